// ── Identity validation ──
//
// Every device's name keys its local copy, so two devices reporting the
// same name would overwrite each other's data. Validation asks every
// address for its status once and refuses an ambiguous fleet.

use futures_util::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DeviceAddress, validate_device_name};
use crate::transport::FleetTransport;

/// Placeholder name for addresses that did not answer.
pub const UNREACHABLE_NAME: &str = "<unreachable>";

/// How to treat addresses that fail to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameTolerance {
    /// Any unanswered address fails validation.
    #[default]
    Strict,
    /// Unanswered addresses are reported but do not fail validation.
    AllowPartial,
}

/// Name reported by one address.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeviceIdentity {
    pub address: DeviceAddress,
    /// `None` when the device did not answer.
    pub name: Option<String>,
}

impl DeviceIdentity {
    /// The name, or `<unreachable>`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNREACHABLE_NAME)
    }
}

/// Fetch every device's name concurrently and check they are distinct.
///
/// Returns identities in input order. Has no storage side effects.
pub async fn validate_names(
    transport: &FleetTransport,
    addresses: &[DeviceAddress],
    tolerance: NameTolerance,
) -> Result<Vec<DeviceIdentity>, CoreError> {
    let results = join_all(addresses.iter().map(|a| transport.fetch_status(a))).await;

    let mut identities = Vec::with_capacity(addresses.len());
    let mut unreachable = Vec::new();
    for (address, result) in addresses.iter().zip(results) {
        let name = match result {
            Ok(status) => {
                validate_device_name(&status.name)?;
                Some(status.name)
            }
            Err(e) => {
                warn!(address = %address, error = %e, "no status during name validation");
                unreachable.push(address.to_string());
                None
            }
        };
        identities.push(DeviceIdentity {
            address: address.clone(),
            name,
        });
    }

    if let Some((name, addresses)) = first_duplicate(&identities) {
        return Err(CoreError::DuplicateName { name, addresses });
    }

    if !unreachable.is_empty() && tolerance == NameTolerance::Strict {
        return Err(CoreError::FleetUnreachable {
            addresses: unreachable,
        });
    }

    debug!(devices = identities.len(), "device names are unique");
    Ok(identities)
}

fn first_duplicate(identities: &[DeviceIdentity]) -> Option<(String, Vec<String>)> {
    let mut by_name: IndexMap<&str, Vec<String>> = IndexMap::new();
    for identity in identities {
        if let Some(name) = identity.name.as_deref() {
            by_name
                .entry(name)
                .or_default()
                .push(identity.address.to_string());
        }
    }
    by_name
        .into_iter()
        .find(|(_, addresses)| addresses.len() > 1)
        .map(|(name, addresses)| (name.to_owned(), addresses))
}
