//! `validate`: every device must report a distinct name.

use sensorhub_core::{DeviceIdentity, NameTolerance};
use tabled::Tabled;

use crate::cli::{GlobalOpts, ValidateArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct IdentityRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&DeviceIdentity> for IdentityRow {
    fn from(id: &DeviceIdentity) -> Self {
        Self {
            address: id.address.to_string(),
            name: id.display_name().to_owned(),
        }
    }
}

pub fn tolerance(allow_partial: bool) -> NameTolerance {
    if allow_partial {
        NameTolerance::AllowPartial
    } else {
        NameTolerance::Strict
    }
}

pub async fn handle(args: ValidateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (hub, cfg) = super::build_hub(global)?;
    let addresses = crate::config::addresses(global, &cfg)?;

    let identities = hub
        .validate_names(&addresses, tolerance(args.allow_partial))
        .await?;

    let out = output::render_list(&global.output, &identities, |id| IdentityRow::from(id), |id| {
        format!("{}\t{}", id.address, id.display_name())
    });
    output::print_output(&out, global.quiet);
    output::print_note(
        &format!("{} device names are unique", identities.len()),
        global.quiet,
    );
    Ok(())
}
