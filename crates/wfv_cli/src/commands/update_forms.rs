//! Update-forms command - Install the latest standard forms.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use wfv_forms::{FormLibrary, FormVersion, FormsConfig, UpdateOutcome};

use super::{open_library, prompt};
use crate::ExitCodes;

#[derive(Args)]
pub struct UpdateFormsArgs {
    /// Install without asking for confirmation
    #[arg(short, long)]
    yes: bool,
}

pub fn execute(args: UpdateFormsArgs, config: &FormsConfig) -> Result<u8> {
    let mut library = open_library(config)?;
    let outcome = update(&mut library, args.yes)?;
    report(&outcome);
    Ok(ExitCodes::SUCCESS)
}

/// Run the update sequence, asking before installing unless `assume_yes`.
pub fn update(library: &mut FormLibrary, assume_yes: bool) -> Result<UpdateOutcome> {
    library
        .update_if_newer(|_installed, available| {
            assume_yes || prompt::confirm(&question(available))
        })
        .context("Failed to update forms")
}

pub fn report(outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::AlreadyCurrent(version) => {
            println!("✅ Forms are up to date (version {})", version)
        }
        UpdateOutcome::DeclinedByUser(version) => {
            info!("skipped forms version {}", version);
            println!("⚠️  Forms version {} is available but was not installed", version)
        }
        UpdateOutcome::Updated(version) => println!("✅ Installed forms version {}", version),
    }
}

fn question(available: &FormVersion) -> String {
    format!(
        "Update currently installed forms with version {}?",
        available.short_form()
    )
}
