//! Version command - Show installed and available forms versions.

use anyhow::{Context, Result};
use clap::Args;

use wfv_forms::{FormsConfig, FormsError};

use super::open_library;
use crate::ExitCodes;

#[derive(Args)]
pub struct VersionArgs {
    /// Also ask the update site for the latest version
    #[arg(long)]
    check: bool,
}

pub fn execute(args: VersionArgs, config: &FormsConfig) -> Result<u8> {
    let mut library = open_library(config)?;

    match library.current_version() {
        Ok(version) => println!(
            "Installed forms: {} ({})",
            version.long_form(),
            version.short_form()
        ),
        Err(FormsError::LibraryUninitialized(root)) => {
            println!("Installed forms: none (library at {:?})", root)
        }
        Err(e) => return Err(e.into()),
    }

    if args.check {
        let release = library
            .check_remote_version()
            .context("Failed to check for the latest forms")?;
        println!("Latest forms:    {}", release.version.short_form());
        println!("Download:        {}", release.download_url);
    }

    Ok(ExitCodes::SUCCESS)
}
