//! Resolve command - Map a display form name to its template file.

use anyhow::Result;
use clap::Args;

use wfv_forms::{FormsConfig, FormsError, ResolutionError};

use super::open_library;
use crate::ExitCodes;

#[derive(Args)]
pub struct ResolveArgs {
    /// Display form file name, e.g. ICS213_Viewer.html
    display_form: String,
}

pub fn execute(args: ResolveArgs, config: &FormsConfig) -> Result<u8> {
    let library = open_library(config)?;

    match library.resolve(&args.display_form) {
        Ok(path) => {
            println!("{}", path.display());
            Ok(ExitCodes::SUCCESS)
        }
        Err(FormsError::Resolution(ResolutionError::AmbiguousMatch { name, paths })) => {
            eprintln!("❌ Multiple form files found matching {}:", name);
            for path in paths {
                eprintln!("   - {}", path.display());
            }
            Ok(ExitCodes::CLIENT_INPUT_ERROR)
        }
        Err(e) => Err(e.into()),
    }
}
