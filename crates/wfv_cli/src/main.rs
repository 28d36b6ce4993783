//! Winlink Form Viewer CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Client input error (bad view file, unknown or ambiguous form)
//! - 3: Server error (form library unusable)
//! - 4: Update error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wfv_forms::FormsError;

mod commands;

use commands::{Cli, Commands};

/// Process exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CLIENT_INPUT_ERROR: u8 = 2;
    pub const SERVER_ERROR: u8 = 3;
    pub const UPDATE_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = commands::load_config(cli.config.as_deref()).and_then(|config| {
        match cli.command {
            Commands::Render(args) => commands::render::execute(args, &config),
            Commands::UpdateForms(args) => commands::update_forms::execute(args, &config),
            Commands::Version(args) => commands::version::execute(args, &config),
            Commands::Resolve(args) => commands::resolve::execute(args, &config),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Log to stderr so rendered forms on stdout stay clean.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "wfv=debug"
    } else if quiet {
        "wfv=warn"
    } else {
        "wfv=info"
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in ["warn", level] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let Some(forms_error) = e.chain().find_map(|cause| cause.downcast_ref::<FormsError>()) else {
        return ExitCodes::GENERAL_ERROR;
    };

    match forms_error {
        FormsError::Parse(_) | FormsError::Resolution(_) => ExitCodes::CLIENT_INPUT_ERROR,
        FormsError::LibraryUninitialized(_)
        | FormsError::CannotCreateRoot { .. }
        | FormsError::Io(_) => ExitCodes::SERVER_ERROR,
        FormsError::Network(_)
        | FormsError::Download { .. }
        | FormsError::CorruptPackage(_)
        | FormsError::Archive(_) => ExitCodes::UPDATE_ERROR,
        FormsError::Config(_) => ExitCodes::GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;
    use wfv_forms::{ConfigError, NetworkError, ResolutionError};

    #[test]
    fn test_categorize_forms_errors() {
        let client: anyhow::Error =
            FormsError::from(ResolutionError::NotFound("X.html".into())).into();
        assert_eq!(categorize_error(&client), ExitCodes::CLIENT_INPUT_ERROR);

        let server: anyhow::Error = FormsError::LibraryUninitialized(PathBuf::from("forms")).into();
        assert_eq!(categorize_error(&server), ExitCodes::SERVER_ERROR);

        let update: anyhow::Error = FormsError::from(NetworkError::Status {
            url: "https://example.org".into(),
            status: 500,
        })
        .into();
        assert_eq!(categorize_error(&update), ExitCodes::UPDATE_ERROR);

        let config: anyhow::Error =
            FormsError::from(ConfigError::NotFound(PathBuf::from("fv.toml"))).into();
        assert_eq!(categorize_error(&config), ExitCodes::GENERAL_ERROR);
    }

    #[test]
    fn test_categorize_through_context() {
        let result: Result<(), FormsError> = Err(FormsError::Download {
            bytes: 10,
            minimum: 1_000_000,
        });
        let err = result.context("Failed to update forms").unwrap_err();
        assert_eq!(categorize_error(&err), ExitCodes::UPDATE_ERROR);
    }

    #[test]
    fn test_categorize_other_errors() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
