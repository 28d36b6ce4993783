//! CLI command definitions.
//!
//! This module defines the command structure for the `fv` CLI and the
//! plumbing shared by its subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wfv_forms::{FormLibrary, FormsConfig, FormsError, Messages, DEFAULT_CONFIG_FILE};

pub mod prompt;
pub mod render;
pub mod resolve;
pub mod update_forms;
pub mod version;

/// fv - Winlink Express form viewer
#[derive(Parser)]
#[command(name = "fv")]
#[command(version, about = "fv - Winlink Express form viewer")]
#[command(long_about = r#"
fv renders Winlink Express view files against the Winlink standard forms
library and keeps that library up to date.

COMMANDS:
  render        → Render a view file with its display form
  update-forms  → Download and install the latest standard forms
  version       → Show the installed (and optionally latest) forms version
  resolve       → Show which template file a display form name maps to

EXIT CODES:
  0 - Success
  1 - General error
  2 - Client input error
  3 - Server error
  4 - Update error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to fv.toml when present)
    #[arg(short, long, global = true, env = "FV_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a view file with its display form
    Render(render::RenderArgs),

    /// Download and install the latest standard forms
    #[command(name = "update-forms")]
    UpdateForms(update_forms::UpdateFormsArgs),

    /// Show the installed forms version
    Version(version::VersionArgs),

    /// Resolve a display form name to its template file
    Resolve(resolve::ResolveArgs),
}

/// Load the configuration named on the command line, or the default file.
///
/// Only an explicitly named file has to exist.
pub fn load_config(path: Option<&Path>) -> Result<FormsConfig> {
    match path {
        Some(path) => FormsConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => FormsConfig::load_or_default(DEFAULT_CONFIG_FILE)
            .context("Failed to load configuration"),
    }
}

/// Open the form library, reporting an unusable root with the configured message.
pub fn open_library(config: &FormsConfig) -> Result<FormLibrary> {
    FormLibrary::open(config).map_err(|e| match e {
        FormsError::CannotCreateRoot { ref path, .. } => {
            let message = Messages::format(
                &config.messages.cant_make_forms_dir,
                path.display().to_string(),
            );
            anyhow::Error::new(e).context(message)
        }
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_flags() {
        let cli = Cli::parse_from([
            "fv",
            "--verbose",
            "render",
            "message.xml",
            "--json",
            "--leave-missing",
        ]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Render(_)));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("fv.toml");
        std::fs::write(&path, "[forms]\npath = \"/srv/forms\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.forms.path, PathBuf::from("/srv/forms"));
    }
}
