//! Form viewer configuration.
//!
//! Configuration is read from a TOML file (`fv.toml` by default). Every key is
//! optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [forms]
//! path = "forms"
//!
//! [update]
//! magic = "1drv.ms"
//!
//! [messages]
//! no_form_file_found = "No form files found matching {value}"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, FormsResult};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "fv.toml";

/// Placeholder replaced by the offending name or value in messages.
pub const MESSAGE_PLACEHOLDER: &str = "{value}";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    pub forms: LibraryConfig,
    pub update: UpdateConfig,
    pub messages: Messages,
}

/// Location of the on-disk form library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root forms directory holding the versioned template trees
    pub path: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("forms"),
        }
    }
}

/// Remote update settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Update-check URL; the installed short version is appended to it
    pub url_prefix: String,
    /// Version checked against while no forms are installed
    pub last_known_version: String,
    /// Marker substring identifying the download link on the update page
    pub magic: String,
    /// Downloads at or below this size are treated as failed transfers
    pub min_archive_bytes: usize,
    /// Path segment rewritten in the download link's final URL
    pub redirect_from: String,
    /// Replacement for `redirect_from`
    pub redirect_to: String,
    /// User agent sent with update requests
    pub user_agent: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            url_prefix:
                "https://winlink.org/content/how_manually_update_standard_templates_version_"
                    .to_string(),
            last_known_version: "1.0.141.0".to_string(),
            magic: "1drv.ms".to_string(),
            min_archive_bytes: 1_000_000,
            redirect_from: "/redir".to_string(),
            redirect_to: "/download".to_string(),
            user_agent: format!("wfv/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// User-facing message templates.
///
/// Each template may contain `{value}`, replaced by the offending name or
/// error text when the message is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub cant_parse_view_file: String,
    pub invalid_envelope: String,
    pub no_display_form: String,
    pub no_form_file_found: String,
    pub multiple_form_files_found: String,
    pub cant_read_form_file: String,
    pub library_uninitialized: String,
    pub cant_make_forms_dir: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            cant_parse_view_file: "Can't parse view file: {value}".to_string(),
            invalid_envelope: "Uploaded content doesn't appear to be a valid Winlink view file"
                .to_string(),
            no_display_form: "View file does not name a display form".to_string(),
            no_form_file_found: "No form files found matching {value}".to_string(),
            multiple_form_files_found: "Multiple form files found matching {value}".to_string(),
            cant_read_form_file: "Can't read form file: {value}".to_string(),
            library_uninitialized:
                "Forms library at {value} is not initialized. Run `fv update-forms`".to_string(),
            cant_make_forms_dir: "Can't create forms dir: {value}".to_string(),
        }
    }
}

impl Messages {
    /// Fill a message template with a value.
    pub fn format(template: &str, value: impl AsRef<str>) -> String {
        template.replace(MESSAGE_PLACEHOLDER, value.as_ref())
    }

    fn entries(&self) -> [(&'static str, &str); 8] {
        [
            ("messages.cant_parse_view_file", self.cant_parse_view_file.as_str()),
            ("messages.invalid_envelope", self.invalid_envelope.as_str()),
            ("messages.no_display_form", self.no_display_form.as_str()),
            ("messages.no_form_file_found", self.no_form_file_found.as_str()),
            ("messages.multiple_form_files_found", self.multiple_form_files_found.as_str()),
            ("messages.cant_read_form_file", self.cant_read_form_file.as_str()),
            ("messages.library_uninitialized", self.library_uninitialized.as_str()),
            ("messages.cant_make_forms_dir", self.cant_make_forms_dir.as_str()),
        ]
    }
}

impl FormsConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> FormsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }

        info!("Using configuration file: {:?}", path);
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Invalid { source, .. } => ConfigError::Invalid {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> FormsResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            warn!("Configuration file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: toml::Table = toml::from_str(content).map_err(|source| ConfigError::Invalid {
            path: PathBuf::new(),
            source,
        })?;
        warn_unknown_keys(&raw);

        let config: FormsConfig = toml::from_str(content).map_err(|source| ConfigError::Invalid {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject keys that were given but left empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forms.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue("forms.path"));
        }

        let update = [
            ("update.url_prefix", &self.update.url_prefix),
            ("update.last_known_version", &self.update.last_known_version),
            ("update.magic", &self.update.magic),
            ("update.redirect_from", &self.update.redirect_from),
            ("update.user_agent", &self.update.user_agent),
        ];
        for (key, value) in update {
            if value.is_empty() {
                return Err(ConfigError::EmptyValue(key));
            }
        }

        for (key, value) in self.messages.entries() {
            if value.is_empty() {
                return Err(ConfigError::EmptyValue(key));
            }
        }

        Ok(())
    }

    /// Override the forms directory.
    pub fn with_forms_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.forms.path = path.into();
        self
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    const KNOWN: &[(&str, &[&str])] = &[
        ("forms", &["path"]),
        (
            "update",
            &[
                "url_prefix",
                "last_known_version",
                "magic",
                "min_archive_bytes",
                "redirect_from",
                "redirect_to",
                "user_agent",
            ],
        ),
        (
            "messages",
            &[
                "cant_parse_view_file",
                "invalid_envelope",
                "no_display_form",
                "no_form_file_found",
                "multiple_form_files_found",
                "cant_read_form_file",
                "library_uninitialized",
                "cant_make_forms_dir",
            ],
        ),
    ];

    let mut unknown = Vec::new();
    for (section, value) in raw {
        let Some((_, keys)) = KNOWN.iter().find(|(name, _)| name == section) else {
            unknown.push(section.clone());
            continue;
        };
        if let Some(table) = value.as_table() {
            for key in table.keys() {
                if !keys.contains(&key.as_str()) {
                    unknown.push(format!("{}.{}", section, key));
                }
            }
        }
    }

    if !unknown.is_empty() {
        warn!("Ignoring unknown configuration keys: {}", unknown.join(", "));
    }
}
