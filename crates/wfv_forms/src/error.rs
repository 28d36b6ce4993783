//! Error types for the forms library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for forms operations.
pub type FormsResult<T> = Result<T, FormsError>;

/// Errors raised while parsing a view payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("uploaded content doesn't appear to be a valid Winlink view file")]
    InvalidEnvelope,

    #[error("{0}")]
    Malformed(String),

    #[error("view file has no <{0}> section")]
    MissingSection(&'static str),
}

/// Errors raised while mapping a display form name to a template file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("view file does not name a display form")]
    MissingDisplayForm,

    #[error("no form files found matching {0}")]
    NotFound(String),

    #[error("multiple form files found matching {name}: {paths:?}")]
    AmbiguousMatch { name: String, paths: Vec<PathBuf> },
}

impl ResolutionError {
    /// The display form name the resolution was attempted for, if any.
    pub fn display_form(&self) -> Option<&str> {
        match self {
            Self::MissingDisplayForm => None,
            Self::NotFound(name) | Self::AmbiguousMatch { name, .. } => Some(name),
        }
    }
}

/// Errors raised while talking to the remote form distribution point.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("no download link containing '{magic}' found at {url}")]
    NoDownloadLink { url: String, magic: String },
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("empty configuration parameter: {0}")]
    EmptyValue(&'static str),

    #[error("invalid configuration in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors that can occur during forms operations.
#[derive(Error, Debug)]
pub enum FormsError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Forms library at {0} is not initialized")]
    LibraryUninitialized(PathBuf),

    #[error("Can't create forms dir {path}: {source}")]
    CannotCreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Downloaded only {bytes} bytes, expected more than {minimum}")]
    Download { bytes: usize, minimum: usize },

    #[error("Form package has no version marker: {0}")]
    CorruptPackage(PathBuf),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
