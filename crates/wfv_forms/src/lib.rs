//! # wfv_forms
//!
//! Winlink Express view rendering and standard forms library management.
//!
//! A view payload names a form template and carries the values entered into
//! it. This crate:
//!
//! - Parses view payloads into a flat key/value model
//! - Resolves the named template in the active standard forms tree
//! - Substitutes `{var name}` tokens in the template
//! - Keeps the local forms library in step with the Winlink update site
//!
//! ## Example
//!
//! ```rust,no_run
//! use wfv_forms::{FormLibrary, FormsConfig, RenderPipeline};
//!
//! let config = FormsConfig::load_or_default("fv.toml").unwrap();
//! let library = FormLibrary::open(&config).unwrap();
//!
//! let view = std::fs::read_to_string("message.xml").unwrap();
//! let result = RenderPipeline::new(&library, &config).render(&view);
//! println!("{}", result.body);
//! ```

pub mod config;
pub mod error;
pub mod library;
pub mod pipeline;
pub mod remote;
pub mod renderer;
pub mod update;
pub mod version;
pub mod view;

pub use config::{FormsConfig, LibraryConfig, Messages, UpdateConfig, DEFAULT_CONFIG_FILE};
pub use error::{ConfigError, FormsError, FormsResult, NetworkError, ParseError, ResolutionError};
pub use library::{FormLibrary, ACTIVE_POINTER_FILE, VERSION_DIR_PREFIX};
pub use pipeline::{RenderPipeline, RenderResult, RenderStatus};
pub use remote::{Fetched, HttpTransport, RemoteRelease, Transport, UpdateSite};
pub use renderer::{MissingPolicy, TemplateRenderer};
pub use update::UpdateOutcome;
pub use version::{FormVersion, VERSION_MARKER_FILE};
pub use view::{ViewModel, ViewParser};
