//! On-disk form template library.
//!
//! Layout of the root forms directory:
//!
//! ```text
//! forms/
//! ├── ACTIVE                          # name of the active version directory
//! ├── Standard_Forms-1.0.141.0/       # previous version, kept
//! ├── Standard_Forms-1.0.142.0/       # active version
//! │   ├── Standard_Forms_Version.dat
//! │   └── ICS USA Forms/ICS213_Viewer.html
//! ├── Standard_Forms-1.0.141.0.zip
//! └── Standard_Forms-1.0.142.0.zip
//! ```
//!
//! A root without `ACTIVE` that holds the version marker directly is treated
//! as a single, unversioned tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::FormsConfig;
use crate::error::{FormsError, FormsResult, ResolutionError};
use crate::remote::{HttpTransport, RemoteRelease, Transport, UpdateSite};
use crate::version::{FormVersion, VERSION_MARKER_FILE};

/// Pointer file naming the active version directory.
pub const ACTIVE_POINTER_FILE: &str = "ACTIVE";

/// Prefix of versioned template directories and retained archives.
pub const VERSION_DIR_PREFIX: &str = "Standard_Forms-";

/// Form template library rooted at the configured forms directory.
pub struct FormLibrary {
    pub(crate) root: PathBuf,
    pub(crate) site: UpdateSite,
    pub(crate) min_archive_bytes: usize,
    pub(crate) active: Option<PathBuf>,
    pub(crate) last_remote: Option<RemoteRelease>,
}

impl FormLibrary {
    /// Open the library, talking to the update site over HTTP.
    pub fn open(config: &FormsConfig) -> FormsResult<Self> {
        let transport = HttpTransport::new(&config.update)?;
        Self::open_with_transport(config, Box::new(transport))
    }

    /// Open the library with a custom transport for the update site.
    ///
    /// Creates the root forms directory if it is missing. A file sitting where
    /// the directory should be is renamed aside first.
    pub fn open_with_transport(
        config: &FormsConfig,
        transport: Box<dyn Transport>,
    ) -> FormsResult<Self> {
        let root = config.forms.path.clone();
        prepare_root(&root)?;

        let active = find_active(&root)?;
        debug!("Forms path: {:?}, active tree: {:?}", root, active);

        Ok(Self {
            root,
            site: UpdateSite::new(transport, config.update.clone()),
            min_archive_bytes: config.update.min_archive_bytes,
            active,
            last_remote: None,
        })
    }

    /// Root forms directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Active template tree, if one is installed.
    pub fn active_dir(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    /// Release seen by the most recent remote version check.
    pub fn last_remote(&self) -> Option<&RemoteRelease> {
        self.last_remote.as_ref()
    }

    /// Whether there is no usable template tree yet.
    pub fn needs_initial_download(&self) -> bool {
        self.current_version().is_err()
    }

    /// Version of the active template tree, read from its marker file.
    pub fn current_version(&self) -> FormsResult<FormVersion> {
        let active = self.require_active()?;
        read_version_marker(active)?.ok_or_else(|| FormsError::LibraryUninitialized(self.root.clone()))
    }

    /// Ask the update site for its latest release and remember the answer.
    pub fn check_remote_version(&mut self) -> FormsResult<RemoteRelease> {
        let installed = self.current_version().ok();
        let release = self.site.latest_release(installed.as_ref())?;
        self.last_remote = Some(release.clone());
        Ok(release)
    }

    /// Find the single template file named exactly `display_form`.
    pub fn resolve(&self, display_form: &str) -> FormsResult<PathBuf> {
        let active = self.require_active()?;

        // walk errors fail the lookup
        let mut matches = Vec::new();
        for entry in WalkDir::new(active) {
            let entry = entry.map_err(|e| {
                warn!("Can't search forms tree {:?}: {}", active, e);
                io::Error::from(e)
            })?;
            if entry.file_type().is_file() && entry.file_name().to_str() == Some(display_form) {
                debug!("found matching filename: {:?}", entry.path());
                matches.push(entry.into_path());
            }
        }

        match matches.len() {
            0 => Err(ResolutionError::NotFound(display_form.to_string()).into()),
            1 => Ok(matches[0].canonicalize()?),
            _ => Err(ResolutionError::AmbiguousMatch {
                name: display_form.to_string(),
                paths: matches,
            }
            .into()),
        }
    }

    /// Installed version directories, oldest name first.
    pub fn installed_versions(&self) -> FormsResult<Vec<PathBuf>> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if entry.file_type()?.is_dir()
                && name.to_string_lossy().starts_with(VERSION_DIR_PREFIX)
            {
                versions.push(entry.path());
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn require_active(&self) -> FormsResult<&Path> {
        self.active
            .as_deref()
            .ok_or_else(|| FormsError::LibraryUninitialized(self.root.clone()))
    }
}

/// Read the long version from a tree's marker file, if present.
pub fn read_version_marker(dir: &Path) -> FormsResult<Option<FormVersion>> {
    let marker = dir.join(VERSION_MARKER_FILE);
    if !marker.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&marker)?;
    Ok(Some(FormVersion::from_long_form(content)))
}

/// Timestamp used to rename things aside.
fn timestamp() -> String {
    Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

fn prepare_root(root: &Path) -> FormsResult<()> {
    if root.exists() && !root.is_dir() {
        let renamed = PathBuf::from(format!("{}-{}", root.display(), timestamp()));
        warn!(
            "Forms directory {:?} is not a directory. Renamed to: {:?}",
            root, renamed
        );
        fs::rename(root, &renamed)?;
    }

    if !root.exists() {
        warn!("Forms directory {:?} not found. Creating.", root);
        fs::create_dir_all(root).map_err(|source| FormsError::CannotCreateRoot {
            path: root.to_path_buf(),
            source,
        })?;
    }

    Ok(())
}

pub(crate) fn find_active(root: &Path) -> FormsResult<Option<PathBuf>> {
    let pointer = root.join(ACTIVE_POINTER_FILE);
    if pointer.is_file() {
        let name = fs::read_to_string(&pointer)?;
        let dir = root.join(name.trim());
        if dir.is_dir() {
            return Ok(Some(dir));
        }
        warn!("Active forms pointer names a missing directory: {:?}", dir);
        return Ok(None);
    }

    if root.join(VERSION_MARKER_FILE).is_file() {
        info!("Using unversioned forms tree at {:?}", root);
        return Ok(Some(root.to_path_buf()));
    }

    Ok(None)
}
