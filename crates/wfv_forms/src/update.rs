//! Form library updates.
//!
//! An update never touches the active tree until the new one is complete:
//! the archive is extracted into a uniquely named staging directory, checked
//! for a version marker, renamed to its versioned name and only then made
//! active by replacing the `ACTIVE` pointer file. Previous version
//! directories are left in place.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FormsError, FormsResult};
use crate::library::{read_version_marker, FormLibrary, ACTIVE_POINTER_FILE, VERSION_DIR_PREFIX};
use crate::version::FormVersion;

const STAGING_PREFIX: &str = ".staging-";

/// Result of an update attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "version", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The installed release is the latest one
    AlreadyCurrent(FormVersion),
    /// A newer release exists but installing it was declined
    DeclinedByUser(FormVersion),
    /// The release was downloaded, installed and made active
    Updated(FormVersion),
}

impl FormLibrary {
    /// Install the latest release if it differs from the installed one.
    ///
    /// `confirm` is asked before downloading, with the installed version (if
    /// any) and the available one. On any error the previously active tree
    /// stays active.
    pub fn update_if_newer<F>(&mut self, confirm: F) -> FormsResult<UpdateOutcome>
    where
        F: FnOnce(Option<&FormVersion>, &FormVersion) -> bool,
    {
        info!("Checking for latest Winlink forms");
        let installed = match self.current_version() {
            Ok(version) => Some(version),
            Err(FormsError::LibraryUninitialized(_)) => None,
            Err(e) => return Err(e),
        };
        match &installed {
            Some(version) => info!("Currently installed version: {}", version),
            None => info!("No forms installed yet"),
        }

        let release = self.check_remote_version()?;
        info!("Latest available version: {}", release.version.short_form());

        if let Some(version) = &installed {
            if version.same_release(&release.version) {
                info!("The installed version is the same as the most current version");
                return Ok(UpdateOutcome::AlreadyCurrent(version.clone()));
            }
        }

        if !confirm(installed.as_ref(), &release.version) {
            info!("skipping forms update");
            return Ok(UpdateOutcome::DeclinedByUser(release.version));
        }

        let bytes = self.site.download(&release)?;
        if bytes.len() <= self.min_archive_bytes {
            warn!(
                "downloaded only {} bytes from {}; not installing",
                bytes.len(),
                release.download_url
            );
            return Err(FormsError::Download {
                bytes: bytes.len(),
                minimum: self.min_archive_bytes,
            });
        }
        info!("downloaded new forms: {} bytes", bytes.len());

        let version = self.install_archive(&bytes)?;
        info!("downloaded new forms, version: {}", version);
        Ok(UpdateOutcome::Updated(version))
    }

    /// Install a forms archive and make it the active tree.
    pub fn install_archive(&mut self, archive: &[u8]) -> FormsResult<FormVersion> {
        let staging_name = format!("{}{}", STAGING_PREFIX, Uuid::new_v4());
        let staging = self.root.join(&staging_name);
        let staged_archive = self.root.join(format!("{}.zip", staging_name));

        fs::create_dir(&staging)?;
        let staged = stage_archive(archive, &staging, &staged_archive);
        let (content_dir, version) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                warn!("Discarding staged forms at {:?}: {}", staging, e);
                discard(&staging, &staged_archive);
                return Err(e);
            }
        };

        let version_dir = self.unused_version_dir(&version);
        if let Err(e) = fs::rename(&content_dir, &version_dir) {
            discard(&staging, &staged_archive);
            return Err(e.into());
        }
        if staging.exists() {
            // archive had a single top-level folder; only the empty shell is left
            let _ = fs::remove_dir_all(&staging);
        }
        info!("installed forms {} to {:?}", version, version_dir);

        let mut archive_name = version_dir.file_name().unwrap_or_default().to_os_string();
        archive_name.push(".zip");
        let archive_path = self.root.join(archive_name);
        fs::rename(&staged_archive, &archive_path)?;
        info!("wrote zipped forms file to: {:?}", archive_path);

        self.activate(&version_dir)?;
        Ok(version)
    }

    /// Point `ACTIVE` at a version directory under the root.
    fn activate(&mut self, version_dir: &Path) -> FormsResult<()> {
        let name = version_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let pointer = self.root.join(ACTIVE_POINTER_FILE);
        let pending = self.root.join(format!("{}.tmp", ACTIVE_POINTER_FILE));
        fs::write(&pending, &name)?;
        fs::rename(&pending, &pointer)?;

        if let Some(previous) = &self.active {
            debug!("previous forms tree kept at {:?}", previous);
        }
        info!("active forms tree is now {}", name);
        self.active = Some(version_dir.to_path_buf());
        Ok(())
    }

    fn unused_version_dir(&self, version: &FormVersion) -> PathBuf {
        let base = format!("{}{}", VERSION_DIR_PREFIX, dir_safe(version.long_form()));
        let dir = self.root.join(&base);
        if dir.exists() {
            self.root.join(format!("{}-{}", base, Uuid::new_v4().simple()))
        } else {
            dir
        }
    }
}

/// Write the archive next to the staging directory, extract it and read the
/// version of the extracted tree.
fn stage_archive(
    archive: &[u8],
    staging: &Path,
    staged_archive: &Path,
) -> FormsResult<(PathBuf, FormVersion)> {
    fs::write(staged_archive, archive)?;

    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    zip.extract(staging)?;
    debug!("extracted {} entries into {:?}", zip.len(), staging);

    let content_dir = content_root(staging)?;
    let version = read_version_marker(&content_dir)?
        .ok_or_else(|| FormsError::CorruptPackage(staging.to_path_buf()))?;
    Ok((content_dir, version))
}

/// The extracted tree: the staging directory itself, or its only
/// subdirectory when the archive wraps everything in one folder.
fn content_root(staging: &Path) -> FormsResult<PathBuf> {
    let entries: Vec<_> = fs::read_dir(staging)?.collect::<Result<_, _>>()?;
    if let [only] = entries.as_slice() {
        if only.file_type()?.is_dir() {
            return Ok(only.path());
        }
    }
    Ok(staging.to_path_buf())
}

fn discard(staging: &Path, staged_archive: &Path) {
    let _ = fs::remove_dir_all(staging);
    let _ = fs::remove_file(staged_archive);
}

fn dir_safe(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::config::FormsConfig;
    use crate::error::NetworkError;
    use crate::remote::{Fetched, MockTransport};
    use crate::version::VERSION_MARKER_FILE;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const PREFIX: &str = "https://example.org/standard_templates_version_";

    fn forms_zip(version: Option<&str>, folder: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        if let Some(version) = version {
            writer
                .start_file(format!("{}{}", folder, VERSION_MARKER_FILE), options)
                .unwrap();
            writer.write_all(version.as_bytes()).unwrap();
        }
        writer
            .start_file(format!("{}ICS USA Forms/ICS213_Viewer.html", folder), options)
            .unwrap();
        writer.write_all(b"<p>{var msg}</p>").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn transport(remote_short: &'static str, archive: Vec<u8>) -> MockTransport {
        let mut transport = MockTransport::new();
        transport.expect_fetch().returning(move |url| {
            if url.starts_with(PREFIX) {
                Ok(Fetched {
                    final_url: format!("{}{}", PREFIX, remote_short),
                    status: 200,
                    body: br#"<a href="https://1drv.ms/u/s!forms">forms</a>"#.to_vec(),
                })
            } else {
                Ok(Fetched {
                    final_url: url.to_string(),
                    status: 200,
                    body: archive.clone(),
                })
            }
        });
        transport
    }

    fn open(root: &Path, transport: MockTransport) -> FormLibrary {
        let mut config = FormsConfig::default().with_forms_path(root);
        config.update.url_prefix = PREFIX.to_string();
        config.update.min_archive_bytes = 16;
        FormLibrary::open_with_transport(&config, Box::new(transport)).unwrap()
    }

    #[test]
    fn test_initial_install() {
        let temp = tempdir().unwrap();
        let archive = forms_zip(Some("1.0.142.0"), "");
        let mut lib = open(temp.path(), transport("10142", archive));

        let outcome = lib
            .update_if_newer(|installed, available| {
                assert!(installed.is_none());
                assert_eq!(available.short_form(), "10142");
                true
            })
            .unwrap();

        let version = FormVersion::from_long_form("1.0.142.0");
        assert_eq!(outcome, UpdateOutcome::Updated(version.clone()));
        assert_eq!(lib.current_version().unwrap(), version);
        assert!(lib.resolve("ICS213_Viewer.html").is_ok());
        assert!(temp.path().join("Standard_Forms-1.0.142.0.zip").is_file());
        assert_eq!(
            fs::read_to_string(temp.path().join(ACTIVE_POINTER_FILE)).unwrap(),
            "Standard_Forms-1.0.142.0"
        );
    }

    #[test]
    fn test_already_current_skips_confirm() {
        let temp = tempdir().unwrap();
        let mut lib = open(temp.path(), transport("10142", Vec::new()));
        lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();

        let outcome = lib
            .update_if_newer(|_, _| panic!("confirm must not be asked"))
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::AlreadyCurrent(_)));
    }

    #[test]
    fn test_declined_update_changes_nothing() {
        let temp = tempdir().unwrap();
        let mut lib = open(temp.path(), transport("10143", Vec::new()));
        lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();

        let outcome = lib.update_if_newer(|_, _| false).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::DeclinedByUser(FormVersion::from_token("10143"))
        );
        assert_eq!(lib.current_version().unwrap().short_form(), "10142");
        assert_eq!(lib.last_remote().unwrap().version.short_form(), "10143");
    }

    #[test]
    fn test_update_keeps_previous_tree() {
        let temp = tempdir().unwrap();
        let archive = forms_zip(Some("1.0.143.0"), "Standard_Forms/");
        let mut lib = open(temp.path(), transport("10143", archive));
        lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();

        let outcome = lib.update_if_newer(|_, _| true).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Updated(FormVersion::from_long_form("1.0.143.0"))
        );
        assert!(temp.path().join("Standard_Forms-1.0.142.0").is_dir());
        assert!(temp
            .path()
            .join("Standard_Forms-1.0.143.0")
            .join(VERSION_MARKER_FILE)
            .is_file());
        assert_eq!(lib.installed_versions().unwrap().len(), 2);
        assert!(lib.resolve("ICS213_Viewer.html").is_ok());
    }

    #[test]
    fn test_undersized_download_is_rejected() {
        let temp = tempdir().unwrap();
        let mut lib = open(temp.path(), transport("10143", b"<html>bu".to_vec()));
        lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();

        let err = lib.update_if_newer(|_, _| true).unwrap_err();
        assert!(matches!(err, FormsError::Download { bytes: 8, minimum: 16 }));
        assert_eq!(lib.current_version().unwrap().short_form(), "10142");
    }

    #[test]
    fn test_package_without_marker_is_corrupt() {
        let temp = tempdir().unwrap();
        let archive = forms_zip(None, "");
        let mut lib = open(temp.path(), transport("10143", archive));
        lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();

        let err = lib.update_if_newer(|_, _| true).unwrap_err();
        assert!(matches!(err, FormsError::CorruptPackage(_)));
        assert_eq!(lib.current_version().unwrap().short_form(), "10142");

        let leftovers = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_not_a_zip_leaves_active_tree() {
        let temp = tempdir().unwrap();
        let mut lib = open(temp.path(), transport("10143", vec![b'x'; 64]));
        lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();

        let err = lib.update_if_newer(|_, _| true).unwrap_err();
        assert!(matches!(err, FormsError::Archive(_)));
        assert_eq!(lib.current_version().unwrap().short_form(), "10142");
    }

    #[test]
    fn test_failed_remote_check_keeps_version() {
        let temp = tempdir().unwrap();
        let mut transport = MockTransport::new();
        transport.expect_fetch().returning(|url| {
            Err(NetworkError::UnexpectedResponse {
                url: url.to_string(),
                message: "unreachable".to_string(),
            })
        });
        let mut lib = open(temp.path(), transport);
        lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();

        let before = lib.current_version().unwrap();
        assert!(lib.update_if_newer(|_, _| true).is_err());
        assert_eq!(lib.current_version().unwrap(), before);
    }

    #[test]
    fn test_reinstalling_same_version_gets_fresh_directory() {
        let temp = tempdir().unwrap();
        let mut lib = open(temp.path(), MockTransport::new());
        for _ in 0..3 {
            lib.install_archive(&forms_zip(Some("1.0.142.0"), "")).unwrap();
        }

        assert_eq!(lib.installed_versions().unwrap().len(), 3);
        assert!(lib.resolve("ICS213_Viewer.html").is_ok());
    }
}
