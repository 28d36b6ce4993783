//! Standard forms version numbers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the marker file holding the long version of a forms tree.
pub const VERSION_MARKER_FILE: &str = "Standard_Forms_Version.dat";

/// A standard forms version.
///
/// The long form is the dotted four-part version found in the marker file
/// (`1.0.141.0`); the short form is what the update site uses in its URLs
/// (`10141`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormVersion {
    long_form: String,
    short_form: String,
}

impl FormVersion {
    /// Build a version from its dotted long form.
    pub fn from_long_form(long_form: impl AsRef<str>) -> Self {
        let long_form = long_form.as_ref().trim().to_string();
        let short_form = short_form(&long_form);
        Self {
            long_form,
            short_form,
        }
    }

    /// Build a version from a token published by the update site.
    ///
    /// Dotted tokens are long forms. Undotted tokens are already short forms
    /// and are used as both.
    pub fn from_token(token: impl AsRef<str>) -> Self {
        let token = token.as_ref().trim();
        if token.contains('.') {
            Self::from_long_form(token)
        } else {
            Self {
                long_form: token.to_string(),
                short_form: token.to_string(),
            }
        }
    }

    pub fn long_form(&self) -> &str {
        &self.long_form
    }

    pub fn short_form(&self) -> &str {
        &self.short_form
    }

    /// Versions compare equal for update purposes when their short forms match.
    pub fn same_release(&self, other: &FormVersion) -> bool {
        self.short_form == other.short_form
    }
}

impl fmt::Display for FormVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.long_form)
    }
}

/// Drop the last dotted component and remove the remaining dots.
///
/// A version without any dot is returned unchanged.
pub fn short_form(long_form: &str) -> String {
    match long_form.rfind('.') {
        Some(index) => long_form[..index].replace('.', ""),
        None => long_form.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form() {
        assert_eq!(short_form("1.0.141.0"), "10141");
        assert_eq!(short_form("1.0.142.3"), "10142");
        assert_eq!(short_form("10141"), "10141");
        assert_eq!(short_form("1.2"), "1");
    }

    #[test]
    fn test_from_long_form_trims() {
        let version = FormVersion::from_long_form("1.0.141.0\r\n");
        assert_eq!(version.long_form(), "1.0.141.0");
        assert_eq!(version.short_form(), "10141");
        assert_eq!(version.to_string(), "1.0.141.0");
    }

    #[test]
    fn test_from_token() {
        assert_eq!(FormVersion::from_token("10142").short_form(), "10142");
        assert_eq!(FormVersion::from_token("1.0.142.0").short_form(), "10142");
    }

    #[test]
    fn test_same_release() {
        let installed = FormVersion::from_long_form("1.0.141.0");
        assert!(installed.same_release(&FormVersion::from_token("10141")));
        assert!(installed.same_release(&FormVersion::from_long_form("1.0.141.7")));
        assert!(!installed.same_release(&FormVersion::from_token("10142")));
    }
}
