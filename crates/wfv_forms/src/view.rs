//! View payload parsing.
//!
//! A view payload is the small XML envelope Winlink Express sends in place of
//! a full form. It carries the name of the form to display and the values
//! entered into it:
//!
//! ```xml
//! <?xml version="1.0"?>
//! <RMS_Express_Form>
//!   <form_parameters>
//!     <display_form>ICS213_Viewer.html</display_form>
//!   </form_parameters>
//!   <variables>
//!     <subject>Status report</subject>
//!   </variables>
//! </RMS_Express_Form>
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::error::ParseError;

/// Section holding form-level parameters such as `display_form`.
pub const FORM_PARAMETERS_SECTION: &str = "form_parameters";

/// Section holding the values entered into the form.
pub const VARIABLES_SECTION: &str = "variables";

/// Key naming the form template to display.
pub const DISPLAY_FORM_KEY: &str = "display_form";

/// Declaration a view payload must start with (compared case-insensitively).
pub const ENVELOPE_DECLARATION: &str = "<?xml version=\"1.0\"?>";

/// Root element marker a view payload must contain (compared case-insensitively).
pub const ENVELOPE_ROOT: &str = "<rms_express_form>";

/// Flat key/value model of a parsed view payload.
///
/// Keys are always lower case. A key recorded for an element without text
/// maps to `None`, which is distinct from the key being absent.
///
/// A model returned by [`ViewParser::parse`] cannot be changed afterwards:
///
/// ```compile_fail
/// let mut model = wfv_forms::ViewModel::new();
/// model.insert("subject", None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewModel {
    values: HashMap<String, Option<String>>,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value, lower-casing the key. Later inserts overwrite earlier ones.
    pub(crate) fn insert(&mut self, key: impl AsRef<str>, value: Option<String>) {
        self.values.insert(key.as_ref().to_lowercase(), value);
    }

    /// Builder-style insert of a present value.
    pub fn with_value(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    /// Look up a key; the outer `Option` is presence, the inner one is the value.
    pub fn lookup(&self, key: &str) -> Option<Option<&str>> {
        self.values
            .get(&key.to_lowercase())
            .map(|value| value.as_deref())
    }

    /// Value for a key, if the key is present and has text.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup(key).flatten()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_lowercase())
    }

    /// The form template name this view should be rendered with.
    pub fn display_form(&self) -> Option<&str> {
        self.get(DISPLAY_FORM_KEY)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ViewModel {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut model = ViewModel::new();
        for (key, value) in iter {
            model.insert(key, Some(value.into()));
        }
        model
    }
}

/// Check the fixed declaration and root marker of a view payload.
pub fn is_view_envelope(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    lower.starts_with(ENVELOPE_DECLARATION) && lower.contains(ENVELOPE_ROOT)
}

/// Parser turning a raw view payload into a [`ViewModel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewParser;

impl ViewParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a view payload.
    ///
    /// Form parameters are recorded first and variables second, so a variable
    /// shadows a form parameter of the same name.
    pub fn parse(&self, raw: &str) -> Result<ViewModel, ParseError> {
        let document =
            roxmltree::Document::parse(raw).map_err(|e| ParseError::Malformed(e.to_string()))?;

        let parameters = find_section(&document, FORM_PARAMETERS_SECTION)?;
        let variables = find_section(&document, VARIABLES_SECTION)?;

        let mut model = ViewModel::new();
        for (section, node) in [
            (FORM_PARAMETERS_SECTION, parameters),
            (VARIABLES_SECTION, variables),
        ] {
            for element in node.children().filter(|n| n.is_element()) {
                let name = element.tag_name().name().to_lowercase();
                let value = element.text().map(str::to_string);
                debug!("{}, name: {}, value: {:?}", section, name, value);
                model.insert(name, value);
            }
        }

        debug!("after parsing, view has {} entries", model.len());
        Ok(model)
    }
}

fn find_section<'a, 'input>(
    document: &'a roxmltree::Document<'input>,
    name: &'static str,
) -> Result<roxmltree::Node<'a, 'input>, ParseError> {
    document
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == name)
        .ok_or(ParseError::MissingSection(name))
}
