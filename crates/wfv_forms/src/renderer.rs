//! Token substitution for form templates.
//!
//! Form templates mark substitution points with `{var <name>}` tokens. Names
//! are matched against the view model case-insensitively and values are
//! inserted verbatim, without any HTML escaping.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::view::ViewModel;

// `{var`, at least one whitespace character, then the name up to the closing brace
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{var\s+([^}]+)\}").expect("token pattern is valid"));

/// What to do with a token whose name is not in the view model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Replace the token with an empty string
    #[default]
    EmptyString,
    /// Leave the token text in the output unchanged
    LeaveToken,
}

/// Template renderer replacing `{var name}` tokens with view values.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    missing_policy: MissingPolicy,
}

impl TemplateRenderer {
    /// Create a renderer that blanks unknown tokens.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing_policy
    }

    pub fn set_missing_policy(&mut self, policy: MissingPolicy) {
        self.missing_policy = policy;
    }

    /// Render template text against a view model.
    ///
    /// Every token is replaced in one pass over the original text, so values
    /// that themselves look like tokens are never expanded. Rendering has no
    /// side effects, logging included.
    pub fn render_content(&self, template: &str, model: &ViewModel) -> String {
        TOKEN_PATTERN
            .replace_all(template, |caps: &Captures| {
                let token = &caps[0];
                let name = caps[1].to_lowercase();

                match model.lookup(&name) {
                    Some(value) => value.unwrap_or_default().to_string(),
                    None => match self.missing_policy {
                        MissingPolicy::EmptyString => String::new(),
                        MissingPolicy::LeaveToken => token.to_string(),
                    },
                }
            })
            .into_owned()
    }
}

/// Names of all tokens in a template, lower-cased, in order of appearance.
pub fn token_names(template: &str) -> Vec<String> {
    TOKEN_PATTERN
        .captures_iter(template)
        .map(|caps| caps[1].to_lowercase())
        .collect()
}
