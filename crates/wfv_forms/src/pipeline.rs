//! View rendering pipeline.
//!
//! Turns a raw view payload into the filled-in form: check the envelope,
//! parse the view, resolve its display form against the active template
//! tree and substitute the view's values into the template. Every failure
//! is reported as a [`RenderResult`] so the caller decides how to surface it.

use std::fs;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{FormsConfig, Messages};
use crate::error::{FormsError, ParseError, ResolutionError};
use crate::library::FormLibrary;
use crate::renderer::{token_names, MissingPolicy, TemplateRenderer};
use crate::view::{is_view_envelope, ViewModel, ViewParser};

/// Classification of a render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Success,
    /// The payload was unusable or named an unknown or ambiguous form
    ClientInputError,
    /// The form library could not serve the request
    ServerError,
}

/// Outcome of rendering one view payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    /// Display form named by the view, when it could be read
    pub display_form: Option<String>,
    /// Rendered form, or the error message
    pub body: String,
    pub status: RenderStatus,
}

impl RenderResult {
    fn success(display_form: &str, body: String) -> Self {
        Self {
            display_form: Some(display_form.to_string()),
            body,
            status: RenderStatus::Success,
        }
    }

    fn failure(display_form: Option<&str>, body: String, status: RenderStatus) -> Self {
        warn!("{}", body);
        Self {
            display_form: display_form.map(str::to_string),
            body,
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Success
    }
}

/// Renders view payloads against a form library.
pub struct RenderPipeline<'a> {
    library: &'a FormLibrary,
    parser: ViewParser,
    renderer: TemplateRenderer,
    messages: Messages,
}

impl<'a> RenderPipeline<'a> {
    pub fn new(library: &'a FormLibrary, config: &FormsConfig) -> Self {
        Self {
            library,
            parser: ViewParser::new(),
            renderer: TemplateRenderer::new(),
            messages: config.messages.clone(),
        }
    }

    pub fn with_renderer(mut self, renderer: TemplateRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn renderer_mut(&mut self) -> &mut TemplateRenderer {
        &mut self.renderer
    }

    /// Render a raw view payload.
    pub fn render(&self, raw: &str) -> RenderResult {
        let view = match self.parse_view(raw) {
            Ok(view) => view,
            Err(e) => return self.failure_for(None, e.into()),
        };

        let Some(display_form) = view.display_form() else {
            return self.failure_for(None, ResolutionError::MissingDisplayForm.into());
        };
        debug!("displayFormName: {}", display_form);

        let form_path = match self.library.resolve(display_form) {
            Ok(path) => path,
            Err(e) => return self.failure_for(Some(display_form), e),
        };

        let template = match fs::read(&form_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                return RenderResult::failure(
                    Some(display_form),
                    Messages::format(
                        &self.messages.cant_read_form_file,
                        format!("{}: {}", form_path.display(), e),
                    ),
                    RenderStatus::ServerError,
                );
            }
        };
        debug!("formFile: {:?}, got {} bytes", form_path, template.len());

        let rendered = self.renderer.render_content(&template, &view);
        if self.renderer.missing_policy() == MissingPolicy::LeaveToken {
            let unsupported: Vec<String> = token_names(&rendered)
                .into_iter()
                .filter(|name| !view.contains_key(name))
                .collect();
            if !unsupported.is_empty() {
                warn!(
                    "{} contained unsupported tokens: {}",
                    display_form,
                    unsupported.join(", ")
                );
            }
        }
        RenderResult::success(display_form, rendered)
    }

    fn parse_view(&self, raw: &str) -> Result<ViewModel, ParseError> {
        if !is_view_envelope(raw) {
            return Err(ParseError::InvalidEnvelope);
        }
        self.parser.parse(raw)
    }

    /// Map a failed step to its configured message and status.
    fn failure_for(&self, display_form: Option<&str>, error: FormsError) -> RenderResult {
        let messages = &self.messages;
        let display_form = match &error {
            FormsError::Resolution(e) => e.display_form().or(display_form),
            _ => display_form,
        };

        let (body, status) = match &error {
            FormsError::Parse(ParseError::InvalidEnvelope) => (
                Messages::format(&messages.cant_parse_view_file, &messages.invalid_envelope),
                RenderStatus::ClientInputError,
            ),
            FormsError::Parse(e) => (
                Messages::format(&messages.cant_parse_view_file, e.to_string()),
                RenderStatus::ClientInputError,
            ),
            FormsError::Resolution(ResolutionError::MissingDisplayForm) => (
                Messages::format(&messages.no_display_form, ""),
                RenderStatus::ClientInputError,
            ),
            FormsError::Resolution(ResolutionError::NotFound(name)) => (
                Messages::format(&messages.no_form_file_found, name),
                RenderStatus::ClientInputError,
            ),
            FormsError::Resolution(ResolutionError::AmbiguousMatch { name, .. }) => (
                Messages::format(&messages.multiple_form_files_found, name),
                RenderStatus::ClientInputError,
            ),
            FormsError::LibraryUninitialized(root) => (
                Messages::format(&messages.library_uninitialized, root.display().to_string()),
                RenderStatus::ServerError,
            ),
            other => (
                Messages::format(&messages.cant_read_form_file, other.to_string()),
                RenderStatus::ServerError,
            ),
        };
        RenderResult::failure(display_form, body, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::ACTIVE_POINTER_FILE;
    use crate::remote::MockTransport;
    use crate::version::VERSION_MARKER_FILE;
    use std::path::Path;
    use tempfile::tempdir;

    fn view(display_form: &str, variables: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<RMS_Express_Form>
  <form_parameters>
    <display_form>{}</display_form>
  </form_parameters>
  <variables>{}</variables>
</RMS_Express_Form>"#,
            display_form, variables
        )
    }

    fn library(root: &Path) -> FormLibrary {
        let tree = root.join("Standard_Forms-1.0.141.0");
        fs::create_dir_all(tree.join("General Forms")).unwrap();
        fs::write(tree.join(VERSION_MARKER_FILE), "1.0.141.0").unwrap();
        fs::write(
            tree.join("General Forms").join("Bulletin_Viewer.html"),
            "<h1>{var subject}</h1><p>{var msg}</p><i>{var missing}</i>",
        )
        .unwrap();
        fs::write(root.join(ACTIVE_POINTER_FILE), "Standard_Forms-1.0.141.0").unwrap();

        let config = FormsConfig::default().with_forms_path(root);
        FormLibrary::open_with_transport(&config, Box::new(MockTransport::new())).unwrap()
    }

    #[test]
    fn test_render_success() {
        let temp = tempdir().unwrap();
        let lib = library(temp.path());
        let pipeline = RenderPipeline::new(&lib, &FormsConfig::default());

        let result = pipeline.render(&view(
            "Bulletin_Viewer.html",
            "<Subject>Net tonight</Subject><msg>&lt;b&gt;bold&lt;/b&gt;</msg>",
        ));

        assert!(result.is_success());
        assert_eq!(result.display_form.as_deref(), Some("Bulletin_Viewer.html"));
        assert_eq!(result.body, "<h1>Net tonight</h1><p><b>bold</b></p><i></i>");
    }

    #[test]
    fn test_render_leaving_missing_tokens() {
        let temp = tempdir().unwrap();
        let lib = library(temp.path());
        let mut pipeline = RenderPipeline::new(&lib, &FormsConfig::default());
        pipeline
            .renderer_mut()
            .set_missing_policy(MissingPolicy::LeaveToken);

        let result = pipeline.render(&view("Bulletin_Viewer.html", "<subject>s</subject>"));
        assert!(result.body.ends_with("<i>{var missing}</i>"));
    }

    #[test]
    fn test_render_rejects_non_view_payload() {
        let temp = tempdir().unwrap();
        let lib = library(temp.path());
        let pipeline = RenderPipeline::new(&lib, &FormsConfig::default());

        let result = pipeline.render("<html><body>hello</body></html>");
        assert_eq!(result.status, RenderStatus::ClientInputError);
        assert_eq!(result.display_form, None);
        assert_eq!(
            result.body,
            "Can't parse view file: Uploaded content doesn't appear to be a valid Winlink view file"
        );
    }

    #[test]
    fn test_render_malformed_view() {
        let temp = tempdir().unwrap();
        let lib = library(temp.path());
        let pipeline = RenderPipeline::new(&lib, &FormsConfig::default());

        let result = pipeline.render("<?xml version=\"1.0\"?><RMS_Express_Form><variables>");
        assert_eq!(result.status, RenderStatus::ClientInputError);
        assert!(result.body.starts_with("Can't parse view file:"));
        assert_eq!(result.display_form, None);
    }

    #[test]
    fn test_render_unknown_form_uses_configured_message() {
        let temp = tempdir().unwrap();
        let lib = library(temp.path());
        let mut config = FormsConfig::default();
        config.messages.no_form_file_found = "Form {value} is not installed".to_string();
        let pipeline = RenderPipeline::new(&lib, &config);

        let result = pipeline.render(&view("Nope.html", ""));
        assert_eq!(result.status, RenderStatus::ClientInputError);
        assert_eq!(result.display_form.as_deref(), Some("Nope.html"));
        assert_eq!(result.body, "Form Nope.html is not installed");
    }

    #[test]
    fn test_render_without_display_form() {
        let temp = tempdir().unwrap();
        let lib = library(temp.path());
        let mut config = FormsConfig::default();
        config.messages.no_display_form = "Which form?".to_string();
        let pipeline = RenderPipeline::new(&lib, &config);

        let result = pipeline.render(
            "<?xml version=\"1.0\"?><RMS_Express_Form><form_parameters/><variables/></RMS_Express_Form>",
        );
        assert_eq!(result.status, RenderStatus::ClientInputError);
        assert_eq!(result.display_form, None);
        assert_eq!(result.body, "Which form?");
    }

    #[test]
    fn test_render_against_empty_library_is_server_error() {
        let temp = tempdir().unwrap();
        let config = FormsConfig::default().with_forms_path(temp.path());
        let lib =
            FormLibrary::open_with_transport(&config, Box::new(MockTransport::new())).unwrap();
        let pipeline = RenderPipeline::new(&lib, &config);

        let result = pipeline.render(&view("Bulletin_Viewer.html", ""));
        assert_eq!(result.status, RenderStatus::ServerError);
    }
}
