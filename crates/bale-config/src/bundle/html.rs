use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTML page generation.
///
/// Entry chunk scripts and stylesheets are injected into the template, or
/// into a minimal page when no template is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlOptions {
    /// Template relative to the project root, e.g. `public/index.html`
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Output filename relative to the output directory
    #[serde(default = "default_html_filename")]
    pub filename: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            template: None,
            filename: default_html_filename(),
        }
    }
}

fn default_html_filename() -> String {
    "index.html".into()
}
