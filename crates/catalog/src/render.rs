//! Markdown companions for the static site
//!
//! Each persisted document gets a Hugo page whose front matter carries the
//! document title and whose body embeds the document through a shortcode.

use apiscout_core::{DocumentKind, document_file_name};

/// Relative URL from a rendered page to the documents directory
const DEFAULT_DOCUMENT_URL_PREFIX: &str = "../../../swaggerdocs";

/// Page weight, so API pages sort after hand-written content
const PAGE_WEIGHT: u32 = 1000;

/// Renders companion artifacts
#[derive(Debug, Clone)]
pub struct ArtifactRenderer {
    document_url_prefix: String,
}

impl Default for ArtifactRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_URL_PREFIX)
    }
}

impl ArtifactRenderer {
    pub fn new(document_url_prefix: impl Into<String>) -> Self {
        Self {
            document_url_prefix: document_url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Render the page for `service_name`'s document of `kind`
    ///
    /// Falls back to the service name when the document has no title.
    pub fn render(&self, service_name: &str, kind: DocumentKind, title: Option<&str>) -> String {
        let title = title.unwrap_or(service_name);
        let url = format!(
            "{}/{}",
            self.document_url_prefix,
            document_file_name(service_name, kind)
        );
        let shortcode = match kind {
            DocumentKind::OpenApi => "oas3",
            DocumentKind::AsyncApi => "asyncapi",
        };

        format!(
            "---\ntitle: {}\nweight: {}\npost: \"<sup><i>{}</i></sup>\"\n---\n\n{{{{< {} url=\"{}\" >}}}}\n",
            yaml_quote(title),
            PAGE_WEIGHT,
            kind.label(),
            shortcode,
            url
        )
    }
}

fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_openapi_page() {
        let page = ArtifactRenderer::default().render("Invoice Svc", DocumentKind::OpenApi, Some("Invoice"));

        assert_eq!(
            page,
            "---\ntitle: \"Invoice\"\nweight: 1000\npost: \"<sup><i>openapi</i></sup>\"\n---\n\n\
             {{< oas3 url=\"../../../swaggerdocs/invoice-svc.json\" >}}\n"
        );
    }

    #[test]
    fn test_render_asyncapi_page_falls_back_to_name() {
        let page = ArtifactRenderer::new("/docs/").render("lights", DocumentKind::AsyncApi, None);

        assert!(page.contains("title: \"lights\""));
        assert!(page.contains("<sup><i>asyncapi</i></sup>"));
        assert!(page.contains("{{< asyncapi url=\"/docs/lights.asyncapi.json\" >}}"));
    }

    #[test]
    fn test_title_is_escaped() {
        let page = ArtifactRenderer::default().render("a", DocumentKind::OpenApi, Some("Say \"hi\": now"));
        assert!(page.contains("title: \"Say \\\"hi\\\": now\""));
    }
}
