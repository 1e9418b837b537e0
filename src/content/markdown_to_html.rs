use markdown::{CompileOptions, Options};

use crate::error::{Error, Result};

/// Renders a post body back to HTML so it can be edited again.
/// Raw HTML blocks (destination cards) are kept as they are.
pub fn markdown_to_html(md_text: &str) -> Result<String> {
    let options = Options {
        compile: CompileOptions {
            allow_dangerous_html: true,
            ..CompileOptions::gfm()
        },
        ..Options::gfm()
    };

    match markdown::to_html_with_options(md_text, &options) {
        Ok(x) => Ok(x),
        Err(e) => Err(Error::Decode(e.reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = markdown_to_html("## Getting there\n\nFly **south**.").unwrap();
        assert!(html.contains("<h2>Getting there</h2>"));
        assert!(html.contains("<p>Fly <strong>south</strong>.</p>"));
    }

    #[test]
    fn test_keeps_raw_html() {
        let md = "Before\n\n<a href=\"https://example.com/ushuaia/\" class=\"cta-destination-card\"><strong>Ushuaia</strong></a>\n\nAfter";
        let html = markdown_to_html(md).unwrap();
        assert!(html.contains(r#"<a href="https://example.com/ushuaia/" class="cta-destination-card"><strong>Ushuaia</strong></a>"#));
        assert!(html.contains("<p>After</p>"));
    }

    #[test]
    fn test_gfm_table() {
        let html = markdown_to_html("| City | Price |\n| --- | --- |\n| Madrid | 80 |").unwrap();
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Madrid</td>"));
    }
}
