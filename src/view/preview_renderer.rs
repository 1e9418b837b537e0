use ramhorns::Template;

use crate::content::ContentRecord;
use crate::error::{Error, Result};

pub const DEFAULT_PREVIEW_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>{{post_title}}</title>
</head>
<body>
<article>
{{#hero_image}}<img src="{{hero_image}}" class="hero">{{/hero_image}}
{{#post_title}}<h1>{{post_title}}</h1>{{/post_title}}
{{#tags}}<span class="tag">#{{tag}}</span> {{/tags}}
{{{post_content}}}
</article>
</body>
</html>
"##;

#[derive(ramhorns::Content)]
struct ViewTag<'a> {
    tag: &'a str,
}

#[derive(ramhorns::Content)]
struct ViewItem<'a> {
    hero_image: &'a str,
    post_title: &'a str,
    author: &'a str,
    date: &'a str,
    tags: Vec<ViewTag<'a>>,
    post_content: &'a str,
}

/// Renders the post as it will look once published: hero image, title, then the content.
pub struct PreviewRenderer<'a> {
    pub template: Template<'a>,
}

impl PreviewRenderer<'_> {
    pub fn new(view_tpl_src: &str) -> Result<PreviewRenderer> {
        let template = match Template::new(view_tpl_src) {
            Ok(x) => x,
            Err(e) => return Err(Error::Template(format!("Error parsing preview template: {}", e))),
        };

        Ok(PreviewRenderer {
            template,
        })
    }

    /// `html` is the editor content, already HTML.
    pub fn render(&self, record: &ContentRecord, html: &str) -> String {
        let tags = record.tags.iter().map(|t| ViewTag { tag: t.as_str() }).collect();
        self.template.render(&ViewItem {
            hero_image: record.hero_image.trim(),
            post_title: record.title.trim(),
            author: record.author.as_str(),
            date: record.publish_date.as_str(),
            tags,
            post_content: html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_preview() {
        let template_src = r##"{{#hero_image}}<img src="{{hero_image}}">{{/hero_image}}{{#post_title}}<h1>{{post_title}}</h1>{{/post_title}}AUTHOR=[{{author}}]TAGS=[{{#tags}}({{tag}}){{/tags}}]{{{post_content}}}"##;
        let renderer = PreviewRenderer::new(template_src).unwrap();
        let record = ContentRecord {
            title: "<Mate>".to_string(),
            hero_image: "https://img/mate.jpg".to_string(),
            author: "laura".to_string(),
            tags: vec!["<yerba>".to_string(), "argentina".to_string()],
            ..Default::default()
        };

        let res = renderer.render(&record, "<p>Body</p>");
        assert_eq!(res, r##"<img src="https://img/mate.jpg"><h1>&lt;Mate&gt;</h1>AUTHOR=[laura]TAGS=[(&lt;yerba&gt;)(argentina)]<p>Body</p>"##);
    }

    #[test]
    fn render_without_title_or_image() {
        let renderer = PreviewRenderer::new(DEFAULT_PREVIEW_TEMPLATE).unwrap();
        let res = renderer.render(&ContentRecord::default(), "<p>Only content</p>");
        assert!(!res.contains("<img"));
        assert!(!res.contains("<h1>"));
        assert!(res.contains("<p>Only content</p>"));
    }
}
