//! Converts the HTML produced by the rich text editor to the markdown dialect
//! stored in the repository.
//!
//! The mapping is fixed: ATX headings, fenced code, `-` bullets, GFM tables.
//! Three elements get special treatment:
//! * `<iframe src>` becomes the bare video URL in its own paragraph
//! * `<blockquote class="tiktok-embed" cite>` becomes the cite URL in its own paragraph
//! * `<a class="cta-destination-card">` is copied verbatim, as raw HTML
//!
//! Anything else that markdown can't express is dropped, so different HTML
//! inputs may produce the same markdown. Text is never dropped: HTML that can't
//! be read to the end is an error.

use std::ops::Range;

use lazy_static::lazy_static;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

use crate::error::{Error, Result};

const CTA_CLASS: &str = "cta-destination-card";
const TIKTOK_CLASS: &str = "tiktok-embed";

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is text, even when it looks like markup.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

const SKIPPED_ELEMENTS: [&str; 6] = ["script", "style", "head", "title", "noscript", "template"];

const BLOCK_ELEMENTS: [&str; 14] = [
    "p", "div", "section", "article", "header", "footer", "main", "aside",
    "nav", "figure", "figcaption", "address", "details", "summary",
];

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    /// Byte range of the element in the source, tags included.
    span: Range<usize>,
}

impl Element {
    fn from_start(start: &BytesStart, pos: usize) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
        let attrs = start.html_attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
                let value = unescape_html(&String::from_utf8_lossy(&attr.value));
                (key, value)
            })
            .collect();

        Element {
            name,
            attrs,
            children: vec![],
            span: pos..pos,
        }
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

fn unescape_html(raw: &str) -> String {
    let res = unescape_with(raw, |entity| match entity {
        "nbsp" => Some(" "),
        other => resolve_html5_entity(other),
    });
    match res {
        Ok(text) => text.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn attach(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn parse_html(html: &str) -> Result<Vec<Node>> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;

    let mut stack: Vec<Element> = vec![];
    let mut roots: Vec<Node> = vec![];

    loop {
        let pos = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(Error::Html(format!("at byte {}: {}", pos, e))),
        };

        match event {
            Event::Start(ref start) => {
                let mut element = Element::from_start(start, pos);
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    element.span.end = reader.buffer_position() as usize;
                    attach(&mut stack, &mut roots, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(ref start) => {
                let mut element = Element::from_start(start, pos);
                element.span.end = reader.buffer_position() as usize;
                attach(&mut stack, &mut roots, Node::Element(element));
            }
            Event::End(ref end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                // Unmatched closing tags are ignored, unclosed children are closed here
                let Some(idx) = stack.iter().rposition(|el| el.name == name) else {
                    continue;
                };
                while stack.len() > idx + 1 {
                    if let Some(mut child) = stack.pop() {
                        child.span.end = pos;
                        attach(&mut stack, &mut roots, Node::Element(child));
                    }
                }
                if let Some(mut element) = stack.pop() {
                    element.span.end = reader.buffer_position() as usize;
                    attach(&mut stack, &mut roots, Node::Element(element));
                }
            }
            Event::Text(ref text) => {
                let raw = String::from_utf8_lossy(text);
                attach(&mut stack, &mut roots, Node::Text(unescape_html(&raw)));
            }
            Event::CData(ref text) => {
                let raw = String::from_utf8_lossy(text).to_string();
                attach(&mut stack, &mut roots, Node::Text(raw));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while let Some(mut element) = stack.pop() {
        element.span.end = html.len();
        attach(&mut stack, &mut roots, Node::Element(element));
    }

    Ok(roots)
}

/// Escapes what a browser reads as text but an XML reader would take for
/// markup: a `<` that can't open a tag, and the content of raw text elements.
fn prepare_html(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut buf = String::with_capacity(html.len() + 16);
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        buf.push_str(&html[pos..start]);
        pos = start + 1;

        let opens_tag = html[pos..].chars().next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));
        if !opens_tag {
            buf.push_str("&lt;");
            continue;
        }
        buf.push('<');

        let Some(name) = RAW_TEXT_ELEMENTS.iter().find(|name| starts_element(&lower[pos..], name)) else {
            continue;
        };
        let Some(tag_len) = html[start..].find('>') else {
            continue;
        };
        let tag_end = start + tag_len + 1;
        buf.push_str(&html[pos..tag_end]);
        pos = tag_end;
        if html[start..tag_end].ends_with("/>") {
            continue;
        }

        let closing = format!("</{}", name);
        let content_end = lower[pos..].find(&closing).map(|i| pos + i).unwrap_or(html.len());
        buf.push_str(&html[pos..content_end].replace('&', "&amp;").replace('<', "&lt;"));
        pos = content_end;
    }

    buf.push_str(&html[pos..]);
    buf
}

/// `text` starts with the tag name `name`, followed by the end of the name.
fn starts_element(text: &str, name: &str) -> bool {
    text.strip_prefix(name)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
}

pub fn html_to_markdown(html: &str) -> Result<String> {
    let html = prepare_html(html);
    let nodes = parse_html(&html)?;
    let converter = Converter { source: &html };
    let markdown = converter.nodes(&nodes);
    Ok(cleanup(&markdown))
}

struct Converter<'a> {
    source: &'a str,
}

impl Converter<'_> {
    fn nodes(&self, nodes: &[Node]) -> String {
        let mut buf = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => buf.push_str(&escape_text(&collapse_whitespace(text))),
                Node::Element(element) => buf.push_str(&self.element(element)),
            }
        }
        buf
    }

    fn element(&self, el: &Element) -> String {
        let name = el.name.as_str();
        match name {
            _ if SKIPPED_ELEMENTS.contains(&name) => String::new(),
            "a" if el.has_class(CTA_CLASS) => block(self.source[el.span.clone()].trim()),
            "a" => self.link(el),
            "iframe" => el.attr("src").map(block).unwrap_or_default(),
            "blockquote" if el.has_class(TIKTOK_CLASS) => el.attr("cite").map(block).unwrap_or_default(),
            "blockquote" => self.blockquote(el),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.heading(el),
            "strong" | "b" => self.delimited(el, "**"),
            "em" | "i" => self.delimited(el, "_"),
            "del" | "s" | "strike" => self.delimited(el, "~~"),
            "code" => inline_code(&raw_text(&el.children)),
            "pre" => self.code_block(el),
            "br" => "  \n".to_string(),
            "hr" => block("* * *"),
            "img" => image(el),
            "ul" | "ol" => block(&self.list(el)),
            "table" => block(&self.table(el)),
            _ if BLOCK_ELEMENTS.contains(&name) => block(&escape_line_start(self.nodes(&el.children).trim())),
            _ => self.nodes(&el.children),
        }
    }

    fn link(&self, el: &Element) -> String {
        let text = self.nodes(&el.children);
        let Some(href) = el.attr("href") else {
            return text;
        };
        if text.trim().is_empty() {
            return String::new();
        }

        match el.attr("title") {
            Some(title) => format!("[{}]({} \"{}\")", text.trim(), href, title.replace('"', "\\\"")),
            None => format!("[{}]({})", text.trim(), href),
        }
    }

    fn heading(&self, el: &Element) -> String {
        let level: usize = el.name[1..].parse().unwrap_or(1);
        let text = self.nodes(&el.children);
        let text = collapse_whitespace(&text.replace('\n', " "));
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }
        block(&format!("{} {}", "#".repeat(level), text))
    }

    fn delimited(&self, el: &Element, delimiter: &str) -> String {
        let inner = self.nodes(&el.children);
        let core = inner.trim();
        if core.is_empty() {
            return inner;
        }

        // Surrounding spaces go outside the delimiters, `** x**` is not emphasis
        let leading = &inner[..inner.len() - inner.trim_start().len()];
        let trailing = &inner[inner.trim_end().len()..];
        format!("{}{}{}{}{}", leading, delimiter, core, delimiter, trailing)
    }

    fn blockquote(&self, el: &Element) -> String {
        let content = cleanup(&self.nodes(&el.children));
        if content.is_empty() {
            return String::new();
        }
        let quoted: Vec<String> = content.lines()
            .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {}", line) })
            .collect();
        block(&quoted.join("\n"))
    }

    fn code_block(&self, el: &Element) -> String {
        let code = el.children.iter().find_map(|child| match child {
            Node::Element(e) if e.name == "code" => Some(e),
            _ => None,
        });

        let language = code
            .and_then(code_language)
            .or_else(|| code_language(el))
            .unwrap_or_default();
        let text = raw_text(&el.children);
        let text = text.trim_end_matches('\n');
        let fence = if text.contains("```") { "~~~" } else { "```" };

        block(&format!("{}{}\n{}\n{}", fence, language, text, fence))
    }

    fn list(&self, el: &Element) -> String {
        let ordered = el.name == "ol";
        let mut number: usize = el.attr("start").and_then(|s| s.parse().ok()).unwrap_or(1);

        let mut items = vec![];
        for child in el.children.iter() {
            let Node::Element(item) = child else {
                continue;
            };
            if item.name != "li" {
                continue;
            }

            let prefix = if ordered {
                format!("{}. ", number)
            } else {
                "- ".to_string()
            };
            number += 1;

            let has_paragraphs = item.children.iter()
                .any(|c| matches!(c, Node::Element(e) if e.name == "p"));
            let mut content = cleanup(&self.nodes(&item.children));
            if !has_paragraphs {
                content = content.replace("\n\n", "\n");
            }

            let indent = " ".repeat(prefix.len());
            let mut lines = content.lines();
            let mut rendered = format!("{}{}", prefix, lines.next().unwrap_or_default());
            for line in lines {
                rendered.push('\n');
                if !line.is_empty() {
                    rendered.push_str(&indent);
                    rendered.push_str(line);
                }
            }
            items.push(rendered);
        }

        items.join("\n")
    }

    fn table(&self, el: &Element) -> String {
        let mut rows: Vec<Vec<String>> = vec![];
        collect_rows(el, &mut |row| {
            let cells = row.children.iter()
                .filter_map(|c| match c {
                    Node::Element(cell) if cell.name == "td" || cell.name == "th" => Some(cell),
                    _ => None,
                })
                .map(|cell| {
                    let text = self.nodes(&cell.children).replace('\n', " ");
                    collapse_whitespace(&text).trim().replace('|', "\\|")
                })
                .collect();
            rows.push(cells);
        });

        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if columns == 0 {
            return String::new();
        }

        let format_row = |row: &Vec<String>| {
            let mut cells = row.clone();
            cells.resize(columns, String::new());
            format!("| {} |", cells.join(" | "))
        };

        let mut lines = vec![format_row(&rows[0])];
        lines.push(format!("|{}", " --- |".repeat(columns)));
        for row in rows.iter().skip(1) {
            lines.push(format_row(row));
        }
        lines.join("\n")
    }
}

fn collect_rows<'a>(el: &'a Element, on_row: &mut dyn FnMut(&'a Element)) {
    for child in el.children.iter() {
        if let Node::Element(child) = child {
            if child.name == "tr" {
                on_row(child);
            } else if child.name != "table" {
                collect_rows(child, on_row);
            }
        }
    }
}

fn code_language(el: &Element) -> Option<String> {
    el.attr("class")?
        .split_whitespace()
        .find_map(|c| c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-")))
        .map(|lang| lang.to_string())
}

fn image(el: &Element) -> String {
    let Some(src) = el.attr("src") else {
        return String::new();
    };
    let alt = el.attr("alt").unwrap_or_default();
    match el.attr("title") {
        Some(title) => format!("![{}]({} \"{}\")", alt, src, title.replace('"', "\\\"")),
        None => format!("![{}]({})", alt, src),
    }
}

fn inline_code(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    if code.contains('`') {
        format!("`` {} ``", code)
    } else {
        format!("`{}`", code)
    }
}

/// Text of the subtree as it is, used for code.
fn raw_text(nodes: &[Node]) -> String {
    let mut buf = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) if el.name == "br" => buf.push('\n'),
            Node::Element(el) => buf.push_str(&raw_text(&el.children)),
        }
    }
    buf
}

fn block(content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return String::new();
    }
    format!("\n\n{}\n\n", content)
}

fn collapse_whitespace(text: &str) -> String {
    lazy_static! {
        static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    }
    WHITESPACE.replace_all(text, " ").to_string()
}

fn escape_text(text: &str) -> String {
    let mut buf = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<') {
            buf.push('\\');
        }
        buf.push(c);
    }
    buf
}

/// Paragraphs starting like a heading, quote or list item would change meaning.
fn escape_line_start(text: &str) -> String {
    lazy_static! {
        static ref LINE_START: Regex = Regex::new(r"^(#{1,6} |>|[-+] |=+|~~~)").unwrap();
        static ref ORDERED: Regex = Regex::new(r"^(\d+)\. ").unwrap();
    }

    if LINE_START.is_match(text) {
        return format!("\\{}", text);
    }
    ORDERED.replace(text, "$1\\. ").to_string()
}

fn cleanup(markdown: &str) -> String {
    lazy_static! {
        static ref BLANK_LINES: Regex = Regex::new(r"\n[ \t]+\n").unwrap();
        static ref MANY_NEWLINES: Regex = Regex::new(r"\n{3,}").unwrap();
    }

    let res = BLANK_LINES.replace_all(markdown, "\n\n");
    let res = MANY_NEWLINES.replace_all(&res, "\n\n");
    res.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(html: &str) -> String {
        html_to_markdown(html).unwrap()
    }

    #[test]
    fn test_headings_and_inline() {
        let md = md("<h2>Hello</h2><p>Some <strong>bold</strong> and <em>italic</em> text.</p>");
        assert_eq!(md, "## Hello\n\nSome **bold** and _italic_ text.");
    }

    #[test]
    fn test_spaces_move_outside_delimiters() {
        let md = md("<p>Hello<strong> world </strong>again</p>");
        assert_eq!(md, "Hello **world** again");
    }

    #[test]
    fn test_iframe_becomes_url() {
        let html = r#"<p>Intro</p><iframe src="https://www.youtube.com/embed/a_b" width="560" allowfullscreen></iframe><p>Outro</p>"#;
        let md = md(html);
        assert_eq!(md, "Intro\n\nhttps://www.youtube.com/embed/a_b\n\nOutro");
    }

    #[test]
    fn test_tiktok_becomes_url() {
        let html = r#"<blockquote class="tiktok-embed" cite="https://www.tiktok.com/@user/video/123" data-video-id="123"><section><a href="https://www.tiktok.com/@user">@user</a></section></blockquote>"#;
        assert_eq!(md(html), "https://www.tiktok.com/@user/video/123");
    }

    #[test]
    fn test_cta_card_is_kept_verbatim() {
        let card = r#"<a href="https://example.com/ushuaia/" target="_blank" class="cta-destination-card" style="display:block; margin:2.5rem 0;"><span style="font-size:1.5rem;">🇦🇷</span><br><strong>Ushuaia: El Fin del Mundo</strong></a>"#;
        let html = format!("<p>Before</p>{}<p>&nbsp;</p><p>After</p>", card);
        let md = md(&html);
        assert_eq!(md, format!("Before\n\n{}\n\nAfter", card));
    }

    #[test]
    fn test_lists() {
        let html = "<ul><li>One</li><li>Two</li></ul><ol><li>First</li><li>Second</li></ol>";
        assert_eq!(md(html), "- One\n- Two\n\n1. First\n2. Second");
    }

    #[test]
    fn test_nested_list() {
        let html = "<ul><li>Parent<ul><li>Child</li></ul></li><li>Next</li></ul>";
        assert_eq!(md(html), "- Parent\n  - Child\n- Next");
    }

    #[test]
    fn test_code_block() {
        let html = "<pre><code class=\"language-rust\">fn main() {\n    println!(\"hi\");\n}\n</code></pre>";
        assert_eq!(md(html), "```rust\nfn main() {\n    println!(\"hi\");\n}\n```");
    }

    #[test]
    fn test_inline_code_is_not_escaped() {
        assert_eq!(md("<p>Use <code>my_var</code> here</p>"), "Use `my_var` here");
    }

    #[test]
    fn test_table() {
        let html = "<table><thead><tr><th>City</th><th>Price</th></tr></thead><tbody><tr><td>Madrid</td><td>US$ 80</td></tr><tr><td>Sevilla</td></tr></tbody></table>";
        assert_eq!(md(html), "| City | Price |\n| --- | --- |\n| Madrid | US$ 80 |\n| Sevilla |  |");
    }

    #[test]
    fn test_entities_links_and_empty_paragraphs() {
        let html = r#"<p>Caf&eacute; &amp; t&eacute;&nbsp;con <a href="https://a.b/c">link</a></p><p>&nbsp;</p>"#;
        assert_eq!(md(html), "Café & té con [link](https://a.b/c)");
    }

    #[test]
    fn test_images() {
        let html = r#"<p><img src="https://img.example.com/a.jpg" alt="Glacier"></p>"#;
        assert_eq!(md(html), "![Glacier](https://img.example.com/a.jpg)");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(md("<p>2 * 3 = 6_x</p>"), r"2 \* 3 = 6\_x");
        assert_eq!(md("<p># not a heading</p>"), r"\# not a heading");
        assert_eq!(md("<p>1. not a list</p>"), r"1\. not a list");
    }

    #[test]
    fn test_blockquote_and_breaks() {
        assert_eq!(md("<blockquote><p>Quote line</p></blockquote>"), "> Quote line");
        assert_eq!(md("<p>line one<br>line two</p>"), "line one  \nline two");
        assert_eq!(md("<p>a</p><hr><p>b</p>"), "a\n\n* * *\n\nb");
    }

    #[test]
    fn test_unclosed_and_unknown_tags() {
        assert_eq!(md("<div><p>Open <span>span</div>"), "Open span");
        assert_eq!(md("plain text</b>"), "plain text");
        assert_eq!(md(""), "");
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(md("<p>1 <2 km</p><p>Tail</p>"), "1 \\<2 km\n\nTail");
        assert_eq!(md("<p>a < b</p>"), "a \\< b");
        assert_eq!(md("<p>Caf&eacute; &lt;3</p>"), "Café \\<3");
    }

    #[test]
    fn test_script_and_style_content_is_raw() {
        let html = "<p>Intro</p><script>if (a < b && c) { x = '<p>'; }</script>\
                    <style>p > a { color: red; }</style><p>Tail paragraph</p>";
        assert_eq!(md(html), "Intro\n\nTail paragraph");
        assert_eq!(md("<p>Intro</p><SCRIPT src=\"a.js\" /><p>Tail</p>"), "Intro\n\nTail");
    }

    #[test]
    fn test_unreadable_html_is_an_error() {
        let res = html_to_markdown("<p>Intro</p><!-- note <p>Tail</p>");
        assert!(matches!(res, Err(Error::Html(_))));
    }
}
