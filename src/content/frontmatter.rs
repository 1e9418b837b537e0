use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::content::ContentRecord;
use crate::error::{Error, Result};

pub const DELIMITER: &str = "---";
pub const DEFAULT_LAYOUT: &str = "../../layouts/BlogPost.astro";

/// Reads and writes the `---` delimited header of a post file.
///
/// ```text
/// ---
/// title: "Post title"
/// description: "..."
/// publishDate: "2024-05-01"
/// author: "someone"
/// heroImage: "https://..."
/// layout: "../../layouts/BlogPost.astro"
/// tags: ["a", "b"]
/// ---
///
/// Markdown body
/// ```
pub struct FrontmatterCodec {
    layout: String,
}

impl Default for FrontmatterCodec {
    fn default() -> Self {
        FrontmatterCodec::new(DEFAULT_LAYOUT)
    }
}

impl FrontmatterCodec {
    pub fn new(layout: &str) -> Self {
        FrontmatterCodec {
            layout: layout.to_string(),
        }
    }

    pub fn encode(&self, record: &ContentRecord) -> String {
        let tags = record.tags.iter()
            .map(|t| quote(t))
            .collect::<Vec<_>>()
            .join(", ");

        let mut buf = String::with_capacity(record.body.len() + 512);
        buf.push_str(DELIMITER);
        buf.push('\n');
        push_field(&mut buf, "title", &record.title);
        push_field(&mut buf, "description", &record.description);
        push_field(&mut buf, "publishDate", &record.publish_date);
        push_field(&mut buf, "author", &record.author);
        push_field(&mut buf, "heroImage", &record.hero_image);
        push_field(&mut buf, "layout", &self.layout);
        buf.push_str(&format!("tags: [{}]\n", tags));

        if let Some(dest) = record.flight_destination.as_deref().filter(|d| !d.is_empty()) {
            push_field(&mut buf, "flight_destination", dest);
        }
        if let Some(city) = record.tour_city.as_deref().filter(|c| !c.is_empty()) {
            push_field(&mut buf, "tour_city", city);
        }

        buf.push_str(DELIMITER);
        buf.push_str("\n\n");
        buf.push_str(&record.body);
        buf
    }

    /// Missing fields come back empty, only a missing delimiter is an error.
    pub fn decode(&self, text: &str) -> Result<ContentRecord> {
        let (header, body) = split_file(text)?;
        let mut record = decode_header(header);
        record.body = body;
        Ok(record)
    }

    /// Same as [`decode`](Self::decode) but a post without title is rejected.
    pub fn decode_strict(&self, text: &str) -> Result<ContentRecord> {
        let record = self.decode(text)?;
        if record.title.is_empty() {
            return Err(Error::MissingField("title"));
        }
        Ok(record)
    }
}

fn push_field(buf: &mut String, key: &str, value: &str) {
    buf.push_str(key);
    buf.push_str(": ");
    buf.push_str(&quote(value));
    buf.push('\n');
}

fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ");
    format!("\"{}\"", escaped)
}

fn unquote(value: &str) -> String {
    let mut buf = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                buf.push(next);
            }
        } else {
            buf.push(c);
        }
    }
    buf
}

/// Splits on the first two lines holding only `---`. Values are always quoted
/// and kept on one line by [`quote`], so an encoded header never holds one.
fn split_file(text: &str) -> Result<(&str, String)> {
    lazy_static! {
        static ref DELIMITER_LINE: Regex = Regex::new(r"(?m)^---[ \t]*\r?$").unwrap();
    }

    let mut delimiters = DELIMITER_LINE.find_iter(text);
    let (Some(open), Some(close)) = (delimiters.next(), delimiters.next()) else {
        return Err(Error::MalformedFile("missing frontmatter delimiters".to_string()));
    };
    let body = text[close.end()..].trim().to_string();
    Ok((&text[open.end()..close.start()], body))
}

fn extract_fields(header: &str) -> HashMap<&str, String> {
    lazy_static! {
        static ref FIELD_REGEX: Regex = Regex::new(
            r#"(?m)^[ \t]*([A-Za-z_]+):[ \t]*(?:"((?:[^"\\\n]|\\.)+)"|'([^'\n]+)')"#).unwrap();
    }

    let mut fields = HashMap::new();
    for caps in FIELD_REGEX.captures_iter(header) {
        let Some(key) = caps.get(1) else {
            continue;
        };
        let value = match (caps.get(2), caps.get(3)) {
            (Some(double), _) => unquote(double.as_str()),
            (None, Some(single)) => single.as_str().to_string(),
            _ => continue,
        };
        fields.entry(key.as_str()).or_insert(value);
    }
    fields
}

fn extract_tags(header: &str) -> Vec<String> {
    lazy_static! {
        static ref TAGS_REGEX: Regex = Regex::new(r#"(?m)^[ \t]*tags:[ \t]*\[(.*)\][ \t]*\r?$"#).unwrap();
        static ref TAG_REGEX: Regex = Regex::new(r#""((?:[^"\\]|\\.)*)"|'([^']*)'|([^,"'\s][^,]*)"#).unwrap();
    }

    let Some(caps) = TAGS_REGEX.captures(header) else {
        return vec![];
    };
    TAG_REGEX.captures_iter(&caps[1])
        .filter_map(|item| match (item.get(1), item.get(2), item.get(3)) {
            (Some(double), _, _) => Some(unquote(double.as_str())),
            (None, Some(single), _) => Some(single.as_str().to_string()),
            (None, None, Some(bare)) => Some(bare.as_str().trim().to_string()),
            _ => None,
        })
        .filter(|t| !t.trim().is_empty())
        .collect()
}

/// Decodes the header fields only. Text without delimiters is read as a bare header.
pub fn decode_header(text: &str) -> ContentRecord {
    let header = match split_file(text) {
        Ok((header, _)) => header,
        Err(_) => text,
    };

    let mut fields = extract_fields(header);
    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    let title = take("title");
    let description = take("description");
    let publish_date = take("publishDate");
    let author = take("author");
    let hero_image = take("heroImage");
    let flight_destination = Some(take("flight_destination")).filter(|s| !s.is_empty());
    let tour_city = Some(take("tour_city")).filter(|s| !s.is_empty());

    ContentRecord {
        title,
        description,
        publish_date,
        author,
        hero_image,
        tags: extract_tags(header),
        flight_destination,
        tour_city,
        body: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContentRecord {
        ContentRecord {
            title: "Ushuaia en invierno".to_string(),
            description: "Qué hacer en el fin del mundo".to_string(),
            publish_date: "2024-06-01".to_string(),
            author: "laura".to_string(),
            hero_image: "https://img.example.com/ushuaia.jpg".to_string(),
            tags: vec!["argentina".to_string(), "patagonia".to_string()],
            flight_destination: Some("USH".to_string()),
            tour_city: None,
            body: "## Intro\n\nTexto.".to_string(),
        }
    }

    #[test]
    fn test_encode() {
        let text = FrontmatterCodec::default().encode(&sample());
        let expected = r#"---
title: "Ushuaia en invierno"
description: "Qué hacer en el fin del mundo"
publishDate: "2024-06-01"
author: "laura"
heroImage: "https://img.example.com/ushuaia.jpg"
layout: "../../layouts/BlogPost.astro"
tags: ["argentina", "patagonia"]
flight_destination: "USH"
---

## Intro

Texto."#;
        assert_eq!(text, expected);
    }

    #[test]
    fn test_round_trip() {
        let codec = FrontmatterCodec::new("../layouts/Post.astro");
        let record = sample();
        let decoded = codec.decode(&codec.encode(&record)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_quotes_survive() {
        let codec = FrontmatterCodec::default();
        let mut record = sample();
        record.title = r#"El "mejor" mate \ Buenos Aires"#.to_string();
        let decoded = codec.decode(&codec.encode(&record)).unwrap();
        assert_eq!(decoded.title, record.title);
    }

    #[test]
    fn test_minimal_header() {
        let record = FrontmatterCodec::default()
            .decode("---\ntitle: \"Test\"\ntags: [\"a\", \"b\"]\n---\n\nBody")
            .unwrap();
        assert_eq!(record.title, "Test");
        assert_eq!(record.tags, vec!["a", "b"]);
        assert_eq!(record.description, "");
        assert_eq!(record.hero_image, "");
        assert_eq!(record.flight_destination, None);
        assert_eq!(record.body, "Body");
    }

    #[test]
    fn test_single_quotes() {
        let record = FrontmatterCodec::default()
            .decode("---\ntitle: 'Single'\ntags: ['x', y]\n---\nBody")
            .unwrap();
        assert_eq!(record.title, "Single");
        assert_eq!(record.tags, vec!["x", "y"]);
    }

    #[test]
    fn test_missing_delimiter() {
        let res = FrontmatterCodec::default().decode("---\ntitle: \"Test\"\nBody without end");
        assert!(matches!(res, Err(Error::MalformedFile(_))));
        let res = FrontmatterCodec::default().decode("just text");
        assert!(matches!(res, Err(Error::MalformedFile(_))));
    }

    #[test]
    fn test_delimiter_inside_body() {
        let record = FrontmatterCodec::default()
            .decode("---\ntitle: \"T\"\n---\n\nBefore\n\n---\n\nAfter\n")
            .unwrap();
        assert_eq!(record.body, "Before\n\n---\n\nAfter");
    }

    #[test]
    fn test_dashes_inside_header_values() {
        let codec = FrontmatterCodec::default();
        let mut record = sample();
        record.title = "Buenos Aires --- guía".to_string();
        record.description = "---".to_string();
        record.body = "Antes\n\n---\n\nDespués".to_string();

        let text = codec.encode(&record);
        assert_eq!(codec.decode(&text).unwrap(), record);
        assert_eq!(decode_header(&text).title, "Buenos Aires --- guía");
    }

    #[test]
    fn test_tags_with_quotes_and_commas() {
        let codec = FrontmatterCodec::default();
        let mut record = sample();
        record.tags = vec![r#"say "hi""#.to_string(), "x, y".to_string(), "[z]".to_string()];
        let decoded = codec.decode(&codec.encode(&record)).unwrap();
        assert_eq!(decoded.tags, record.tags);
    }

    #[test]
    fn test_strict_requires_title() {
        let codec = FrontmatterCodec::default();
        let res = codec.decode_strict("---\ndescription: \"d\"\n---\nBody");
        assert!(matches!(res, Err(Error::MissingField("title"))));
        assert!(codec.decode_strict("---\ntitle: \"t\"\n---\nBody").is_ok());
    }

    #[test]
    fn test_header_without_delimiters() {
        let record = decode_header("title: \"Only header\"\nauthor: \"me\"");
        assert_eq!(record.title, "Only header");
        assert_eq!(record.author, "me");
    }
}
