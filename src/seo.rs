//! Heuristic SEO score of a post, out of 100.
//!
//! | Check       | Points |
//! |-------------|--------|
//! | title       | 20     |
//! | description | 15     |
//! | length      | 15     |
//! | headings    | 15     |
//! | images      | 10     |
//! | keyword     | 15     |
//! | readability | 10     |
//!
//! Content is the markdown body. Lengths are counted in characters.

use lazy_static::lazy_static;
use regex::Regex;

const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Error,
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreDetails {
    pub title: u32,
    pub description: u32,
    pub content: u32,
    pub headings: u32,
    pub images: u32,
    pub keywords: u32,
    pub readability: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeoReport {
    pub score: u32,
    pub alerts: Vec<Alert>,
    pub suggestions: Vec<String>,
    pub details: ScoreDetails,
}

impl SeoReport {
    pub fn label(&self) -> &'static str {
        score_label(self.score)
    }
}

pub fn score_label(score: u32) -> &'static str {
    if score >= 80 {
        "Excellent"
    } else if score >= 60 {
        "Good"
    } else if score >= 40 {
        "Needs work"
    } else {
        "Low"
    }
}

/// Colour of the title length dot shown next to the title field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleIndicator {
    Empty,
    Red,
    Yellow,
    Green,
}

pub fn title_indicator(title: &str) -> TitleIndicator {
    match title.chars().count() {
        0 => TitleIndicator::Empty,
        n if !(30..=70).contains(&n) => TitleIndicator::Red,
        n if !(40..=60).contains(&n) => TitleIndicator::Yellow,
        _ => TitleIndicator::Green,
    }
}

pub struct SeoInput<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content: &'a str,
    pub hero_image: &'a str,
}

#[derive(Default)]
struct Analysis {
    alerts: Vec<Alert>,
    suggestions: Vec<String>,
}

impl Analysis {
    fn alert(&mut self, kind: AlertKind, message: String) {
        self.alerts.push(Alert { kind, message });
    }

    fn suggest(&mut self, suggestion: String) {
        self.suggestions.push(suggestion);
    }

    fn title(&mut self, title: &str) -> u32 {
        if title.trim().is_empty() {
            self.alert(AlertKind::Error, "Missing title".to_string());
            self.suggest("Add a descriptive title of 50-60 characters".to_string());
            return 0;
        }

        let length = title.chars().count();
        if length < 30 {
            self.alert(AlertKind::Warning, format!("Title too short ({} characters)", length));
            self.suggest("The title should have at least 50 characters".to_string());
            return 5;
        }
        if length > 65 {
            self.alert(AlertKind::Warning, format!("Title too long ({} characters)", length));
            self.suggest("Keep the title under 60 characters, search results cut it".to_string());
            return 12;
        }
        if (50..=60).contains(&length) {
            self.alert(AlertKind::Success, format!("Title optimized ({} characters)", length));
            return 20;
        }
        15
    }

    fn description(&mut self, description: &str) -> u32 {
        if description.trim().is_empty() {
            self.alert(AlertKind::Error, "Missing SEO description".to_string());
            self.suggest("Add a meta description of 150-160 characters".to_string());
            return 0;
        }

        let length = description.chars().count();
        if length < 120 {
            self.alert(AlertKind::Warning, format!("Short description ({} characters)", length));
            self.suggest("The description should have at least 150 characters".to_string());
            return 5;
        }
        if length > 165 {
            self.alert(AlertKind::Warning, format!("Long description ({} characters)", length));
            self.suggest("The description should not exceed 160 characters".to_string());
            return 10;
        }

        self.alert(AlertKind::Success, format!("Description optimized ({} characters)", length));
        15
    }

    fn content_length(&mut self, content: &str) -> u32 {
        if content.is_empty() {
            self.alert(AlertKind::Error, "No content".to_string());
            self.suggest("Write at least 600 words".to_string());
            return 0;
        }

        let words = count_words(content);
        if words < 300 {
            self.alert(AlertKind::Error, format!("Content too short ({} words)", words));
            self.suggest("Posts over 600 words rank better".to_string());
            return 0;
        }
        if words < 600 {
            self.alert(AlertKind::Warning, format!("Short content ({} words)", words));
            self.suggest(format!("Add {} more words", 600 - words));
            return 8;
        }

        self.alert(AlertKind::Success, format!("Long content ({} words)", words));
        15
    }

    fn headings(&mut self, content: &str) -> u32 {
        lazy_static! {
            static ref H1: Regex = Regex::new(r"(?m)^# ").unwrap();
            static ref H2: Regex = Regex::new(r"(?m)^## ").unwrap();
            static ref H3: Regex = Regex::new(r"(?m)^### ").unwrap();
        }

        if content.is_empty() {
            return 0;
        }

        let h1 = H1.find_iter(content).count();
        let h2 = H2.find_iter(content).count();
        let h3 = H3.find_iter(content).count();

        if h1 > 1 {
            self.alert(AlertKind::Warning, format!("Multiple H1 headings ({})", h1));
            self.suggest("Use a single H1, the post title".to_string());
        }

        match h2 {
            0 => {
                self.alert(AlertKind::Error, "No H2 headings".to_string());
                self.suggest("Add at least 2-3 H2 subtitles".to_string());
                0
            }
            1 => {
                self.alert(AlertKind::Warning, "Only 1 H2".to_string());
                self.suggest("Add more H2 subtitles".to_string());
                8
            }
            _ => {
                self.alert(AlertKind::Success, format!("Heading structure is fine ({} H2, {} H3)", h2, h3));
                15
            }
        }
    }

    fn images(&mut self, content: &str, hero_image: &str) -> u32 {
        lazy_static! {
            static ref IMAGE: Regex = Regex::new(r"!\[([^\]]*)\]\([^)]+\)").unwrap();
        }

        let mut score = 0;
        if hero_image.trim().is_empty() {
            self.alert(AlertKind::Warning, "No hero image".to_string());
            self.suggest("Add a hero image to the post".to_string());
        } else {
            score += 5;
        }

        let alts: Vec<&str> = IMAGE.captures_iter(content)
            .map(|c| c.get(1).map(|m| m.as_str()).unwrap_or_default())
            .collect();
        let without_alt = alts.iter().filter(|alt| alt.trim().is_empty()).count();

        if without_alt > 0 {
            self.alert(AlertKind::Warning, format!("{} image(s) without ALT text", without_alt));
            self.suggest("Describe every image with ALT text".to_string());
        } else if !alts.is_empty() {
            self.alert(AlertKind::Success, format!("Every image has ALT text ({})", alts.len()));
            score += 5;
        }
        score
    }

    fn keywords(&mut self, title: &str, description: &str, content: &str) -> u32 {
        if title.is_empty() || content.is_empty() {
            return 0;
        }

        let title = title.to_lowercase();
        let Some(keyword) = title.split_whitespace().find(|w| w.chars().count() > 4) else {
            return 0;
        };

        let mut score = 0;
        if description.to_lowercase().contains(keyword) {
            score += 5;
        } else {
            self.alert(AlertKind::Warning, format!("Keyword \"{}\" is not in the description", keyword));
            self.suggest(format!("Include \"{}\" in the meta description", keyword));
        }

        let occurrences = content.to_lowercase().matches(keyword).count();
        let words = count_words(content);
        let density = if words == 0 { 0.0 } else { occurrences as f64 / words as f64 * 100.0 };

        if density < 0.5 {
            self.alert(AlertKind::Warning, format!("Low keyword density ({:.1}%)", density));
            self.suggest(format!("Mention \"{}\" more often (1-2% is ideal)", keyword));
            score += 3;
        } else if density > 3.0 {
            self.alert(AlertKind::Warning, format!("High keyword density ({:.1}%), it may look like spam", density));
            self.suggest("Use the keyword less".to_string());
            score += 8;
        } else {
            self.alert(AlertKind::Success, format!("Keyword density is fine ({:.1}%)", density));
            score += 10;
        }
        score
    }

    fn readability(&mut self, content: &str) -> u32 {
        if content.is_empty() {
            return 0;
        }

        let sentences = content.split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();
        let words = count_words(content);
        let avg = if sentences == 0 { 0.0 } else { words as f64 / sentences as f64 };

        if avg > 25.0 {
            self.alert(AlertKind::Warning, "Sentences too long, hard to read".to_string());
            self.suggest("Split long sentences".to_string());
            5
        } else if avg < 10.0 {
            self.alert(AlertKind::Info, "Very short sentences".to_string());
            8
        } else {
            self.alert(AlertKind::Success, "Readability is fine".to_string());
            10
        }
    }
}

/// Words of the text once markdown images, link targets and markers are removed.
pub fn count_words(text: &str) -> usize {
    lazy_static! {
        static ref IMAGE: Regex = Regex::new(r"!\[([^\]]*)\]\([^)]+\)").unwrap();
        static ref LINK: Regex = Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap();
        static ref HEADING: Regex = Regex::new(r"#{1,6}\s").unwrap();
        static ref FORMATTING: Regex = Regex::new(r"[*_~`]").unwrap();
    }

    let clean = IMAGE.replace_all(text, "");
    let clean = LINK.replace_all(&clean, "$1");
    let clean = HEADING.replace_all(&clean, "");
    let clean = FORMATTING.replace_all(&clean, "");
    clean.split_whitespace().count()
}

pub fn analyze(input: &SeoInput) -> SeoReport {
    let mut analysis = Analysis::default();
    let details = ScoreDetails {
        title: analysis.title(input.title),
        description: analysis.description(input.description),
        content: analysis.content_length(input.content),
        headings: analysis.headings(input.content),
        images: analysis.images(input.content, input.hero_image),
        keywords: analysis.keywords(input.title, input.description, input.content),
        readability: analysis.readability(input.content),
    };

    let total = details.title + details.description + details.content + details.headings
        + details.images + details.keywords + details.readability;

    SeoReport {
        score: total.min(MAX_SCORE),
        alerts: analysis.alerts,
        suggestions: analysis.suggestions,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(words: usize, word: &str) -> String {
        let mut s = vec![word; words].join(" ");
        s.push('.');
        s
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("## Title here\n\nSome **bold** [link text](https://x.y) ![alt](img.png)"), 6);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_empty_post() {
        let report = analyze(&SeoInput { title: "", description: "", content: "", hero_image: "" });
        assert_eq!(report.score, 0);
        assert_eq!(report.label(), "Low");
        assert!(report.alerts.iter().any(|a| a.kind == AlertKind::Error && a.message == "Missing title"));
    }

    #[test]
    fn test_title_thresholds() {
        let score = |len: usize| Analysis::default().title(&"a".repeat(len));
        assert_eq!(score(29), 5);
        assert_eq!(score(30), 15);
        assert_eq!(score(50), 20);
        assert_eq!(score(60), 20);
        assert_eq!(score(61), 15);
        assert_eq!(score(66), 12);
    }

    #[test]
    fn test_description_thresholds() {
        let score = |len: usize| Analysis::default().description(&"d".repeat(len));
        assert_eq!(score(119), 5);
        assert_eq!(score(120), 15);
        assert_eq!(score(165), 15);
        assert_eq!(score(166), 10);
    }

    #[test]
    fn test_headings_and_images() {
        let mut analysis = Analysis::default();
        assert_eq!(analysis.headings("# A\n\n# B\n\n## C\n"), 8);
        assert!(analysis.alerts.iter().any(|a| a.message == "Multiple H1 headings (2)"));
        assert_eq!(Analysis::default().headings("## A\n\n## B\n\n### C"), 15);
        assert_eq!(Analysis::default().headings("no headings"), 0);

        assert_eq!(Analysis::default().images("![a](1.png) ![b](2.png)", "hero.jpg"), 10);
        assert_eq!(Analysis::default().images("![](1.png) ![b](2.png)", "hero.jpg"), 5);
        assert_eq!(Analysis::default().images("no images", ""), 0);
    }

    #[test]
    fn test_full_post() {
        let title = "Patagonia en invierno: guía completa para tu viaje ideal";
        let description = "Todo lo que necesitas saber para recorrer la patagonia en invierno: clima, rutas, \
                           excursiones, presupuesto y consejos prácticos para tu viaje soñado.";
        // 922 words in 82 sentences, "patagonia" 10 times
        let mut content = String::from("## Clima\n\n");
        for i in 0..40 {
            content.push_str(&sentence(20, "viaje"));
            let place = if i % 4 == 0 { "patagonia" } else { "ruta" };
            content.push_str(&format!(" La {} sorprende.\n", place));
        }
        content.push_str("\n## Rutas\n\n![Glaciar](glaciar.jpg)\n");

        let report = analyze(&SeoInput {
            title,
            description,
            content: &content,
            hero_image: "https://img/hero.jpg",
        });
        assert_eq!(report.details.title, 20);
        assert_eq!(report.details.description, 15);
        assert_eq!(report.details.content, 15);
        assert_eq!(report.details.headings, 15);
        assert_eq!(report.details.images, 10);
        assert_eq!(report.details.keywords, 15);
        assert_eq!(report.details.readability, 10);
        assert_eq!(report.score, 100);
        assert_eq!(report.label(), "Excellent");

        let short = analyze(&SeoInput {
            title,
            description,
            content: "## Only\n\nA few words here.",
            hero_image: "https://img/hero.jpg",
        });
        assert_eq!(short.details.content, 0);
        assert!(short.score < report.score);
    }

    #[test]
    fn test_labels_and_indicator() {
        assert_eq!(score_label(80), "Excellent");
        assert_eq!(score_label(60), "Good");
        assert_eq!(score_label(40), "Needs work");
        assert_eq!(score_label(39), "Low");

        assert_eq!(title_indicator(""), TitleIndicator::Empty);
        assert_eq!(title_indicator(&"t".repeat(20)), TitleIndicator::Red);
        assert_eq!(title_indicator(&"t".repeat(35)), TitleIndicator::Yellow);
        assert_eq!(title_indicator(&"t".repeat(50)), TitleIndicator::Green);
    }
}
