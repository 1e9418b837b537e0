pub mod frontmatter;
pub mod html_to_markdown;
pub mod markdown_to_html;
pub mod slug;

/// A post as edited in the desk, before it becomes a file in the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentRecord {
    pub title: String,
    pub description: String,
    pub publish_date: String,
    pub author: String,
    pub hero_image: String,
    pub tags: Vec<String>,
    pub flight_destination: Option<String>,
    pub tour_city: Option<String>,
    pub body: String,
}

impl ContentRecord {
    /// File name used the first time the record is published.
    pub fn file_name(&self) -> String {
        slug::post_file_name(&self.title, &self.publish_date)
    }
}
