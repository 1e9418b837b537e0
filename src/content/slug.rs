/// Lowercase, ascii only, words joined by `-`.
pub fn slugify(title: &str) -> String {
    let ascii = unidecode::unidecode(title).to_ascii_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut prev_dash = true;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// `2024-02-29-post-title-of-mine.md`
pub fn post_file_name(title: &str, publish_date: &str) -> String {
    let slug = slugify(title);
    match publish_date.trim() {
        "" => format!("{}.md", slug),
        date => format!("{}-{}.md", date, slug),
    }
}

/// Slug cut to `max_len` characters, never ending with a dash.
pub fn short_slug(title: &str, max_len: usize) -> String {
    let slug: String = slugify(title).chars().take(max_len).collect();
    slug.trim_end_matches('-').to_string()
}
