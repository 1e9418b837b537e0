use ramhorns::Template;

use crate::error::{Error, Result};
use crate::paginator::Paginator;
use crate::remote_config::RemoteConfig;
use crate::view::post_grid::GridEntry;

pub const DEFAULT_GRID_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>Posts ({{total}})</title>
</head>
<body>
<h1>Posts <span class="count">{{total}}</span></h1>
{{#no_results}}<p id="no-results">No posts</p>{{/no_results}}
<div id="posts-grid">
{{#posts}}
  <div class="post-card">
    {{#has_image}}<img src="{{image}}" alt="{{title}}">{{/has_image}}
    {{^has_image}}<div class="no-image"></div>{{/has_image}}
    <span class="date">{{date}}</span>
    <h3>{{title}}</h3>
    <p class="author">{{author}}</p>
    <a href="{{link}}" target="_blank">View code</a>
    <code class="path">{{path}}</code>
  </div>
{{/posts}}
</div>
{{#show_pagination}}
<nav class="pages">{{#pages}}{{#current}}<strong>{{number}}</strong>{{/current}}{{^current}}<span>{{number}}</span>{{/current}} {{/pages}}</nav>
{{/show_pagination}}
</body>
</html>
"##;

#[derive(ramhorns::Content)]
struct GridPage<'a> {
    total: usize,
    no_results: bool,
    posts: Vec<PostCard<'a>>,
    pages: Vec<ViewPagination>,
    show_pagination: bool,
}

#[derive(ramhorns::Content)]
struct PostCard<'a> {
    has_image: bool,
    image: &'a str,
    date: &'a str,
    title: &'a str,
    author: &'a str,
    path: &'a str,
    link: String,
}

#[derive(ramhorns::Content)]
struct ViewPagination {
    current: bool,
    number: u32,
}

pub struct GridRenderer<'a> {
    pub template: Template<'a>,
    pub page_size: u32,
}

impl GridRenderer<'_> {
    pub fn new(grid_tpl_src: &str, page_size: u32) -> Result<GridRenderer> {
        let template = match Template::new(grid_tpl_src) {
            Ok(x) => x,
            Err(e) => return Err(Error::Template(format!("Error parsing grid template: {}", e))),
        };

        Ok(GridRenderer {
            template,
            page_size,
        })
    }

    pub fn render(&self, entries: &[GridEntry], cur_page: u32, remote: &RemoteConfig) -> Result<String> {
        let paginator = Paginator::from(entries, self.page_size);
        let page = match (paginator.page_count(), cur_page) {
            (0, 1) => &entries[..0],
            _ => paginator.get_page(cur_page).map_err(Error::invalid_input)?,
        };

        let posts = page.iter()
            .map(|e| PostCard {
                has_image: !e.hero_image.is_empty(),
                image: e.hero_image.as_str(),
                date: e.publish_date.as_str(),
                title: e.title.as_str(),
                author: e.author.as_str(),
                path: e.path.as_str(),
                link: remote.blob_url(&e.path),
            })
            .collect();

        let pages = (1..=paginator.page_count())
            .map(|number| ViewPagination {
                current: number == cur_page,
                number,
            })
            .collect();

        Ok(self.template.render(&GridPage {
            total: entries.len(),
            no_results: entries.is_empty(),
            posts,
            pages,
            show_pagination: paginator.page_count() > 1,
        }))
    }
}
