pub mod auth;
pub mod authors;
pub mod autosave;
pub mod config;
pub mod content;
pub mod context;
pub mod editor;
pub mod error;
pub mod logger;
pub mod paginator;
pub mod remote_config;
pub mod repository;
pub mod seo;
pub mod settings;
pub mod store;
pub mod text_utils;
pub mod tours;
pub mod util;
pub mod view;
