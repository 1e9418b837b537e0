pub mod grid_renderer;
pub mod post_grid;
pub mod preview_renderer;
