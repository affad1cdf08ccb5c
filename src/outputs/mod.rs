//! View binding: what the rendering layer observes.

pub mod text;
pub mod view;

pub use view::SessionView;
