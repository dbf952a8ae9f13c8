//! Report rendering.

pub mod generator;
pub mod panels;

pub use generator::{generate_json_report, generate_markdown_report, RenderOptions};
