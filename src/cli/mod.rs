//! Command-line front end: argument parsing and the screen renderer.

mod app;
mod args;

pub use app::*;
pub use args::*;
