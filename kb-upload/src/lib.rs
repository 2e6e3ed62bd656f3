pub mod cli;
pub mod progress;
pub mod upload;

pub use cli::{run, Cli};
