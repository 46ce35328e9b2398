pub mod cli;
pub mod load_config;
pub mod mapbox;
pub mod staging;

pub use cli::{run, Cli, Commands};
