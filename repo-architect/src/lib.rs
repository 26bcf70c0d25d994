pub mod cli;
pub mod load_config;

pub use cli::{analyze, run, Cli, Commands};
