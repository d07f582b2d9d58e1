#![warn(clippy::uninlined_format_args)]

pub mod cards;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod paths;
pub mod patterns;
pub mod provider;
pub mod scheduler;
pub mod server;
pub mod templating;
pub mod tokens;
pub mod tracing_setup;

pub use cli::{Cli, Commands};
