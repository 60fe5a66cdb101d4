//! Command handlers -- one module per subcommand

pub mod config;
pub mod patterns;
pub mod players;
