//! CLI subcommands.

pub mod directory;
pub mod migrate;
pub mod users;
