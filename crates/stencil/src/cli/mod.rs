//! Subcommands of the `stencil` binary

pub mod config;
pub mod error;
pub mod list;
pub mod output;
pub mod scan;
pub mod templates;
