//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! - [`download`] - Download the tiles of a region

pub mod download;
