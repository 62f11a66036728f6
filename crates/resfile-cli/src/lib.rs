//! Command-line front end for resource container files.
//!
//! The `resfile` binary is a thin wrapper: it parses [`Cli`], installs a
//! tracing subscriber and calls [`run`]. Keeping the commands in a library
//! lets them be driven from tests with an in-memory output buffer.

#![warn(missing_docs)]

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::{EntryRow, run};
