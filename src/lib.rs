//! mable: maintain the Approved Book List (ABL)
//!
//! Layers, innermost first:
//! - [`domain`]: registry model and mutation engine
//! - [`application`]: loading, fetching and persisting the ABL
//! - [`infrastructure`]: filesystem/HTTP implementations and wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
