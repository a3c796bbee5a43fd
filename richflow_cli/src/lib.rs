//! Command line front-end for richflow
//!
//! Text files become line sources that are merged into one root flow; each
//! command builds a pipeline over that root and renders the result.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
