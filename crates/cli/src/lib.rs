//! Testpilot CLI
//!
//! Command-line front end for planning and running browser end-to-end
//! tests.

pub mod commands;
pub mod output;
