//! Tabula CLI - command-line front end for the Tabula schema migration engine.
//!
//! `tabula plan` runs table descriptors through the engine against an
//! in-memory database and prints every statement a real database would
//! receive. `tabula validate` checks descriptors without issuing anything.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
