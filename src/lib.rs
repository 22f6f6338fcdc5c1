//! askportal is a terminal client for the ask-cbioportal question-answering
//! service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation state: per-session channels, the session
//!   store, the event reducer, history persistence and the [`core::app::App`]
//!   coordinator that ties them together.
//! - [`ui`] turns messages into markup and presents them, either as a
//!   document model or on a line-oriented terminal.
//! - [`commands`] implements slash-command parsing and execution used by the
//!   chat loop.
//! - [`api`] defines the frames exchanged with the backend.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
