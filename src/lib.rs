//! Parley is a terminal chat client for a conversation service that stores
//! conversations server-side and streams assistant replies.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the backend seam ([`api::ChatBackend`]), its wire
//!   payloads, and the HTTP implementation.
//! - [`core`] owns the synchronization controller: conversation switching,
//!   paginated history, streamed reply reconciliation, and title polling.
//! - [`ui`] renders the terminal interface and runs the interactive event loop.
//! - [`cli`] parses arguments and dispatches to the chat loop or one-shot
//!   subcommands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
