//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: terminal setup, input handling, and the loop that drives
//!   [`crate::core::runtime::SyncRuntime`].
//! - [`renderer`]: draws a [`crate::core::sync::ViewModel`] with ratatui.
//! - [`state`], [`theme`], and [`title`]: front-end-only state, styles, and
//!   the title reveal animation.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns domain logic and backend coordination.

pub mod chat_loop;
pub mod renderer;
pub mod state;
pub mod theme;
pub mod title;
