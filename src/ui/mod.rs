//! Presentation layer.
//!
//! - [`markdown`]: turns raw message text into markup, including the chart
//!   placeholder shown while a chart block is still streaming.
//! - [`view`]: the [`view::ViewSurface`] seam, the controller that maps
//!   reducer effects onto it, and an in-memory document surface.
//! - [`terminal`] and [`chat_loop`]: the interactive line-oriented client.
//!
//! Ownership boundary: this layer presents state, while [`crate::core`] owns
//! it.

pub mod chat_loop;
pub mod markdown;
pub mod terminal;
pub mod view;
