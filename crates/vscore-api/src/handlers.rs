//! Request handlers.

pub mod health;
pub mod rag;
pub mod videos;

pub use health::*;
pub use rag::*;
pub use videos::*;
