//! Clients for the hosted model backend.
//!
//! This crate provides:
//! - [`AzureVisionClient`]: chat completions with inline frame images and
//!   JSON response mode
//! - [`AzureEmbeddingClient`]: text embeddings for knowledge-base search
//!
//! Both are built once at startup and shared behind `Arc`; they hold no
//! per-request state.

pub mod config;
pub mod embedding;
pub mod error;
pub mod vision;

pub use config::{EmbeddingConfig, VisionConfig};
pub use embedding::{AzureEmbeddingClient, Embedder};
pub use error::{MlError, MlResult};
pub use vision::{AzureVisionClient, ImagePayload, VisionModel, VisionRequest};
