//! Persistence for videos, analyses and the knowledge base.
//!
//! Two backends implement the same traits:
//! - [`PgStore`]: Postgres with the `vector` extension
//! - [`MemoryStore`]: process-local, for development and tests
//!
//! Status changes are conditional updates on the expected predecessor, so
//! a video never leaves a terminal state and never skips PROCESSING.

pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use pg::{DatabaseConfig, PgStore};
pub use store::{cosine_similarity, KnowledgeStore, VideoStore};
