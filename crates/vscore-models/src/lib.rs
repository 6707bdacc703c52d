//! Shared data models for the VidScore AI backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and the upload/analysis status state machine
//! - Marketing-performance analysis results
//! - Knowledge-base documents and search hits

pub mod analysis;
pub mod knowledge;
pub mod utils;
pub mod video;

pub use analysis::{AnalysisDetails, AnalysisRecord, AnalysisResult, DimensionScore, ResultShapeError};
pub use knowledge::{KnowledgeDocument, SearchHit, DEFAULT_EMBEDDING_DIMENSIONS};
pub use utils::sanitize_filename;
pub use video::{InvalidTransition, VideoId, VideoRecord, VideoStatus, VideoWithAnalysis};
