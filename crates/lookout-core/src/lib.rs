//! lookout-core — Face embeddings and matching.
//!
//! Defines the embedding and watch-list types, the nearest-neighbor matcher,
//! and the [`FaceAnalyzer`] capability interface, with an ONNX Runtime backed
//! implementation (single-shot detector + embedding encoder).

pub mod analyzer;
pub mod detector;
pub mod encoder;
pub mod types;

pub use analyzer::{AnalyzerError, FaceAnalyzer, OnnxAnalyzer};
pub use detector::FaceDetector;
pub use encoder::FaceEncoder;
pub use types::{
    Embedding, FaceBox, KnownFace, MatchResult, Matcher, NearestMatcher, WatchedFace,
    DEFAULT_TOLERANCE, EMBEDDING_DIM,
};
