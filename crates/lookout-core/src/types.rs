use serde::{Deserialize, Serialize};

/// Length of every embedding produced by the encoder and stored in the face
/// table. A stored row with any other length is a corruption condition.
pub const EMBEDDING_DIM: usize = 128;

/// Maximum Euclidean distance for two embeddings to be considered the same
/// identity.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Bounding box for a detected face, in original-image pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face embedding vector — a face's identity signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two embeddings. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A registered identity as persisted in the face store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownFace {
    pub id: i64,
    pub name: String,
    pub embedding: Embedding,
}

/// A cached `(name, embedding)` pair used for matching.
#[derive(Debug, Clone)]
pub struct WatchedFace {
    pub name: String,
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against the watch list.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub matched: bool,
    /// Euclidean distance of the nearest entry, `f32::INFINITY` when the
    /// watch list is empty.
    pub distance: f32,
    /// Name of the nearest entry when within tolerance.
    pub name: Option<String>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            distance: f32::INFINITY,
            name: None,
        }
    }
}

/// Strategy for resolving a probe embedding against a gallery of watched faces.
pub trait Matcher {
    fn nearest(&self, probe: &Embedding, gallery: &[WatchedFace], tolerance: f32) -> MatchResult;
}

/// Nearest-neighbor matcher: the gallery entry with minimum Euclidean
/// distance wins, and matches iff that distance is within tolerance.
///
/// An empty gallery short-circuits to a non-match; it is never an error.
pub struct NearestMatcher;

impl Matcher for NearestMatcher {
    fn nearest(&self, probe: &Embedding, gallery: &[WatchedFace], tolerance: f32) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, face) in gallery.iter().enumerate() {
            let dist = probe.distance(&face.embedding);
            if dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist <= tolerance => MatchResult {
                matched: true,
                distance: best_dist,
                name: Some(gallery[idx].name.clone()),
            },
            Some(_) => MatchResult {
                matched: false,
                distance: best_dist,
                name: None,
            },
            None => MatchResult::no_match(),
        }
    }
}
