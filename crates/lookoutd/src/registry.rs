//! Registration service: validates and writes new face registrations.
//!
//! One uploaded image yields one embedding (the first detected face, in
//! detection order; additional faces are silently ignored). The watch-list
//! cache is rebuilt synchronously before a registration returns, so
//! recognition immediately sees the new face.

use crate::engine::{EngineError, EngineHandle};
use lookout_core::{Embedding, KnownFace};
use lookout_store::{FaceCache, FaceStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("a non-empty name is required")]
    MissingName,
    #[error("could not decode uploaded image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("no face detected in the uploaded image")]
    NoFaceDetected,
    #[error("the watch list is full ({limit} faces)")]
    CapacityExceeded { limit: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct RegistrationService {
    store: FaceStore,
    cache: Arc<FaceCache>,
    engine: EngineHandle,
    max_registered: usize,
}

impl RegistrationService {
    pub fn new(
        store: FaceStore,
        cache: Arc<FaceCache>,
        engine: EngineHandle,
        max_registered: usize,
    ) -> Self {
        Self {
            store,
            cache,
            engine,
            max_registered,
        }
    }

    /// Register one face from an uploaded image under `name`.
    pub async fn register(
        &self,
        image_bytes: &[u8],
        name: &str,
    ) -> Result<KnownFace, RegistrationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistrationError::MissingName);
        }

        let image = image::load_from_memory(image_bytes)?.to_rgb8();
        let embeddings = self.engine.embed_faces(image).await?;
        let Some(embedding) = embeddings.into_iter().next() else {
            return Err(RegistrationError::NoFaceDetected);
        };

        if self.cache.len() >= self.max_registered {
            return Err(RegistrationError::CapacityExceeded {
                limit: self.max_registered,
            });
        }

        let id = self.persist(name.to_string(), embedding.clone()).await?;
        tracing::info!(id, name, "face added to the watch list");

        Ok(KnownFace {
            id,
            name: name.to_string(),
            embedding,
        })
    }

    /// Insert the row and rebuild the cache, off the async runtime.
    async fn persist(&self, name: String, embedding: Embedding) -> Result<i64, StoreError> {
        let store = self.store.clone();
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || -> Result<i64, StoreError> {
            let id = store.insert(&name, &embedding)?;
            cache.reload(&store)?;
            Ok(id)
        })
        .await
        .expect("blocking store task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spawn_engine;
    use image::RgbImage;
    use lookout_core::{AnalyzerError, FaceAnalyzer, FaceBox, EMBEDDING_DIM};
    use tempfile::TempDir;

    struct StubAnalyzer {
        embeddings: Vec<Embedding>,
    }

    impl FaceAnalyzer for StubAnalyzer {
        fn detect_faces(&mut self, _image: &RgbImage) -> Result<Vec<FaceBox>, AnalyzerError> {
            Ok(self
                .embeddings
                .iter()
                .map(|_| FaceBox {
                    x: 0.0,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                    confidence: 1.0,
                })
                .collect())
        }

        fn embed_faces(
            &mut self,
            _image: &RgbImage,
            boxes: &[FaceBox],
        ) -> Result<Vec<Embedding>, AnalyzerError> {
            Ok(self.embeddings[..boxes.len()].to_vec())
        }
    }

    fn embedding_at(x: f32) -> Embedding {
        let mut values = vec![0.0; EMBEDDING_DIM];
        values[0] = x;
        Embedding::new(values)
    }

    fn png_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let mut buf = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn service(
        dir: &TempDir,
        embeddings: Vec<Embedding>,
        max_registered: usize,
    ) -> (RegistrationService, FaceStore, Arc<FaceCache>) {
        let store = FaceStore::new(dir.path().join("faces.db"));
        store.initialize().unwrap();
        let cache = Arc::new(FaceCache::new());
        cache.reload(&store).unwrap();
        let engine = spawn_engine(StubAnalyzer { embeddings });
        let registry =
            RegistrationService::new(store.clone(), cache.clone(), engine, max_registered);
        (registry, store, cache)
    }

    #[tokio::test]
    async fn test_register_inserts_and_reloads_cache() {
        let dir = TempDir::new().unwrap();
        let (registry, store, cache) = service(&dir, vec![embedding_at(0.5)], 10);

        let face = registry.register(&png_bytes(), "alice").await.unwrap();
        assert_eq!(face.name, "alice");
        assert_eq!(store.list().unwrap().len(), 1);
        // Cache sees the new face before register() returns.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.snapshot()[0].name, "alice");
    }

    #[tokio::test]
    async fn test_register_uses_first_detected_face() {
        let dir = TempDir::new().unwrap();
        let (registry, store, _cache) =
            service(&dir, vec![embedding_at(1.0), embedding_at(2.0)], 10);

        registry.register(&png_bytes(), "alice").await.unwrap();
        let rows = store.list().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].embedding.values[0], 1.0);
    }

    #[tokio::test]
    async fn test_register_no_face_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let (registry, store, cache) = service(&dir, vec![], 10);

        let err = registry.register(&png_bytes(), "alice").await.unwrap_err();
        assert!(matches!(err, RegistrationError::NoFaceDetected));
        assert!(store.list().unwrap().is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_register_rejects_when_capacity_reached() {
        let dir = TempDir::new().unwrap();
        let (registry, store, cache) = service(&dir, vec![embedding_at(0.5)], 2);

        registry.register(&png_bytes(), "alice").await.unwrap();
        registry.register(&png_bytes(), "bob").await.unwrap();
        let err = registry.register(&png_bytes(), "carol").await.unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::CapacityExceeded { limit: 2 }
        ));
        // Store and cache unchanged by the rejected registration.
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let dir = TempDir::new().unwrap();
        let (registry, store, _cache) = service(&dir, vec![embedding_at(0.5)], 10);

        let err = registry.register(&png_bytes(), "   ").await.unwrap_err();
        assert!(matches!(err, RegistrationError::MissingName));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_undecodable_image() {
        let dir = TempDir::new().unwrap();
        let (registry, store, _cache) = service(&dir, vec![embedding_at(0.5)], 10);

        let err = registry
            .register(b"definitely not an image", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ImageDecode(_)));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_tracks_store_across_register_and_delete() {
        let dir = TempDir::new().unwrap();
        let (registry, store, cache) = service(&dir, vec![embedding_at(0.5)], 10);

        let face = registry.register(&png_bytes(), "alice").await.unwrap();
        registry.register(&png_bytes(), "bob").await.unwrap();
        assert_eq!(cache.len(), store.list().unwrap().len());

        store.delete(face.id).unwrap();
        cache.reload(&store).unwrap();
        assert_eq!(cache.len(), store.list().unwrap().len());
        assert_eq!(cache.len(), 1);
    }
}
