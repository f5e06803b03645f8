//! Inference engine thread.
//!
//! ONNX sessions are owned by one dedicated OS thread; HTTP and WebSocket
//! handlers reach it through a clone-safe [`EngineHandle`]. The engine is
//! generic over [`FaceAnalyzer`] so tests can inject stubs.

use image::RgbImage;
use lookout_core::{AnalyzerError, Embedding, FaceAnalyzer};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from handlers to the engine thread.
enum EngineRequest {
    Embed {
        image: RgbImage,
        reply: oneshot::Sender<Result<Vec<Embedding>, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Detect and embed every face in the image, in detection order.
    pub async fn embed_faces(&self, image: RgbImage) -> Result<Vec<Embedding>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Embed {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread and return its handle.
///
/// The analyzer is moved onto the thread; requests are serialized through
/// the channel, so one frame or registration runs to completion before the
/// next is considered.
pub fn spawn_engine<A>(mut analyzer: A) -> EngineHandle
where
    A: FaceAnalyzer + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(8);

    std::thread::Builder::new()
        .name("lookout-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Embed { image, reply } => {
                        let result = analyzer.embeddings(&image).map_err(EngineError::from);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}
