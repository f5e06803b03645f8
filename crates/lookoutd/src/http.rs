//! HTTP routes and the realtime frame channel.
//!
//! The transport surface mirrors the browser client: CRUD endpoints for the
//! watch list plus a per-client WebSocket that carries `video_frame` payloads
//! in and `notification` payloads out. Notifications go only to the
//! originating socket, never broadcast.

use crate::recognition::FrameRecognizer;
use crate::registry::{RegistrationError, RegistrationService};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use lookout_store::{FaceCache, FaceStore, StoreError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct AppState {
    pub store: FaceStore,
    pub cache: Arc<FaceCache>,
    pub registry: RegistrationService,
    pub recognizer: FrameRecognizer,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/list_faces", get(list_faces))
        .route("/delete_face/:id", post(delete_face))
        .route("/add_face", post(add_face))
        .route("/stream", get(stream))
        .with_state(state)
}

/// Serve the embedded demo client page.
async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn list_faces(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.list_entries())
        .await
        .expect("blocking store task panicked");

    match result {
        Ok(entries) => {
            let faces: Vec<Value> = entries
                .into_iter()
                .map(|(id, name)| json!({ "id": id, "name": name }))
                .collect();
            (StatusCode::OK, Json(json!({ "faces": faces })))
        }
        Err(err) => store_error_response(err),
    }
}

/// Delete by id and rebuild the cache. Reports success whether or not the
/// id existed.
async fn delete_face(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<Value>) {
    let store = state.store.clone();
    let cache = state.cache.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
        store.delete(id)?;
        cache.reload(&store)?;
        Ok(())
    })
    .await
    .expect("blocking store task panicked");

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("face {id} removed from the watch list"),
            })),
        ),
        Err(err) => store_error_response(err),
    }
}

async fn add_face(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut file: Option<Vec<u8>> = None;
    let mut name: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => match field.name() {
                Some("file") => match field.bytes().await {
                    Ok(bytes) => file = Some(bytes.to_vec()),
                    Err(err) => return bad_request(format!("could not read file field: {err}")),
                },
                Some("name") => match field.text().await {
                    Ok(text) => name = Some(text),
                    Err(err) => return bad_request(format!("could not read name field: {err}")),
                },
                _ => {}
            },
            Ok(None) => break,
            Err(err) => return bad_request(format!("malformed multipart body: {err}")),
        }
    }

    let (Some(file), Some(name)) = (file, name) else {
        return bad_request("file and name fields are required".to_string());
    };

    match state.registry.register(&file, &name).await {
        Ok(face) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "name": face.name,
                "message": "face registered on the watch list",
            })),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "registration rejected");
            (
                registration_status(&err),
                Json(json!({ "error": err.to_string() })),
            )
        }
    }
}

fn registration_status(err: &RegistrationError) -> StatusCode {
    match err {
        RegistrationError::MissingName | RegistrationError::NoFaceDetected => {
            StatusCode::BAD_REQUEST
        }
        RegistrationError::CapacityExceeded { .. } => StatusCode::FORBIDDEN,
        RegistrationError::ImageDecode(_)
        | RegistrationError::Store(_)
        | RegistrationError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn store_error_response(err: StoreError) -> (StatusCode, Json<Value>) {
    tracing::error!(error = %err, "store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

/// One frame from the client: a data-URL-prefixed base64 image.
#[derive(Deserialize)]
struct FrameEvent {
    data: String,
}

async fn stream(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

/// Per-connection frame loop. Bad frames are logged and swallowed so one
/// undecodable frame never takes the stream down.
async fn handle_stream(mut socket: WebSocket, state: Arc<AppState>) {
    tracing::debug!("video stream connected");

    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!(error = %err, "video stream read failed");
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let event: FrameEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(error = %err, "dropped unparseable frame event");
                continue;
            }
        };

        match state.recognizer.recognize_frame(&event.data).await {
            Ok(Some(notification)) => {
                let payload = json!({ "message": notification.message }).to_string();
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                // Best-effort per frame: the connection survives bad frames.
                tracing::debug!(error = %err, "dropped bad frame");
            }
        }
    }

    tracing::debug!("video stream closed");
}
