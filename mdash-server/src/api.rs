//! REST API and SSE routes

use crate::{
    sinks::resolve_sink_path,
    state::{AppState, SinkConfig, SinkType},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use mdash_core::{
    model::FieldMask,
    wire::{InboundMessage, PlaybackCommand, TrackUpdate},
};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/telemetry", get(latest_snapshot))
        .route("/api/telemetry/stream", get(telemetry_stream))
        .route("/api/command/:cmd", post(issue_command))
        .route("/api/track", post(inject_track))
        .route("/api/sinks", get(list_sinks).post(create_sink))
        .route("/api/sinks/:id", delete(delete_sink))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Telemetry Endpoints ===

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn latest_snapshot(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let latest = state.latest.read().await;
    let Some(snapshot) = latest.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "No tick has run yet").into_response();
    };

    let mask = query.fields.map(|f| FieldMask::parse(&f));
    match snapshot.to_json_filtered(mask.as_ref()) {
        Ok(json) => ([("content-type", "application/json")], json).into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize snapshot: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let field_mask = query.fields.map(|f| FieldMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = field_mask.clone();
        async move {
            match result {
                Ok(snapshot) => match snapshot.to_json_filtered(mask.as_ref()) {
                    Ok(json) => Some(Ok(Event::default().data(json))),
                    Err(e) => {
                        tracing::error!("Failed to serialize snapshot: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Media Endpoints ===

async fn issue_command(
    State(state): State<AppState>,
    Path(cmd): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let command: PlaybackCommand = cmd
        .parse()
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("{}", e)))?;

    state.send_command(command).await;
    tracing::debug!("Issued {} over the API", command);
    Ok(StatusCode::ACCEPTED)
}

/// Accept a raw track message, as the media bridge would send it
async fn inject_track(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, (StatusCode, String)> {
    let tx = state.track_tx.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Track injection is not wired up".to_string(),
    ))?;

    let update = TrackUpdate::parse(&body);
    if update.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Empty track message".to_string()));
    }

    if tx.send(InboundMessage::Track(update)) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Tick loop is not running".to_string(),
        ))
    }
}

// === Sink Management Endpoints ===

async fn list_sinks(State(state): State<AppState>) -> Json<Vec<SinkConfig>> {
    let sinks = state.sinks.read().await;
    Json(sinks.clone())
}

async fn create_sink(
    State(state): State<AppState>,
    Json(mut config): Json<SinkConfig>,
) -> Result<(StatusCode, Json<SinkConfig>), (StatusCode, String)> {
    if let SinkType::File { path } = &config.sink_type {
        resolve_sink_path(&state.sink_dir, path)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("{}", e)))?;
    }

    let mut sinks = state.sinks.write().await;

    if config.id.is_empty() {
        let mut n = sinks.len() + 1;
        while sinks.iter().any(|s| s.id == format!("sink-{}", n)) {
            n += 1;
        }
        config.id = format!("sink-{}", n);
    } else if sinks.iter().any(|s| s.id == config.id) {
        return Err((
            StatusCode::CONFLICT,
            format!("Sink {} already exists", config.id),
        ));
    }

    tracing::info!("Added sink {}", config.id);
    sinks.push(config.clone());

    Ok((StatusCode::CREATED, Json(config)))
}

async fn delete_sink(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let mut sinks = state.sinks.write().await;

    if let Some(pos) = sinks.iter().position(|s| s.id == id) {
        sinks.remove(pos);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
