//! Servidor web Axum para consulta de candidatos em uma KB persistida

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use clap::Parser;
use kb_core::{Candidate, KnowledgeBase};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kb-web", about = "Consulta de candidatos sobre uma base de conhecimento")]
struct Args {
    /// Diretório `kb/` gravado pelo create-kb
    #[arg(long, env = "KB_DIR")]
    kb_dir: PathBuf,

    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,
}

/// Estado compartilhado da aplicação
struct AppState {
    kb: KnowledgeBase,
}

#[derive(Deserialize)]
struct CandidatesQuery {
    #[serde(default)]
    mention: String,
}

#[derive(Serialize)]
struct CandidatesResponse {
    mention: String,
    candidates: Vec<Candidate>,
}

#[derive(Serialize)]
struct StatsResponse {
    entities: usize,
    aliases: usize,
    entity_vector_length: usize,
}

#[derive(Serialize)]
struct EntityResponse {
    id: String,
    frequency: u64,
    vector: Vec<f32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let kb_dir = args.kb_dir.clone();
    let kb = tokio::task::spawn_blocking(move || KnowledgeBase::from_disk(&kb_dir))
        .await?
        .with_context(|| format!("falha ao carregar a KB de {}", args.kb_dir.display()))?;
    info!(
        "KB carregada: {} entidades, {} aliases",
        kb.n_entities(),
        kb.n_aliases()
    );

    let app = router(Arc::new(AppState { kb }));
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!("Servidor KB iniciado em http://{}", args.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/candidates", get(candidates_handler))
        .route("/entities/:id", get(entity_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatsResponse {
        entities: state.kb.n_entities(),
        aliases: state.kb.n_aliases(),
        entity_vector_length: state.kb.entity_vector_length(),
    })
}

/// Candidatos para o texto de uma menção (alias exato, aparado)
async fn candidates_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CandidatesQuery>,
) -> impl IntoResponse {
    let mention = query.mention.trim();
    if mention.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Menção vazia"})),
        )
            .into_response();
    }

    Json(CandidatesResponse {
        mention: mention.to_string(),
        candidates: state.kb.get_candidates(mention),
    })
    .into_response()
}

async fn entity_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match (state.kb.get_frequency(&id), state.kb.get_vector(&id)) {
        (Some(frequency), Some(vector)) => Json(EntityResponse {
            vector: vector.to_vec(),
            id,
            frequency,
        })
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("Entidade '{id}' não encontrada")})),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let mut kb = KnowledgeBase::new(2);
        kb.set_entities(
            &["Q1".to_string(), "Q4".to_string()],
            vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            &[10, 3],
        )
        .unwrap();
        kb.add_alias("paris", &["Q1", "Q4"], &[0.9, 0.1]).unwrap();
        kb.add_alias("_Q1_", &["Q1"], &[1.0]).unwrap();
        router(Arc::new(AppState { kb }))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_candidates_in_order() {
        let (status, body) = get_json("/candidates?mention=paris").await;
        assert_eq!(status, StatusCode::OK);
        let candidates = body["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0]["entity"], "Q1");
        assert_eq!(candidates[1]["entity"], "Q4");
        assert_eq!(candidates[1]["entity_freq"], 3);
    }

    #[tokio::test]
    async fn test_synthetic_alias_lookup() {
        let (status, body) = get_json("/candidates?mention=_Q1_").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidates"][0]["entity"], "Q1");
        assert_eq!(body["candidates"][0]["prior_prob"], 1.0);
    }

    #[tokio::test]
    async fn test_empty_mention_is_bad_request() {
        let (status, _) = get_json("/candidates?mention=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_json("/candidates").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_entity_lookup() {
        let (status, body) = get_json("/entities/Q4").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["frequency"], 3);
        assert_eq!(body["vector"].as_array().unwrap().len(), 2);

        let (status, _) = get_json("/entities/Q999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats() {
        let (status, body) = get_json("/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entities"], 2);
        assert_eq!(body["aliases"], 2);
        assert_eq!(body["entity_vector_length"], 2);
    }
}
