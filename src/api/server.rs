use std::net::SocketAddr;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::ai::{AiError, TextModel};
use crate::api::handler::*;
use crate::api::middleware as mw;
use crate::constants::{
    AI_FORMAT_MSG, AI_UNAVAILABLE_MSG, MODEL_NOT_FOUND_MSG, QUOTA_EXCEEDED_MSG, SERVER_PORT,
};
use crate::db::prelude::*;
use crate::eco::WorkflowError;
use crate::util::env::Var;
use crate::var;

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: &'static PgPool,
    pub model: Arc<dyn TextModel>,
    pub sim_user: UserId,
    pub sim_user_name: String,
}

#[instrument(skip(tx, model))]
pub async fn router(tx: UnboundedSender<SocketAddr>, model: Arc<dyn TextModel>) {
    let pool = db_pool().await.unwrap();
    ensure_schema(pool).await.unwrap();

    let cors = mw::cors().await.unwrap();
    let state = Arc::new(AppState {
        db_pool: pool,
        model,
        sim_user: UserId::from(var!(Var::SimUserId).await.unwrap()),
        sim_user_name: var!(Var::SimUserName).await.unwrap().to_string(),
    });

    let app = Router::new()
        //
        // general
        .route("/", get(health))
        .route("/checkhealth", get(|| async { "SERVER_OK" }))
        //
        // marketplace catalog routes
        .route("/api/emissions", get(emissions))
        .route("/api/offset-projects", get(offset_projects))
        .route("/api/dashboard-summary", get(dashboard_summary))
        //
        // assistant q&a
        .route("/api/chat", post(chat))
        //
        // reward workflow routes
        .route("/api/eco/user-stats", get(user_stats))
        .route("/api/eco/calculate-footprint", post(calculate_footprint))
        .route("/api/eco/coach-actions", get(coach_actions))
        .route("/api/eco/confirm-action", post(confirm_action))
        .route("/api/eco/auto-invest", get(auto_invest))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(cors)
        .with_state(state);

    let port = var!(Var::ServerApiPort)
        .await
        .unwrap()
        .parse::<u16>()
        .unwrap_or(SERVER_PORT);

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await.unwrap();

    tx.send(socket_addr).unwrap();
    axum::serve(listener, app).await.unwrap()
}

/// Logs any `RouteError` a handler stashed in the response extensions.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[instrument(skip(tx, rx, model))]
pub async fn start_server(
    tx: UnboundedSender<SocketAddr>,
    mut rx: UnboundedReceiver<SocketAddr>,
    model: Arc<dyn TextModel>,
) -> Result<Vec<JoinHandle<()>>, RouteError> {
    tracing::info!("starting server");
    let server_handle = tokio::task::spawn(async move {
        router(tx, model).await;
    });

    let logging_handle = tokio::task::spawn(async move {
        while !rx.is_closed() {
            if let Some(msg) = rx.recv().await {
                tracing::info!(
                    server_url = &format!("http://127.0.0.1:{}", msg.port()),
                    "server ready"
                );
                break;
            }
        }
    });

    let handles = vec![server_handle, logging_handle];
    Ok(handles)
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    QueryError(#[from] StoreError),

    #[error(transparent)]
    SqlxError(#[from] sqlx::error::Error),

    #[error("{0}")]
    FetchFailed(&'static str, #[source] sqlx::error::Error),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message, err) = match &self {
            RouteError::QueryError(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error.to_string(),
                Some(self),
            ),

            RouteError::SqlxError(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error.to_string(),
                Some(self),
            ),

            RouteError::FetchFailed(message, _) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                message.to_string(),
                Some(self),
            ),

            RouteError::Workflow(flow_err) => {
                match flow_err {
                    WorkflowError::Input(error) => (
                        StatusCode::BAD_REQUEST,
                        error.to_string(),
                        None, // caller's typo, not our failure
                    ),
                    WorkflowError::EmptyMessage => {
                        (StatusCode::BAD_REQUEST, flow_err.to_string(), None)
                    }
                    WorkflowError::Ai(AiError::RateLimited) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        String::from(QUOTA_EXCEEDED_MSG),
                        Some(self),
                    ),
                    WorkflowError::Ai(AiError::ModelNotFound(_)) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        String::from(MODEL_NOT_FOUND_MSG),
                        Some(self),
                    ),
                    WorkflowError::Ai(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        String::from(AI_UNAVAILABLE_MSG),
                        Some(self),
                    ),
                    WorkflowError::BadReply(_) | WorkflowError::PayloadField(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        String::from(AI_FORMAT_MSG),
                        Some(self),
                    ),
                    WorkflowError::Store(error) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        error.to_string(),
                        Some(self),
                    ),
                }
            }
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();
        if let Some(err) = err {
            response.extensions_mut().insert(Arc::new(err));
        }

        response
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ai::extract::ExtractError;
    use crate::db::prelude::InputError;

    async fn error_body(err: RouteError) -> (StatusCode, bool, String) {
        let response = err.into_response();
        let status = response.status();
        let logged = response.extensions().get::<Arc<RouteError>>().is_some();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        (status, logged, body["error"].as_str().unwrap().to_owned())
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_requests() {
        let err = RouteError::Workflow(InputError::MissingField("travel").into());
        let (status, logged, message) = error_body(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Missing required field 'travel'");
        assert!(!logged);
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_a_bad_request() {
        let err = RouteError::Workflow(WorkflowError::EmptyMessage);
        let (status, _, message) = error_body(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Message is required");
    }

    #[tokio::test]
    async fn test_quota_exhaustion_keeps_its_wording() {
        let err = RouteError::Workflow(AiError::RateLimited.into());
        let (status, logged, message) = error_body(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, QUOTA_EXCEEDED_MSG);
        assert!(logged);
    }

    #[tokio::test]
    async fn test_missing_model_keeps_its_wording() {
        let err = RouteError::Workflow(AiError::ModelNotFound("gemini-x".into()).into());
        let (status, _, message) = error_body(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, MODEL_NOT_FOUND_MSG);
    }

    #[tokio::test]
    async fn test_other_completion_failures_read_as_unavailable() {
        let err = RouteError::Workflow(AiError::Timeout(10).into());
        let (status, _, message) = error_body(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, AI_UNAVAILABLE_MSG);
    }

    #[tokio::test]
    async fn test_unusable_replies_read_as_format_trouble() {
        let shapeless = RouteError::Workflow(ExtractError::NoPayload.into());
        let (status, _, message) = error_body(shapeless).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, AI_FORMAT_MSG);

        let incomplete = RouteError::Workflow(WorkflowError::PayloadField("carbon_score"));
        let (_, _, message) = error_body(incomplete).await;
        assert_eq!(message, AI_FORMAT_MSG);
    }

    #[tokio::test]
    async fn test_catalog_fetch_failures_use_fixed_messages() {
        let err = RouteError::FetchFailed("Failed to fetch emissions data", sqlx::Error::RowNotFound);
        let (status, logged, message) = error_body(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Failed to fetch emissions data");
        assert!(logged);
    }
}
