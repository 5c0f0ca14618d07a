use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{Json, debug_handler};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::api::server::{AppState, JsonResult, RouteError};
use crate::db::models::Pagination;
use crate::db::prelude::{
    CoachAction, ConfirmReceipt, DashboardSummary, EcoUser, EmissionRecord, FootprintReport,
    InvestRecommendation, OffsetProject, ProjectRepository, ProjectStore, UserRepository,
};
use crate::eco::EcoWorkflow;

#[derive(Serialize)]
pub struct ChatReply {
    pub reply: String,
}

pub async fn health() -> &'static str {
    "✅ Carbon Offset Marketplace API is running"
}

#[instrument(skip(state))]
pub async fn emissions(
    Query(param): Query<Pagination>,
    State(state): State<Arc<AppState>>,
) -> JsonResult<Vec<EmissionRecord>> {
    let repo = ProjectRepository::new(state.db_pool);
    let rows = repo
        .emissions_ranked(param.limit(), param.offset())
        .await
        .map_err(|err| RouteError::FetchFailed("Failed to fetch emissions data", err))?;

    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn offset_projects(
    State(state): State<Arc<AppState>>,
) -> JsonResult<Vec<OffsetProject>> {
    let repo = ProjectRepository::new(state.db_pool);
    let projects = repo
        .offset_projects()
        .await
        .map_err(|err| RouteError::FetchFailed("Failed to fetch offset projects", err))?;

    Ok(Json(projects))
}

#[instrument(skip(state))]
pub async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
) -> JsonResult<DashboardSummary> {
    let repo = ProjectRepository::new(state.db_pool);
    let summary = repo
        .dashboard_summary()
        .await
        .map_err(|err| RouteError::FetchFailed("Failed to generate dashboard summary", err))?;

    Ok(Json(summary))
}

#[instrument(skip(state, body))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> JsonResult<ChatReply> {
    let (users, projects) = (
        UserRepository::new(state.db_pool),
        ProjectRepository::new(state.db_pool),
    );

    let flow = EcoWorkflow::new(&users, &projects, state.model.as_ref());
    let reply = flow.assistant_reply(&body).await?;

    Ok(Json(ChatReply { reply }))
}

#[instrument(skip(state))]
pub async fn user_stats(State(state): State<Arc<AppState>>) -> JsonResult<EcoUser> {
    let (users, projects) = (
        UserRepository::new(state.db_pool),
        ProjectRepository::new(state.db_pool),
    );

    let flow = EcoWorkflow::new(&users, &projects, state.model.as_ref());
    let user = flow
        .user_stats(&state.sim_user, &state.sim_user_name)
        .await?;

    Ok(Json(user))
}

#[instrument(skip(state, body))]
#[debug_handler]
pub async fn calculate_footprint(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> JsonResult<FootprintReport> {
    let (users, projects) = (
        UserRepository::new(state.db_pool),
        ProjectRepository::new(state.db_pool),
    );

    let flow = EcoWorkflow::new(&users, &projects, state.model.as_ref());
    let report = flow
        .calculate_footprint(&state.sim_user, &state.sim_user_name, &body)
        .await?;

    Ok(Json(report))
}

#[instrument(skip(state))]
pub async fn coach_actions(State(state): State<Arc<AppState>>) -> JsonResult<Vec<CoachAction>> {
    let (users, projects) = (
        UserRepository::new(state.db_pool),
        ProjectRepository::new(state.db_pool),
    );

    let flow = EcoWorkflow::new(&users, &projects, state.model.as_ref());
    let actions = flow
        .coach_actions(&state.sim_user, &state.sim_user_name)
        .await?;

    Ok(Json(actions))
}

#[instrument(skip(state, body))]
pub async fn confirm_action(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> JsonResult<ConfirmReceipt> {
    let (users, projects) = (
        UserRepository::new(state.db_pool),
        ProjectRepository::new(state.db_pool),
    );

    let flow = EcoWorkflow::new(&users, &projects, state.model.as_ref());
    let receipt = flow
        .confirm_action(&state.sim_user, &state.sim_user_name, &body)
        .await?;

    Ok(Json(receipt))
}

#[instrument(skip(state))]
pub async fn auto_invest(
    State(state): State<Arc<AppState>>,
) -> JsonResult<Vec<InvestRecommendation>> {
    let (users, projects) = (
        UserRepository::new(state.db_pool),
        ProjectRepository::new(state.db_pool),
    );

    let flow = EcoWorkflow::new(&users, &projects, state.model.as_ref());
    let picks = flow
        .auto_invest(&state.sim_user, &state.sim_user_name)
        .await?;

    Ok(Json(picks))
}
