//! Orchestration for the eco-credit reward loop: bootstrap, footprint
//! scoring, coaching, credit awards and investment picks.
//!
//! Every operation takes the acting user's id explicitly; resolving who
//! that is belongs to the HTTP boundary. The store and completion
//! backend sit behind traits, so the whole loop runs against in-memory
//! stand-ins under test.

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::ai::extract::{self, ExtractError};
use crate::ai::{AiError, TextModel};
use crate::constants::{MAX_CARBON_SCORE, MAX_INVEST_CANDIDATES};
use crate::db::models::coach::{CoachAction, ConfirmReceipt, ConfirmRequest};
use crate::db::models::footprint::{FootprintInput, FootprintReport};
use crate::db::models::project::InvestRecommendation;
use crate::db::models::user::{EcoUser, UserId};
use crate::db::models::{InputError, require_str};
use crate::db::repositories::{ProjectStore, UserStore};
use crate::eco::prompts;

pub type EcoResult<T> = core::result::Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Input(#[from] InputError),

    #[error("Message is required")]
    EmptyMessage,

    #[error("{0}")]
    Ai(#[from] AiError),

    #[error("{0}")]
    BadReply(#[from] ExtractError),

    #[error("reply payload is missing or mistypes '{0}'")]
    PayloadField(&'static str),

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

pub struct EcoWorkflow<'a> {
    users: &'a dyn UserStore,
    projects: &'a dyn ProjectStore,
    model: &'a dyn TextModel,
}

impl<'a> EcoWorkflow<'a> {
    pub fn new(
        users: &'a dyn UserStore,
        projects: &'a dyn ProjectStore,
        model: &'a dyn TextModel,
    ) -> Self {
        Self {
            users,
            projects,
            model,
        }
    }

    /// Read-or-create. First contact provisions the user row and wallet.
    #[instrument(skip(self))]
    pub async fn user_stats(&self, id: &UserId, name: &str) -> EcoResult<EcoUser> {
        Ok(self.users.bootstrap(id, name).await?)
    }

    /// Scores the questionnaire via the model, then stores the new carbon
    /// score and a log entry in one transaction. Validation and model
    /// failures happen before any write.
    #[instrument(skip(self, body))]
    pub async fn calculate_footprint(
        &self,
        id: &UserId,
        name: &str,
        body: &Value,
    ) -> EcoResult<FootprintReport> {
        let input = FootprintInput::parse(body)?;

        let prompt = prompts::footprint_prompt(&input);
        let reply = self.model.complete(&prompt).await?;
        let payload = Value::Object(extract::extract_object(&reply)?);

        let footprint_kg = field_number(&payload, "footprint_kg")?;
        let analysis = field_str(&payload, "analysis")?;

        // Models occasionally wander out of the 0-100 band they were
        // asked for; the stored score stays clamped.
        let carbon_score = (field_number(&payload, "carbon_score")?.round() as i64)
            .clamp(0, MAX_CARBON_SCORE);

        let user = self
            .users
            .apply_footprint(id, name, &input, carbon_score)
            .await?;
        tracing::debug!(user_id = %user.id, carbon_score, "footprint scored and logged");

        Ok(FootprintReport {
            footprint_kg,
            carbon_score,
            analysis,
        })
    }

    /// Purely advisory; nothing is written. The prompt asks for a fixed
    /// number of actions but the reply is accepted at whatever length it
    /// arrives, since models routinely miscount.
    #[instrument(skip(self))]
    pub async fn coach_actions(&self, id: &UserId, name: &str) -> EcoResult<Vec<CoachAction>> {
        let user = self.users.bootstrap(id, name).await?;

        let prompt = prompts::coach_prompt(&user);
        let reply = self.model.complete(&prompt).await?;

        extract::extract_array(&reply)?
            .iter()
            .map(parse_coach_action)
            .collect()
    }

    /// The core state transition: award credits and re-derive the badge,
    /// atomically across the credit total and wallet balance.
    #[instrument(skip(self, body))]
    pub async fn confirm_action(
        &self,
        id: &UserId,
        name: &str,
        body: &Value,
    ) -> EcoResult<ConfirmReceipt> {
        let req = ConfirmRequest::parse(body)?;
        let outcome = self.users.award_credits(id, name, req.credits).await?;

        tracing::info!(
            user_id = %id,
            action = req.action,
            credits = req.credits,
            new_credits = outcome.new_credits,
            badge = %outcome.badge,
            "action confirmed"
        );

        Ok(ConfirmReceipt {
            success: true,
            new_credits: outcome.new_credits,
            badge: outcome.badge,
        })
    }

    /// Advisory investment picks over a bounded candidate slate. An empty
    /// catalog short-circuits without consulting the model.
    #[instrument(skip(self))]
    pub async fn auto_invest(
        &self,
        id: &UserId,
        name: &str,
    ) -> EcoResult<Vec<InvestRecommendation>> {
        let user = self.users.bootstrap(id, name).await?;
        let candidates = self.projects.invest_candidates(MAX_INVEST_CANDIDATES).await?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = prompts::invest_prompt(&user, &candidates);
        let reply = self.model.complete(&prompt).await?;

        extract::extract_array(&reply)?
            .iter()
            .map(parse_recommendation)
            .collect()
    }

    /// Free-form Q&A with the sustainability persona. Stateless; the
    /// model sees one question at a time.
    #[instrument(skip(self, body))]
    pub async fn assistant_reply(&self, body: &Value) -> EcoResult<String> {
        let message = require_str(body, "message").map_err(|_| WorkflowError::EmptyMessage)?;

        let prompt = prompts::assistant_prompt(&message);
        Ok(self.model.complete(&prompt).await?)
    }
}

fn parse_coach_action(item: &Value) -> EcoResult<CoachAction> {
    Ok(CoachAction {
        action: field_str(item, "action")?,
        carbon_saved: field_number(item, "carbon_saved")?,
        credits: field_number(item, "credits")?.round().max(0.0) as i64,
        motivation: field_str(item, "motivation")?,
    })
}

fn parse_recommendation(item: &Value) -> EcoResult<InvestRecommendation> {
    Ok(InvestRecommendation {
        project_type: field_str(item, "project_type")?,
        country: field_str(item, "country")?,
        credits_needed: field_number(item, "credits_needed")?.round() as i64,
        price_per_credit: field_number(item, "price_per_credit")?,
        reason: field_str(item, "reason")?,
    })
}

// Reply-payload readers. Deliberately laxer than request validation:
// numbers-as-strings and out-of-range values are the model's quirks to
// absorb, not a caller error to 400 on.
fn field_number(item: &Value, field: &'static str) -> EcoResult<f64> {
    let parsed = match item.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|n| n.is_finite())
        .ok_or(WorkflowError::PayloadField(field))
}

fn field_str(item: &Value, field: &'static str) -> EcoResult<String> {
    item.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(WorkflowError::PayloadField(field))
}
