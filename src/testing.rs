//! In-memory stand-ins for the store and completion backend, shared by
//! the workflow tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use sqlx::Result as SqlxResult;

use crate::ai::{AiError, AiResult, TextModel};
use crate::db::models::footprint::FootprintInput;
use crate::db::models::project::{DashboardSummary, EmissionRecord, OffsetProject};
use crate::db::models::user::{AwardOutcome, Badge, EcoUser, UserId, Wallet};
use crate::db::repositories::{ProjectStore, UserStore};

/// Replays a scripted list of completions in order and records every
/// prompt it was handed. An exhausted script yields `EmptyReply`.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<Vec<AiResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(replies: Vec<AiResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(reply: &str) -> Self {
        Self::replying(vec![Ok(reply.to_owned())])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> AiResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_owned());

        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(AiError::EmptyReply);
        }

        replies.remove(0)
    }
}

struct MemUserRecord {
    name: String,
    carbon_score: i64,
    eco_credits: i64,
    badge: Badge,
    balance: i64,
    footprints: Vec<(FootprintInput, i64)>,
}

impl MemUserRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            carbon_score: 0,
            eco_credits: 0,
            badge: Badge::Bronze,
            balance: 0,
            footprints: Vec::new(),
        }
    }

    fn snapshot(&self, id: &UserId) -> EcoUser {
        EcoUser {
            id: id.clone(),
            name: self.name.clone(),
            carbon_score: self.carbon_score,
            eco_credits: self.eco_credits,
            badge: self.badge,
        }
    }
}

/// User/wallet store backed by a mutex-guarded map. Awards mutate the
/// credit total, balance and badge inside one critical section, matching
/// the transactional behavior of the real store.
#[derive(Default)]
pub struct MemUsers {
    records: Mutex<HashMap<UserId, MemUserRecord>>,
    writes: AtomicUsize,
}

impl MemUsers {
    pub fn user_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn balance_of(&self, id: &UserId) -> Option<i64> {
        self.records.lock().unwrap().get(id).map(|r| r.balance)
    }

    pub fn footprints_of(&self, id: &UserId) -> Vec<(FootprintInput, i64)> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .map(|r| r.footprints.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserStore for MemUsers {
    async fn bootstrap(&self, id: &UserId, name: &str) -> SqlxResult<EcoUser> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(id.clone())
            .or_insert_with(|| MemUserRecord::new(name));

        Ok(record.snapshot(id))
    }

    async fn fetch_wallet(&self, id: &UserId) -> SqlxResult<Option<Wallet>> {
        let records = self.records.lock().unwrap();
        let now = Utc::now().naive_utc();

        Ok(records.get(id).map(|r| Wallet {
            user_id: id.clone(),
            balance: r.balance,
            created_at: now,
            updated_at: now,
        }))
    }

    async fn apply_footprint(
        &self,
        id: &UserId,
        name: &str,
        input: &FootprintInput,
        score: i64,
    ) -> SqlxResult<EcoUser> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(id.clone())
            .or_insert_with(|| MemUserRecord::new(name));

        record.carbon_score = score;
        record.footprints.push((input.clone(), score));
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(record.snapshot(id))
    }

    async fn award_credits(
        &self,
        id: &UserId,
        name: &str,
        credits: i64,
    ) -> SqlxResult<AwardOutcome> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(id.clone())
            .or_insert_with(|| MemUserRecord::new(name));

        record.eco_credits += credits;
        record.balance += credits;
        record.badge = Badge::for_credits(record.eco_credits);
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(AwardOutcome {
            new_credits: record.eco_credits,
            badge: record.badge,
        })
    }
}

/// Fixed catalog of marketplace rows.
#[derive(Default)]
pub struct MemProjects {
    pub emissions: Vec<EmissionRecord>,
}

impl MemProjects {
    pub fn with_projects(count: usize) -> Self {
        Self {
            emissions: (0..count)
                .map(|i| sample_emission(&format!("Country-{i}"), true))
                .collect(),
        }
    }
}

#[async_trait]
impl ProjectStore for MemProjects {
    async fn emissions_ranked(&self, limit: i64, offset: i64) -> SqlxResult<Vec<EmissionRecord>> {
        let mut rows = self.emissions.clone();
        rows.sort_by(|a, b| b.co2_emission.total_cmp(&a.co2_emission));

        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn offset_projects(&self) -> SqlxResult<Vec<OffsetProject>> {
        Ok(self
            .emissions
            .iter()
            .cloned()
            .filter_map(EmissionRecord::into_project)
            .collect())
    }

    async fn dashboard_summary(&self) -> SqlxResult<DashboardSummary> {
        Ok(DashboardSummary {
            total_emissions: self.emissions.iter().map(|r| r.co2_emission).sum(),
            total_offsets: self.emissions.iter().map(|r| r.credits_needed as f64).sum(),
            net_carbon: self.emissions.iter().map(|r| r.offset_cost).sum(),
        })
    }

    async fn invest_candidates(&self, limit: i64) -> SqlxResult<Vec<OffsetProject>> {
        let mut candidates: Vec<_> = self
            .emissions
            .iter()
            .cloned()
            .filter_map(EmissionRecord::into_project)
            .collect();

        candidates.sort_by(|a, b| b.co2_emission.total_cmp(&a.co2_emission));
        candidates.truncate(limit as usize);

        Ok(candidates)
    }
}

/// One synthetic emission row; `listed` controls whether it carries a
/// project and therefore shows up in the marketplace.
pub fn sample_emission(country: &str, listed: bool) -> EmissionRecord {
    let code: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(3)
        .map(char::from)
        .collect();

    let credits_needed = rand::random_range(100..=9000);

    EmissionRecord {
        id: rand::random_range(1..=500),
        country: country.to_owned(),
        code: code.to_uppercase(),
        year: 2022,
        co2_emission: rand::random_range(10..=12_000) as f64,
        population: rand::random_range(1..=1_400) * 1_000_000,
        area: rand::random_range(300..=17_000) as f64 * 1000.0,
        percent_of_world: rand::random_range(1..=300) as f64 / 10.0,
        project_type: listed.then(|| "Reforestation".to_owned()),
        offset_status: listed.then(|| "active".to_owned()),
        credits_needed,
        price_per_credit: rand::random_range(5..=25) as f64,
        offset_cost: credits_needed as f64 * 12.0,
    }
}
