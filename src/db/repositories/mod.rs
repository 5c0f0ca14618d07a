use async_trait::async_trait;
use sqlx::{Pool, Postgres, Result as SqlxResult, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::db::models::footprint::FootprintInput;
use crate::db::models::project::{DashboardSummary, EmissionRecord, OffsetProject};
use crate::db::models::user::{AwardOutcome, Badge, EcoUser, EcoUserRow, UserId, Wallet};

pub mod projects;
pub mod users;

pub struct Tx<'a> {
    inner: Option<Transaction<'a, Postgres>>,
}

impl<'a> Tx<'a> {
    /// Runs `f` inside a transaction, committing on `Ok` and dropping the
    /// transaction (an implicit rollback) on `Err`.
    #[instrument(skip(pool, f))]
    pub async fn with_tx<F, Fut, T>(pool: &'static Pool<Postgres>, f: F) -> SqlxResult<T>
    where
        F: FnOnce(Tx<'a>) -> Fut,
        Fut: Future<Output = (Tx<'a>, SqlxResult<T>)>,
    {
        let tx = Self::begin(pool).await?;
        let (mut tx, result) = f(tx).await;

        match result {
            Ok(val) => {
                tx.commit().await?;
                Ok(val)
            }
            Err(e) => {
                tracing::trace!(error = ?e, "transacted query failure");
                Err(e)
            }
        }
    }

    #[instrument(skip(pool))]
    pub async fn begin(pool: &'static Pool<Postgres>) -> SqlxResult<Self> {
        let inner = pool.begin().await?;
        Ok(Self { inner: Some(inner) })
    }

    #[instrument(skip(self))]
    pub async fn commit(&mut self) -> SqlxResult<()> {
        if let Some(tx) = self.inner.take() {
            tx.commit().await
        } else {
            Err(sqlx::Error::Protocol(
                "Transaction already completed".into(),
            ))
        }
    }

    #[instrument(skip(self))]
    pub async fn rollback(&mut self) -> SqlxResult<()> {
        if let Some(tx) = self.inner.take() {
            tx.rollback().await
        } else {
            Err(sqlx::Error::Protocol(
                "Transaction already completed".into(),
            ))
        }
    }

    fn inner_mut(&mut self) -> SqlxResult<&mut Transaction<'a, Postgres>> {
        self.inner
            .as_mut()
            .ok_or_else(|| sqlx::Error::Protocol("Transaction already completed".into()))
    }

    /// First contact creates the row; every later call leaves existing
    /// state untouched.
    #[instrument(skip(self, id, name))]
    pub async fn insert_user_if_absent(&mut self, id: &UserId, name: &str) -> SqlxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO eco_user (
                id,
                name,
                carbon_score,
                eco_credits,
                badge,
                created_at,
                updated_at
            )
            VALUES ($1, $2, 0, 0, $3, NOW(), NOW())
            ON CONFLICT (id)
            DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(Badge::Bronze.as_str())
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, id))]
    pub async fn insert_wallet_if_absent(&mut self, id: &UserId) -> SqlxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallet (
                user_id,
                balance,
                created_at,
                updated_at
            )
            VALUES ($1, 0, NOW(), NOW())
            ON CONFLICT (user_id)
            DO NOTHING
            "#,
        )
        .bind(id)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, id))]
    pub async fn fetch_user(&mut self, id: &UserId) -> SqlxResult<Option<EcoUser>> {
        let row = sqlx::query_as::<_, EcoUserRow>(&format!(
            "SELECT {} FROM eco_user WHERE id = $1",
            sql_fragment::USER_FIELDS
        ))
        .bind(id)
        .fetch_optional(&mut **self.inner_mut()?)
        .await?;

        Ok(row.map(EcoUserRow::into_user))
    }

    /// Stores the newly assessed carbon score and appends the
    /// questionnaire answers to the footprint log.
    #[instrument(skip(self, id, input))]
    pub async fn record_footprint(
        &mut self,
        id: &UserId,
        input: &FootprintInput,
        score: i64,
    ) -> SqlxResult<()> {
        sqlx::query(
            r#"
            UPDATE eco_user
            SET carbon_score = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(score)
        .execute(&mut **self.inner_mut()?)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO footprint_log (
                id,
                user_id,
                travel_km,
                electricity_kwh,
                diet,
                plastic,
                ac_hours,
                score,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .bind(input.travel_km)
        .bind(input.electricity_kwh)
        .bind(input.diet.as_str())
        .bind(input.plastic.as_str())
        .bind(input.ac_hours)
        .bind(score)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(())
    }

    /// Adds credits to the lifetime total and wallet balance as in-place
    /// increments, so concurrent awards serialize on the row lock instead
    /// of clobbering each other. The badge is derived from the total the
    /// increment returned.
    #[instrument(skip(self, id, credits))]
    pub async fn award_credits(&mut self, id: &UserId, credits: i64) -> SqlxResult<AwardOutcome> {
        let new_credits = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE eco_user
            SET eco_credits = eco_credits + $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING eco_credits
            "#,
        )
        .bind(id)
        .bind(credits)
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        let badge = Badge::for_credits(new_credits);

        sqlx::query(
            r#"
            UPDATE eco_user
            SET badge = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(badge.as_str())
        .execute(&mut **self.inner_mut()?)
        .await?;

        sqlx::query(
            r#"
            UPDATE wallet
            SET balance = balance + $2,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .bind(credits)
        .execute(&mut **self.inner_mut()?)
        .await?;

        Ok(AwardOutcome { new_credits, badge })
    }
}

pub mod sql_fragment {
    pub const USER_FIELDS: &str = r#"
        id,
        name,
        carbon_score,
        eco_credits,
        badge,
        created_at,
        updated_at
    "#;

    pub const WALLET_FIELDS: &str = r#"
        user_id,
        balance,
        created_at,
        updated_at
    "#;

    pub const EMISSION_FIELDS: &str = r#"
        id,
        country,
        code,
        year,
        co2_emission,
        population,
        area,
        percent_of_world,
        project_type,
        offset_status,
        credits_needed,
        price_per_credit,
        offset_cost
    "#;
}

/// Persistence seam for user, wallet and footprint state.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the user row and wallet on first contact; later calls
    /// return existing state untouched.
    async fn bootstrap(&self, id: &UserId, name: &str) -> SqlxResult<EcoUser>;

    #[allow(dead_code)]
    async fn fetch_wallet(&self, id: &UserId) -> SqlxResult<Option<Wallet>>;

    /// Replaces the carbon score and logs the questionnaire answers in a
    /// single transaction.
    async fn apply_footprint(
        &self,
        id: &UserId,
        name: &str,
        input: &FootprintInput,
        score: i64,
    ) -> SqlxResult<EcoUser>;

    /// Atomically increments the credit total and wallet balance,
    /// re-deriving the badge from the post-update total.
    async fn award_credits(&self, id: &UserId, name: &str, credits: i64)
    -> SqlxResult<AwardOutcome>;
}

/// Read-only access to the marketplace catalog.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// One page of emission records, heaviest emitter first.
    async fn emissions_ranked(&self, limit: i64, offset: i64) -> SqlxResult<Vec<EmissionRecord>>;

    /// Records with a project listing, shaped for the marketplace.
    async fn offset_projects(&self) -> SqlxResult<Vec<OffsetProject>>;

    async fn dashboard_summary(&self) -> SqlxResult<DashboardSummary>;

    /// A bounded slate of projects for the investment advisor, heaviest
    /// emitters first.
    async fn invest_candidates(&self, limit: i64) -> SqlxResult<Vec<OffsetProject>>;
}
