use sqlx::{Pool, Postgres, Result as SqlxResult};
use tracing::instrument;

use super::sql_fragment;
use crate::db::{
    models::footprint::FootprintInput,
    models::user::{AwardOutcome, EcoUser, UserId, Wallet},
    prelude::Tx,
    repositories::UserStore,
};

#[derive(Debug)]
pub struct UserRepository {
    pool: &'static Pool<Postgres>,
}

impl UserRepository {
    #[instrument(skip(pool))]
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserStore for UserRepository {
    #[instrument(skip(self))]
    async fn bootstrap(&self, id: &UserId, name: &str) -> SqlxResult<EcoUser> {
        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                tx.insert_user_if_absent(id, name).await?;
                tx.insert_wallet_if_absent(id).await?;
                tx.fetch_user(id).await?.ok_or(sqlx::Error::RowNotFound)
            }
            .await;

            (tx, result)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn fetch_wallet(&self, id: &UserId) -> SqlxResult<Option<Wallet>> {
        sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {} FROM wallet WHERE user_id = $1",
            sql_fragment::WALLET_FIELDS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
    }

    #[instrument(skip(self, input))]
    async fn apply_footprint(
        &self,
        id: &UserId,
        name: &str,
        input: &FootprintInput,
        score: i64,
    ) -> SqlxResult<EcoUser> {
        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                tx.insert_user_if_absent(id, name).await?;
                tx.insert_wallet_if_absent(id).await?;
                tx.record_footprint(id, input, score).await?;
                tx.fetch_user(id).await?.ok_or(sqlx::Error::RowNotFound)
            }
            .await;

            (tx, result)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn award_credits(
        &self,
        id: &UserId,
        name: &str,
        credits: i64,
    ) -> SqlxResult<AwardOutcome> {
        Tx::with_tx(self.pool, |mut tx| async move {
            let result = async {
                tx.insert_user_if_absent(id, name).await?;
                tx.insert_wallet_if_absent(id).await?;
                tx.award_credits(id, credits).await
            }
            .await;

            (tx, result)
        })
        .await
    }
}
