use std::sync::LazyLock;

use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::util::env;
use crate::util::env::Var;
use crate::var;

pub mod models;
pub mod repositories;

pub mod prelude {
    pub use crate::db::StoreError;
    pub use crate::db::{db_pool, ensure_schema};

    pub use crate::db::models::InputError;
    pub use crate::db::models::coach::{CoachAction, ConfirmReceipt, ConfirmRequest};
    pub use crate::db::models::footprint::{FootprintInput, FootprintReport};
    pub use crate::db::models::project::{
        DashboardSummary, EmissionRecord, InvestRecommendation, OffsetProject,
    };
    pub use crate::db::models::user::{AwardOutcome, Badge, EcoUser, UserId, Wallet};

    pub use crate::db::repositories::Tx;
    pub use crate::db::repositories::projects::ProjectRepository;
    pub use crate::db::repositories::users::UserRepository;
    pub use crate::db::repositories::{ProjectStore, UserStore};
}

static DB_POOL: LazyLock<OnceCell<Db>> = LazyLock::new(OnceCell::new);
pub async fn db_pool() -> StoreResult<&'static PgPool> {
    Ok(&DB_POOL
        .get_or_try_init(|| async { Db::new_pool().await })
        .await?
        .pool)
}

/// Applies `schema.sql` on boot. Every statement in it is idempotent, so
/// running against an already-provisioned database is a no-op.
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(include_str!("../../schema.sql"))
        .execute(pool)
        .await?;

    Ok(())
}

struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn new_pool() -> StoreResult<Self> {
        let db_url = var!(Var::DatabaseUrl).await?;
        let pool = sqlx::PgPool::connect(db_url).await?;

        Ok(Self { pool })
    }
}

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error("{0}")]
    EnvError(#[from] env::EnvErr),
}
