use sqlx::{Pool, Postgres, Result as SqlxResult};
use tracing::instrument;

use super::sql_fragment;
use crate::db::{
    models::project::{DashboardSummary, EmissionRecord, OffsetProject},
    repositories::ProjectStore,
};

#[derive(Debug)]
pub struct ProjectRepository {
    pool: &'static Pool<Postgres>,
}

impl ProjectRepository {
    #[instrument(skip(pool))]
    pub fn new(pool: &'static Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProjectStore for ProjectRepository {
    #[instrument(skip(self))]
    async fn emissions_ranked(&self, limit: i64, offset: i64) -> SqlxResult<Vec<EmissionRecord>> {
        sqlx::query_as::<_, EmissionRecord>(&format!(
            "SELECT {} FROM country_emissions ORDER BY co2_emission DESC LIMIT $1 OFFSET $2",
            sql_fragment::EMISSION_FIELDS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await
    }

    #[instrument(skip(self))]
    async fn offset_projects(&self) -> SqlxResult<Vec<OffsetProject>> {
        let rows = sqlx::query_as::<_, EmissionRecord>(&format!(
            "SELECT {} FROM country_emissions WHERE project_type IS NOT NULL ORDER BY id",
            sql_fragment::EMISSION_FIELDS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(EmissionRecord::into_project)
            .collect())
    }

    #[instrument(skip(self))]
    async fn dashboard_summary(&self) -> SqlxResult<DashboardSummary> {
        // SUM over BIGINT yields NUMERIC, which does not decode to f64;
        // the casts normalize all three aggregates.
        sqlx::query_as::<_, DashboardSummary>(
            r#"
            SELECT
                COALESCE(SUM(co2_emission), 0)::DOUBLE PRECISION AS total_emissions,
                COALESCE(SUM(credits_needed), 0)::DOUBLE PRECISION AS total_offsets,
                COALESCE(SUM(offset_cost), 0)::DOUBLE PRECISION AS net_carbon
            FROM country_emissions
            "#,
        )
        .fetch_one(self.pool)
        .await
    }

    #[instrument(skip(self))]
    async fn invest_candidates(&self, limit: i64) -> SqlxResult<Vec<OffsetProject>> {
        let rows = sqlx::query_as::<_, EmissionRecord>(&format!(
            r#"
            SELECT {}
            FROM country_emissions
            WHERE project_type IS NOT NULL
            ORDER BY co2_emission DESC
            LIMIT $1
            "#,
            sql_fragment::EMISSION_FIELDS
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(EmissionRecord::into_project)
            .collect())
    }
}
