use serde::{Deserialize, Serialize};

/// Base country_emissions table model
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmissionRecord {
    pub id: i64,
    pub country: String,
    pub code: String,
    pub year: i64,
    pub co2_emission: f64,
    pub population: i64,
    pub area: f64,
    pub percent_of_world: f64,
    pub project_type: Option<String>,
    pub offset_status: Option<String>,
    pub credits_needed: i64,
    pub price_per_credit: f64,
    pub offset_cost: f64,
}

impl EmissionRecord {
    /// Rows without a project listing are emissions-only entries and never
    /// surface in the marketplace.
    pub fn into_project(self) -> Option<OffsetProject> {
        let project_type = self.project_type?;

        Some(OffsetProject {
            id: self.id,
            country: self.country,
            code: self.code,
            year: self.year,
            project_type,
            status: self.offset_status,
            co2_emission: self.co2_emission,
            credits_needed: self.credits_needed,
            price_per_credit: self.price_per_credit,
            offset_cost: self.offset_cost,
            population: self.population,
            area: self.area,
            percent_of_world: self.percent_of_world,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetProject {
    pub id: i64,
    pub country: String,
    pub code: String,
    pub year: i64,
    pub project_type: String,
    pub status: Option<String>,
    pub co2_emission: f64,
    pub credits_needed: i64,
    pub price_per_credit: f64,
    pub offset_cost: f64,
    pub population: i64,
    pub area: f64,
    pub percent_of_world: f64,
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_emissions: f64,
    pub total_offsets: f64,
    pub net_carbon: f64,
}

/// One pick from the investment advisor, priced from the catalog row it
/// references.
#[derive(Debug, Clone, Serialize)]
pub struct InvestRecommendation {
    pub project_type: String,
    pub country: String,
    pub credits_needed: i64,
    pub price_per_credit: f64,
    pub reason: String,
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(project_type: Option<&str>) -> EmissionRecord {
        EmissionRecord {
            id: 7,
            country: "Germany".to_owned(),
            code: "DEU".to_owned(),
            year: 2022,
            co2_emission: 665.88,
            population: 83_800_000,
            area: 357_588.0,
            percent_of_world: 1.8,
            project_type: project_type.map(str::to_owned),
            offset_status: Some("active".to_owned()),
            credits_needed: 1900,
            price_per_credit: 21.5,
            offset_cost: 40_850.0,
        }
    }

    #[test]
    fn emissions_only_rows_are_not_projects() {
        assert!(record(None).into_project().is_none());
    }

    #[test]
    fn project_rows_rename_offset_status() {
        let project = record(Some("Methane Capture")).into_project().unwrap();
        let json = serde_json::to_value(&project).unwrap();

        assert_eq!(json["project_type"], "Methane Capture");
        assert_eq!(json["status"], "active");
        assert!(json.get("offset_status").is_none());
    }

    #[test]
    fn dashboard_summary_uses_camel_case_keys() {
        let summary = DashboardSummary {
            total_emissions: 25_211.48,
            total_offsets: 39_990.0,
            net_carbon: 482_356.0,
        };
        let json = serde_json::to_value(summary).unwrap();

        assert_eq!(json["totalEmissions"], 25_211.48);
        assert_eq!(json["totalOffsets"], 39_990.0);
        assert_eq!(json["netCarbon"], 482_356.0);
    }
}
