use serde::Serialize;
use serde_json::Value;

use super::{InputError, require_number, require_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diet {
    Veg,
    NonVeg,
    Vegan,
    Pescatarian,
}

impl Diet {
    pub const ALLOWED: &'static str = "veg, non-veg, vegan, pescatarian";

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "veg" => Some(Diet::Veg),
            "non-veg" => Some(Diet::NonVeg),
            "vegan" => Some(Diet::Vegan),
            "pescatarian" => Some(Diet::Pescatarian),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Diet::Veg => "veg",
            Diet::NonVeg => "non-veg",
            Diet::Vegan => "vegan",
            Diet::Pescatarian => "pescatarian",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlasticUse {
    Low,
    Medium,
    High,
}

impl PlasticUse {
    pub const ALLOWED: &'static str = "low, medium, high";

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(PlasticUse::Low),
            "medium" => Some(PlasticUse::Medium),
            "high" => Some(PlasticUse::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlasticUse::Low => "low",
            PlasticUse::Medium => "medium",
            PlasticUse::High => "high",
        }
    }
}

/// Validated monthly-habit answers from the footprint questionnaire.
#[derive(Debug, Clone)]
pub struct FootprintInput {
    pub travel_km: f64,
    pub electricity_kwh: f64,
    pub diet: Diet,
    pub plastic: PlasticUse,
    pub ac_hours: f64,
}

impl FootprintInput {
    pub fn parse(body: &Value) -> Result<Self, InputError> {
        let travel_km = require_number(body, "travel")?;
        let electricity_kwh = require_number(body, "electricity")?;
        let ac_hours = require_number(body, "ac")?;

        let diet_label = require_str(body, "diet")?;
        let diet = Diet::parse(&diet_label).ok_or(InputError::InvalidChoice {
            field: "diet",
            allowed: Diet::ALLOWED,
        })?;

        let plastic_label = require_str(body, "plastic")?;
        let plastic = PlasticUse::parse(&plastic_label).ok_or(InputError::InvalidChoice {
            field: "plastic",
            allowed: PlasticUse::ALLOWED,
        })?;

        Ok(Self {
            travel_km,
            electricity_kwh,
            diet,
            plastic,
            ac_hours,
        })
    }
}

/// Assistant-produced footprint summary returned to the client verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct FootprintReport {
    pub footprint_kg: f64,
    pub carbon_score: i64,
    pub analysis: String,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn full_body() -> Value {
        json!({
            "travel": 120,
            "electricity": "250",
            "diet": "non-veg",
            "plastic": "medium",
            "ac": 4.5,
        })
    }

    #[test]
    fn parses_mixed_numeric_representations() {
        let input = FootprintInput::parse(&full_body()).unwrap();

        assert_eq!(input.travel_km, 120.0);
        assert_eq!(input.electricity_kwh, 250.0);
        assert_eq!(input.diet, Diet::NonVeg);
        assert_eq!(input.plastic, PlasticUse::Medium);
        assert_eq!(input.ac_hours, 4.5);
    }

    #[test]
    fn unknown_diet_is_rejected() {
        let mut body = full_body();
        body["diet"] = json!("carnivore");

        let err = FootprintInput::parse(&body).unwrap_err();
        assert!(matches!(err, InputError::InvalidChoice { field: "diet", .. }));
    }

    #[test]
    fn unknown_plastic_band_is_rejected() {
        let mut body = full_body();
        body["plastic"] = json!("extreme");

        let err = FootprintInput::parse(&body).unwrap_err();
        assert!(matches!(
            err,
            InputError::InvalidChoice { field: "plastic", .. }
        ));
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let mut body = full_body();
        body.as_object_mut().unwrap().remove("electricity");

        let err = FootprintInput::parse(&body).unwrap_err();
        assert_eq!(err, InputError::MissingField("electricity"));
    }

    #[test]
    fn diet_labels_tolerate_case_and_padding() {
        assert_eq!(Diet::parse(" Vegan "), Some(Diet::Vegan));
        assert_eq!(PlasticUse::parse("LOW"), Some(PlasticUse::Low));
    }
}
