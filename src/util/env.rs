//! Process environment access.
//!
//! Variables are read once (after loading a `.env` file when present) and
//! cached for the lifetime of the process. Everything except `DATABASE_URL`
//! and `GEMINI_API_KEY` carries a default, so those two alone are enough to
//! boot a local instance.

use std::collections::HashMap;
use std::sync::LazyLock;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::constants::{DEFAULT_GEMINI_MODEL, GEMINI_API_URL};

static ENV_VARS: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);
pub async fn get_var(var: Var) -> EnvResult<&'static str> {
    let vars = ENV_VARS.get_or_try_init(|| async { Env::new() }).await?;
    Ok(match var {
        Var::DatabaseUrl => &vars.database_url,
        Var::GeminiApiKey => &vars.gemini_api_key,
        Var::GeminiModel => &vars.gemini_model,
        Var::GeminiApiBase => &vars.gemini_api_base,
        Var::GeminiTimeoutSecs => &vars.gemini_timeout_secs,
        Var::ServerApiPort => &vars.server_api_port,
        Var::CorsAllowOrigins => &vars.cors_allow_origins,
        Var::SimUserId => &vars.sim_user_id,
        Var::SimUserName => &vars.sim_user_name,
        Var::OtelExporterEndpoint => &vars.otel_exporter_otlp_endpoint,
        Var::ApiServiceName => &vars.api_service_name,
        Var::ApiTracerName => &vars.api_tracer_name,
    })
}

#[derive(Debug, Clone)]
pub struct Env {
    pub database_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub gemini_timeout_secs: String,
    pub server_api_port: String,
    pub cors_allow_origins: String,
    pub sim_user_id: String,
    pub sim_user_name: String,
    pub otel_exporter_otlp_endpoint: String,
    pub api_service_name: String,
    pub api_tracer_name: String,
}

impl Env {
    pub fn new() -> EnvResult<Self> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(EnvErr::Dotenvy(e)),
        }

        Self::from_iter(std::env::vars())
    }

    pub fn from_iter<Iter>(iter: Iter) -> EnvResult<Self>
    where
        Iter: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = iter.into_iter().collect();

        Ok(Self {
            database_url: required(&vars, "DATABASE_URL")?,
            gemini_api_key: required(&vars, "GEMINI_API_KEY")?,
            gemini_model: defaulted(&vars, "GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_api_base: defaulted(&vars, "GEMINI_API_BASE", GEMINI_API_URL),
            gemini_timeout_secs: defaulted(&vars, "GEMINI_TIMEOUT_SECS", "10"),
            server_api_port: defaulted(&vars, "SERVER_API_PORT", "5001"),
            cors_allow_origins: defaulted(&vars, "CORS_ALLOW_ORIGINS", "*"),
            sim_user_id: defaulted(&vars, "SIM_USER_ID", "eco-warrior"),
            sim_user_name: defaulted(&vars, "SIM_USER_NAME", "Eco Warrior"),
            otel_exporter_otlp_endpoint: defaulted(&vars, "OTEL_EXPORTER_OTLP_ENDPOINT", ""),
            api_service_name: defaulted(&vars, "API_SERVICE_NAME", "ecoroute-server"),
            api_tracer_name: defaulted(&vars, "API_TRACER_NAME", "ecoroute-api"),
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> EnvResult<String> {
    match vars.get(key) {
        Some(val) if !val.trim().is_empty() => Ok(val.clone()),
        _ => Err(EnvErr::MissingValue(key.to_owned())),
    }
}

fn defaulted(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    match vars.get(key) {
        Some(val) if !val.trim().is_empty() => val.clone(),
        _ => default.to_owned(),
    }
}

#[derive(Debug)]
pub enum Var {
    DatabaseUrl,
    GeminiApiKey,
    GeminiModel,
    GeminiApiBase,
    GeminiTimeoutSecs,
    ServerApiPort,
    CorsAllowOrigins,
    SimUserId,
    SimUserName,
    OtelExporterEndpoint,
    ApiServiceName,
    ApiTracerName,
}

#[macro_export]
macro_rules! var {
    ($ev:expr) => {
        $crate::util::env::get_var($ev)
    };
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error(transparent)]
    Dotenvy(#[from] dotenvy::Error),

    #[error("missing environment variable '{0}'")]
    MissingValue(String),
}

#[cfg(test)]
mod test {
    use super::*;

    fn base_vars() -> Vec<(String, String)> {
        vec![
            ("DATABASE_URL".into(), "postgres://localhost/eco".into()),
            ("GEMINI_API_KEY".into(), "test-key".into()),
        ]
    }

    #[test]
    fn defaults_fill_optional_vars() {
        let env = Env::from_iter(base_vars()).unwrap();

        assert_eq!(env.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(env.gemini_api_base, GEMINI_API_URL);
        assert_eq!(env.server_api_port, "5001");
        assert_eq!(env.cors_allow_origins, "*");
        assert_eq!(env.sim_user_id, "eco-warrior");
        assert_eq!(env.otel_exporter_otlp_endpoint, "");
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let mut vars = base_vars();
        vars.push(("GEMINI_MODEL".into(), "gemini-2.0-pro".into()));
        vars.push(("SERVER_API_PORT".into(), "8080".into()));

        let env = Env::from_iter(vars).unwrap();
        assert_eq!(env.gemini_model, "gemini-2.0-pro");
        assert_eq!(env.server_api_port, "8080");
    }

    #[test]
    fn missing_required_var_errors() {
        let vars = vec![("DATABASE_URL".into(), "postgres://localhost/eco".into())];
        let err = Env::from_iter(vars).unwrap_err();

        assert!(matches!(err, EnvErr::MissingValue(ref key) if key == "GEMINI_API_KEY"));
    }

    #[test]
    fn blank_value_is_treated_as_missing() {
        let mut vars = base_vars();
        vars.push(("GEMINI_MODEL".into(), "   ".into()));

        let env = Env::from_iter(vars).unwrap();
        assert_eq!(env.gemini_model, DEFAULT_GEMINI_MODEL);
    }
}
