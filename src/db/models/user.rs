use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const SILVER_AFTER: i64 = 100;
pub const GOLD_AFTER: i64 = 300;
pub const PLATINUM_AFTER: i64 = 700;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub String);

/// Reward tier derived from the lifetime credit total. Tiers unlock
/// strictly above each threshold, so a balance of exactly 100 is still
/// Bronze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Badge {
    pub fn for_credits(credits: i64) -> Self {
        match credits {
            c if c > PLATINUM_AFTER => Badge::Platinum,
            c if c > GOLD_AFTER => Badge::Gold,
            c if c > SILVER_AFTER => Badge::Silver,
            _ => Badge::Bronze,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Badge::Bronze => "Bronze",
            Badge::Silver => "Silver",
            Badge::Gold => "Gold",
            Badge::Platinum => "Platinum",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Bronze" => Some(Badge::Bronze),
            "Silver" => Some(Badge::Silver),
            "Gold" => Some(Badge::Gold),
            "Platinum" => Some(Badge::Platinum),
            _ => None,
        }
    }
}

/// Base eco_user table model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EcoUserRow {
    pub id: UserId,
    pub name: String,
    pub carbon_score: i64,
    pub eco_credits: i64,
    pub badge: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl EcoUserRow {
    pub fn into_user(self) -> EcoUser {
        // A badge column that no longer parses falls back to the tier the
        // credit total implies.
        let badge = Badge::from_label(&self.badge)
            .unwrap_or_else(|| Badge::for_credits(self.eco_credits));

        EcoUser {
            id: self.id,
            name: self.name,
            carbon_score: self.carbon_score,
            eco_credits: self.eco_credits,
            badge,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcoUser {
    pub id: UserId,
    pub name: String,
    pub carbon_score: i64,
    pub eco_credits: i64,
    pub badge: Badge,
}

/// Base wallet table model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// State visible to the caller once a credit award has landed.
#[derive(Debug, Clone, Copy)]
pub struct AwardOutcome {
    pub new_credits: i64,
    pub badge: Badge,
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        UserId(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
