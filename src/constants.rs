pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 10;

pub const SERVER_PORT: u16 = 5001;

pub const MAX_CARBON_SCORE: i64 = 100;
pub const COACH_ACTION_COUNT: usize = 3;
pub const INVEST_PICK_COUNT: usize = 2;

// Prompts embed the candidate catalog inline, so the list handed to the
// model has to stay bounded.
pub const MAX_INVEST_CANDIDATES: i64 = 12;

// Free-tier Gemini allows roughly ten requests a minute; the limiter
// smooths bursts instead of letting them burn quota.
pub const GEMINI_BURST: usize = 8;
pub const GEMINI_REFILL_INTERVAL_SECS: u64 = 6;

pub const QUOTA_EXCEEDED_MSG: &str =
    "Quota exceeded. Please wait a minute before asking another question.";
pub const MODEL_NOT_FOUND_MSG: &str =
    "AI model not found. Retrying with alternative configuration...";
pub const AI_UNAVAILABLE_MSG: &str = "AI assistant is temporarily unavailable";
pub const AI_FORMAT_MSG: &str =
    "AI returned a response in an unexpected format. Please try again.";
