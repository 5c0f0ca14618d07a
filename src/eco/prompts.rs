//! Prompt construction for every model-backed operation.
//!
//! Each prompt spells out the exact JSON shape it wants back. Replies
//! still go through the tolerant extractor, since models decorate their
//! output with fences and prose regardless of instructions.

use crate::constants::{COACH_ACTION_COUNT, INVEST_PICK_COUNT};
use crate::db::models::footprint::FootprintInput;
use crate::db::models::project::OffsetProject;
use crate::db::models::user::EcoUser;

pub fn assistant_prompt(message: &str) -> String {
    format!(
        "\nYou are EcoRoute, a sustainability assistant for a carbon offset platform.\n\
         Answer clearly, briefly, and in beginner-friendly language.\n\
         Focus only on sustainability, emissions, and carbon offset topics.\n\
         \n\
         User question: {message}\n"
    )
}

pub fn footprint_prompt(input: &FootprintInput) -> String {
    format!(
        "You are a carbon footprint analyst. A user reports their monthly habits:\n\
         - travel: {travel} km\n\
         - electricity: {electricity} kWh\n\
         - diet: {diet}\n\
         - plastic use: {plastic}\n\
         - air conditioning: {ac} hours per day\n\
         \n\
         Estimate their monthly carbon footprint. Respond with strictly a JSON object \
         and no other text:\n\
         {{\"footprint_kg\": <number>, \"carbon_score\": <integer 0-100, higher is more \
         sustainable>, \"analysis\": \"<2-3 sentence summary>\"}}",
        travel = input.travel_km,
        electricity = input.electricity_kwh,
        diet = input.diet.as_str(),
        plastic = input.plastic.as_str(),
        ac = input.ac_hours,
    )
}

pub fn coach_prompt(user: &EcoUser) -> String {
    format!(
        "You are a sustainability coach. The user has a carbon score of {score}/100 \
         (higher is more sustainable) and has earned {credits} eco-credits so far.\n\
         Suggest exactly {count} actions they could take this week, calibrated to that \
         score. Respond with strictly a JSON array and no other text, where each entry \
         is:\n\
         {{\"action\": \"<short imperative>\", \"carbon_saved\": <kg CO2 saved, number>, \
         \"credits\": <integer 5-50>, \"motivation\": \"<one encouraging sentence>\"}}",
        score = user.carbon_score,
        credits = user.eco_credits,
        count = COACH_ACTION_COUNT,
    )
}

pub fn invest_prompt(user: &EcoUser, candidates: &[OffsetProject]) -> String {
    let catalog = candidates
        .iter()
        .map(|p| {
            serde_json::json!({
                "project_type": p.project_type,
                "country": p.country,
                "credits_needed": p.credits_needed,
                "price_per_credit": p.price_per_credit,
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an impact advisor for a carbon offset marketplace. The user has a \
         carbon score of {score}/100 and {credits} eco-credits.\n\
         Candidate projects, one JSON object per line:\n\
         {catalog}\n\
         \n\
         Pick exactly {count} projects worth backing first. Respond with strictly a \
         JSON array and no other text, where each entry copies the chosen project's \
         \"project_type\", \"country\", \"credits_needed\" and \"price_per_credit\" \
         fields and adds \"reason\": \"<one sentence on why this project>\".",
        score = user.carbon_score,
        credits = user.eco_credits,
        count = INVEST_PICK_COUNT,
    )
}
