//! Adapter for the HTML fragment the hosted model renders.
//!
//! The fragment is one card per condition:
//!
//! ```text
//! <div class="disease-card">
//!   <h3>🦠 Tick Borne Disease</h3>
//!   <span class="risk-badge">HIGH RISK</span>
//!   <p>Probability: 72.4%</p>
//! </div>
//! ```
//!
//! Everything here keys off those substrings. A change in the remote markup
//! means a change in this module and its fixtures, nowhere else.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PredictionError;
use crate::models::{DiseaseType, RiskLevel};
use crate::sse;

pub const BLOCK_DELIMITER: &str = r#"<div class="disease-card""#;

/// Below this many recognised conditions the payload is treated as garbage.
pub const MIN_CONDITIONS: usize = 2;

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h3[^>]*>(.*?)</h3>").expect("Invalid h3 regex"));

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

static BADGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(HIGH|MODERATE|MEDIUM|LOW)\s+RISK\b").expect("Invalid badge regex")
});

static PROBABILITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Probability:\s*(?:<[^>]*>\s*)*(\d{1,3}(?:\.\d+)?)\s*%")
        .expect("Invalid probability regex")
});

/// Display-name variants the remote service has been seen to emit, keyed by
/// their normalized form.
static DISEASE_ALIASES: LazyLock<HashMap<&'static str, DiseaseType>> = LazyLock::new(|| {
    HashMap::from([
        ("tick borne disease", DiseaseType::TickBorne),
        ("tickborne disease", DiseaseType::TickBorne),
        ("tick borne", DiseaseType::TickBorne),
        ("filariasis", DiseaseType::Filariasis),
        ("heartworm filariasis", DiseaseType::Filariasis),
        ("diabetes mellitus type 2", DiseaseType::Diabetes),
        ("diabetes mellitus type2", DiseaseType::Diabetes),
        ("diabetes mellitus type ii", DiseaseType::Diabetes),
        ("diabetes mellitus", DiseaseType::Diabetes),
        ("obesity related metabolic dysfunction", DiseaseType::ObesityMetabolic),
        ("obesity metabolic dysfunction", DiseaseType::ObesityMetabolic),
        ("obesity related metabolic", DiseaseType::ObesityMetabolic),
        ("urolithiasis", DiseaseType::Urolithiasis),
    ])
});

/// Raw values recovered for one condition card.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCondition {
    pub disease: DiseaseType,
    pub risk_level: RiskLevel,
    pub probability: f64,
}

/// Full adapter: SSE body in, per-condition records out.
pub fn parse_risk_result(sse_body: &str) -> Result<Vec<ParsedCondition>, PredictionError> {
    let html = sse::extract_html(sse_body)?;
    parse_conditions(&html)
}

pub fn parse_conditions(html: &str) -> Result<Vec<ParsedCondition>, PredictionError> {
    let mut conditions: Vec<ParsedCondition> = Vec::new();

    for block in html.split(BLOCK_DELIMITER) {
        let Some(name) = block_name(block) else {
            continue;
        };
        let Some(disease) = canonical_disease(&name) else {
            tracing::debug!(name = %name, "skipping unrecognised condition block");
            continue;
        };
        if conditions.iter().any(|c| c.disease == disease) {
            tracing::debug!(disease = %disease, "skipping duplicate condition block");
            continue;
        }

        conditions.push(ParsedCondition {
            disease,
            risk_level: block_risk_level(block),
            probability: block_probability(block),
        });
    }

    if conditions.len() < MIN_CONDITIONS {
        return Err(PredictionError::Parse(format!(
            "failed to parse disease predictions from model output ({} condition(s) recognised)",
            conditions.len()
        )));
    }

    Ok(conditions)
}

fn block_name(block: &str) -> Option<String> {
    let inner = NAME_REGEX.captures(block)?.get(1)?.as_str();
    let text = TAG_REGEX.replace_all(inner, " ");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lowercases, drops emoji and punctuation, and folds `-`/`_` into spaces.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '-' | '_' => ' ',
            c if c.is_ascii_alphanumeric() || c.is_whitespace() => c.to_ascii_lowercase(),
            _ => ' ',
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn canonical_disease(name: &str) -> Option<DiseaseType> {
    DISEASE_ALIASES.get(normalize_name(name).as_str()).copied()
}

fn block_risk_level(block: &str) -> RiskLevel {
    let Some(caps) = BADGE_REGEX.captures(block) else {
        return RiskLevel::Low;
    };
    match caps[1].to_ascii_uppercase().as_str() {
        "HIGH" => RiskLevel::High,
        "MODERATE" | "MEDIUM" => RiskLevel::Moderate,
        _ => RiskLevel::Low,
    }
}

fn block_probability(block: &str) -> f64 {
    PROBABILITY_REGEX
        .captures(block)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .map(|value| value.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}
