use std::collections::HashSet;

use chrono::Utc;

use crate::html::ParsedCondition;
use crate::models::{
    AgeGroup, DietType, DiseasePredictionInput, DiseasePredictionResult, DiseaseType,
    ExerciseLevel, PetProfile, RiskLevel, Sex, SingleDiseasePrediction, TickPrevention,
    WeightStatus,
};

pub const MIN_HEALTHY_PROBABILITY: f64 = 5.0;

const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "Continue current preventive care routine",
    "Maintain regular veterinary checkups",
    "Keep up the healthy lifestyle",
];

/// Builds the typed result from the conditions recovered out of the model
/// output. Diseases the model did not report are left out.
pub fn normalize(
    conditions: &[ParsedCondition],
    input: &DiseasePredictionInput,
) -> DiseasePredictionResult {
    let predictions = DiseaseType::DISEASES
        .iter()
        .filter_map(|disease| conditions.iter().find(|c| c.disease == *disease))
        .map(|condition| SingleDiseasePrediction {
            disease: condition.disease,
            probability: condition.probability,
            risk_level: condition.risk_level,
            is_positive: is_positive(condition.risk_level, condition.probability),
            key_indicators: key_indicators(condition.disease, input),
        })
        .collect();

    assemble(predictions, input)
}

/// Completes a set of per-disease predictions (in encounter order) with the
/// Healthy entry, summary flags, profile and recommendations.
pub fn assemble(
    mut predictions: Vec<SingleDiseasePrediction>,
    input: &DiseasePredictionInput,
) -> DiseasePredictionResult {
    predictions.retain(|p| !p.disease.is_healthy());

    let has_risk = predictions.iter().any(|p| p.is_positive);

    let mut highest: Option<(DiseaseType, f64)> = None;
    for prediction in &predictions {
        let current = highest.map(|(_, probability)| probability).unwrap_or(0.0);
        if prediction.probability > current {
            highest = Some((prediction.disease, prediction.probability));
        }
    }
    let max_probability = highest.map(|(_, probability)| probability).unwrap_or(0.0);

    predictions.push(healthy_prediction(max_probability, input));

    let recommendations = recommendations(&predictions, input);
    predictions.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    DiseasePredictionResult {
        has_risk,
        highest_risk_disease: highest.map(|(disease, _)| disease),
        predictions,
        recommendations,
        pet_profile: profile(input),
        analyzed_at: Utc::now(),
    }
}

pub fn is_positive(risk_level: RiskLevel, probability: f64) -> bool {
    match risk_level {
        RiskLevel::High => true,
        RiskLevel::Moderate => probability >= 50.0,
        RiskLevel::Low => false,
    }
}

pub fn healthy_probability(max_disease_probability: f64) -> f64 {
    (100.0 - max_disease_probability).max(MIN_HEALTHY_PROBABILITY)
}

/// Risk level for the Healthy entry reads as confidence in health, so the
/// polarity is inverted relative to the diseases.
pub fn healthy_risk_level(probability: f64) -> RiskLevel {
    if probability >= 60.0 {
        RiskLevel::Low
    } else if probability >= 30.0 {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

fn healthy_prediction(max_disease_probability: f64, input: &DiseasePredictionInput) -> SingleDiseasePrediction {
    let probability = healthy_probability(max_disease_probability);
    SingleDiseasePrediction {
        disease: DiseaseType::Healthy,
        probability,
        risk_level: healthy_risk_level(probability),
        is_positive: probability >= 50.0,
        key_indicators: key_indicators(DiseaseType::Healthy, input),
    }
}

pub fn profile(input: &DiseasePredictionInput) -> PetProfile {
    PetProfile {
        age_group: age_group(input.age_years),
        weight_status: weight_status(input.body_condition_score),
        risk_factors_count: count_risk_factors(input),
    }
}

pub fn age_group(age_years: f64) -> AgeGroup {
    if age_years <= 2.0 {
        AgeGroup::Puppy
    } else if age_years <= 7.0 {
        AgeGroup::Adult
    } else if age_years <= 11.0 {
        AgeGroup::Senior
    } else {
        AgeGroup::Geriatric
    }
}

pub fn weight_status(body_condition_score: u8) -> WeightStatus {
    match body_condition_score {
        0..=3 => WeightStatus::Underweight,
        4..=5 => WeightStatus::Ideal,
        6..=7 => WeightStatus::Overweight,
        _ => WeightStatus::Obese,
    }
}

pub fn count_risk_factors(input: &DiseasePredictionInput) -> u32 {
    let checks = [
        input.age_years >= 8.0,
        input.body_condition_score <= 3 || input.body_condition_score >= 7,
        input.pale_gums,
        input.skin_lesions,
        input.polyuria,
        input.tick_prevention != TickPrevention::Regular,
        !input.heartworm_prevention,
        input.exercise_level == ExerciseLevel::Low,
        input.environment.is_rural(),
    ];
    checks.iter().filter(|hit| **hit).count() as u32
}

pub fn key_indicators(disease: DiseaseType, input: &DiseasePredictionInput) -> Vec<String> {
    let outdoor = input.environment.has_outdoor_exposure();
    let candidates: Vec<(bool, &str)> = match disease {
        DiseaseType::TickBorne => vec![
            (outdoor, "Outdoor environment exposure"),
            (
                input.tick_prevention != TickPrevention::Regular,
                "Inadequate tick prevention",
            ),
            (input.skin_lesions, "Presence of skin lesions"),
            (input.pale_gums, "Pale gums (possible anemia)"),
        ],
        DiseaseType::Filariasis => vec![
            (!input.heartworm_prevention, "No heartworm prevention"),
            (outdoor, "Outdoor exposure"),
            (input.pale_gums, "Pale gums"),
        ],
        DiseaseType::Diabetes => vec![
            (input.age_years >= 7.0, "Senior/geriatric age"),
            (input.body_condition_score >= 7, "Overweight/obese"),
            (input.polyuria, "Excessive urination"),
            (input.exercise_level == ExerciseLevel::Low, "Low activity level"),
        ],
        DiseaseType::ObesityMetabolic => vec![
            (input.body_condition_score >= 6, "Above ideal body condition"),
            (input.exercise_level == ExerciseLevel::Low, "Low exercise level"),
            (
                matches!(input.diet_type, DietType::Mixed | DietType::Homemade),
                "Diet type consideration",
            ),
        ],
        DiseaseType::Urolithiasis => vec![
            (input.polyuria, "Urinary symptoms"),
            (input.diet_type != DietType::Commercial, "Non-commercial diet"),
            (input.sex == Sex::Male, "Male sex (higher risk)"),
        ],
        DiseaseType::Healthy => vec![
            (
                (4..=5).contains(&input.body_condition_score),
                "Ideal body condition",
            ),
            (
                input.tick_prevention == TickPrevention::Regular && input.heartworm_prevention,
                "Good preventive care",
            ),
            (input.exercise_level != ExerciseLevel::Low, "Active lifestyle"),
        ],
    };

    candidates
        .into_iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, text)| text.to_string())
        .collect()
}

fn disease_advice(disease: DiseaseType, input: &DiseasePredictionInput) -> Vec<&'static str> {
    match disease {
        DiseaseType::TickBorne => {
            let mut advice = vec!["Request tick-borne disease panel blood test"];
            if input.tick_prevention != TickPrevention::Regular {
                advice.push("Start regular tick prevention treatment");
            }
            advice
        }
        DiseaseType::Filariasis => {
            let mut advice = vec!["Request heartworm antigen test"];
            if !input.heartworm_prevention {
                advice.push("Begin heartworm prevention medication");
            }
            advice
        }
        DiseaseType::Diabetes => vec![
            "Request blood glucose and fructosamine tests",
            "Monitor water intake and urination patterns",
        ],
        DiseaseType::ObesityMetabolic => vec![
            "Implement a weight management program",
            "Increase daily exercise gradually",
        ],
        DiseaseType::Urolithiasis => vec![
            "Encourage increased water intake",
            "Request urinalysis and possibly imaging",
        ],
        DiseaseType::Healthy => Vec::new(),
    }
}

pub fn recommendations(
    predictions: &[SingleDiseasePrediction],
    input: &DiseasePredictionInput,
) -> Vec<String> {
    let mut triggered: Vec<&'static str> = Vec::new();

    let any_high = predictions
        .iter()
        .any(|p| !p.disease.is_healthy() && p.risk_level == RiskLevel::High);
    if any_high {
        triggered.push("Schedule an immediate veterinary consultation for comprehensive examination");
    }

    for prediction in predictions.iter().filter(|p| !p.disease.is_healthy()) {
        if prediction.risk_level == RiskLevel::High || prediction.is_positive {
            triggered.extend(disease_advice(prediction.disease, input));
        }
    }

    if input.body_condition_score >= 6 {
        triggered.push("Consider adjusting diet portions and quality");
    }
    if input.exercise_level == ExerciseLevel::Low {
        triggered.push("Gradually increase daily physical activity");
    }
    if input.age_years >= 7.0 {
        triggered.push("Schedule more frequent senior wellness checkups");
    }

    if triggered.is_empty() {
        triggered.extend(FALLBACK_RECOMMENDATIONS);
    }

    let mut seen = HashSet::new();
    triggered
        .into_iter()
        .filter(|text| seen.insert(*text))
        .map(str::to_string)
        .collect()
}
