//! Offline estimate of the five disease risks from simple additive weights.
//! Used when the hosted model is unavailable or for local runs; it shares the
//! normalizer for everything downstream of the per-disease scores.

use crate::models::{
    DietType, DiseasePredictionInput, DiseasePredictionResult, DiseaseType, Environment,
    ExerciseLevel, RiskLevel, Sex, SingleDiseasePrediction, TickPrevention,
};
use crate::normalize;

const MAX_SCORE: f64 = 95.0;

pub fn estimate(input: &DiseasePredictionInput) -> DiseasePredictionResult {
    let predictions = DiseaseType::DISEASES
        .iter()
        .map(|disease| {
            let probability = score(*disease, input).min(MAX_SCORE);
            SingleDiseasePrediction {
                disease: *disease,
                probability,
                risk_level: risk_level(probability),
                is_positive: probability >= 50.0,
                key_indicators: normalize::key_indicators(*disease, input),
            }
        })
        .collect();

    normalize::assemble(predictions, input)
}

pub fn risk_level(probability: f64) -> RiskLevel {
    if probability >= 60.0 {
        RiskLevel::High
    } else if probability >= 30.0 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

fn score(disease: DiseaseType, input: &DiseasePredictionInput) -> f64 {
    let weight = |hit: bool, points: f64| if hit { points } else { 0.0 };
    let bcs = input.body_condition_score;
    let low_exercise = input.exercise_level == ExerciseLevel::Low;

    match disease {
        DiseaseType::TickBorne => {
            10.0 + weight(input.environment.is_rural(), 30.0)
                + weight(
                    matches!(input.environment, Environment::Mixed | Environment::Suburban),
                    15.0,
                )
                + match input.tick_prevention {
                    TickPrevention::None => 35.0,
                    TickPrevention::Irregular => 20.0,
                    TickPrevention::Regular => 0.0,
                }
                + weight(input.skin_lesions, 15.0)
                + weight(input.pale_gums, 10.0)
        }
        DiseaseType::Filariasis => {
            10.0 + weight(!input.heartworm_prevention, 40.0)
                + weight(input.environment.is_rural(), 20.0)
                + weight(
                    matches!(input.environment, Environment::Mixed | Environment::Suburban),
                    10.0,
                )
                + weight(input.pale_gums, 15.0)
        }
        DiseaseType::Diabetes => {
            let age = if input.age_years >= 10.0 {
                25.0
            } else if input.age_years >= 7.0 {
                15.0
            } else {
                0.0
            };
            let body = match bcs {
                8.. => 30.0,
                7 => 20.0,
                _ => 0.0,
            };
            5.0 + age + body + weight(input.polyuria, 25.0) + weight(low_exercise, 10.0)
        }
        DiseaseType::ObesityMetabolic => {
            let body = match bcs {
                9.. => 45.0,
                8 => 35.0,
                7 => 25.0,
                6 => 15.0,
                _ => 0.0,
            };
            5.0 + body + weight(low_exercise, 15.0) + weight(input.age_years >= 7.0, 10.0)
        }
        DiseaseType::Urolithiasis => {
            8.0 + weight(input.polyuria, 25.0)
                + weight(input.sex == Sex::Male, 15.0)
                + weight(input.diet_type != DietType::Commercial, 10.0)
                + weight(!input.is_neutered, 10.0)
        }
        DiseaseType::Healthy => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::tests::sample_input;

    #[test]
    fn scores_sample_pet() {
        let result = estimate(&sample_input());

        assert_eq!(result.predictions.len(), 6);
        let diabetes = result.prediction(DiseaseType::Diabetes).unwrap();
        // 5 + 15 (age 9) + 30 (bcs 8) + 25 (polyuria) + 10 (low exercise)
        assert_eq!(diabetes.probability, 85.0);
        assert_eq!(diabetes.risk_level, RiskLevel::High);

        let tick = result.prediction(DiseaseType::TickBorne).unwrap();
        assert_eq!(tick.probability, 60.0);

        assert_eq!(result.highest_risk_disease, Some(DiseaseType::Diabetes));
        assert!(result.has_risk);
        assert_eq!(result.prediction(DiseaseType::Healthy).unwrap().probability, 15.0);
    }

    #[test]
    fn scores_are_capped() {
        let mut input = sample_input();
        input.environment = Environment::Outdoor;
        input.tick_prevention = TickPrevention::None;
        input.skin_lesions = true;
        input.pale_gums = true;

        let result = estimate(&input);
        let tick = result.prediction(DiseaseType::TickBorne).unwrap();
        assert_eq!(tick.probability, MAX_SCORE);
        assert_eq!(result.prediction(DiseaseType::Healthy).unwrap().probability, 5.0);
    }
}
