//! Translates a [`DiseasePredictionInput`] into the positional argument list
//! the hosted `predict_diseases` endpoint expects.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::PredictionError;
use crate::models::{DiseasePredictionInput, TickPrevention};

/// Positional parameter names, in the order the remote function declares them.
pub const PARAMETER_NAMES: [&str; 13] = [
    "Age",
    "Breed_Size",
    "Sex",
    "Neutered_Status",
    "Body_Condition_Score",
    "Pale_Gums",
    "Skin_Lesions",
    "Polyuria",
    "Tick_Prevention",
    "Heartworm_Prevention",
    "Diet_Type",
    "Exercise_Level",
    "Environment",
];

pub const MAX_AGE_YEARS: f64 = 30.0;

#[derive(Debug, Clone, Serialize)]
pub struct GradioPayload {
    pub data: Vec<Value>,
}

pub fn validate_input(input: &DiseasePredictionInput) -> Result<(), PredictionError> {
    if !input.age_years.is_finite() || input.age_years < 0.0 || input.age_years > MAX_AGE_YEARS {
        return Err(PredictionError::InvalidInput(
            "Age must be between 0 and 30 years".to_string(),
        ));
    }
    if !(1..=9).contains(&input.body_condition_score) {
        return Err(PredictionError::InvalidInput(
            "Body condition score must be between 1 and 9".to_string(),
        ));
    }
    Ok(())
}

pub fn to_gradio_params(input: &DiseasePredictionInput) -> Vec<Value> {
    let params = vec![
        json!(input.age_years),
        json!(input.breed_size.as_str()),
        json!(input.sex.as_str()),
        json!(if input.is_neutered { "Neutered" } else { "Intact" }),
        json!(input.body_condition_score),
        json!(yes_no(input.pale_gums)),
        json!(yes_no(input.skin_lesions)),
        json!(yes_no(input.polyuria)),
        json!(remote_tick_label(input.tick_prevention)),
        json!(yes_no(input.heartworm_prevention)),
        json!(remote_diet_label(input.diet_type.as_str())),
        json!(input.exercise_level.as_str()),
        json!(remote_environment_label(input.environment.as_str())),
    ];
    debug_assert_eq!(params.len(), PARAMETER_NAMES.len());
    params
}

pub fn to_payload(input: &DiseasePredictionInput) -> GradioPayload {
    GradioPayload {
        data: to_gradio_params(input),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// The model only distinguishes "on a regular schedule" from everything else.
pub fn remote_tick_label(tick: TickPrevention) -> &'static str {
    match tick {
        TickPrevention::Regular => "Yes",
        TickPrevention::None | TickPrevention::Irregular => "No",
    }
}

/// Unknown diets fall back to "Commercial".
pub fn remote_diet_label(diet: &str) -> &'static str {
    match diet {
        "Commercial" => "Commercial",
        "Homemade" | "Raw" => "Home",
        "Mixed" => "Mixed",
        _ => "Commercial",
    }
}

/// Unknown environments fall back to "Suburban".
pub fn remote_environment_label(environment: &str) -> &'static str {
    match environment {
        "Indoor" | "Urban" => "Urban",
        "Outdoor" | "Rural" => "Rural",
        "Mixed" | "Suburban" => "Suburban",
        _ => "Suburban",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{BreedSize, DietType, Environment, ExerciseLevel, Sex};

    pub(crate) fn sample_input() -> DiseasePredictionInput {
        DiseasePredictionInput {
            age_years: 9.0,
            breed_size: BreedSize::Medium,
            sex: Sex::Male,
            is_neutered: true,
            body_condition_score: 8,
            pale_gums: false,
            skin_lesions: false,
            polyuria: true,
            tick_prevention: TickPrevention::Irregular,
            heartworm_prevention: false,
            diet_type: DietType::Commercial,
            exercise_level: ExerciseLevel::Low,
            environment: Environment::Outdoor,
        }
    }

    #[test]
    fn produces_thirteen_positional_values_in_order() {
        let params = to_gradio_params(&sample_input());
        assert_eq!(params.len(), PARAMETER_NAMES.len());
        assert_eq!(
            params,
            vec![
                json!(9.0),
                json!("Medium"),
                json!("Male"),
                json!("Neutered"),
                json!(8),
                json!("No"),
                json!("No"),
                json!("Yes"),
                json!("No"),
                json!("No"),
                json!("Commercial"),
                json!("Low"),
                json!("Rural"),
            ]
        );
    }

    #[test]
    fn environment_mapping_is_total() {
        let all = [
            Environment::Indoor,
            Environment::Outdoor,
            Environment::Mixed,
            Environment::Urban,
            Environment::Rural,
            Environment::Suburban,
        ];
        for env in all {
            let label = remote_environment_label(env.as_str());
            assert!(["Urban", "Rural", "Suburban"].contains(&label));
        }
        assert_eq!(remote_environment_label("Indoor"), "Urban");
        assert_eq!(remote_environment_label("Outdoor"), "Rural");
        assert_eq!(remote_environment_label("Mixed"), "Suburban");
        assert_eq!(remote_environment_label("Underground"), "Suburban");
    }

    #[test]
    fn diet_mapping_falls_back_to_commercial() {
        for diet in [
            DietType::Commercial,
            DietType::Homemade,
            DietType::Raw,
            DietType::Mixed,
        ] {
            let label = remote_diet_label(diet.as_str());
            assert!(["Commercial", "Home", "Mixed"].contains(&label));
        }
        assert_eq!(remote_diet_label("Kibble"), "Commercial");
    }

    #[test]
    fn only_regular_tick_prevention_counts() {
        assert_eq!(remote_tick_label(TickPrevention::Regular), "Yes");
        assert_eq!(remote_tick_label(TickPrevention::Irregular), "No");
        assert_eq!(remote_tick_label(TickPrevention::None), "No");
    }

    #[test]
    fn intact_pets_serialize_as_intact() {
        let mut input = sample_input();
        input.is_neutered = false;
        assert_eq!(to_gradio_params(&input)[3], json!("Intact"));
    }

    #[test]
    fn payload_wraps_params_in_data_field() {
        let body = serde_json::to_value(to_payload(&sample_input())).unwrap();
        assert_eq!(body["data"].as_array().map(Vec::len), Some(13));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut input = sample_input();
        input.body_condition_score = 0;
        assert!(matches!(
            validate_input(&input),
            Err(PredictionError::InvalidInput(_))
        ));

        let mut input = sample_input();
        input.age_years = 31.0;
        assert!(validate_input(&input).is_err());

        assert!(validate_input(&sample_input()).is_ok());
    }
}
