use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum BreedSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum TickPrevention {
    None,
    Irregular,
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum DietType {
    Commercial,
    Homemade,
    Raw,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum ExerciseLevel {
    Low,
    Moderate,
    High,
}

/// Where the pet lives. `Urban`, `Rural` and `Suburban` are the remote
/// model's own vocabulary and are accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum Environment {
    Indoor,
    Outdoor,
    Mixed,
    Urban,
    Rural,
    Suburban,
}

impl Environment {
    /// Any setting with regular time outside.
    pub fn has_outdoor_exposure(self) -> bool {
        !matches!(self, Environment::Indoor | Environment::Urban)
    }

    pub fn is_rural(self) -> bool {
        matches!(self, Environment::Outdoor | Environment::Rural)
    }
}

macro_rules! label_enum {
    ($ty:ty { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum!(BreedSize { Small => "Small", Medium => "Medium", Large => "Large" });
label_enum!(Sex { Male => "Male", Female => "Female" });
label_enum!(TickPrevention { None => "None", Irregular => "Irregular", Regular => "Regular" });
label_enum!(DietType {
    Commercial => "Commercial",
    Homemade => "Homemade",
    Raw => "Raw",
    Mixed => "Mixed",
});
label_enum!(ExerciseLevel { Low => "Low", Moderate => "Moderate", High => "High" });
label_enum!(Environment {
    Indoor => "Indoor",
    Outdoor => "Outdoor",
    Mixed => "Mixed",
    Urban => "Urban",
    Rural => "Rural",
    Suburban => "Suburban",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseasePredictionInput {
    pub age_years: f64,
    pub breed_size: BreedSize,
    pub sex: Sex,
    pub is_neutered: bool,
    pub body_condition_score: u8,
    pub pale_gums: bool,
    pub skin_lesions: bool,
    pub polyuria: bool,
    pub tick_prevention: TickPrevention,
    pub heartworm_prevention: bool,
    pub diet_type: DietType,
    pub exercise_level: ExerciseLevel,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiseaseType {
    #[serde(rename = "Tick-Borne Disease")]
    TickBorne,
    #[serde(rename = "Filariasis")]
    Filariasis,
    #[serde(rename = "Diabetes Mellitus Type 2")]
    Diabetes,
    #[serde(rename = "Obesity-Related Metabolic Dysfunction")]
    ObesityMetabolic,
    #[serde(rename = "Urolithiasis")]
    Urolithiasis,
    #[serde(rename = "Healthy")]
    Healthy,
}

impl DiseaseType {
    /// The five conditions the remote model scores, in encounter order.
    pub const DISEASES: [DiseaseType; 5] = [
        DiseaseType::TickBorne,
        DiseaseType::Filariasis,
        DiseaseType::Diabetes,
        DiseaseType::ObesityMetabolic,
        DiseaseType::Urolithiasis,
    ];

    pub fn is_healthy(self) -> bool {
        self == DiseaseType::Healthy
    }
}

label_enum!(DiseaseType {
    TickBorne => "Tick-Borne Disease",
    Filariasis => "Filariasis",
    Diabetes => "Diabetes Mellitus Type 2",
    ObesityMetabolic => "Obesity-Related Metabolic Dysfunction",
    Urolithiasis => "Urolithiasis",
    Healthy => "Healthy",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

label_enum!(RiskLevel { Low => "Low", Moderate => "Moderate", High => "High" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleDiseasePrediction {
    pub disease: DiseaseType,
    /// Percentage in 0..=100, scored independently per condition.
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub is_positive: bool,
    pub key_indicators: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    Puppy,
    Adult,
    Senior,
    Geriatric,
}

label_enum!(AgeGroup {
    Puppy => "Puppy",
    Adult => "Adult",
    Senior => "Senior",
    Geriatric => "Geriatric",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightStatus {
    Underweight,
    Ideal,
    Overweight,
    Obese,
}

label_enum!(WeightStatus {
    Underweight => "Underweight",
    Ideal => "Ideal",
    Overweight => "Overweight",
    Obese => "Obese",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetProfile {
    pub age_group: AgeGroup,
    pub weight_status: WeightStatus,
    pub risk_factors_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseasePredictionResult {
    pub has_risk: bool,
    pub highest_risk_disease: Option<DiseaseType>,
    pub predictions: Vec<SingleDiseasePrediction>,
    pub recommendations: Vec<String>,
    pub pet_profile: PetProfile,
    pub analyzed_at: DateTime<Utc>,
}

impl DiseasePredictionResult {
    pub fn prediction(&self, disease: DiseaseType) -> Option<&SingleDiseasePrediction> {
        self.predictions.iter().find(|p| p.disease == disease)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn unhealthy() -> Self {
        Self {
            status: "unhealthy".to_string(),
        }
    }
}

/// A stored analysis as read back from the database.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub pet_id: Option<String>,
    pub has_risk: bool,
    pub highest_risk_disease: Option<String>,
    pub risk_factors_count: i32,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DiseaseSummary {
    pub disease: String,
    pub count: usize,
    pub avg_risk_factors: f64,
}
