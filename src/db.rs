use anyhow::Context;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AnalysisRecord, BreedSize, DietType, DiseasePredictionInput, DiseasePredictionResult,
    Environment, ExerciseLevel, Sex, TickPrevention,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn save_analysis(
    pool: &PgPool,
    pet_id: Option<&str>,
    input: &DiseasePredictionInput,
    result: &DiseasePredictionResult,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO disease_risk.analyses (
            id, pet_id, age_years, breed_size, sex, is_neutered, body_condition_score,
            pale_gums, skin_lesions, polyuria, tick_prevention, heartworm_prevention,
            diet_type, exercise_level, environment, has_risk, highest_risk_disease,
            predictions, recommendations, pet_profile, analyzed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21)
        "#,
    )
    .bind(id)
    .bind(pet_id)
    .bind(input.age_years)
    .bind(input.breed_size.as_str())
    .bind(input.sex.as_str())
    .bind(input.is_neutered)
    .bind(i16::from(input.body_condition_score))
    .bind(input.pale_gums)
    .bind(input.skin_lesions)
    .bind(input.polyuria)
    .bind(input.tick_prevention.as_str())
    .bind(input.heartworm_prevention)
    .bind(input.diet_type.as_str())
    .bind(input.exercise_level.as_str())
    .bind(input.environment.as_str())
    .bind(result.has_risk)
    .bind(result.highest_risk_disease.map(|d| d.as_str()))
    .bind(Json(&result.predictions))
    .bind(Json(&result.recommendations))
    .bind(Json(&result.pet_profile))
    .bind(result.analyzed_at)
    .execute(pool)
    .await
    .context("failed to insert analysis")?;

    Ok(id)
}

pub async fn fetch_history(
    pool: &PgPool,
    since_date: NaiveDate,
    pet_id: Option<&str>,
) -> anyhow::Result<Vec<AnalysisRecord>> {
    let mut query = String::from(
        "SELECT id, pet_id, has_risk, highest_risk_disease, recommendations, analyzed_at, \
         COALESCE((pet_profile->>'risk_factors_count')::int, 0) AS risk_factors_count \
         FROM disease_risk.analyses \
         WHERE analyzed_at >= $1",
    );

    if pet_id.is_some() {
        query.push_str(" AND pet_id = $2");
    }
    query.push_str(" ORDER BY analyzed_at DESC");

    let since = since_date
        .and_hms_opt(0, 0, 0)
        .context("invalid date")?
        .and_utc();
    let mut rows = sqlx::query(&query).bind(since);

    if let Some(value) = pet_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut analyses = Vec::with_capacity(records.len());

    for row in records {
        let recommendations: Json<Vec<String>> = row.get("recommendations");
        analyses.push(AnalysisRecord {
            id: row.get("id"),
            pet_id: row.get("pet_id"),
            has_risk: row.get("has_risk"),
            highest_risk_disease: row.get("highest_risk_disease"),
            risk_factors_count: row.get("risk_factors_count"),
            recommendations: recommendations.0,
            analyzed_at: row.get("analyzed_at"),
        });
    }

    Ok(analyses)
}

/// One line of a batch file: the pet it belongs to (if any) and its input.
#[derive(Debug, Clone)]
pub struct BatchRow {
    pub pet_id: Option<String>,
    pub input: DiseasePredictionInput,
}

pub fn import_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<BatchRow>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        pet_id: Option<String>,
        age_years: f64,
        breed_size: BreedSize,
        sex: Sex,
        is_neutered: bool,
        body_condition_score: u8,
        pale_gums: bool,
        skin_lesions: bool,
        polyuria: bool,
        tick_prevention: TickPrevention,
        heartworm_prevention: bool,
        diet_type: DietType,
        exercise_level: ExerciseLevel,
        environment: Environment,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid batch row {}", index + 1))?;
        rows.push(BatchRow {
            pet_id: row.pet_id.filter(|id| !id.trim().is_empty()),
            input: DiseasePredictionInput {
                age_years: row.age_years,
                breed_size: row.breed_size,
                sex: row.sex,
                is_neutered: row.is_neutered,
                body_condition_score: row.body_condition_score,
                pale_gums: row.pale_gums,
                skin_lesions: row.skin_lesions,
                polyuria: row.polyuria,
                tick_prevention: row.tick_prevention,
                heartworm_prevention: row.heartworm_prevention,
                diet_type: row.diet_type,
                exercise_level: row.exercise_level,
                environment: row.environment,
            },
        });
    }

    Ok(rows)
}
