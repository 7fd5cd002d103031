use std::fmt::Write;

use chrono::{Duration, NaiveDate, Utc};

use crate::models::{
    AnalysisRecord, DiseasePredictionInput, DiseasePredictionResult, DiseaseSummary, DiseaseType,
};

const NO_RISK_LABEL: &str = "No elevated risk";

pub fn cutoff_date(since_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(since_days.max(1))
}

pub fn build_report(
    pet_label: Option<&str>,
    input: &DiseasePredictionInput,
    result: &DiseasePredictionResult,
) -> String {
    let mut output = String::new();
    let pet_label = pet_label.unwrap_or("unnamed pet");

    let _ = writeln!(output, "# Disease Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} (analyzed {})",
        pet_label,
        result.analyzed_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- Overall: {}",
        if result.has_risk {
            "at risk, follow-up advised"
        } else {
            "no positive findings"
        }
    );
    let _ = writeln!(
        output,
        "- Highest risk: {}",
        result
            .highest_risk_disease
            .map(|d| d.as_str())
            .unwrap_or("none")
    );
    if let Some(healthy) = result.prediction(DiseaseType::Healthy) {
        let _ = writeln!(output, "- Health confidence: {:.1}%", healthy.probability);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pet Profile");
    let _ = writeln!(
        output,
        "- {} {} {}, {} years, body condition {}/9",
        input.breed_size,
        input.sex,
        if input.is_neutered { "(neutered)" } else { "(intact)" },
        input.age_years,
        input.body_condition_score
    );
    let _ = writeln!(output, "- Age group: {}", result.pet_profile.age_group);
    let _ = writeln!(output, "- Weight status: {}", result.pet_profile.weight_status);
    let _ = writeln!(
        output,
        "- Risk factors: {}",
        result.pet_profile.risk_factors_count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Predictions");
    let _ = writeln!(output, "| Condition | Probability | Risk | Positive | Indicators |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for prediction in &result.predictions {
        let indicators = if prediction.key_indicators.is_empty() {
            "-".to_string()
        } else {
            prediction.key_indicators.join("; ")
        };
        let _ = writeln!(
            output,
            "| {} | {:.1}% | {} | {} | {} |",
            prediction.disease,
            prediction.probability,
            prediction.risk_level,
            if prediction.is_positive { "yes" } else { "no" },
            indicators
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    for recommendation in &result.recommendations {
        let _ = writeln!(output, "- {}", recommendation);
    }

    output
}

/// One line of the `history` listing.
pub fn history_line(record: &AnalysisRecord) -> String {
    format!(
        "- {} {} {} ({}) highest risk {} across {} risk factors",
        record.analyzed_at.format("%Y-%m-%d %H:%M"),
        record.id,
        record.pet_id.as_deref().unwrap_or("no pet"),
        if record.has_risk { "at risk" } else { "clear" },
        record.highest_risk_disease.as_deref().unwrap_or("none"),
        record.risk_factors_count
    )
}

pub fn summarize_by_disease(records: &[AnalysisRecord]) -> Vec<DiseaseSummary> {
    let mut map: std::collections::HashMap<String, (usize, i32)> =
        std::collections::HashMap::new();

    for record in records {
        let key = record
            .highest_risk_disease
            .clone()
            .unwrap_or_else(|| NO_RISK_LABEL.to_string());
        let entry = map.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += record.risk_factors_count;
    }

    let mut summaries: Vec<DiseaseSummary> = map
        .into_iter()
        .map(|(disease, (count, total_factors))| DiseaseSummary {
            disease,
            count,
            avg_risk_factors: if count == 0 {
                0.0
            } else {
                total_factors as f64 / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.disease.cmp(&b.disease)));
    summaries
}

pub fn build_history_report(
    pet_id: Option<&str>,
    cutoff: NaiveDate,
    records: &[AnalysisRecord],
) -> String {
    let summaries = summarize_by_disease(records);

    let mut output = String::new();
    let pet_label = pet_id.unwrap_or("all pets");

    let _ = writeln!(output, "# Disease Risk History");
    let _ = writeln!(
        output,
        "Generated for {} (analyses since {})",
        pet_label, cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No analyses recorded for this window.");
    } else {
        let at_risk = records.iter().filter(|r| r.has_risk).count();
        let _ = writeln!(
            output,
            "{} of {} analyses flagged a positive risk.",
            at_risk,
            records.len()
        );
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} analyses (avg {:.1} risk factors)",
                summary.disease, summary.count, summary.avg_risk_factors
            );
        }
    }

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.analyzed_at.cmp(&a.analyzed_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Analyses");

    if recent.is_empty() {
        let _ = writeln!(output, "No analyses recorded for this window.");
    } else {
        for record in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                record.pet_id.as_deref().unwrap_or("no pet"),
                record
                    .highest_risk_disease
                    .as_deref()
                    .unwrap_or(NO_RISK_LABEL),
                record.analyzed_at.format("%Y-%m-%d"),
                record
                    .recommendations
                    .first()
                    .map(String::as_str)
                    .unwrap_or("no recommendations")
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic;
    use crate::mapper::tests::sample_input;
    use uuid::Uuid;

    fn record(disease: Option<&str>, has_risk: bool, factors: i32, days_ago: i64) -> AnalysisRecord {
        AnalysisRecord {
            id: Uuid::new_v4(),
            pet_id: Some("pet-7".to_string()),
            has_risk,
            highest_risk_disease: disease.map(String::from),
            risk_factors_count: factors,
            recommendations: vec!["Request heartworm antigen test".to_string()],
            analyzed_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn cutoff_date_respects_since_days() {
        let expected = Utc::now().date_naive() - Duration::days(14);
        assert_eq!(cutoff_date(14), expected);
        assert_eq!(cutoff_date(0), Utc::now().date_naive() - Duration::days(1));
    }

    #[test]
    fn summaries_group_by_highest_risk() {
        let records = vec![
            record(Some("Filariasis"), true, 4, 1),
            record(Some("Filariasis"), true, 2, 3),
            record(None, false, 0, 5),
        ];
        let summaries = summarize_by_disease(&records);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].disease, "Filariasis");
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].avg_risk_factors - 3.0).abs() < 0.001);
        assert_eq!(summaries[1].disease, NO_RISK_LABEL);
    }

    #[test]
    fn analysis_report_lists_every_prediction() {
        let input = sample_input();
        let result = heuristic::estimate(&input);
        let report = build_report(Some("Biscuit"), &input, &result);

        assert!(report.starts_with("# Disease Risk Report"));
        assert!(report.contains("Generated for Biscuit"));
        assert!(report.contains("- Highest risk: Diabetes Mellitus Type 2"));
        assert!(report.contains("- Age group: Senior"));
        for prediction in &result.predictions {
            assert!(report.contains(&format!("| {} |", prediction.disease)));
        }
    }

    #[test]
    fn history_line_identifies_the_stored_analysis() {
        let stored = record(Some("Filariasis"), true, 4, 2);
        let line = history_line(&stored);

        assert!(line.contains(&stored.id.to_string()));
        assert!(line.contains("pet-7 (at risk) highest risk Filariasis across 4 risk factors"));
    }

    #[test]
    fn history_report_handles_empty_window() {
        let cutoff = Utc::now().date_naive();
        let report = build_history_report(None, cutoff, &[]);
        assert!(report.contains("Generated for all pets"));
        assert!(report.contains("No analyses recorded for this window."));
    }

    #[test]
    fn history_report_shows_recent_first() {
        let records = vec![
            record(Some("Urolithiasis"), false, 1, 10),
            record(Some("Filariasis"), true, 3, 1),
        ];
        let report = build_history_report(Some("pet-7"), Utc::now().date_naive(), &records);

        assert!(report.contains("1 of 2 analyses flagged a positive risk."));
        let filariasis = report.find("- pet-7 (Filariasis)").unwrap();
        let urolithiasis = report.find("- pet-7 (Urolithiasis)").unwrap();
        assert!(filariasis < urolithiasis);
    }
}
