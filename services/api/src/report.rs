use crate::infra::load_engine;
use chrono::{Local, NaiveDate};
use clap::Args;
use crime_risk::assessment::{CrimeForecast, PersonCsvImporter, RiskLevel, RiskReport};
use crime_risk::error::AppError;
use std::collections::BTreeMap;
use std::path::PathBuf;

const FORECASTS_PER_PERSON: usize = 3;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// CSV export of person records (one row per person)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Reference date for forecasts (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the nearest crime forecasts under each person
    #[arg(long)]
    pub(crate) forecasts: bool,
    /// JSON file overriding the embedded reference tables
    #[arg(long)]
    pub(crate) tables: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TablesArgs {
    /// JSON file overriding the embedded reference tables
    #[arg(long)]
    pub(crate) tables: Option<PathBuf>,
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let engine = load_engine(args.tables)?;
    let import = PersonCsvImporter::from_path(&args.csv)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let mut reports: Vec<(u64, RiskReport)> = import
        .records
        .iter()
        .map(|record| (record.row, engine.assess(&record.person, today)))
        .collect();
    reports.sort_by(|a, b| {
        b.1.assessment
            .risk_score
            .total_cmp(&a.1.assessment.risk_score)
    });

    println!("Risk assessment: {}", args.csv.display());
    println!("Reference date: {today}");
    println!(
        "Rows read: {} (assessed {}, skipped {})",
        import.total_rows(),
        import.records.len(),
        import.errors.len()
    );

    println!("\nRisk levels");
    let counts = level_counts(reports.iter().map(|(_, report)| report));
    for level in RiskLevel::ALL.iter().rev() {
        println!(
            "  {:<9} {}",
            level.label(),
            counts.get(level).copied().unwrap_or(0)
        );
    }

    if reports.is_empty() {
        println!("\nPersons by risk: none assessed");
    } else {
        println!("\nPersons by risk");
        for (row, report) in &reports {
            println!("  {}", person_line(*row, report));
            if args.forecasts {
                for forecast in report
                    .forecasts
                    .forecasts()
                    .iter()
                    .take(FORECASTS_PER_PERSON)
                {
                    println!("      {}", forecast_line(forecast));
                }
            }
        }
    }

    if !import.errors.is_empty() {
        println!("\nSkipped rows");
        for error in &import.errors {
            println!(
                "  row {:>4} [{}] {}",
                error.row,
                error.iin.as_deref().unwrap_or("no IIN"),
                error.message
            );
        }
    }

    Ok(())
}

pub(crate) fn run_tables(args: TablesArgs) -> Result<(), AppError> {
    let engine = load_engine(args.tables)?;
    let tables = engine.tables();

    println!("Reference tables (validated)");

    println!("\nComponent weights");
    for (name, weight) in tables.weights.entries() {
        println!("  {:<11} {:.2}", name, weight);
    }

    println!("\nPattern risks");
    for (pattern, risk) in &tables.pattern_risks {
        println!("  {:<17} {:.2}", pattern.key(), risk);
    }

    println!("\nCrime time windows");
    for (crime, days) in &tables.time_windows {
        println!(
            "  {:<14} {:>3} days  prevention {:>5.1}%  ({})",
            crime.key(),
            days,
            tables.prevention_rate(*crime),
            crime.label()
        );
    }

    let stats = engine.statistics();
    println!(
        "\nSource: {} violations, {} recidivists, {:.1}% preventable",
        stats.total_analyzed, stats.total_recidivists, stats.preventable_crimes_percent
    );

    Ok(())
}

fn level_counts<'a>(reports: impl Iterator<Item = &'a RiskReport>) -> BTreeMap<RiskLevel, usize> {
    let mut counts = BTreeMap::new();
    for report in reports {
        *counts.entry(report.assessment.risk_level).or_insert(0) += 1;
    }
    counts
}

fn person_line(row: u64, report: &RiskReport) -> String {
    let assessment = &report.assessment;
    let nearest = report
        .forecasts
        .most_likely()
        .map(|forecast| format!("{} in {} days", forecast.crime_type, forecast.days))
        .unwrap_or_else(|| "no forecast".to_string());

    format!(
        "row {:>4} {:<12} score {:>4.2} {:<8} {:<17} next: {}",
        row,
        assessment.iin.as_deref().unwrap_or("-"),
        assessment.risk_score,
        assessment.risk_level_label,
        assessment.person.pattern_type.key(),
        nearest
    )
}

fn forecast_line(forecast: &CrimeForecast) -> String {
    format!(
        "{:<14} {} ({} days, {:.1}%, {} confidence, {})",
        forecast.crime_type.key(),
        forecast.date,
        forecast.days,
        forecast.probability,
        forecast.confidence.label(),
        forecast.risk_level_label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_risk::assessment::{AssessmentEngine, AssessmentRequest, PatternType};

    fn report() -> RiskReport {
        let engine = AssessmentEngine::standard().expect("standard engine");
        let person = AssessmentRequest {
            iin: Some("900101350123".to_string()),
            pattern_type: Some(PatternType::Escalating),
            total_cases: Some(6),
            criminal_count: Some(2),
            days_since_last: Some(40),
            current_age: Some(24),
            age_at_first_violation: Some(17),
            has_escalation: Some(true),
            admin_to_criminal: Some(2),
            ..AssessmentRequest::default()
        }
        .validate()
        .expect("valid person");
        engine.assess(
            &person,
            NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date"),
        )
    }

    #[test]
    fn person_line_names_row_iin_and_nearest_crime() {
        let line = person_line(7, &report());
        assert!(line.starts_with("row    7 900101350123"));
        assert!(line.contains("escalating"));
        assert!(line.contains("next: "));
    }

    #[test]
    fn forecast_line_includes_date_and_probability() {
        let report = report();
        let nearest = report.forecasts.most_likely().expect("forecast present");
        let line = forecast_line(nearest);
        assert!(line.contains(&nearest.date.to_string()));
        assert!(line.contains('%'));
    }

    #[test]
    fn level_counts_group_reports() {
        let reports = vec![report(), report()];
        let counts = level_counts(reports.iter());
        assert_eq!(counts.values().sum::<usize>(), 2);
        assert_eq!(counts.len(), 1);
    }
}
