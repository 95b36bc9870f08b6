use super::common::*;
use crate::assessment::interventions::InterventionPriority;
use crate::assessment::service::{CalendarRiskLevel, PreventionUrgency};
use crate::assessment::{
    AssessmentEngine, AssessmentRequest, AssessmentServiceError, BehaviourPatternKind, CrimeType,
    HistoryTrend, ReferenceTables, RiskLevel, ValidatedPerson,
};
use chrono::NaiveDate;

fn adult_without_record() -> ValidatedPerson {
    AssessmentRequest::default()
        .validate()
        .expect("defaults are valid")
}

#[test]
fn engine_rejects_drifted_tables() {
    let mut tables = ReferenceTables::standard();
    tables.weights.history = 0.4;

    let err = AssessmentEngine::new(tables).expect_err("invalid tables rejected");
    assert!(matches!(err, AssessmentServiceError::Tables(_)));
    assert!(err.to_string().contains("sum to 1.0"));
}

#[test]
fn engine_rejects_zero_batch_limit() {
    let err = AssessmentEngine::with_batch_limit(ReferenceTables::standard(), 0)
        .expect_err("zero limit rejected");
    assert!(matches!(err, AssessmentServiceError::InvalidBatchLimit));
}

#[test]
fn assess_combines_score_forecasts_and_plan() {
    let engine = engine();
    let person = AssessmentRequest::from(chronic_person())
        .validate()
        .expect("valid person");

    let report = engine.assess(&person, today());

    assert_eq!(report.assessment.risk_level, RiskLevel::Critical);
    assert_eq!(report.assessment.recommendation, "Requires immediate intervention");
    assert_eq!(report.forecasts.len(), 8);
    assert_eq!(report.interventions.priority, InterventionPriority::Critical);
    assert_eq!(report.interventions.monitoring_frequency, "Daily");
    assert_eq!(
        report.interventions.programs[..3],
        ["Employment assistance", "Financial counselling", "Social assistance"]
    );
    assert_eq!(
        report
            .interventions
            .programs
            .iter()
            .filter(|program| **program == "Psychological support")
            .count(),
        1
    );
    assert_eq!(
        report.interventions.responsible_agencies,
        vec![
            "Employment service",
            "Psychological service",
            "Social protection",
            "District police"
        ]
    );
}

#[test]
fn quick_assessment_reports_nearest_forecast() {
    let engine = engine();
    let quick = engine.quick_assessment(&mixed_unstable_person(), today());
    let timeline = engine.forecast(&mixed_unstable_person(), today());

    assert_eq!(quick.risk_level, RiskLevel::High);
    assert_eq!(quick.risk_level_label, "High");
    assert_eq!(quick.most_likely_crime.as_ref(), timeline.most_likely());
}

#[test]
fn batch_collects_failures_by_index() {
    let engine = engine();
    let invalid = AssessmentRequest {
        total_cases: Some(1),
        criminal_count: Some(3),
        iin: Some("880101300123".to_string()),
        ..AssessmentRequest::default()
    };

    let batch = engine
        .assess_batch(vec![
            AssessmentRequest::from(mixed_unstable_person()),
            invalid,
            AssessmentRequest::default(),
        ])
        .expect("batch accepted");

    assert_eq!(batch.total_processed, 3);
    assert_eq!(batch.successful, 2);
    assert_eq!(batch.failed, 1);
    assert_eq!(batch.errors[0].index, 1);
    assert_eq!(batch.errors[0].iin.as_deref(), Some("880101300123"));
    assert!(batch.errors[0].errors[0].contains("criminal_count"));
    assert!((batch.results[0].risk_score - 5.76).abs() < 1e-3);
}

#[test]
fn batch_limits_are_enforced() {
    let engine = engine_with_batch_limit(2);

    assert!(matches!(
        engine.assess_batch(Vec::new()),
        Err(AssessmentServiceError::EmptyBatch)
    ));
    assert!(matches!(
        engine.assess_batch(vec![AssessmentRequest::default(); 3]),
        Err(AssessmentServiceError::BatchTooLarge { size: 3, limit: 2 })
    ));
}

#[test]
fn priority_crimes_are_filtered_and_ranked() {
    let engine = engine();
    let priorities = engine
        .priority_crimes(&chronic_person(), today(), 50.0)
        .expect("threshold in range");

    let crimes: Vec<CrimeType> = priorities
        .priority_crimes
        .iter()
        .map(|priority| priority.forecast.crime_type)
        .collect();
    assert_eq!(
        crimes,
        vec![CrimeType::Theft, CrimeType::Extortion, CrimeType::Murder]
    );
    assert_eq!(priorities.total_found, 3);
    assert_eq!(priorities.total_analyzed, 8);

    let theft = &priorities.priority_crimes[0];
    assert_eq!(theft.forecast.days, 45);
    assert_eq!(theft.prevention_window, 15);
    assert_eq!(theft.urgency, PreventionUrgency::High);
}

#[test]
fn priority_crimes_keep_top_five() {
    let priorities = engine()
        .priority_crimes(&chronic_person(), today(), 5.0)
        .expect("threshold in range");
    assert_eq!(priorities.total_found, 8);
    assert_eq!(priorities.priority_crimes.len(), 5);
    assert!(priorities
        .priority_crimes
        .windows(2)
        .all(|pair| pair[0].forecast.probability >= pair[1].forecast.probability));
}

#[test]
fn priority_threshold_must_be_in_range() {
    let err = engine()
        .priority_crimes(&chronic_person(), today(), 99.0)
        .expect_err("threshold rejected");
    assert!(matches!(
        err,
        AssessmentServiceError::ProbabilityThresholdOutOfRange(_)
    ));
}

#[test]
fn prevention_calendar_buckets_forecasts_by_month() {
    let calendar = engine()
        .prevention_calendar(&chronic_person(), today(), 6)
        .expect("months in range");

    assert_eq!(calendar.months.len(), 6);
    assert_eq!(calendar.planning_period_months, 6);

    let first = &calendar.months[0];
    assert_eq!(first.month, "2025-06");
    assert!(first.risks.is_empty());
    assert_eq!(first.recommendations, vec!["Standard monitoring"]);
    assert_eq!(first.risk_level, CalendarRiskLevel::Low);

    let second = &calendar.months[1];
    assert_eq!(second.month, "2025-07");
    assert_eq!((second.start_day, second.end_day), (30, 60));
    assert_eq!(second.risks.len(), 8);
    assert_eq!(second.risks[0].crime_type, CrimeType::Theft);
    assert!(second.recommendations[0].starts_with("Enhanced control"));
    assert_eq!(second.risk_level, CalendarRiskLevel::Medium);
}

#[test]
fn prevention_calendar_rejects_out_of_range_months() {
    let engine = engine();
    for months in [0, 13] {
        assert!(matches!(
            engine.prevention_calendar(&chronic_person(), today(), months),
            Err(AssessmentServiceError::MonthsOutOfRange(_))
        ));
    }
}

#[test]
fn timeline_limit_truncates_nearest_first() {
    let engine = engine();
    let forecasts = engine
        .timeline(&chronic_person(), today(), 3)
        .expect("limit in range");
    assert_eq!(forecasts.len(), 3);
    assert_eq!(forecasts[0].crime_type, CrimeType::Fraud);

    assert!(matches!(
        engine.timeline(&chronic_person(), today(), 21),
        Err(AssessmentServiceError::TimelineLimitOutOfRange(21))
    ));
}

#[test]
fn low_risk_person_needs_no_programmes() {
    let plan = engine().intervention_plan(&low_risk_person(), today());
    assert_eq!(plan.priority, InterventionPriority::Standard);
    assert!(plan.programs.is_empty());
    assert!(plan.timeline.is_empty());
    assert!(plan.responsible_agencies.is_empty());
}

#[test]
fn individual_forecast_shortens_window_of_repeated_crime() {
    let forecast =
        engine().individual_forecast(&adult_without_record(), &theft_specialist_history(), today());

    assert_eq!(forecast.behaviour_pattern.kind, BehaviourPatternKind::Specialized);
    assert_eq!(forecast.behaviour_pattern.avg_interval, 30);
    assert_eq!(forecast.risk_factors.trend, HistoryTrend::Stable);
    assert_eq!(forecast.risk_factors.last_violation_days_ago, Some(30));
    assert_eq!(forecast.confidence_level, 0.5);

    let theft = &forecast.forecasts[0];
    assert_eq!(theft.crime_type, CrimeType::Theft);
    assert_eq!(theft.probability, 95.0);
    assert_eq!(theft.days, 116);
    assert_eq!(theft.base_days, 146);
    assert_eq!(theft.date, NaiveDate::from_ymd_opt(2025, 10, 9).expect("valid date"));
    assert_eq!((theft.confidence_interval.lower, theft.confidence_interval.upper), (100, 132));
    assert_eq!(theft.risk_level, RiskLevel::Critical);
    assert_eq!(theft.preventability, 80.0);

    assert!(forecast.forecasts[1..]
        .iter()
        .all(|other| other.probability == 5.0 && other.days == other.base_days));
    assert!(forecast.critical_periods.is_empty());
}

#[test]
fn individual_forecast_flags_escalation_towards_violent_crime() {
    let forecast =
        engine().individual_forecast(&adult_without_record(), &escalating_history(), today());

    assert_eq!(forecast.behaviour_pattern.kind, BehaviourPatternKind::Escalating);
    assert!(forecast.risk_factors.escalation_detected);
    assert_eq!(forecast.risk_factors.trend, HistoryTrend::Accelerating);
    assert_eq!(forecast.confidence_level, 0.7);

    let ranked: Vec<(CrimeType, f64, u32)> = forecast
        .forecasts
        .iter()
        .take(5)
        .map(|forecast| (forecast.crime_type, forecast.probability, forecast.days))
        .collect();
    assert_eq!(
        ranked,
        vec![
            (CrimeType::ArmedRobbery, 95.0, 47),
            (CrimeType::Hooliganism, 72.0, 78),
            (CrimeType::Murder, 70.0, 48),
            (CrimeType::Theft, 66.0, 77),
            (CrimeType::Robbery, 66.0, 47),
        ]
    );

    assert_eq!(forecast.critical_periods.len(), 2);
    let first = &forecast.critical_periods[0];
    assert_eq!(
        first.crime_types,
        vec![CrimeType::ArmedRobbery, CrimeType::Murder, CrimeType::Robbery]
    );
    assert_eq!(first.avg_probability, 77.0);
    assert_eq!(first.risk_level, RiskLevel::High);
    assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2025, 8, 1).expect("valid date"));
    assert_eq!(first.recommended_interventions.len(), 6);

    let second = &forecast.critical_periods[1];
    assert_eq!(second.start_date, NaiveDate::from_ymd_opt(2025, 8, 15).expect("valid date"));
    assert_eq!(second.avg_probability, 51.6);
    assert_eq!(second.risk_level, RiskLevel::Medium);
}

#[test]
fn individual_forecast_without_history_keeps_base_windows() {
    let forecast = engine().individual_forecast(&adult_without_record(), &[], today());

    assert_eq!(forecast.behaviour_pattern.kind, BehaviourPatternKind::InsufficientData);
    assert_eq!(forecast.risk_factors.trend, HistoryTrend::NoData);
    assert_eq!(forecast.confidence_level, 0.3);
    assert!(forecast
        .forecasts
        .iter()
        .all(|forecast| forecast.days == forecast.base_days && forecast.probability == 20.0));
}
