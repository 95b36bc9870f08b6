//! Individual forecasts driven by a person's own violation history.
//!
//! The research windows give the population baseline; this module bends them
//! per person using how often each crime type recurs, whether intervals are
//! shrinking, how recent the last violation was and whether severity is
//! escalating.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{CrimeType, PersonAttributes};
use super::forecast::ConfidenceInterval;
use super::interventions::program_for;
use super::scoring::RiskLevel;
use super::tables::ReferenceTables;

const MIN_INDIVIDUAL_DAYS: u32 = 7;
const CRITICAL_PERIOD_PROBABILITY: f64 = 40.0;
const DAYS_PER_PERIOD: u32 = 30;
const PROGRAMS_PER_CRIME: usize = 2;

/// One entry of a person's violation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub violation_date: NaiveDate,
    pub violation_type: String,
}

impl ViolationRecord {
    pub fn new(violation_date: NaiveDate, violation_type: impl Into<String>) -> Self {
        Self {
            violation_date,
            violation_type: violation_type.into(),
        }
    }

    pub fn crime_type(&self) -> Option<CrimeType> {
        classify_violation(&self.violation_type)
    }

    fn severity(&self) -> u8 {
        let text = self.violation_type.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

        if has(&["убийств", "murder"]) {
            10
        } else if has(&["разбой", "armed_robbery", "armed robbery"]) {
            8
        } else if has(&["грабеж", "грабёж", "robbery"]) {
            7
        } else if has(&["изнасилование", "rape"]) {
            9
        } else if has(&["вымогательство", "extortion"]) {
            6
        } else if has(&["мошенничество", "fraud"]) {
            5
        } else if has(&["кража", "theft"]) {
            4
        } else if has(&["хулиганство", "hooliganism"]) {
            3
        } else {
            2
        }
    }
}

/// Map a free-text violation description onto a tracked crime category.
///
/// Unspecific criminal records fall back to theft and administrative ones to
/// hooliganism, the most common transitions in the research data.
pub fn classify_violation(description: &str) -> Option<CrimeType> {
    let text = description.trim().to_lowercase();
    if let Some(crime) = CrimeType::ALL.into_iter().find(|crime| crime.key() == text) {
        return Some(crime);
    }

    const KEYWORDS: [(CrimeType, &[&str]); 8] = [
        (CrimeType::Theft, &["кража", "хищение", "воровство"]),
        (CrimeType::Robbery, &["грабеж", "грабёж"]),
        (CrimeType::ArmedRobbery, &["разбой"]),
        (CrimeType::Fraud, &["мошенничество", "обман"]),
        (CrimeType::Murder, &["убийство", "убийств"]),
        (CrimeType::Rape, &["изнасилование", "насилие"]),
        (CrimeType::Hooliganism, &["хулиганство", "хулиган"]),
        (CrimeType::Extortion, &["вымогательство", "вымогател"]),
    ];

    for (crime, keywords) in KEYWORDS {
        if keywords.iter().any(|keyword| text.contains(keyword)) {
            return Some(crime);
        }
    }

    if text.contains("уголов") || text.contains("criminal") {
        Some(CrimeType::Theft)
    } else if text.contains("администр") || text.contains("administrative") {
        Some(CrimeType::Hooliganism)
    } else {
        None
    }
}

/// Whether the gaps between violations are shrinking or growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryTrend {
    NoData,
    Stable,
    Accelerating,
    Decelerating,
}

/// Summary statistics over a person's violation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryAnalysis {
    pub total_violations: usize,
    pub crime_types: BTreeMap<CrimeType, u32>,
    pub unclassified: u32,
    pub avg_interval_days: f64,
    pub min_interval_days: i64,
    pub max_interval_days: i64,
    pub trend: HistoryTrend,
    pub escalation_detected: bool,
    pub last_violation_days_ago: Option<u32>,
}

impl HistoryAnalysis {
    fn crime_count(&self, crime: CrimeType) -> u32 {
        self.crime_types.get(&crime).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviourPatternKind {
    InsufficientData,
    Specialized,
    Repetitive,
    Periodic,
    Chaotic,
    Mixed,
    Escalating,
}

impl BehaviourPatternKind {
    fn confidence(&self) -> f64 {
        match self {
            BehaviourPatternKind::InsufficientData => 0.3,
            BehaviourPatternKind::Specialized => 0.8,
            BehaviourPatternKind::Repetitive => 0.7,
            BehaviourPatternKind::Periodic => 0.75,
            BehaviourPatternKind::Chaotic => 0.6,
            BehaviourPatternKind::Mixed => 0.65,
            BehaviourPatternKind::Escalating => 0.85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviourPattern {
    pub kind: BehaviourPatternKind,
    pub confidence: f64,
    pub description: String,
    pub unique_crime_types: usize,
    pub avg_interval: u32,
    pub variability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastFactors {
    pub historical_frequency: bool,
    pub pattern_match: BehaviourPatternKind,
    pub trend: HistoryTrend,
    pub days_since_last: Option<u32>,
}

/// Forecast for one crime type, personalised by the violation history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualCrimeForecast {
    pub crime_type: CrimeType,
    pub crime_label: &'static str,
    pub probability: f64,
    pub days: u32,
    pub base_days: u32,
    pub date: NaiveDate,
    pub confidence_interval: ConfidenceInterval,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub preventability: f64,
    pub factors: ForecastFactors,
}

/// A stretch where several likely crimes cluster within the same month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub risk_level: RiskLevel,
    pub crime_types: Vec<CrimeType>,
    pub avg_probability: f64,
    pub recommended_interventions: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualForecast {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iin: Option<String>,
    /// Most likely crime first.
    pub forecasts: Vec<IndividualCrimeForecast>,
    pub behaviour_pattern: BehaviourPattern,
    pub risk_factors: HistoryAnalysis,
    pub critical_periods: Vec<CriticalPeriod>,
    pub confidence_level: f64,
    pub calculated_at: DateTime<Utc>,
}

/// Forecaster bending the research windows around one person's history.
#[derive(Debug, Clone)]
pub struct IndividualForecaster {
    tables: Arc<ReferenceTables>,
}

impl IndividualForecaster {
    pub fn new(tables: Arc<ReferenceTables>) -> Self {
        Self { tables }
    }

    pub fn forecast(
        &self,
        iin: Option<String>,
        attrs: &PersonAttributes,
        violations: &[ViolationRecord],
        today: NaiveDate,
    ) -> IndividualForecast {
        let mut sorted = violations.to_vec();
        sorted.sort_by_key(|violation| violation.violation_date);

        let analysis = analyze_history(&sorted, today);
        let pattern = behaviour_pattern(&sorted, &analysis);

        let mut forecasts: Vec<IndividualCrimeForecast> = self
            .tables
            .time_windows
            .iter()
            .map(|(crime, base_days)| {
                let days = individual_window(*crime, *base_days, &analysis, attrs);
                crime_forecast(*crime, *base_days, days, &analysis, &pattern, today)
            })
            .collect();
        forecasts.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        let critical_periods = critical_periods(&forecasts, today);

        debug!(
            violations = sorted.len(),
            pattern = ?pattern.kind,
            trend = ?analysis.trend,
            critical_periods = critical_periods.len(),
            "individual forecast computed"
        );

        IndividualForecast {
            iin,
            forecasts,
            behaviour_pattern: pattern,
            risk_factors: analysis,
            critical_periods,
            confidence_level: history_confidence(sorted.len()),
            calculated_at: Utc::now(),
        }
    }
}

fn intervals(sorted: &[ViolationRecord]) -> Vec<i64> {
    sorted
        .windows(2)
        .map(|pair| (pair[1].violation_date - pair[0].violation_date).num_days())
        .collect()
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let count = values.len();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

fn analyze_history(sorted: &[ViolationRecord], today: NaiveDate) -> HistoryAnalysis {
    let mut crime_types = BTreeMap::new();
    let mut unclassified = 0;
    for violation in sorted {
        match violation.crime_type() {
            Some(crime) => *crime_types.entry(crime).or_insert(0) += 1,
            None => unclassified += 1,
        }
    }

    let gaps = intervals(sorted);
    let avg_interval_days = if gaps.is_empty() {
        if sorted.is_empty() {
            0.0
        } else {
            365.0
        }
    } else {
        mean(gaps.iter().map(|gap| *gap as f64))
    };

    let trend = if sorted.is_empty() {
        HistoryTrend::NoData
    } else if gaps.len() >= 3 {
        let early = mean(gaps[..3].iter().map(|gap| *gap as f64));
        let recent = mean(gaps[gaps.len() - 3..].iter().map(|gap| *gap as f64));
        if recent < early * 0.7 {
            HistoryTrend::Accelerating
        } else if recent > early * 1.3 {
            HistoryTrend::Decelerating
        } else {
            HistoryTrend::Stable
        }
    } else {
        HistoryTrend::Stable
    };

    let last_violation_days_ago = sorted.last().map(|last| {
        let days = (today - last.violation_date).num_days().max(0);
        u32::try_from(days).unwrap_or(u32::MAX)
    });

    HistoryAnalysis {
        total_violations: sorted.len(),
        crime_types,
        unclassified,
        avg_interval_days,
        min_interval_days: gaps.iter().copied().min().unwrap_or(0),
        max_interval_days: gaps.iter().copied().max().unwrap_or(0),
        trend,
        escalation_detected: escalation_detected(sorted),
        last_violation_days_ago,
    }
}

/// Severity of the latest three violations against the first three.
fn escalation_detected(sorted: &[ViolationRecord]) -> bool {
    if sorted.len() < 3 {
        return false;
    }

    let severity: Vec<f64> = sorted
        .iter()
        .map(|violation| f64::from(violation.severity()))
        .collect();
    let early = mean(severity[..3].iter().copied());
    let recent = mean(severity[severity.len() - 3..].iter().copied());

    recent > early * 1.5
}

fn behaviour_pattern(sorted: &[ViolationRecord], analysis: &HistoryAnalysis) -> BehaviourPattern {
    let unique_crime_types =
        analysis.crime_types.len() + usize::from(analysis.unclassified > 0);

    if sorted.len() < 2 {
        let kind = BehaviourPatternKind::InsufficientData;
        return BehaviourPattern {
            kind,
            confidence: kind.confidence(),
            description: "Not enough history to determine a pattern".to_string(),
            unique_crime_types,
            avg_interval: 0,
            variability: 0.0,
        };
    }

    let gaps: Vec<f64> = intervals(sorted).into_iter().map(|gap| gap as f64).collect();
    let mean_gap = mean(gaps.iter().copied());
    let std_gap = if gaps.len() > 1 {
        let variance = gaps
            .iter()
            .map(|gap| (gap - mean_gap).powi(2))
            .sum::<f64>()
            / (gaps.len() - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };
    let variability = if mean_gap > 0.0 { std_gap / mean_gap } else { 0.0 };
    let avg_interval = mean_gap.max(0.0) as u32;

    let (kind, description) = if analysis.escalation_detected {
        (
            BehaviourPatternKind::Escalating,
            "Escalating offence severity".to_string(),
        )
    } else if unique_crime_types == 1 {
        let specialty = sorted[0]
            .crime_type()
            .map(|crime| crime.label())
            .unwrap_or("unclassified offences");
        (
            BehaviourPatternKind::Specialized,
            format!("Specialises in {specialty}"),
        )
    } else if (unique_crime_types as f64) / (sorted.len() as f64) < 0.3 {
        (
            BehaviourPatternKind::Repetitive,
            "Repeating offence pattern".to_string(),
        )
    } else if variability < 0.3 {
        (
            BehaviourPatternKind::Periodic,
            format!("Recurs roughly every {avg_interval} days"),
        )
    } else if variability > 0.7 {
        (
            BehaviourPatternKind::Chaotic,
            "Chaotic pattern without clear periodicity".to_string(),
        )
    } else {
        (
            BehaviourPatternKind::Mixed,
            "Mixed behaviour pattern".to_string(),
        )
    };

    BehaviourPattern {
        kind,
        confidence: kind.confidence(),
        description,
        unique_crime_types,
        avg_interval,
        variability,
    }
}

fn individual_window(
    crime: CrimeType,
    base_days: u32,
    analysis: &HistoryAnalysis,
    attrs: &PersonAttributes,
) -> u32 {
    let mut days = f64::from(base_days);

    let count = analysis.crime_count(crime);
    if count > 0 {
        days *= (1.0 - f64::from(count) * 0.05).max(0.3);
    }

    days *= match analysis.trend {
        HistoryTrend::Accelerating => 0.7,
        HistoryTrend::Decelerating => 1.3,
        HistoryTrend::Stable | HistoryTrend::NoData => 1.0,
    };

    days *= match analysis.last_violation_days_ago {
        Some(recent) if recent < 30 => 0.8,
        Some(recent) if recent > 180 => 1.2,
        _ => 1.0,
    };

    if attrs.current_age < 25 {
        days *= 0.85;
    } else if attrs.current_age > 40 {
        days *= 1.15;
    }

    let violent = matches!(
        crime,
        CrimeType::Murder | CrimeType::ArmedRobbery | CrimeType::Robbery
    );
    if analysis.escalation_detected && violent {
        days *= 0.6;
    }

    if days.is_finite() {
        (days.trunc() as u32).max(MIN_INDIVIDUAL_DAYS)
    } else {
        base_days.max(MIN_INDIVIDUAL_DAYS)
    }
}

fn crime_forecast(
    crime: CrimeType,
    base_days: u32,
    days: u32,
    analysis: &HistoryAnalysis,
    pattern: &BehaviourPattern,
    today: NaiveDate,
) -> IndividualCrimeForecast {
    let count = analysis.crime_count(crime);
    let seen = count > 0;
    let mut probability = 50.0;

    if seen {
        let share = f64::from(count) / analysis.total_violations as f64;
        probability += share * 30.0;
        if count >= 3 {
            probability += 15.0;
        }
    } else {
        probability -= 20.0;
    }

    probability += match pattern.kind {
        BehaviourPatternKind::Specialized if seen => 20.0,
        BehaviourPatternKind::Specialized => -30.0,
        BehaviourPatternKind::Repetitive => 15.0,
        BehaviourPatternKind::Periodic => 10.0,
        BehaviourPatternKind::Chaotic => 0.0,
        BehaviourPatternKind::Mixed => 5.0,
        BehaviourPatternKind::Escalating
            if matches!(crime, CrimeType::Murder | CrimeType::ArmedRobbery) =>
        {
            25.0
        }
        BehaviourPatternKind::Escalating => -5.0,
        BehaviourPatternKind::InsufficientData => -10.0,
    };

    if let Some(since) = analysis.last_violation_days_ago {
        if f64::from(since) > f64::from(days) * 0.8 {
            probability += 10.0;
        }
    }

    probability += match analysis.trend {
        HistoryTrend::Accelerating => 15.0,
        HistoryTrend::Decelerating => -10.0,
        HistoryTrend::Stable | HistoryTrend::NoData => 0.0,
    };

    let probability = (probability.clamp(5.0, 95.0) * 10.0).round() / 10.0;

    let width = 30.0 - pattern.confidence * 20.0;
    let spread = (f64::from(days) * width / 100.0).trunc() as u32;

    IndividualCrimeForecast {
        crime_type: crime,
        crime_label: crime.label(),
        probability,
        days,
        base_days,
        date: today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX),
        confidence_interval: ConfidenceInterval {
            lower: days.saturating_sub(spread).max(1),
            upper: days + spread,
        },
        confidence: pattern.confidence,
        risk_level: probability_level(probability),
        preventability: preventability(crime, pattern.kind, analysis.trend),
        factors: ForecastFactors {
            historical_frequency: seen,
            pattern_match: pattern.kind,
            trend: analysis.trend,
            days_since_last: analysis.last_violation_days_ago,
        },
    }
}

fn probability_level(probability: f64) -> RiskLevel {
    if probability >= 70.0 {
        RiskLevel::Critical
    } else if probability >= 50.0 {
        RiskLevel::High
    } else if probability >= 30.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn preventability(crime: CrimeType, pattern: BehaviourPatternKind, trend: HistoryTrend) -> f64 {
    let mut value: f64 = match crime {
        CrimeType::Theft => 80.0,
        CrimeType::Fraud => 75.0,
        CrimeType::Hooliganism => 85.0,
        CrimeType::Robbery => 70.0,
        CrimeType::Extortion => 65.0,
        CrimeType::ArmedRobbery => 60.0,
        CrimeType::Rape => 55.0,
        CrimeType::Murder => 50.0,
    };

    value += match pattern {
        BehaviourPatternKind::Periodic => 10.0,
        BehaviourPatternKind::Chaotic => -10.0,
        BehaviourPatternKind::Escalating => -15.0,
        _ => 0.0,
    };
    value += match trend {
        HistoryTrend::Decelerating => 5.0,
        HistoryTrend::Accelerating => -5.0,
        HistoryTrend::Stable | HistoryTrend::NoData => 0.0,
    };

    value.clamp(20.0, 95.0)
}

fn critical_periods(
    forecasts: &[IndividualCrimeForecast],
    today: NaiveDate,
) -> Vec<CriticalPeriod> {
    let mut groups: BTreeMap<u32, Vec<&IndividualCrimeForecast>> = BTreeMap::new();
    for forecast in forecasts {
        if forecast.probability >= CRITICAL_PERIOD_PROBABILITY {
            groups
                .entry(forecast.days / DAYS_PER_PERIOD)
                .or_default()
                .push(forecast);
        }
    }

    let mut periods: Vec<CriticalPeriod> = groups
        .into_values()
        .filter(|group| group.len() >= 2)
        .map(|group| {
            let start = group.iter().map(|forecast| forecast.days).min().unwrap_or(0);
            let end = group.iter().map(|forecast| forecast.days).max().unwrap_or(0);
            let avg = mean(group.iter().map(|forecast| forecast.probability));

            let mut recommended_interventions = Vec::new();
            for forecast in &group {
                for program in program_for(forecast.crime_type)
                    .programs
                    .iter()
                    .take(PROGRAMS_PER_CRIME)
                    .copied()
                {
                    if !recommended_interventions.contains(&program) {
                        recommended_interventions.push(program);
                    }
                }
            }

            CriticalPeriod {
                start_date: offset(today, start),
                end_date: offset(today, end),
                risk_level: if avg >= 60.0 {
                    RiskLevel::High
                } else {
                    RiskLevel::Medium
                },
                crime_types: group.iter().map(|forecast| forecast.crime_type).collect(),
                avg_probability: (avg * 10.0).round() / 10.0,
                recommended_interventions,
            }
        })
        .collect();

    periods.sort_by_key(|period| period.start_date);
    periods
}

fn offset(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

fn history_confidence(violations: usize) -> f64 {
    match violations {
        0..=1 => 0.3,
        2..=4 => 0.5,
        5..=9 => 0.7,
        _ => 0.85,
    }
}
