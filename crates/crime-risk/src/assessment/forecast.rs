use super::domain::{CrimeType, PatternType, PersonAttributes};
use super::scoring::RiskScorer;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::debug;

pub const MIN_FORECAST_DAYS: u32 = 30;
pub const MAX_FORECAST_DAYS: u32 = 365;

/// How much evidence backs a single forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastConfidence {
    Low,
    Medium,
    High,
}

impl ForecastConfidence {
    fn from_signals(attrs: &PersonAttributes) -> Self {
        let signals = [
            attrs.total_cases > 5,
            attrs.pattern_type != PatternType::Unknown,
            attrs.has_escalation,
        ]
        .into_iter()
        .filter(|signal| *signal)
        .count();

        match signals {
            3 => ForecastConfidence::High,
            2 => ForecastConfidence::Medium,
            _ => ForecastConfidence::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ForecastConfidence::High => "Высокая",
            ForecastConfidence::Medium => "Средняя",
            ForecastConfidence::Low => "Низкая",
        }
    }
}

/// Urgency band derived purely from the forecast horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineRiskLevel {
    CriticalPeriod,
    HighRisk,
    MediumRisk,
    LowRisk,
}

impl TimelineRiskLevel {
    pub fn from_days(days: u32) -> Self {
        match days {
            0..=59 => TimelineRiskLevel::CriticalPeriod,
            60..=119 => TimelineRiskLevel::HighRisk,
            120..=179 => TimelineRiskLevel::MediumRisk,
            _ => TimelineRiskLevel::LowRisk,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimelineRiskLevel::CriticalPeriod => "Critical period",
            TimelineRiskLevel::HighRisk => "High risk",
            TimelineRiskLevel::MediumRisk => "Medium risk",
            TimelineRiskLevel::LowRisk => "Low risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: u32,
    pub upper: u32,
}

impl ConfidenceInterval {
    fn around(days: u32) -> Self {
        let days = f64::from(days);
        Self {
            lower: (days * 0.7).round() as u32,
            upper: (days * 1.4).round() as u32,
        }
    }

    pub fn contains(&self, days: u32) -> bool {
        self.lower <= days && days <= self.upper
    }
}

/// Expected window until a single crime category might occur.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrimeForecast {
    pub crime_type: CrimeType,
    pub crime_label: &'static str,
    pub days: u32,
    pub date: NaiveDate,
    pub probability: f64,
    pub confidence_interval: ConfidenceInterval,
    pub confidence: ForecastConfidence,
    pub confidence_label: &'static str,
    pub risk_level: TimelineRiskLevel,
    pub risk_level_label: &'static str,
}

/// Forecasts for every tracked crime type, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CrimeTimeline {
    forecasts: Vec<CrimeForecast>,
}

impl CrimeTimeline {
    pub fn forecasts(&self) -> &[CrimeForecast] {
        &self.forecasts
    }

    pub fn into_forecasts(self) -> Vec<CrimeForecast> {
        self.forecasts
    }

    pub fn get(&self, crime: CrimeType) -> Option<&CrimeForecast> {
        self.forecasts.iter().find(|forecast| forecast.crime_type == crime)
    }

    pub fn most_likely(&self) -> Option<&CrimeForecast> {
        self.forecasts.first()
    }

    pub fn crime_types(&self) -> impl Iterator<Item = CrimeType> + '_ {
        self.forecasts.iter().map(|forecast| forecast.crime_type)
    }

    pub fn len(&self) -> usize {
        self.forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }
}

/// Converts a person record and its risk score into per-crime time windows.
#[derive(Debug, Clone)]
pub struct CrimeTimelineForecaster {
    scorer: RiskScorer,
}

impl CrimeTimelineForecaster {
    pub fn new(scorer: RiskScorer) -> Self {
        Self { scorer }
    }

    pub fn forecast(&self, attrs: &PersonAttributes, today: NaiveDate) -> CrimeTimeline {
        let risk = self.scorer.score(attrs);
        self.forecast_with_score(attrs, risk.risk_score, today)
    }

    /// Forecast with a score the caller already computed for `attrs`.
    pub fn forecast_with_score(
        &self,
        attrs: &PersonAttributes,
        risk_score: f64,
        today: NaiveDate,
    ) -> CrimeTimeline {
        let mut forecasts: Vec<CrimeForecast> = self
            .scorer
            .tables()
            .time_windows
            .iter()
            .map(|(crime, base_days)| self.single(attrs, risk_score, *crime, *base_days, today))
            .collect();

        forecasts.sort_by_key(|forecast| forecast.days);

        if let Some(nearest) = forecasts.first() {
            debug!(
                crime = %nearest.crime_type,
                days = nearest.days,
                probability = nearest.probability,
                "timeline forecast computed"
            );
        }

        CrimeTimeline { forecasts }
    }

    fn single(
        &self,
        attrs: &PersonAttributes,
        risk_score: f64,
        crime: CrimeType,
        base_days: u32,
        today: NaiveDate,
    ) -> CrimeForecast {
        let days = forecast_days(attrs, crime, base_days);
        let probability = self
            .scorer
            .crime_probability(attrs.pattern_type, risk_score, crime, days);
        let confidence = ForecastConfidence::from_signals(attrs);
        let risk_level = TimelineRiskLevel::from_days(days);
        let date = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);

        CrimeForecast {
            crime_type: crime,
            crime_label: crime.label(),
            days,
            date,
            probability,
            confidence_interval: ConfidenceInterval::around(days),
            confidence,
            confidence_label: confidence.label(),
            risk_level,
            risk_level_label: risk_level.label(),
        }
    }
}

fn forecast_days(attrs: &PersonAttributes, crime: CrimeType, base_days: u32) -> u32 {
    let scaled = f64::from(base_days)
        * age_modifier(attrs.current_age)
        * pattern_modifier(attrs.pattern_type, crime)
        * social_modifier(attrs);

    if scaled.is_finite() {
        (scaled.round() as u32).clamp(MIN_FORECAST_DAYS, MAX_FORECAST_DAYS)
    } else {
        base_days.clamp(MIN_FORECAST_DAYS, MAX_FORECAST_DAYS)
    }
}

fn age_modifier(age: u32) -> f64 {
    match age {
        0..=24 => 0.8,
        25..=34 => 0.9,
        35..=44 => 1.1,
        _ => 1.3,
    }
}

fn pattern_modifier(pattern: PatternType, crime: CrimeType) -> f64 {
    let base = match pattern {
        PatternType::MixedUnstable => 0.9,
        PatternType::ChronicCriminal => 0.7,
        PatternType::Escalating => 0.6,
        PatternType::Deescalating => 1.3,
        PatternType::Single => 1.5,
        PatternType::Unknown => 1.0,
    };

    match (pattern, crime) {
        (PatternType::ChronicCriminal, CrimeType::Theft | CrimeType::Robbery) => base * 0.9,
        (PatternType::Escalating, CrimeType::ArmedRobbery | CrimeType::Murder) => base * 0.8,
        _ => base,
    }
}

fn social_modifier(attrs: &PersonAttributes) -> f64 {
    let mut modifier = 1.0;
    if !attrs.has_property {
        modifier *= 0.85;
    }
    if !attrs.has_job {
        modifier *= 0.9;
    }
    if attrs.substance_abuse {
        modifier *= 0.8;
    }
    modifier
}
