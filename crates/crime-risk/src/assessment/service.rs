use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::PersonAttributes;
use super::forecast::{CrimeForecast, CrimeTimeline, CrimeTimelineForecaster};
use super::history::{IndividualForecast, IndividualForecaster, ViolationRecord};
use super::interventions::{plan_interventions, InterventionPlan};
use super::scoring::{RiskComponents, RiskLevel, RiskScorer};
use super::tables::{ReferenceTableError, ReferenceTables, ResearchStatistics};
use super::validation::{AssessmentRequest, ValidatedPerson};

pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_MIN_PROBABILITY: f64 = 50.0;
pub const DEFAULT_MONTHS_AHEAD: u32 = 6;
pub const DEFAULT_TIMELINE_LIMIT: usize = 8;
pub const MAX_TIMELINE_LIMIT: usize = 20;
pub const MAX_MONTHS_AHEAD: u32 = 12;

const PRIORITY_LIMIT: usize = 5;
const DAYS_PER_MONTH: u32 = 30;
const PREVENTION_LEAD_DAYS: u32 = 30;

/// Score, level and components for a single validated person.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iin: Option<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_level_label: &'static str,
    pub recommendation: &'static str,
    pub components: RiskComponents,
    pub person: PersonAttributes,
    pub calculated_at: DateTime<Utc>,
}

/// Assessment enriched with the forecast timeline and intervention plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    pub forecasts: CrimeTimeline,
    pub interventions: InterventionPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_level_label: &'static str,
    pub recommendation: &'static str,
    pub components: RiskComponents,
    pub most_likely_crime: Option<CrimeForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iin: Option<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchAssessment {
    pub results: Vec<RiskAssessment>,
    pub errors: Vec<BatchFailure>,
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreventionUrgency {
    High,
    Medium,
    Low,
}

impl PreventionUrgency {
    fn from_days(days: u32) -> Self {
        match days {
            0..=89 => PreventionUrgency::High,
            90..=179 => PreventionUrgency::Medium,
            _ => PreventionUrgency::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityCrime {
    #[serde(flatten)]
    pub forecast: CrimeForecast,
    pub prevention_window: u32,
    pub urgency: PreventionUrgency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityCrimes {
    pub priority_crimes: Vec<PriorityCrime>,
    pub total_found: usize,
    pub total_analyzed: usize,
    pub min_probability_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarRiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreventionMonth {
    pub month: String,
    pub start_day: u32,
    pub end_day: u32,
    pub risks: Vec<CrimeForecast>,
    pub recommendations: Vec<String>,
    pub risk_level: CalendarRiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreventionCalendar {
    pub months: Vec<PreventionMonth>,
    pub planning_period_months: u32,
}

/// Error raised by the assessment engine.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Tables(#[from] ReferenceTableError),
    #[error("batch must contain at least one record")]
    EmptyBatch,
    #[error("batch of {size} records exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },
    #[error("batch size limit must be at least 1")]
    InvalidBatchLimit,
    #[error("min_probability must be between 5 and 95, found {0}")]
    ProbabilityThresholdOutOfRange(f64),
    #[error("months_ahead must be between 1 and 12, found {0}")]
    MonthsOutOfRange(u32),
    #[error("limit must be between 1 and 20, found {0}")]
    TimelineLimitOutOfRange(usize),
}

/// Engine composing the scorer, forecasters and intervention planner over one validated
/// set of tables.
#[derive(Debug, Clone)]
pub struct AssessmentEngine {
    tables: Arc<ReferenceTables>,
    scorer: RiskScorer,
    forecaster: CrimeTimelineForecaster,
    individual: IndividualForecaster,
    max_batch_size: usize,
}

impl AssessmentEngine {
    pub fn new(tables: ReferenceTables) -> Result<Self, AssessmentServiceError> {
        Self::with_batch_limit(tables, DEFAULT_MAX_BATCH_SIZE)
    }

    pub fn with_batch_limit(
        tables: ReferenceTables,
        max_batch_size: usize,
    ) -> Result<Self, AssessmentServiceError> {
        tables.validate()?;
        if max_batch_size == 0 {
            return Err(AssessmentServiceError::InvalidBatchLimit);
        }

        let tables = Arc::new(tables);
        let scorer = RiskScorer::new(tables.clone());
        let forecaster = CrimeTimelineForecaster::new(scorer.clone());
        let individual = IndividualForecaster::new(tables.clone());

        Ok(Self {
            tables,
            scorer,
            forecaster,
            individual,
            max_batch_size,
        })
    }

    pub fn standard() -> Result<Self, AssessmentServiceError> {
        Self::new(ReferenceTables::standard())
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    pub fn forecaster(&self) -> &CrimeTimelineForecaster {
        &self.forecaster
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn statistics(&self) -> ResearchStatistics {
        ResearchStatistics::standard()
    }

    /// Score a validated person without forecasting.
    pub fn calculate(&self, person: &ValidatedPerson) -> RiskAssessment {
        let score = self.scorer.score(&person.attributes);
        let level = RiskLevel::from_score(score.risk_score);

        info!(
            risk_score = score.risk_score,
            level = level.label(),
            pattern = %person.attributes.pattern_type,
            "risk assessment completed"
        );

        RiskAssessment {
            iin: person.iin.clone(),
            risk_score: score.risk_score,
            risk_level: level,
            risk_level_label: level.label(),
            recommendation: level.recommendation(),
            components: score.components,
            person: person.attributes.clone(),
            calculated_at: Utc::now(),
        }
    }

    pub fn forecast(&self, attrs: &PersonAttributes, today: NaiveDate) -> CrimeTimeline {
        self.forecaster.forecast(attrs, today)
    }

    /// Nearest forecasts first, truncated to `limit`.
    pub fn timeline(
        &self,
        attrs: &PersonAttributes,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<CrimeForecast>, AssessmentServiceError> {
        if !(1..=MAX_TIMELINE_LIMIT).contains(&limit) {
            return Err(AssessmentServiceError::TimelineLimitOutOfRange(limit));
        }

        let mut forecasts = self.forecast(attrs, today).into_forecasts();
        forecasts.truncate(limit);
        Ok(forecasts)
    }

    pub fn assess(&self, person: &ValidatedPerson, today: NaiveDate) -> RiskReport {
        let assessment = self.calculate(person);
        let forecasts = self
            .forecaster
            .forecast_with_score(&person.attributes, assessment.risk_score, today);
        let interventions = plan_interventions(assessment.risk_score, forecasts.forecasts(), today);

        RiskReport {
            assessment,
            forecasts,
            interventions,
        }
    }

    pub fn quick_assessment(&self, attrs: &PersonAttributes, today: NaiveDate) -> QuickAssessment {
        let score = self.scorer.score(attrs);
        let level = RiskLevel::from_score(score.risk_score);
        let timeline = self
            .forecaster
            .forecast_with_score(attrs, score.risk_score, today);

        QuickAssessment {
            risk_score: score.risk_score,
            risk_level: level,
            risk_level_label: level.label(),
            recommendation: level.recommendation(),
            components: score.components,
            most_likely_crime: timeline.into_forecasts().into_iter().next(),
        }
    }

    /// Validate and score every request, keeping per-index failures instead of aborting.
    pub fn assess_batch(
        &self,
        requests: Vec<AssessmentRequest>,
    ) -> Result<BatchAssessment, AssessmentServiceError> {
        if requests.is_empty() {
            return Err(AssessmentServiceError::EmptyBatch);
        }
        if requests.len() > self.max_batch_size {
            return Err(AssessmentServiceError::BatchTooLarge {
                size: requests.len(),
                limit: self.max_batch_size,
            });
        }

        let total_processed = requests.len();
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for (index, request) in requests.into_iter().enumerate() {
            let iin = request.iin.clone();
            match request.validate() {
                Ok(person) => results.push(self.calculate(&person)),
                Err(error) => {
                    warn!(index, %error, "batch record rejected");
                    errors.push(BatchFailure {
                        index,
                        iin,
                        errors: error.messages(),
                    });
                }
            }
        }

        Ok(BatchAssessment {
            successful: results.len(),
            failed: errors.len(),
            total_processed,
            results,
            errors,
        })
    }

    pub fn priority_crimes(
        &self,
        attrs: &PersonAttributes,
        today: NaiveDate,
        min_probability: f64,
    ) -> Result<PriorityCrimes, AssessmentServiceError> {
        if !(5.0..=95.0).contains(&min_probability) {
            return Err(AssessmentServiceError::ProbabilityThresholdOutOfRange(
                min_probability,
            ));
        }

        let timeline = self.forecast(attrs, today);
        let total_analyzed = timeline.len();

        let mut matching: Vec<PriorityCrime> = timeline
            .into_forecasts()
            .into_iter()
            .filter(|forecast| forecast.probability >= min_probability)
            .map(|forecast| PriorityCrime {
                prevention_window: forecast.days.saturating_sub(PREVENTION_LEAD_DAYS).max(1),
                urgency: PreventionUrgency::from_days(forecast.days),
                forecast,
            })
            .collect();

        matching.sort_by(|a, b| b.forecast.probability.total_cmp(&a.forecast.probability));
        let total_found = matching.len();
        matching.truncate(PRIORITY_LIMIT);

        Ok(PriorityCrimes {
            priority_crimes: matching,
            total_found,
            total_analyzed,
            min_probability_threshold: min_probability,
        })
    }

    pub fn prevention_calendar(
        &self,
        attrs: &PersonAttributes,
        today: NaiveDate,
        months_ahead: u32,
    ) -> Result<PreventionCalendar, AssessmentServiceError> {
        if !(1..=MAX_MONTHS_AHEAD).contains(&months_ahead) {
            return Err(AssessmentServiceError::MonthsOutOfRange(months_ahead));
        }

        let timeline = self.forecast(attrs, today);
        let months = (0..months_ahead)
            .map(|offset| calendar_month(&timeline, today, offset))
            .collect();

        Ok(PreventionCalendar {
            months,
            planning_period_months: months_ahead,
        })
    }

    /// Forecast from the person's own violation record rather than the population windows.
    pub fn individual_forecast(
        &self,
        person: &ValidatedPerson,
        violations: &[ViolationRecord],
        today: NaiveDate,
    ) -> IndividualForecast {
        let forecast = self
            .individual
            .forecast(person.iin.clone(), &person.attributes, violations, today);

        info!(
            violations = violations.len(),
            pattern = ?forecast.behaviour_pattern.kind,
            critical_periods = forecast.critical_periods.len(),
            "individual forecast completed"
        );

        forecast
    }

    pub fn intervention_plan(
        &self,
        attrs: &PersonAttributes,
        today: NaiveDate,
    ) -> InterventionPlan {
        let score = self.scorer.score(attrs);
        let timeline = self
            .forecaster
            .forecast_with_score(attrs, score.risk_score, today);
        plan_interventions(score.risk_score, timeline.forecasts(), today)
    }
}

fn calendar_month(timeline: &CrimeTimeline, today: NaiveDate, offset: u32) -> PreventionMonth {
    let start_day = DAYS_PER_MONTH * offset;
    let end_day = DAYS_PER_MONTH * (offset + 1);
    let anchor = today
        .checked_add_days(Days::new(u64::from(start_day)))
        .unwrap_or(NaiveDate::MAX);

    let mut risks: Vec<CrimeForecast> = timeline
        .forecasts()
        .iter()
        .filter(|forecast| (start_day..=end_day).contains(&forecast.days))
        .cloned()
        .collect();
    risks.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let mut recommendations: Vec<String> = risks
        .iter()
        .filter_map(|risk| {
            if risk.probability > 60.0 {
                Some(format!("Enhanced control - risk of {}", risk.crime_type))
            } else if risk.probability > 40.0 {
                Some(format!("Preventive work - possible {}", risk.crime_type))
            } else {
                None
            }
        })
        .collect();
    if recommendations.is_empty() {
        recommendations.push("Standard monitoring".to_string());
    }

    let risk_level = if risks.iter().any(|risk| risk.probability > 70.0) {
        CalendarRiskLevel::High
    } else if risks.iter().any(|risk| risk.probability > 40.0) {
        CalendarRiskLevel::Medium
    } else {
        CalendarRiskLevel::Low
    };

    PreventionMonth {
        month: anchor.format("%Y-%m").to_string(),
        start_day,
        end_day,
        risks,
        recommendations,
        risk_level,
    }
}
