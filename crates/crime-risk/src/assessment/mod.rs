//! Recidivism risk scoring and crime timeline forecasting.
//!
//! Reference tables are validated once when the [`AssessmentEngine`] is built and shared
//! read-only by the scorer, both forecasters and the intervention planner. Every operation
//! is a pure function of the person record, its violation history when supplied, and the
//! caller-supplied reference date.

pub mod domain;
pub mod forecast;
pub mod history;
pub mod import;
pub mod interventions;
pub mod router;
pub mod scoring;
pub mod service;
pub mod tables;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{CrimeType, PatternType, PersonAttributes};
pub use forecast::{
    ConfidenceInterval, CrimeForecast, CrimeTimeline, CrimeTimelineForecaster,
    ForecastConfidence, TimelineRiskLevel,
};
pub use history::{
    classify_violation, BehaviourPattern, BehaviourPatternKind, CriticalPeriod, HistoryAnalysis,
    HistoryTrend, IndividualCrimeForecast, IndividualForecast, IndividualForecaster,
    ViolationRecord,
};
pub use import::{
    ImportRowError, ImportedPerson, PersonCsvImporter, PersonImport, PersonImportError,
};
pub use interventions::{
    plan_interventions, InterventionEvent, InterventionPlan, InterventionPriority,
    InterventionProgram,
};
pub use router::assessment_router;
pub use scoring::{get_risk_level, RiskComponents, RiskLevel, RiskScore, RiskScorer};
pub use service::{
    AssessmentEngine, AssessmentServiceError, BatchAssessment, PreventionCalendar,
    PriorityCrimes, QuickAssessment, RiskAssessment, RiskReport,
};
pub use tables::{ReferenceTableError, ReferenceTables, ResearchStatistics, RiskWeights};
pub use validation::{
    check_iin, AssessmentRequest, IinCheck, RequestValidationError, ValidatedPerson,
    ValidationError,
};
