use super::domain::CrimeType;
use super::forecast::CrimeForecast;
use super::tables::RISK_THRESHOLDS;
use chrono::{Days, NaiveDate};
use serde::Serialize;

const LIKELY_PROBABILITY: f64 = 50.0;
const LEAD_TIME_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionUrgency {
    Medium,
    High,
    Critical,
}

/// Prevention programmes recommended for one crime category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InterventionProgram {
    pub programs: &'static [&'static str],
    pub urgency: InterventionUrgency,
    pub duration_days: u32,
}

pub fn program_for(crime: CrimeType) -> InterventionProgram {
    use InterventionUrgency::*;

    match crime {
        CrimeType::Theft => InterventionProgram {
            programs: &[
                "Employment assistance",
                "Financial counselling",
                "Social assistance",
            ],
            urgency: High,
            duration_days: 90,
        },
        CrimeType::Fraud => InterventionProgram {
            programs: &["Legal education", "Financial literacy", "Ethics education"],
            urgency: Critical,
            duration_days: 60,
        },
        CrimeType::Murder => InterventionProgram {
            programs: &[
                "Anger management",
                "Psychological support",
                "Alcohol control",
                "Conflict mediation",
            ],
            urgency: Critical,
            duration_days: 120,
        },
        CrimeType::Robbery => InterventionProgram {
            programs: &[
                "Social adaptation",
                "Employment assistance",
                "Rehabilitation",
            ],
            urgency: High,
            duration_days: 90,
        },
        CrimeType::ArmedRobbery => InterventionProgram {
            programs: &[
                "Intensive supervision",
                "Psychological correction",
                "Social support",
            ],
            urgency: Critical,
            duration_days: 120,
        },
        CrimeType::Hooliganism => InterventionProgram {
            programs: &["Leisure programmes", "Sports", "Community service"],
            urgency: Medium,
            duration_days: 60,
        },
        CrimeType::Extortion => InterventionProgram {
            programs: &[
                "Legal education",
                "Economic support",
                "Psychological support",
            ],
            urgency: High,
            duration_days: 90,
        },
        CrimeType::Rape => InterventionProgram {
            programs: &["Psychiatric care", "Behaviour monitoring", "Therapy"],
            urgency: Critical,
            duration_days: 180,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionPriority {
    Standard,
    High,
    Critical,
}

impl InterventionPriority {
    fn from_score(score: f64) -> Self {
        if score >= RISK_THRESHOLDS.critical {
            InterventionPriority::Critical
        } else if score >= RISK_THRESHOLDS.high {
            InterventionPriority::High
        } else {
            InterventionPriority::Standard
        }
    }

    pub fn monitoring_frequency(&self) -> &'static str {
        match self {
            InterventionPriority::Critical => "Daily",
            InterventionPriority::High => "2-3 times a week",
            InterventionPriority::Standard => "Weekly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionEvent {
    pub crime_type: CrimeType,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    pub programs: Vec<&'static str>,
    pub urgency: InterventionUrgency,
}

/// Personal prevention plan assembled from the likely forecasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterventionPlan {
    pub priority: InterventionPriority,
    pub monitoring_frequency: &'static str,
    pub programs: Vec<&'static str>,
    pub timeline: Vec<InterventionEvent>,
    pub responsible_agencies: Vec<&'static str>,
}

pub fn plan_interventions(
    risk_score: f64,
    forecasts: &[CrimeForecast],
    today: NaiveDate,
) -> InterventionPlan {
    let priority = InterventionPriority::from_score(risk_score);
    let mut programs: Vec<&'static str> = Vec::new();
    let mut timeline = Vec::new();

    for forecast in forecasts
        .iter()
        .filter(|forecast| forecast.probability > LIKELY_PROBABILITY)
    {
        let catalogue = program_for(forecast.crime_type);
        for program in catalogue.programs.iter().copied() {
            if !programs.contains(&program) {
                programs.push(program);
            }
        }

        let deadline = forecast
            .date
            .checked_sub_days(Days::new(LEAD_TIME_DAYS))
            .unwrap_or(today);

        timeline.push(InterventionEvent {
            crime_type: forecast.crime_type,
            start_date: today,
            deadline,
            programs: catalogue.programs.to_vec(),
            urgency: catalogue.urgency,
        });
    }

    timeline.sort_by_key(|event| event.deadline);

    let mut responsible_agencies = Vec::new();
    if programs.iter().any(|program| program.contains("Employment")) {
        responsible_agencies.push("Employment service");
    }
    if programs.iter().any(|program| program.contains("Psycholog")) {
        responsible_agencies.push("Psychological service");
    }
    if programs.iter().any(|program| program.contains("Social")) {
        responsible_agencies.push("Social protection");
    }
    if risk_score >= RISK_THRESHOLDS.high {
        responsible_agencies.push("District police");
    }

    InterventionPlan {
        priority,
        monitoring_frequency: priority.monitoring_frequency(),
        programs,
        timeline,
        responsible_agencies,
    }
}
