use super::domain::{CrimeType, PatternType, PersonAttributes};
use super::tables::{ReferenceTables, RISK_THRESHOLDS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_SCORE: f64 = 10.0;
const MIN_PROBABILITY: f64 = 5.0;
const MAX_PROBABILITY: f64 = 95.0;

/// Weighted contribution of each factor; the sum, clamped to [0, 10], is the score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskComponents {
    pub pattern: f64,
    pub history: f64,
    pub time: f64,
    pub age: f64,
    pub social: f64,
    pub escalation: f64,
}

impl RiskComponents {
    pub fn total(&self) -> f64 {
        self.pattern + self.history + self.time + self.age + self.social + self.escalation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskScore {
    pub risk_score: f64,
    pub components: RiskComponents,
}

/// Triage band derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Lower bounds are inclusive: 7.0 is already critical.
    pub fn from_score(score: f64) -> Self {
        if score >= RISK_THRESHOLDS.critical {
            RiskLevel::Critical
        } else if score >= RISK_THRESHOLDS.high {
            RiskLevel::High
        } else if score >= RISK_THRESHOLDS.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Requires immediate intervention",
            RiskLevel::High => "Enhanced monitoring",
            RiskLevel::Medium => "Standard monitoring",
            RiskLevel::Low => "Minimal monitoring",
        }
    }
}

/// Map a score to its level label and recommendation.
pub fn get_risk_level(score: f64) -> (&'static str, &'static str) {
    let level = RiskLevel::from_score(score);
    (level.label(), level.recommendation())
}

/// Stateless scorer applying the reference tables to a person record.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    tables: Arc<ReferenceTables>,
}

impl RiskScorer {
    pub fn new(tables: Arc<ReferenceTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn score(&self, attrs: &PersonAttributes) -> RiskScore {
        let weights = &self.tables.weights;
        let pattern_score = self.tables.pattern_risk(attrs.pattern_type) * MAX_SCORE;

        let components = RiskComponents {
            pattern: pattern_score * weights.pattern,
            history: history_score(attrs) * weights.history,
            time: time_score(attrs) * weights.time,
            age: age_score(attrs) * weights.age,
            social: social_score(attrs) * weights.social,
            escalation: escalation_score(attrs) * weights.escalation,
        };

        RiskScore {
            risk_score: components.total().clamp(0.0, MAX_SCORE),
            components,
        }
    }

    /// Probability (percent, 5..=95) that `crime` occurs within `days_ahead`.
    pub fn crime_probability(
        &self,
        pattern: PatternType,
        risk_score: f64,
        crime: CrimeType,
        days_ahead: u32,
    ) -> f64 {
        let base_rate = self.tables.prevention_rate(crime);
        let risk_modifier = risk_score / MAX_SCORE;

        let expected_days = f64::from(self.tables.time_window(crime));
        let days_ahead = f64::from(days_ahead);
        let time_modifier = if days_ahead < expected_days * 0.5 {
            0.6
        } else if days_ahead < expected_days {
            0.8
        } else if days_ahead < expected_days * 1.5 {
            1.0
        } else {
            0.7
        };

        let pattern_modifier = match (pattern, crime) {
            (PatternType::ChronicCriminal, CrimeType::Theft | CrimeType::Robbery) => 1.3,
            (PatternType::Escalating, CrimeType::Robbery | CrimeType::ArmedRobbery) => 1.2,
            (PatternType::MixedUnstable, _) => 1.1,
            _ => 1.0,
        };

        (base_rate * risk_modifier * time_modifier * pattern_modifier)
            .clamp(MIN_PROBABILITY, MAX_PROBABILITY)
    }
}

fn history_score(attrs: &PersonAttributes) -> f64 {
    let total = attrs.total_cases;
    let mut score: f64 = match total {
        0 => return 0.0,
        1..=2 => 2.0,
        3..=5 => 4.0,
        6..=10 => 6.0,
        _ => 8.0,
    };

    if attrs.criminal_count > 0 {
        score += f64::from(attrs.criminal_count) / f64::from(total) * 2.0;
    }

    score.min(MAX_SCORE)
}

fn time_score(attrs: &PersonAttributes) -> f64 {
    let score: f64 = match attrs.days_since_last {
        0..=29 => 10.0,
        30..=89 => 8.0,
        90..=179 => 6.0,
        180..=364 => 4.0,
        _ => 2.0,
    };

    if attrs.recidivism_rate > 2.0 {
        (score + 2.0).min(MAX_SCORE)
    } else {
        score
    }
}

fn age_score(attrs: &PersonAttributes) -> f64 {
    let base: f64 = match attrs.current_age {
        18..=25 => 8.0,
        26..=35 => 6.0,
        36..=45 => 4.0,
        _ => 2.0,
    };

    let early_onset = match attrs.age_at_first_violation {
        0..=17 => 3.0,
        18..=20 => 2.0,
        21..=24 => 1.0,
        _ => 0.0,
    };

    (base + early_onset).min(MAX_SCORE)
}

fn social_score(attrs: &PersonAttributes) -> f64 {
    let mut score: f64 = 5.0;

    if attrs.has_property {
        score -= 2.0;
    } else {
        score += 1.0;
    }
    if attrs.has_job {
        score -= 2.0;
    } else {
        score += 1.0;
    }
    if attrs.has_family {
        score -= 1.0;
    }
    if attrs.substance_abuse {
        score += 2.0;
    }

    score.clamp(0.0, MAX_SCORE)
}

fn escalation_score(attrs: &PersonAttributes) -> f64 {
    if attrs.has_escalation {
        match attrs.admin_to_criminal {
            0 => 5.0,
            1..=2 => 7.0,
            _ => 9.0,
        }
    } else if attrs.admin_count > 5 {
        4.0
    } else {
        2.0
    }
}
