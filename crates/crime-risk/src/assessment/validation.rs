use super::domain::{
    flag, PatternType, PersonAttributes, DEFAULT_CURRENT_AGE, DEFAULT_DAYS_SINCE_LAST,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_AGE: u32 = 14;
pub const MAX_AGE: u32 = 100;
const IIN_LENGTH: usize = 12;

/// Wire shape of a person record as submitted by API clients and CSV rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iin: Option<String>,
    #[serde(default)]
    pub pattern_type: Option<PatternType>,
    #[serde(default)]
    pub total_cases: Option<u32>,
    #[serde(default)]
    pub criminal_count: Option<u32>,
    #[serde(default)]
    pub admin_count: Option<u32>,
    #[serde(default)]
    pub days_since_last: Option<u32>,
    #[serde(default)]
    pub recidivism_rate: Option<f64>,
    #[serde(default)]
    pub current_age: Option<u32>,
    #[serde(default)]
    pub age_at_first_violation: Option<u32>,
    #[serde(default, deserialize_with = "flag::deserialize_optional")]
    pub has_property: Option<bool>,
    #[serde(default, deserialize_with = "flag::deserialize_optional")]
    pub has_job: Option<bool>,
    #[serde(default, deserialize_with = "flag::deserialize_optional")]
    pub has_family: Option<bool>,
    #[serde(default, deserialize_with = "flag::deserialize_optional")]
    pub substance_abuse: Option<bool>,
    #[serde(default, deserialize_with = "flag::deserialize_optional")]
    pub has_escalation: Option<bool>,
    #[serde(default)]
    pub admin_to_criminal: Option<u32>,
}

/// A request that passed boundary validation, with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedPerson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iin: Option<String>,
    pub attributes: PersonAttributes,
}

/// Single boundary rule violation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("current_age must be between 14 and 100, found {0}")]
    CurrentAgeOutOfRange(u32),
    #[error("age_at_first_violation must be between 14 and 100, found {0}")]
    FirstViolationAgeOutOfRange(u32),
    #[error("age_at_first_violation ({first}) cannot exceed current_age ({current})")]
    FirstViolationAfterCurrentAge { first: u32, current: u32 },
    #[error("criminal_count ({count}) cannot exceed total_cases ({total})")]
    CriminalCountExceedsTotal { count: u32, total: u32 },
    #[error("admin_count ({count}) cannot exceed total_cases ({total})")]
    AdminCountExceedsTotal { count: u32, total: u32 },
    #[error("recidivism_rate must be a non-negative number")]
    InvalidRecidivismRate,
    #[error("iin must contain exactly 12 digits")]
    InvalidIin,
}

/// Every violation found in one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestValidationError {
    pub errors: Vec<ValidationError>,
}

impl RequestValidationError {
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid person record: {}", self.messages().join("; "))
    }
}

impl std::error::Error for RequestValidationError {}

impl AssessmentRequest {
    pub fn validate(self) -> Result<ValidatedPerson, RequestValidationError> {
        let mut errors = Vec::new();

        let iin = self.iin.map(|raw| normalize_iin(&raw)).filter(|iin| !iin.is_empty());
        if let Some(iin) = &iin {
            if !check_iin(iin).valid {
                errors.push(ValidationError::InvalidIin);
            }
        }

        let current_age = self.current_age.unwrap_or(DEFAULT_CURRENT_AGE);
        if !(MIN_AGE..=MAX_AGE).contains(&current_age) {
            errors.push(ValidationError::CurrentAgeOutOfRange(current_age));
        }

        let age_at_first_violation = self.age_at_first_violation.unwrap_or(current_age);
        if self.age_at_first_violation.is_some() {
            if !(MIN_AGE..=MAX_AGE).contains(&age_at_first_violation) {
                errors.push(ValidationError::FirstViolationAgeOutOfRange(
                    age_at_first_violation,
                ));
            }
            if age_at_first_violation > current_age {
                errors.push(ValidationError::FirstViolationAfterCurrentAge {
                    first: age_at_first_violation,
                    current: current_age,
                });
            }
        }

        let total_cases = self.total_cases.unwrap_or(0);
        let criminal_count = self.criminal_count.unwrap_or(0);
        let mut admin_count = self.admin_count.unwrap_or(0);
        if criminal_count > total_cases {
            errors.push(ValidationError::CriminalCountExceedsTotal {
                count: criminal_count,
                total: total_cases,
            });
        }
        if admin_count > total_cases {
            errors.push(ValidationError::AdminCountExceedsTotal {
                count: admin_count,
                total: total_cases,
            });
        }

        let recidivism_rate = self.recidivism_rate.unwrap_or(0.0);
        if !recidivism_rate.is_finite() || recidivism_rate < 0.0 {
            errors.push(ValidationError::InvalidRecidivismRate);
        }

        if !errors.is_empty() {
            return Err(RequestValidationError { errors });
        }

        // Records that only carry a criminal count imply the remainder is administrative.
        if admin_count == 0 && criminal_count < total_cases {
            admin_count = total_cases - criminal_count;
        }

        Ok(ValidatedPerson {
            iin,
            attributes: PersonAttributes {
                pattern_type: self.pattern_type.unwrap_or_default(),
                total_cases,
                criminal_count,
                admin_count,
                days_since_last: self.days_since_last.unwrap_or(DEFAULT_DAYS_SINCE_LAST),
                recidivism_rate,
                current_age,
                age_at_first_violation,
                has_property: self.has_property.unwrap_or(false),
                has_job: self.has_job.unwrap_or(false),
                has_family: self.has_family.unwrap_or(false),
                substance_abuse: self.substance_abuse.unwrap_or(false),
                has_escalation: self.has_escalation.unwrap_or(false),
                admin_to_criminal: self.admin_to_criminal.unwrap_or(0),
            },
        })
    }
}

impl From<PersonAttributes> for AssessmentRequest {
    fn from(attrs: PersonAttributes) -> Self {
        Self {
            iin: None,
            pattern_type: Some(attrs.pattern_type),
            total_cases: Some(attrs.total_cases),
            criminal_count: Some(attrs.criminal_count),
            admin_count: Some(attrs.admin_count),
            days_since_last: Some(attrs.days_since_last),
            recidivism_rate: Some(attrs.recidivism_rate),
            current_age: Some(attrs.current_age),
            age_at_first_violation: Some(attrs.age_at_first_violation),
            has_property: Some(attrs.has_property),
            has_job: Some(attrs.has_job),
            has_family: Some(attrs.has_family),
            substance_abuse: Some(attrs.substance_abuse),
            has_escalation: Some(attrs.has_escalation),
            admin_to_criminal: Some(attrs.admin_to_criminal),
        }
    }
}

/// Outcome of a standalone IIN format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IinCheck {
    pub valid: bool,
    pub message: &'static str,
}

/// Check an IIN for presence, length and digits after stripping spaces and dashes.
pub fn check_iin(raw: &str) -> IinCheck {
    let iin = normalize_iin(raw);
    let (valid, message) = if iin.is_empty() {
        (false, "IIN is missing")
    } else if iin.chars().count() != IIN_LENGTH {
        (false, "IIN must contain 12 characters")
    } else if !iin.chars().all(|c| c.is_ascii_digit()) {
        (false, "IIN must contain only digits")
    } else {
        (true, "IIN is valid")
    };
    IinCheck { valid, message }
}

pub(crate) fn normalize_iin(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}
