use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Behavioural classification of a person's violation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    MixedUnstable,
    ChronicCriminal,
    Escalating,
    Deescalating,
    Single,
    Unknown,
}

impl Default for PatternType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl PatternType {
    pub const ALL: [PatternType; 6] = [
        PatternType::MixedUnstable,
        PatternType::ChronicCriminal,
        PatternType::Escalating,
        PatternType::Deescalating,
        PatternType::Single,
        PatternType::Unknown,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PatternType::MixedUnstable => "mixed_unstable",
            PatternType::ChronicCriminal => "chronic_criminal",
            PatternType::Escalating => "escalating",
            PatternType::Deescalating => "deescalating",
            PatternType::Single => "single",
            PatternType::Unknown => "unknown",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.key() == normalized)
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Crime categories tracked by the research time-window tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrimeType {
    Fraud,
    Theft,
    Murder,
    Extortion,
    Robbery,
    ArmedRobbery,
    Rape,
    Hooliganism,
}

impl CrimeType {
    pub const ALL: [CrimeType; 8] = [
        CrimeType::Fraud,
        CrimeType::Theft,
        CrimeType::Murder,
        CrimeType::Extortion,
        CrimeType::Robbery,
        CrimeType::ArmedRobbery,
        CrimeType::Rape,
        CrimeType::Hooliganism,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            CrimeType::Fraud => "fraud",
            CrimeType::Theft => "theft",
            CrimeType::Murder => "murder",
            CrimeType::Extortion => "extortion",
            CrimeType::Robbery => "robbery",
            CrimeType::ArmedRobbery => "armed_robbery",
            CrimeType::Rape => "rape",
            CrimeType::Hooliganism => "hooliganism",
        }
    }

    /// Category name as recorded in the source research dataset.
    pub fn label(&self) -> &'static str {
        match self {
            CrimeType::Fraud => "Мошенничество",
            CrimeType::Theft => "Кража",
            CrimeType::Murder => "Убийство",
            CrimeType::Extortion => "Вымогательство",
            CrimeType::Robbery => "Грабеж",
            CrimeType::ArmedRobbery => "Разбой",
            CrimeType::Rape => "Изнасилование",
            CrimeType::Hooliganism => "Хулиганство",
        }
    }
}

impl fmt::Display for CrimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Validated person record consumed by the scorer and forecaster.
///
/// Every field carries its documented default, so the scoring core never has
/// to reason about missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonAttributes {
    pub pattern_type: PatternType,
    pub total_cases: u32,
    pub criminal_count: u32,
    pub admin_count: u32,
    pub days_since_last: u32,
    pub recidivism_rate: f64,
    pub current_age: u32,
    pub age_at_first_violation: u32,
    #[serde(with = "flag")]
    pub has_property: bool,
    #[serde(with = "flag")]
    pub has_job: bool,
    #[serde(with = "flag")]
    pub has_family: bool,
    #[serde(with = "flag")]
    pub substance_abuse: bool,
    #[serde(with = "flag")]
    pub has_escalation: bool,
    pub admin_to_criminal: u32,
}

pub const DEFAULT_DAYS_SINCE_LAST: u32 = 365;
pub const DEFAULT_CURRENT_AGE: u32 = 35;

impl Default for PersonAttributes {
    fn default() -> Self {
        Self {
            pattern_type: PatternType::Unknown,
            total_cases: 0,
            criminal_count: 0,
            admin_count: 0,
            days_since_last: DEFAULT_DAYS_SINCE_LAST,
            recidivism_rate: 0.0,
            current_age: DEFAULT_CURRENT_AGE,
            age_at_first_violation: DEFAULT_CURRENT_AGE,
            has_property: false,
            has_job: false,
            has_family: false,
            substance_abuse: false,
            has_escalation: false,
            admin_to_criminal: 0,
        }
    }
}

/// 0/1 encoding used by the upstream datasets; `true`/`false` is accepted too.
pub mod flag {
    use super::*;

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawFlag::deserialize(deserializer)? {
            RawFlag::Bool(value) => Ok(value),
            RawFlag::Int(0) => Ok(false),
            RawFlag::Int(1) => Ok(true),
            RawFlag::Int(other) => Err(serde::de::Error::custom(format!(
                "flag must be 0 or 1, found {other}"
            ))),
        }
    }

    pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawFlag>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawFlag::Bool(value)) => Ok(Some(value)),
            Some(RawFlag::Int(0)) => Ok(Some(false)),
            Some(RawFlag::Int(1)) => Ok(Some(true)),
            Some(RawFlag::Int(other)) => Err(serde::de::Error::custom(format!(
                "flag must be 0 or 1, found {other}"
            ))),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Int(i64),
    }
}
