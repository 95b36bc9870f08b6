use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::domain::PatternType;
use super::validation::{normalize_iin, AssessmentRequest, ValidatedPerson};

/// Reads person records from CSV exports of the violation registry.
pub struct PersonCsvImporter;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedPerson {
    pub row: u64,
    #[serde(flatten)]
    pub person: ValidatedPerson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRowError {
    pub row: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iin: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonImport {
    pub records: Vec<ImportedPerson>,
    pub errors: Vec<ImportRowError>,
}

impl PersonImport {
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.errors.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersonImportError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl PersonCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<PersonImport, PersonImportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PersonImportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<PersonImport, PersonImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut import = PersonImport::default();

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = record
                .position()
                .map(|position| position.line())
                .unwrap_or(index as u64 + 2);
            let parsed: PersonRow = record.deserialize(Some(&headers))?;
            let iin = parsed
                .iin
                .as_deref()
                .map(normalize_iin)
                .filter(|iin| !iin.is_empty());

            let outcome = parsed
                .into_request()
                .and_then(|request| request.validate().map_err(|error| error.messages()));

            match outcome {
                Ok(person) => import.records.push(ImportedPerson { row, person }),
                Err(messages) => {
                    let message = messages.join("; ");
                    warn!(
                        row,
                        iin = iin.as_deref().unwrap_or("-"),
                        %message,
                        "skipping person row"
                    );
                    import.errors.push(ImportRowError { row, iin, message });
                }
            }
        }

        info!(
            imported = import.records.len(),
            skipped = import.errors.len(),
            "person import finished"
        );

        Ok(import)
    }
}

#[derive(Debug, Deserialize)]
struct PersonRow {
    #[serde(
        alias = "IIN",
        alias = "ИИН",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    iin: Option<String>,
    #[serde(alias = "pattern", default, deserialize_with = "empty_string_as_none")]
    pattern_type: Option<String>,
    #[serde(
        alias = "total_violations",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    total_cases: Option<String>,
    #[serde(
        alias = "criminal_cases",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    criminal_count: Option<String>,
    #[serde(
        alias = "admin_violations",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    admin_count: Option<String>,
    #[serde(
        alias = "days_since_last_violation",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    days_since_last: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    recidivism_rate: Option<String>,
    #[serde(alias = "age", default, deserialize_with = "empty_string_as_none")]
    current_age: Option<String>,
    #[serde(
        alias = "first_violation_age",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    age_at_first_violation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    has_property: Option<String>,
    #[serde(alias = "employed", default, deserialize_with = "empty_string_as_none")]
    has_job: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    has_family: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    substance_abuse: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    has_escalation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    admin_to_criminal: Option<String>,
}

impl PersonRow {
    fn into_request(self) -> Result<AssessmentRequest, Vec<String>> {
        let mut errors = Vec::new();

        let pattern_type = self.pattern_type.as_deref().and_then(|raw| {
            let parsed = PatternType::from_key(raw);
            if parsed.is_none() {
                errors.push(format!("unknown pattern_type '{raw}'"));
            }
            parsed
        });

        let request = AssessmentRequest {
            iin: self.iin,
            pattern_type,
            total_cases: number(&mut errors, "total_cases", self.total_cases),
            criminal_count: number(&mut errors, "criminal_count", self.criminal_count),
            admin_count: number(&mut errors, "admin_count", self.admin_count),
            days_since_last: number(&mut errors, "days_since_last", self.days_since_last),
            recidivism_rate: number(&mut errors, "recidivism_rate", self.recidivism_rate),
            current_age: number(&mut errors, "current_age", self.current_age),
            age_at_first_violation: number(
                &mut errors,
                "age_at_first_violation",
                self.age_at_first_violation,
            ),
            has_property: flag(&mut errors, "has_property", self.has_property),
            has_job: flag(&mut errors, "has_job", self.has_job),
            has_family: flag(&mut errors, "has_family", self.has_family),
            substance_abuse: flag(&mut errors, "substance_abuse", self.substance_abuse),
            has_escalation: flag(&mut errors, "has_escalation", self.has_escalation),
            admin_to_criminal: number(&mut errors, "admin_to_criminal", self.admin_to_criminal),
        };

        if errors.is_empty() {
            Ok(request)
        } else {
            Err(errors)
        }
    }
}

fn number<T: FromStr>(errors: &mut Vec<String>, field: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    // Spreadsheet exports write whole numbers as "3.0".
    let trimmed = raw.strip_suffix(".0").unwrap_or(&raw);
    match trimmed.parse::<T>().or_else(|_| raw.parse::<T>()) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(format!("{field} is not a valid number: '{raw}'"));
            None
        }
    }
}

fn flag(errors: &mut Vec<String>, field: &str, raw: Option<String>) -> Option<bool> {
    let raw = raw?;
    match parse_flag(&raw) {
        Some(value) => Some(value),
        None => {
            errors.push(format!("{field} must be a yes/no flag: '{raw}'"));
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "1.0" | "yes" | "y" | "true" | "да" => Some(true),
        "0" | "0.0" | "no" | "n" | "false" | "нет" => Some(false),
        _ => None,
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
