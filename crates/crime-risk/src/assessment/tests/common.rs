use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::assessment::{
    assessment_router, AssessmentEngine, AssessmentRequest, PatternType, PersonAttributes,
    ReferenceTables, ViolationRecord,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid date")
}

pub(super) fn engine() -> AssessmentEngine {
    AssessmentEngine::new(ReferenceTables::standard()).expect("standard tables are valid")
}

pub(super) fn engine_with_batch_limit(limit: usize) -> AssessmentEngine {
    AssessmentEngine::with_batch_limit(ReferenceTables::standard(), limit)
        .expect("standard tables are valid")
}

pub(super) fn router() -> axum::Router {
    assessment_router(Arc::new(engine()))
}

/// Worked example from the research notes: scores 5.76, "High".
pub(super) fn mixed_unstable_person() -> PersonAttributes {
    PersonAttributes {
        pattern_type: PatternType::MixedUnstable,
        total_cases: 5,
        criminal_count: 2,
        admin_count: 3,
        days_since_last: 60,
        recidivism_rate: 1.5,
        current_age: 28,
        age_at_first_violation: 21,
        has_property: false,
        has_job: true,
        has_family: false,
        substance_abuse: false,
        has_escalation: false,
        admin_to_criminal: 1,
    }
}

pub(super) fn chronic_person() -> PersonAttributes {
    PersonAttributes {
        pattern_type: PatternType::ChronicCriminal,
        total_cases: 14,
        criminal_count: 9,
        admin_count: 5,
        days_since_last: 12,
        recidivism_rate: 3.4,
        current_age: 22,
        age_at_first_violation: 16,
        has_property: false,
        has_job: false,
        has_family: false,
        substance_abuse: true,
        has_escalation: true,
        admin_to_criminal: 4,
    }
}

pub(super) fn low_risk_person() -> PersonAttributes {
    PersonAttributes {
        pattern_type: PatternType::Single,
        total_cases: 1,
        criminal_count: 0,
        admin_count: 1,
        days_since_last: 900,
        recidivism_rate: 0.1,
        current_age: 52,
        age_at_first_violation: 50,
        has_property: true,
        has_job: true,
        has_family: true,
        substance_abuse: false,
        has_escalation: false,
        admin_to_criminal: 0,
    }
}

pub(super) fn sample_people() -> Vec<PersonAttributes> {
    let mut people = vec![
        PersonAttributes::default(),
        mixed_unstable_person(),
        chronic_person(),
        low_risk_person(),
    ];

    for pattern in PatternType::ALL {
        for age in [14, 19, 27, 38, 61, 100] {
            for days_since_last in [0, 45, 120, 250, 5_000] {
                people.push(PersonAttributes {
                    pattern_type: pattern,
                    current_age: age,
                    age_at_first_violation: age.min(17).max(14),
                    days_since_last,
                    total_cases: age / 4,
                    criminal_count: age / 12,
                    admin_count: age / 4 - age / 12,
                    substance_abuse: age % 2 == 0,
                    has_escalation: days_since_last < 100,
                    admin_to_criminal: days_since_last % 5,
                    recidivism_rate: f64::from(age) / 20.0,
                    ..PersonAttributes::default()
                });
            }
        }
    }

    people
}

fn record(year: i32, month: u32, day: u32, violation_type: &str) -> ViolationRecord {
    ViolationRecord::new(
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date"),
        violation_type,
    )
}

/// Four thefts thirty days apart, the last one thirty days before [`today`].
pub(super) fn theft_specialist_history() -> Vec<ViolationRecord> {
    vec![
        record(2025, 4, 16, "Кража"),
        record(2025, 2, 15, "Кража"),
        record(2025, 5, 16, "Кража"),
        record(2025, 3, 17, "Кража"),
    ]
}

/// Hooliganism rising to armed robbery with shrinking gaps of 90, 80, 30 and 20 days.
pub(super) fn escalating_history() -> Vec<ViolationRecord> {
    vec![
        record(2024, 10, 28, "Хулиганство"),
        record(2025, 1, 26, "Хулиганство"),
        record(2025, 4, 16, "Кража"),
        record(2025, 5, 16, "Грабеж"),
        record(2025, 6, 5, "Разбой"),
    ]
}

pub(super) fn request_json(attrs: &PersonAttributes) -> Value {
    serde_json::to_value(AssessmentRequest::from(attrs.clone())).expect("request serializes")
}

pub(super) fn invalid_request_json() -> Value {
    json!({
        "pattern_type": "escalating",
        "total_cases": 2,
        "criminal_count": 4,
        "current_age": 30,
        "age_at_first_violation": 35,
    })
}

pub(super) fn post_json(uri: &str, body: &Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("json body"),
        ))
        .expect("request builds")
}

pub(super) fn get(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
