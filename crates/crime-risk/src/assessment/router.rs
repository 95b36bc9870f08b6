use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::domain::CrimeType;
use super::history::ViolationRecord;
use super::service::{
    AssessmentEngine, AssessmentServiceError, DEFAULT_MIN_PROBABILITY, DEFAULT_MONTHS_AHEAD,
    DEFAULT_TIMELINE_LIMIT,
};
use super::validation::{check_iin, AssessmentRequest, RequestValidationError, ValidatedPerson};

/// Router builder exposing the scoring, forecasting and planning endpoints.
pub fn assessment_router(engine: Arc<AssessmentEngine>) -> Router {
    Router::new()
        .route("/api/v1/risks/calculate", post(calculate_handler))
        .route("/api/v1/risks/quick-assessment", post(quick_assessment_handler))
        .route("/api/v1/risks/batch-calculate", post(batch_handler))
        .route("/api/v1/risks/statistics", get(statistics_handler))
        .route("/api/v1/forecasts/timeline", post(timeline_handler))
        .route("/api/v1/forecasts/priority-crimes", post(priority_crimes_handler))
        .route(
            "/api/v1/forecasts/prevention-calendar",
            post(prevention_calendar_handler),
        )
        .route("/api/v1/forecasts/base-windows", get(base_windows_handler))
        .route("/api/v1/forecasts/individual", post(individual_forecast_handler))
        .route("/api/v1/interventions/plan", post(intervention_plan_handler))
        .route("/api/v1/persons/validate-iin", post(validate_iin_handler))
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub persons: Vec<AssessmentRequest>,
}

/// Person record together with their dated violation history.
#[derive(Debug, Default, Deserialize)]
pub struct IndividualForecastRequest {
    #[serde(default)]
    pub person: AssessmentRequest,
    #[serde(default)]
    pub violations: Vec<ViolationRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IinCheckRequest {
    #[serde(default)]
    pub iin: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PriorityParams {
    pub min_probability: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarParams {
    pub months_ahead: Option<u32>,
}

#[derive(Debug, Serialize)]
struct BaseWindow {
    crime_type: CrimeType,
    crime_label: &'static str,
    days: u32,
    prevention_rate: f64,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn validation_failure(error: RequestValidationError) -> Response {
    warn!(%error, "assessment request rejected");
    let payload = json!({
        "error": "validation failed",
        "errors": error.messages(),
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

/// Body or query string that never reached validation, such as an unknown
/// `pattern_type` or a negative count.
fn malformed_request(status: StatusCode, detail: String) -> Response {
    warn!(%status, %detail, "malformed assessment request");
    let payload = json!({
        "error": "validation failed",
        "errors": [detail],
    });
    (status, Json(payload)).into_response()
}

fn json_rejection(rejection: JsonRejection) -> Response {
    malformed_request(rejection.status(), rejection.body_text())
}

fn query_rejection(rejection: QueryRejection) -> Response {
    malformed_request(rejection.status(), rejection.body_text())
}

fn service_failure(error: AssessmentServiceError) -> Response {
    let status = match &error {
        AssessmentServiceError::Tables(_) | AssessmentServiceError::InvalidBatchLimit => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        warn!(%error, "assessment request rejected");
    }
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn validate(request: AssessmentRequest) -> Result<ValidatedPerson, Response> {
    request.validate().map_err(validation_failure)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(value)| value).map_err(json_rejection)
}

fn validated_person(
    payload: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Result<ValidatedPerson, Response> {
    validate(body(payload)?)
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query.map(|Query(value)| value).map_err(query_rejection)
}

pub(crate) async fn calculate_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    payload: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Response {
    match validated_person(payload) {
        Ok(person) => (StatusCode::OK, Json(engine.calculate(&person))).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn quick_assessment_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    payload: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Response {
    match validated_person(payload) {
        Ok(person) => {
            let quick = engine.quick_assessment(&person.attributes, today());
            (StatusCode::OK, Json(quick)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn batch_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let batch = match body(payload) {
        Ok(batch) => batch,
        Err(response) => return response,
    };

    match engine.assess_batch(batch.persons) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn statistics_handler(State(engine): State<Arc<AssessmentEngine>>) -> Response {
    (StatusCode::OK, Json(engine.statistics())).into_response()
}

pub(crate) async fn timeline_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    query: Result<Query<TimelineParams>, QueryRejection>,
    payload: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Response {
    let params = match query_params(query) {
        Ok(params) => params,
        Err(response) => return response,
    };
    let person = match validated_person(payload) {
        Ok(person) => person,
        Err(response) => return response,
    };
    let limit = params.limit.unwrap_or(DEFAULT_TIMELINE_LIMIT);

    match engine.timeline(&person.attributes, today(), limit) {
        Ok(forecasts) => {
            let payload = json!({
                "forecasts": forecasts,
                "person_iin": person.iin,
                "total_forecasts": forecasts.len(),
                "calculated_at": Utc::now(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn priority_crimes_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    query: Result<Query<PriorityParams>, QueryRejection>,
    payload: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Response {
    let params = match query_params(query) {
        Ok(params) => params,
        Err(response) => return response,
    };
    let person = match validated_person(payload) {
        Ok(person) => person,
        Err(response) => return response,
    };
    let threshold = params.min_probability.unwrap_or(DEFAULT_MIN_PROBABILITY);

    match engine.priority_crimes(&person.attributes, today(), threshold) {
        Ok(priorities) => (StatusCode::OK, Json(priorities)).into_response(),
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn prevention_calendar_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    query: Result<Query<CalendarParams>, QueryRejection>,
    payload: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Response {
    let params = match query_params(query) {
        Ok(params) => params,
        Err(response) => return response,
    };
    let person = match validated_person(payload) {
        Ok(person) => person,
        Err(response) => return response,
    };
    let months_ahead = params.months_ahead.unwrap_or(DEFAULT_MONTHS_AHEAD);

    match engine.prevention_calendar(&person.attributes, today(), months_ahead) {
        Ok(calendar) => (StatusCode::OK, Json(calendar)).into_response(),
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn base_windows_handler(State(engine): State<Arc<AssessmentEngine>>) -> Response {
    let tables = engine.tables();
    let windows: Vec<BaseWindow> = tables
        .time_windows
        .iter()
        .map(|(crime, days)| BaseWindow {
            crime_type: *crime,
            crime_label: crime.label(),
            days: *days,
            prevention_rate: tables.prevention_rate(*crime),
        })
        .collect();

    let payload = json!({
        "windows": windows,
        "total_crime_types": windows.len(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn individual_forecast_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    payload: Result<Json<IndividualForecastRequest>, JsonRejection>,
) -> Response {
    let request = match body(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match validate(request.person) {
        Ok(person) => {
            let forecast = engine.individual_forecast(&person, &request.violations, today());
            (StatusCode::OK, Json(forecast)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn intervention_plan_handler(
    State(engine): State<Arc<AssessmentEngine>>,
    payload: Result<Json<AssessmentRequest>, JsonRejection>,
) -> Response {
    match validated_person(payload) {
        Ok(person) => {
            let plan = engine.intervention_plan(&person.attributes, today());
            (StatusCode::OK, Json(plan)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn validate_iin_handler(
    payload: Result<Json<IinCheckRequest>, JsonRejection>,
) -> Response {
    match body(payload) {
        Ok(request) => (StatusCode::OK, Json(check_iin(&request.iin))).into_response(),
        Err(response) => response,
    }
}
