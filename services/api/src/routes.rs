use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use enrollments::domain::{AddressParams, CreateOrUpdateParams, EnrollmentParams};
use enrollments::error::AppError;
use enrollments::lookup::PostalLookup;
use enrollments::repository::{AddressRepository, EnrollmentRepository};
use enrollments::service::{EnrollmentService, EnrollmentServiceError};

/// Submission body for the enrollment upsert. The owning user id rides in the
/// path; authentication happens upstream of this service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnrollmentSubmission {
    pub(crate) name: String,
    pub(crate) document_id: String,
    pub(crate) birth_date: NaiveDate,
    pub(crate) phone: String,
    pub(crate) address: AddressParams,
}

impl EnrollmentSubmission {
    fn into_params(self, user_id: i64) -> CreateOrUpdateParams {
        CreateOrUpdateParams {
            user_id,
            enrollment: EnrollmentParams {
                name: self.name,
                document_id: self.document_id,
                birth_date: self.birth_date,
                phone: self.phone,
            },
            address: self.address,
        }
    }
}

pub(crate) fn app_router<E, A, L>(service: Arc<EnrollmentService<E, A, L>>) -> Router
where
    E: EnrollmentRepository + 'static,
    A: AddressRepository + 'static,
    L: PostalLookup + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/users/:user_id/enrollment",
            get(get_enrollment_handler::<E, A, L>).post(upsert_enrollment_handler::<E, A, L>),
        )
        .route(
            "/api/v1/postal/:postal_code",
            get(resolve_postal_handler::<E, A, L>),
        )
        .with_state(service)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn get_enrollment_handler<E, A, L>(
    State(service): State<Arc<EnrollmentService<E, A, L>>>,
    Path(user_id): Path<i64>,
) -> Response
where
    E: EnrollmentRepository + 'static,
    A: AddressRepository + 'static,
    L: PostalLookup + 'static,
{
    match service.get_one_with_address(user_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(EnrollmentServiceError::NotFound) => StatusCode::NO_CONTENT.into_response(),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn upsert_enrollment_handler<E, A, L>(
    State(service): State<Arc<EnrollmentService<E, A, L>>>,
    Path(user_id): Path<i64>,
    Json(submission): Json<EnrollmentSubmission>,
) -> Response
where
    E: EnrollmentRepository + 'static,
    A: AddressRepository + 'static,
    L: PostalLookup + 'static,
{
    match service.create_or_update(submission.into_params(user_id)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn resolve_postal_handler<E, A, L>(
    State(service): State<Arc<EnrollmentService<E, A, L>>>,
    Path(postal_code): Path<String>,
) -> Result<Response, AppError>
where
    E: EnrollmentRepository + 'static,
    A: AddressRepository + 'static,
    L: PostalLookup + 'static,
{
    let code = postal_code.trim();
    if code.is_empty() {
        let payload = json!({ "error": "postal code must not be blank" });
        return Ok((StatusCode::BAD_REQUEST, Json(payload)).into_response());
    }

    let resolved = service.resolve_postal_code(code).await?;
    Ok((StatusCode::OK, Json(resolved)).into_response())
}
