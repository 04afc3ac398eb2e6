// [apps/orchestrator/src/handlers/rotation.rs]
/*!
 * =================================================================
 * APARATO: ROTATION HANDLER (V4.3 - LEASE/ACK ADAPTERS)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: VALIDACIÓN DE CONTRATOS Y DESPACHO AL MOTOR
 *
 * # Logic:
 * Los handlers validan forma (VALIDATION_ERROR), delegan al motor y
 * traducen la taxonomía de fallos a tuplas HTTP sin filtrar detalle
 * interno. Las formas batch abanican bajo un pool acotado y cada
 * sub-resultado es independiente: el fallo de un elemento jamás
 * envenena a sus hermanos.
 * =================================================================
 */

use crate::middleware::OperatorIdentity;
use crate::services::{LeaseEngine, RotationFault};
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{self, StreamExt};
use kylink_domain_models::{AckRequest, AckResponse, LeaseRequest, LeaseResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

/// Concurrencia del pool de las formas batch.
const BATCH_WORKER_CONCURRENCY: usize = 16;

/// Sobre batch de solicitudes de lease.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseBatchRequest {
    pub requests: Vec<LeaseRequest>,
}

/// Sobre batch de confirmaciones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckBatchRequest {
    pub requests: Vec<AckRequest>,
}

/// Resultado paralelo de un ack individual dentro del batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum AckBatchEntry {
    Success(AckResponse),
    Failure { code: String, message: String },
}

/// Tupla HTTP de un fallo del núcleo (sin fuga de detalle interno).
fn fault_response(fault: RotationFault) -> Response {
    let message = match &fault {
        RotationFault::Internal(_) => "internal error".to_string(),
        other => other.to_string(),
    };
    (
        fault.http_status(),
        Json(json!({ "code": fault.code(), "message": message })),
    )
        .into_response()
}

/// Validación de forma de una solicitud de lease.
fn validate_lease_request(request: &LeaseRequest) -> Result<(), RotationFault> {
    if request.campaign_id.trim().is_empty() {
        return Err(RotationFault::Validation("campaignId must be non-empty".into()));
    }
    if request.now_clicks < 0 {
        return Err(RotationFault::Validation("nowClicks must be >= 0".into()));
    }
    if request.window_start_epoch_seconds <= 0 {
        return Err(RotationFault::Validation("windowStartEpochSeconds must be > 0".into()));
    }
    if request.idempotency_key.trim().is_empty() {
        return Err(RotationFault::Validation("idempotencyKey must be non-empty".into()));
    }
    Ok(())
}

/// Validación de forma de una confirmación.
fn validate_ack_request(request: &AckRequest) -> Result<(), RotationFault> {
    if request.lease_id.trim().is_empty() {
        return Err(RotationFault::Validation("leaseId must be non-empty".into()));
    }
    if request.campaign_id.trim().is_empty() {
        return Err(RotationFault::Validation("campaignId must be non-empty".into()));
    }
    Ok(())
}

pub struct RotationHandler;

impl RotationHandler {
    /**
     * Endpoint: POST /api/v1/rotation/lease
     */
    #[instrument(skip(application_state, operator, request_payload), fields(operator = %operator.operator_identifier))]
    pub async fn handle_lease(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Json(request_payload): Json<LeaseRequest>,
    ) -> Response {
        if let Err(validation_fault) = validate_lease_request(&request_payload) {
            return fault_response(validation_fault);
        }

        let engine = LeaseEngine::new(application_state);
        match engine.lease(&operator.operator_identifier, &request_payload).await {
            Ok(lease_response) => (StatusCode::OK, Json(lease_response)).into_response(),
            Err(engine_fault) => fault_response(engine_fault),
        }
    }

    /**
     * Endpoint: POST /api/v1/rotation/ack
     */
    #[instrument(skip(application_state, operator, request_payload), fields(operator = %operator.operator_identifier))]
    pub async fn handle_ack(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Json(request_payload): Json<AckRequest>,
    ) -> Response {
        if let Err(validation_fault) = validate_ack_request(&request_payload) {
            return fault_response(validation_fault);
        }

        let engine = LeaseEngine::new(application_state);
        match engine.ack(&operator.operator_identifier, &request_payload).await {
            Ok(ack_response) => (StatusCode::OK, Json(ack_response)).into_response(),
            Err(engine_fault) => fault_response(engine_fault),
        }
    }

    /**
     * Endpoint: POST /api/v1/rotation/lease/batch
     *
     * Abanico acotado con resultados posicionales: el elemento i de la
     * respuesta corresponde al elemento i de la solicitud.
     */
    #[instrument(skip(application_state, operator, batch_payload), fields(operator = %operator.operator_identifier))]
    pub async fn handle_lease_batch(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Json(batch_payload): Json<LeaseBatchRequest>,
    ) -> Response {
        let max_batch_size = application_state.config.max_batch_size;
        if batch_payload.requests.len() > max_batch_size {
            return fault_response(RotationFault::Validation(format!(
                "batch exceeds maximum size of {}",
                max_batch_size
            )));
        }

        let operator_identifier = operator.operator_identifier.clone();
        let results: Vec<LeaseResponse> = stream::iter(batch_payload.requests)
            .map(|single_request| {
                let worker_state = application_state.clone();
                let worker_operator = operator_identifier.clone();
                async move {
                    if let Err(validation_fault) = validate_lease_request(&single_request) {
                        return LeaseResponse::declined("VALIDATION_ERROR", &validation_fault.to_string());
                    }
                    let engine = LeaseEngine::new(worker_state);
                    match engine.lease(&worker_operator, &single_request).await {
                        Ok(lease_response) => lease_response,
                        Err(engine_fault) => {
                            LeaseResponse::declined(engine_fault.code(), "sub-request failed")
                        }
                    }
                }
            })
            .buffered(BATCH_WORKER_CONCURRENCY)
            .collect()
            .await;

        (StatusCode::OK, Json(json!({ "results": results }))).into_response()
    }

    /**
     * Endpoint: POST /api/v1/rotation/ack/batch
     */
    #[instrument(skip(application_state, operator, batch_payload), fields(operator = %operator.operator_identifier))]
    pub async fn handle_ack_batch(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Json(batch_payload): Json<AckBatchRequest>,
    ) -> Response {
        let max_batch_size = application_state.config.max_batch_size;
        if batch_payload.requests.len() > max_batch_size {
            return fault_response(RotationFault::Validation(format!(
                "batch exceeds maximum size of {}",
                max_batch_size
            )));
        }

        let operator_identifier = operator.operator_identifier.clone();
        let results: Vec<AckBatchEntry> = stream::iter(batch_payload.requests)
            .map(|single_request| {
                let worker_state = application_state.clone();
                let worker_operator = operator_identifier.clone();
                async move {
                    if let Err(validation_fault) = validate_ack_request(&single_request) {
                        return AckBatchEntry::Failure {
                            code: "VALIDATION_ERROR".into(),
                            message: validation_fault.to_string(),
                        };
                    }
                    let engine = LeaseEngine::new(worker_state);
                    match engine.ack(&worker_operator, &single_request).await {
                        Ok(ack_response) => AckBatchEntry::Success(ack_response),
                        Err(engine_fault) => AckBatchEntry::Failure {
                            code: engine_fault.code().into(),
                            message: "sub-request failed".into(),
                        },
                    }
                }
            })
            .buffered(BATCH_WORKER_CONCURRENCY)
            .collect()
            .await;

        (StatusCode::OK, Json(json!({ "results": results }))).into_response()
    }
}
