// [apps/orchestrator/src/handlers/jobs.rs]
/*!
 * =================================================================
 * APARATO: JOBS HANDLER (V4.1 - CRON GATEWAY)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EJECUCIÓN AD-HOC Y ESTADO DEL REGISTRO DE TRABAJOS
 *
 * # Logic:
 * Mismo camino de ejecución que los tickers internos: despliegues de
 * producción apagan los tickers y un cron externo golpea estos
 * endpoints con el secreto compartido.
 * =================================================================
 */

use crate::middleware::OperatorIdentity;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::instrument;

pub struct JobsHandler;

impl JobsHandler {
    /**
     * Endpoint: POST /api/v1/jobs/execute/:job_name
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_execute(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Path(job_name): Path<String>,
    ) -> Response {
        let registry = application_state.job_registry.clone();
        match registry.execute_job(&job_name, application_state).await {
            Ok(outcome) => (
                StatusCode::OK,
                Json(json!({ "ok": true, "job": job_name, "result": outcome })),
            )
                .into_response(),
            Err(fault) => (
                fault.http_status(),
                Json(json!({ "ok": false, "code": fault.code(), "job": job_name })),
            )
                .into_response(),
        }
    }

    /**
     * Endpoint: GET /api/v1/jobs/status
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_status(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
    ) -> Response {
        (
            StatusCode::OK,
            Json(application_state.job_registry.status_snapshot()),
        )
            .into_response()
    }
}
