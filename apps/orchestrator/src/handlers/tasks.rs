// [apps/orchestrator/src/handlers/tasks.rs]
/*!
 * =================================================================
 * APARATO: CLICK TASK HANDLER (V4.2 - FLOOD MANAGEMENT)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ALTA, CONSULTA Y CANCELACIÓN DE INUNDACIONES
 *
 * # Logic:
 * El alta planifica N marcas con la curva diurna sobre la hora de
 * pared local y persiste tarea + items en una transacción. La
 * cancelación voltea atómicamente los items pendientes.
 * =================================================================
 */

use crate::middleware::OperatorIdentity;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use kylink_core_pacing::plan_click_schedule;
use kylink_domain_models::ClickItemStatus;
use kylink_infra_db::DbError;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

/// Tope de clicks por tarea individual.
const MAX_CLICKS_PER_TASK: u32 = 2_000;

/// Payload de alta de una tarea de inundación.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClickTaskPayload {
    pub campaign_id: String,
    pub clicks: u32,
}

/// Conversión pared-local -> UTC en el borde de persistencia.
fn local_wall_to_utc(wall: chrono::NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&wall)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

pub struct ClickTaskHandler;

impl ClickTaskHandler {
    /**
     * Endpoint: POST /api/v1/tasks
     */
    #[instrument(skip(application_state, operator, request_payload), fields(operator = %operator.operator_identifier))]
    pub async fn handle_create(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Json(request_payload): Json<CreateClickTaskPayload>,
    ) -> Response {
        if request_payload.clicks == 0 || request_payload.clicks > MAX_CLICKS_PER_TASK {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "code": "VALIDATION_ERROR",
                    "message": format!("clicks must be within 1..={}", MAX_CLICKS_PER_TASK)
                })),
            )
                .into_response();
        }

        // La campaña debe existir bajo el aislamiento del operador.
        let campaign_known = application_state
            .campaign_repository
            .find_campaign(&operator.operator_identifier, &request_payload.campaign_id)
            .await;
        match campaign_known {
            Ok(Some(_)) => {}
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "code": "NOT_FOUND", "message": "campaign unknown" })),
                )
                    .into_response();
            }
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "code": "INTERNAL_ERROR", "message": "campaign resolution failed" })),
                )
                    .into_response();
            }
        }

        // Planificación diurna sobre la hora de pared local.
        let schedule_utc: Vec<DateTime<Utc>> =
            plan_click_schedule(request_payload.clicks, Local::now().naive_local())
                .into_iter()
                .map(local_wall_to_utc)
                .collect();

        let created = application_state
            .click_task_repository
            .create_task_with_schedule(
                &operator.operator_identifier,
                &request_payload.campaign_id,
                &schedule_utc,
            )
            .await;

        match created {
            Ok(task) => (StatusCode::CREATED, Json(task)).into_response(),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "code": "INTERNAL_ERROR", "message": "task creation failed" })),
            )
                .into_response(),
        }
    }

    /**
     * Endpoint: GET /api/v1/tasks/:task_id
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_status(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Path(task_id): Path<String>,
    ) -> Response {
        let task = match application_state
            .click_task_repository
            .get_task(&operator.operator_identifier, &task_id)
            .await
        {
            Ok(Some(task)) => task,
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "code": "NOT_FOUND", "message": "task unknown" })),
                )
                    .into_response();
            }
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "code": "INTERNAL_ERROR", "message": "task resolution failed" })),
                )
                    .into_response();
            }
        };

        let items = application_state
            .click_task_repository
            .task_items(&task_id)
            .await
            .unwrap_or_default();

        let count_with_status = |status: ClickItemStatus| {
            items.iter().filter(|item| item.status == status).count()
        };

        (
            StatusCode::OK,
            Json(json!({
                "task": task,
                "itemSummary": {
                    "pending": count_with_status(ClickItemStatus::Pending),
                    "executing": count_with_status(ClickItemStatus::Executing),
                    "success": count_with_status(ClickItemStatus::Success),
                    "failed": count_with_status(ClickItemStatus::Failed),
                    "cancelled": count_with_status(ClickItemStatus::Cancelled),
                }
            })),
        )
            .into_response()
    }

    /**
     * Endpoint: POST /api/v1/tasks/:task_id/cancel
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_cancel(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Path(task_id): Path<String>,
    ) -> Response {
        match application_state
            .click_task_repository
            .cancel_task(&operator.operator_identifier, &task_id)
            .await
        {
            Ok(task) => (StatusCode::OK, Json(task)).into_response(),
            Err(DbError::InvalidTaskState) => (
                StatusCode::CONFLICT,
                Json(json!({ "code": "INVALID_STATE", "message": "task is not running" })),
            )
                .into_response(),
            Err(DbError::TaskNotFound) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "code": "NOT_FOUND", "message": "task unknown" })),
            )
                .into_response(),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "code": "INTERNAL_ERROR", "message": "cancellation failed" })),
            )
                .into_response(),
        }
    }
}
