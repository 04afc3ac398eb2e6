// [apps/orchestrator/src/handlers/admin.rs]
/*!
 * =================================================================
 * APARATO: ADMIN OPERATIONS HANDLER (V4.1 - OPS SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: OBSERVABILIDAD DE STOCK, ALERTAS Y RECUPERACIÓN
 * =================================================================
 */

use crate::middleware::OperatorIdentity;
use crate::services::{RecoveryService, StockProducer};
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::instrument;

pub struct AdminOperationsHandler;

impl AdminOperationsHandler {
    /**
     * Endpoint: GET /api/v1/admin/stock/status
     *
     * Inventario disponible por campaña con su marca de agua dinámica.
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_stock_status(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
    ) -> Response {
        let levels = match application_state.stock_repository.available_levels().await {
            Ok(levels) => levels,
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "code": "INTERNAL_ERROR", "message": "stock query failed" })),
                )
                    .into_response();
            }
        };

        let producer = StockProducer::new(application_state.clone());
        let mut campaign_levels = Vec::with_capacity(levels.len());
        for (user_id, campaign_id, available_count) in levels {
            let watermark = producer.dynamic_watermark(&user_id, &campaign_id).await;
            campaign_levels.push(json!({
                "userId": user_id,
                "campaignId": campaign_id,
                "available": available_count,
                "watermark": watermark,
                "belowWatermark": available_count < watermark,
            }));
        }

        (StatusCode::OK, Json(json!({ "campaigns": campaign_levels }))).into_response()
    }

    /**
     * Endpoint: POST /api/v1/admin/stock/replenish/:campaign_id
     *
     * Reposición forzada de una campaña individual.
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_force_replenish(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Path(campaign_id): Path<String>,
    ) -> Response {
        let producer = StockProducer::new(application_state);
        match producer
            .replenish_campaign(&operator.operator_identifier, &campaign_id, true)
            .await
        {
            Ok(report) => (StatusCode::OK, Json(report)).into_response(),
            Err(fault) => (
                fault.http_status(),
                Json(json!({ "code": fault.code(), "message": "replenish failed" })),
            )
                .into_response(),
        }
    }

    /**
     * Endpoint: GET /api/v1/admin/alerts
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_list_alerts(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
    ) -> Response {
        match application_state.alert_repository.list_recent(100).await {
            Ok(alerts) => (StatusCode::OK, Json(json!({ "alerts": alerts }))).into_response(),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "code": "INTERNAL_ERROR", "message": "alert query failed" })),
            )
                .into_response(),
        }
    }

    /**
     * Endpoint: POST /api/v1/admin/alerts/:alert_id/ack
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_acknowledge_alert(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Path(alert_id): Path<String>,
    ) -> Response {
        match application_state.alert_repository.acknowledge(&alert_id).await {
            Ok(true) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
            Ok(false) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "code": "NOT_FOUND", "message": "alert unknown" })),
            )
                .into_response(),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "code": "INTERNAL_ERROR", "message": "acknowledge failed" })),
            )
                .into_response(),
        }
    }

    /**
     * Endpoint: POST /api/v1/admin/recovery/sweep
     *
     * Pasada completa de recuperación bajo demanda.
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn handle_recovery_sweep(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
    ) -> Response {
        match RecoveryService::new(application_state).full_sweep().await {
            Ok(report) => (StatusCode::OK, Json(report)).into_response(),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "code": "INTERNAL_ERROR", "message": "recovery sweep failed" })),
            )
                .into_response(),
        }
    }
}
