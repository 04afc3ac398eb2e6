// [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: ROTATION ROUTING MATRIX (V4.3 - GATEWAY TOPOLOGY)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA DE RED DEL NÚCLEO DE ROTACIÓN
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología expone tres estratos:
 * 1. REST Táctico (lease/ack de alta frecuencia para los scripts).
 * 2. Superficie de operaciones (tareas, stock, alertas, recuperación).
 * 3. Gateway de trabajos (tickers externos vía secreto de cron) y
 *    streaming SSE de progreso.
 * =================================================================
 */

use crate::handlers::{
    admin::AdminOperationsHandler, campaign::CampaignLookupHandler, jobs::JobsHandler,
    rotation::RotationHandler, stream::ProgressStreamHandler, tasks::ClickTaskHandler,
};
use crate::middleware::{api_key_guard, cron_or_api_key_guard};
use crate::state::AppState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_rotation_router(application_shared_state: AppState) -> Router {
    // Escudo de red para las herramientas de operaciones.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO TÁCTICO: lease/ack de los scripts de Google Ads.
    let rotation_stratum = Router::new()
        .route("/lease", post(RotationHandler::handle_lease))
        .route("/ack", post(RotationHandler::handle_ack))
        .route("/lease/batch", post(RotationHandler::handle_lease_batch))
        .route("/ack/batch", post(RotationHandler::handle_ack_batch));

    // ESTRATO DE OPERACIONES: tareas de clicks, inventario y alertas.
    let operations_stratum = Router::new()
        .route("/campaigns/lookup", post(CampaignLookupHandler::handle_lookup))
        .nest(
            "/tasks",
            Router::new()
                .route("/", post(ClickTaskHandler::handle_create))
                .route("/:task_id", get(ClickTaskHandler::handle_status))
                .route("/:task_id/cancel", post(ClickTaskHandler::handle_cancel)),
        )
        .nest(
            "/admin",
            Router::new()
                .route("/stock/status", get(AdminOperationsHandler::handle_stock_status))
                .route(
                    "/stock/replenish/:campaign_id",
                    post(AdminOperationsHandler::handle_force_replenish),
                )
                .route("/alerts", get(AdminOperationsHandler::handle_list_alerts))
                .route(
                    "/alerts/:alert_id/ack",
                    post(AdminOperationsHandler::handle_acknowledge_alert),
                )
                .route(
                    "/recovery/sweep",
                    post(AdminOperationsHandler::handle_recovery_sweep),
                ),
        )
        .route(
            "/stream/replenish",
            get(ProgressStreamHandler::stream_replenish_sweep),
        );

    // GATEWAY DE TRABAJOS: cron externo o API key estándar.
    let jobs_stratum = Router::new()
        .route("/execute/:job_name", post(JobsHandler::handle_execute))
        .route("/status", get(JobsHandler::handle_status))
        .layer(middleware::from_fn_with_state(
            application_shared_state.clone(),
            cron_or_api_key_guard,
        ));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        .route("/health", get(|| async { "STATUS_OK" }))
        .nest(
            "/api/v1",
            Router::new()
                .nest("/rotation", rotation_stratum)
                .merge(operations_stratum)
                .layer(middleware::from_fn_with_state(
                    application_shared_state.clone(),
                    api_key_guard,
                ))
                .nest("/jobs", jobs_stratum),
        )
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
