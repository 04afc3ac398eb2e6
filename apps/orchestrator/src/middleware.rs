// [apps/orchestrator/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: PERIMETER GUARDS (V4.2 - DIGEST CITIZENSHIP)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DE API KEYS E INYECCIÓN DE IDENTIDAD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DIGEST ONLY: El token en claro jamás toca el Ledger; se compara
 *    su SHA-256 contra el digest almacenado.
 * 2. SHAPE GATE: Solo tokens ky_live_/ky_test_ + 32 hex llegan a la
 *    consulta de persistencia.
 * 3. DUAL CITIZENSHIP: Los endpoints de trabajos aceptan además el
 *    secreto compartido de cron por cabecera dedicada.
 * =================================================================
 */

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use kylink_infra_db::repositories::{digest_bearer_token, token_has_valid_shape};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// Cabecera del secreto compartido para endpoints iniciados por cron.
const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Identidad soberana inyectada en el flujo de la petición.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorIdentity {
    /// Identificador del operador autenticado (o delegado de cron).
    pub operator_identifier: String,
    /// Indica si la petición entró por el túnel de cron.
    pub via_cron_secret: bool,
}

/// Tupla de rechazo perimetral.
fn rejection(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

/// Resuelve la identidad desde la cabecera Authorization.
async fn resolve_bearer_identity(
    application_state: &AppState,
    headers: &HeaderMap,
) -> Result<OperatorIdentity, Response> {
    let bearer_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| rejection(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "missing bearer token"))?;

    if !token_has_valid_shape(bearer_token) {
        warn!("❌ [AUTH_REJECTION]: Token shape violation.");
        return Err(rejection(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "malformed api key",
        ));
    }

    let token_digest = digest_bearer_token(bearer_token);
    let operator = application_state
        .api_key_repository
        .authenticate_digest(&token_digest)
        .await
        .map_err(|_| {
            rejection(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "authentication backend unavailable",
            )
        })?
        .ok_or_else(|| {
            warn!("❌ [AUTH_REJECTION]: Unknown token digest.");
            rejection(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "unknown api key")
        })?;

    if operator.suspended {
        warn!("⛔ [AUTH_REJECTION]: Suspended operator [{}].", operator.user_id);
        return Err(rejection(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "operator suspended",
        ));
    }

    debug!("🔐 [AUTH]: Operator [{}] authenticated via digest.", operator.user_id);
    Ok(OperatorIdentity {
        operator_identifier: operator.user_id,
        via_cron_secret: false,
    })
}

/**
 * Guardia perimetral estándar: exige un API key válido y no suspendido.
 */
pub async fn api_key_guard(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_bearer_identity(&application_state, request.headers()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(rejection_response) => rejection_response,
    }
}

/**
 * Guardia de trabajos: acepta el secreto compartido de cron por
 * cabecera dedicada, o degrada al circuito estándar de API key.
 */
pub async fn cron_or_api_key_guard(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let supplied_secret = request
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    if let (Some(expected_secret), Some(supplied)) = (
        application_state.config.cron_shared_secret.as_deref(),
        supplied_secret.as_deref(),
    ) {
        if expected_secret == supplied {
            debug!("🕰️ [AUTH]: Cron delegate recognized via shared secret.");
            request.extensions_mut().insert(OperatorIdentity {
                operator_identifier: "CRON_DELEGATE".to_string(),
                via_cron_secret: true,
            });
            return next.run(request).await;
        }
        warn!("❌ [AUTH_REJECTION]: Invalid cron shared secret.");
        return rejection(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "invalid cron secret");
    }

    match resolve_bearer_identity(&application_state, request.headers()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(rejection_response) => rejection_response,
    }
}
