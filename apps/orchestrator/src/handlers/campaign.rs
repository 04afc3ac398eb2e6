// [apps/orchestrator/src/handlers/campaign.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGN LOOKUP HANDLER (V4.1 - BULK READ ADAPTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: RESOLUCIÓN MASIVA DE URLs DE TRACKING EFECTIVAS
 * =================================================================
 */

use crate::middleware::OperatorIdentity;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kylink_domain_models::{
    CampaignLookupRequest, CampaignLookupResponse, CampaignLookupResult, LookupStatistics,
};
use serde_json::json;
use std::collections::HashMap;
use tracing::instrument;

pub struct CampaignLookupHandler;

impl CampaignLookupHandler {
    /**
     * Endpoint: POST /api/v1/campaigns/lookup
     *
     * Lectura pura: para cada campaña del operador autenticado (≤ 500)
     * devuelve la URL del enlace de afiliado efectivo o su ausencia.
     */
    #[instrument(skip(application_state, operator, request_payload), fields(operator = %operator.operator_identifier))]
    pub async fn handle_lookup(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
        Json(request_payload): Json<CampaignLookupRequest>,
    ) -> Response {
        let max_batch_size = application_state.config.max_batch_size;
        if request_payload.campaigns.len() > max_batch_size {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "code": "VALIDATION_ERROR",
                    "message": format!("lookup exceeds maximum size of {}", max_batch_size)
                })),
            )
                .into_response();
        }

        let campaign_ids: Vec<String> = request_payload
            .campaigns
            .iter()
            .map(|entry| entry.campaign_id.clone())
            .collect();

        let resolution = application_state
            .campaign_repository
            .lookup_tracking_urls(&operator.operator_identifier, &campaign_ids)
            .await;

        match resolution {
            Ok(resolved_map) => {
                let mut campaign_results = HashMap::with_capacity(resolved_map.len());
                let mut found_count = 0usize;

                for (campaign_id, tracking_url) in resolved_map {
                    let found = tracking_url.is_some();
                    if found {
                        found_count += 1;
                    }
                    campaign_results.insert(campaign_id, CampaignLookupResult { tracking_url, found });
                }

                let requested = campaign_ids.len();
                let response = CampaignLookupResponse {
                    success: true,
                    campaign_results,
                    stats: LookupStatistics {
                        requested,
                        found: found_count,
                        missing: requested - found_count,
                    },
                };
                (StatusCode::OK, Json(response)).into_response()
            }
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "code": "INTERNAL_ERROR", "message": "lookup failed" })),
            )
                .into_response(),
        }
    }
}
