// [apps/orchestrator/src/services/lease_engine.rs]
/*!
 * =================================================================
 * APARATO: LEASE ENGINE SERVICE (V4.4 - IDEMPOTENT AUTHORITY)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L2-APP)
 * RESPONSABILIDAD: ASIGNACIÓN IDEMPOTENTE DE SUFIJOS POR INCREMENTO
 *
 * # Logic:
 * Secuencia del lease: cortocircuito idempotente -> upsert perezoso
 * de campaña -> transición del estado de clicks (con reinicio diario)
 * -> asignación atómica -> disparo de reposición. Ambas políticas de
 * compromiso (inmediata y diferida) preservan: (a) idempotencia por
 * clave; (b) a lo sumo un lease activo por campaña; (c) monotonicidad
 * estricta del contador aplicado.
 * =================================================================
 */

use crate::services::stock_producer::StockProducer;
use crate::services::RotationFault;
use crate::state::AppState;
use chrono::{Datelike, Local};
use kylink_domain_models::{
    AckRequest, AckResponse, LeaseRequest, LeaseResponse, LeaseStatus, StockAuditAction,
};
use kylink_infra_db::repositories::{AllocationMode, AllocationRequest};
use kylink_infra_db::DbError;
use serde_json::json;
use tracing::{info, instrument, warn};

pub struct LeaseEngine {
    application_state: AppState,
}

impl LeaseEngine {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    /// Clave de día calendario en zona local del servidor.
    fn local_calendar_day(timestamp: chrono::DateTime<chrono::Utc>) -> (i32, u32, u32) {
        let local = timestamp.with_timezone(&Local);
        (local.year(), local.month(), local.day())
    }

    /**
     * OPERACIÓN LEASE: decide y (según política) aplica una rotación
     * para el incremento de clicks observado.
     */
    #[instrument(skip(self, request), fields(campaign = %request.campaign_id, clicks = request.now_clicks))]
    pub async fn lease(
        &self,
        user_id: &str,
        request: &LeaseRequest,
    ) -> Result<LeaseResponse, RotationFault> {
        let state = &self.application_state;

        // --- FASE 1: CORTOCIRCUITO DE IDEMPOTENCIA ---
        if let Some((existing_lease, joined_suffix)) = state
            .lease_repository
            .find_by_idempotency_key(user_id, &request.idempotency_key)
            .await?
        {
            info!(
                "🔁 [LEASE_REPLAY]: Key [{}] collapsed onto lease [{}].",
                request.idempotency_key, existing_lease.id
            );
            return Ok(LeaseResponse::apply(
                existing_lease.id,
                joined_suffix.unwrap_or_default(),
                "idempotent_replay",
            ));
        }

        // --- FASE 2: UPSERT PEREZOSO DE CAMPAÑA ---
        let campaign_known = state
            .campaign_repository
            .find_campaign(user_id, &request.campaign_id)
            .await?
            .is_some();

        match (&request.meta, campaign_known) {
            (Some(meta), _) => {
                state
                    .campaign_repository
                    .upsert_from_meta(user_id, &request.campaign_id, meta)
                    .await?;
            }
            (None, false) => {
                return Ok(LeaseResponse::declined(
                    "PENDING_IMPORT",
                    "campaign unknown and no meta supplied",
                ));
            }
            (None, true) => {}
        }

        // --- FASE 3: TRANSICIÓN DEL ESTADO DE CLICKS ---
        let click_state = match state
            .click_state_repository
            .get_state(user_id, &request.campaign_id)
            .await?
        {
            None => {
                state
                    .click_state_repository
                    .create_state(user_id, &request.campaign_id, request.now_clicks, request.observed_at)
                    .await?
            }
            Some(existing_state) => {
                let observation_day = Self::local_calendar_day(request.observed_at);
                let stored_day = Self::local_calendar_day(existing_state.last_observed_at);

                if observation_day != stored_day
                    && request.now_clicks < existing_state.last_applied_clicks
                {
                    // Nuevo día calendario con contador menor: Google Ads reinició.
                    state
                        .click_state_repository
                        .reset_for_new_day(
                            user_id,
                            &request.campaign_id,
                            request.now_clicks,
                            request.observed_at,
                        )
                        .await?;
                } else {
                    state
                        .click_state_repository
                        .refresh_observation(
                            user_id,
                            &request.campaign_id,
                            request.now_clicks,
                            request.observed_at,
                        )
                        .await?;
                }

                state
                    .click_state_repository
                    .get_state(user_id, &request.campaign_id)
                    .await?
                    .ok_or_else(|| RotationFault::Internal("click state vanished".into()))?
            }
        };

        // --- FASE 4: GATE DE INCREMENTO (POLÍTICA DIFERIDA) ---
        // Bajo ack diferido no se arrienda sin avance real del contador;
        // bajo compromiso inmediato el contrato del cliente declara la
        // rotación aplicada a la recepción.
        if state.config.lease_commit_policy == AllocationMode::DeferredAck
            && request.now_clicks <= click_state.last_applied_clicks
        {
            return Ok(LeaseResponse::noop("click_counter_not_advanced"));
        }

        // --- FASE 5: ASIGNACIÓN ATÓMICA ---
        let allocation = AllocationRequest {
            user_id: user_id.to_string(),
            campaign_id: request.campaign_id.clone(),
            idempotency_key: request.idempotency_key.clone(),
            now_clicks: request.now_clicks,
            window_start_epoch_seconds: request.window_start_epoch_seconds,
        };

        let allocation_result = state
            .lease_repository
            .allocate(&allocation, state.config.lease_commit_policy)
            .await;

        match allocation_result {
            Ok((sealed_lease, suffix)) => {
                // Reposición asíncrona tras consumir inventario.
                StockProducer::new(state.clone())
                    .trigger_background_replenish(user_id, &request.campaign_id);

                Ok(LeaseResponse::apply(sealed_lease.id, suffix, "rotation_applied"))
            }
            Err(DbError::NoStock) => {
                state
                    .audit_repository
                    .record_action(
                        user_id,
                        &request.campaign_id,
                        StockAuditAction::NoStock,
                        json!({ "idempotencyKey": request.idempotency_key }),
                    )
                    .await?;

                StockProducer::new(state.clone())
                    .trigger_background_replenish(user_id, &request.campaign_id);

                Ok(LeaseResponse::declined(
                    "NO_STOCK",
                    "inventory empty, asynchronous replenish triggered",
                ))
            }
            Err(DbError::AllocationConflict) => {
                // Una transacción hermana selló primero la misma clave.
                if let Some((existing_lease, joined_suffix)) = state
                    .lease_repository
                    .find_by_idempotency_key(user_id, &request.idempotency_key)
                    .await?
                {
                    return Ok(LeaseResponse::apply(
                        existing_lease.id,
                        joined_suffix.unwrap_or_default(),
                        "idempotent_replay",
                    ));
                }
                Err(RotationFault::Internal("allocation conflict unresolved".into()))
            }
            Err(other_fault) => Err(other_fault.into()),
        }
    }

    /**
     * OPERACIÓN ACK: confirma o revierte una rotación arrendada.
     * Idempotente sobre estados terminales.
     */
    #[instrument(skip(self, request), fields(lease = %request.lease_id))]
    pub async fn ack(
        &self,
        user_id: &str,
        request: &AckRequest,
    ) -> Result<AckResponse, RotationFault> {
        let state = &self.application_state;

        let lease = state
            .lease_repository
            .find_lease(user_id, &request.campaign_id, &request.lease_id)
            .await?
            .ok_or_else(|| RotationFault::NotFound("lease".into()))?;

        // Estados terminales: respuesta idempotente con el estado previo.
        if matches!(lease.status, LeaseStatus::Consumed | LeaseStatus::Failed) {
            return Ok(AckResponse {
                ok: true,
                previous_status: Some(lease.status.as_str().to_string()),
            });
        }

        // Lease reclamado por el janitor: el ack llega tarde.
        if lease.status == LeaseStatus::Expired {
            return Err(RotationFault::LeaseExpired);
        }

        if request.applied {
            state.lease_repository.ack_success(&lease).await?;
        } else {
            let failure_message = request
                .error_message
                .as_deref()
                .unwrap_or("client reported unapplied rotation");
            state
                .lease_repository
                .ack_failure(&lease, failure_message)
                .await?;
            warn!(
                "♻️  [ACK_FAILURE]: Lease [{}] recycled: {}",
                lease.id, failure_message
            );
        }

        Ok(AckResponse { ok: true, previous_status: None })
    }
}
