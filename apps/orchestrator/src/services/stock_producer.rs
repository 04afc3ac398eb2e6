// [apps/orchestrator/src/services/stock_producer.rs]
/*!
 * =================================================================
 * APARATO: STOCK PRODUCER SERVICE (V4.3 - DYNAMIC WATERMARK)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L2-APP)
 * RESPONSABILIDAD: REPOSICIÓN ACOTADA DEL INVENTARIO DE SUFIJOS
 *
 * # Mathematical Proof (Watermark Sizing):
 * Con C24 consumos en 24h, la tasa horaria es C24/24. La marca de
 * agua clamp(ceil((C24/24) × 2), 3, 20) mantiene dos horas de buffer
 * a la tasa observada, acotada para que campañas frías no acumulen
 * inventario que el envejecimiento destruiría.
 * =================================================================
 */

use crate::services::suffix_generator::SuffixGenerator;
use crate::services::RotationFault;
use crate::state::AppState;
use kylink_domain_models::{
    ProgressEvent, ProgressStage, ReplenishReport, ReplenishVerdict, StockAuditAction,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use super::progress::ProgressEmitter;

pub struct StockProducer {
    application_state: AppState,
}

impl StockProducer {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    /**
     * Marca de agua dinámica por campaña. Cualquier fallo de cálculo
     * degrada a la marca estática de contingencia.
     */
    #[instrument(skip(self))]
    pub async fn dynamic_watermark(&self, user_id: &str, campaign_id: &str) -> i64 {
        let config = &self.application_state.config;

        let consumed_last_window = match self
            .application_state
            .stock_repository
            .consumed_in_window(user_id, campaign_id, config.watermark_window_hours)
            .await
        {
            Ok(count) => count,
            Err(fault) => {
                warn!("💧 [WATERMARK]: Window query failed, static fallback: {}", fault);
                return config.static_low_watermark;
            }
        };

        if consumed_last_window == 0 {
            return config.watermark_default;
        }

        let hourly_rate = consumed_last_window as f64 / config.watermark_window_hours as f64;
        let buffered = (hourly_rate * config.watermark_safety_factor).ceil() as i64;
        buffered.clamp(config.watermark_min, config.watermark_max)
    }

    /**
     * Reposición de una campaña individual bajo el limitador por
     * campaña. `force` ignora la comparación contra la marca de agua.
     */
    #[instrument(skip(self), fields(campaign = %campaign_id))]
    pub async fn replenish_campaign(
        &self,
        user_id: &str,
        campaign_id: &str,
        force: bool,
    ) -> Result<ReplenishReport, RotationFault> {
        let state = &self.application_state;

        let available_before = state
            .stock_repository
            .count_available(user_id, campaign_id)
            .await?;
        let watermark = self.dynamic_watermark(user_id, campaign_id).await;

        if available_before >= watermark && !force {
            state
                .audit_repository
                .record_action(
                    user_id,
                    campaign_id,
                    StockAuditAction::Skipped,
                    json!({ "available": available_before, "watermark": watermark }),
                )
                .await?;

            return Ok(ReplenishReport {
                user_id: user_id.to_string(),
                campaign_id: campaign_id.to_string(),
                verdict: ReplenishVerdict::Skipped,
                watermark,
                available_before,
                produced_count: 0,
                failed_count: 0,
            });
        }

        let produce_count =
            (watermark - available_before).max(state.config.produce_batch_size) as usize;

        // Resolución de campaña y enlace efectivo (elegibilidad).
        let campaign = state
            .campaign_repository
            .find_campaign(user_id, campaign_id)
            .await?
            .ok_or(RotationFault::PendingImport)?;

        let affiliate_link = state
            .campaign_repository
            .effective_affiliate_link(user_id, campaign_id)
            .await?
            .ok_or_else(|| {
                RotationFault::Validation("campaign has no enabled affiliate link".into())
            })?;

        // Abanico acotado por el semáforo de producción por campaña.
        let production_limiter = Arc::new(Semaphore::new(state.config.stock_concurrency));
        let mut production_handles = Vec::with_capacity(produce_count);

        for _ in 0..produce_count {
            let limiter = production_limiter.clone();
            let generator = SuffixGenerator::new(state.clone());
            let campaign_snapshot = campaign.clone();
            let link_snapshot = affiliate_link.clone();

            production_handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire_owned().await.ok()?;
                generator.generate_one(&campaign_snapshot, &link_snapshot).await
            }));
        }

        let mut fresh_items = Vec::with_capacity(produce_count);
        for handle in production_handles {
            if let Ok(Some(item)) = handle.await {
                fresh_items.push(item);
            }
        }

        let failed_count = (produce_count - fresh_items.len()) as i64;
        let produced_count = state
            .stock_repository
            .bulk_insert_available(&fresh_items)
            .await? as i64;

        let verdict = if produced_count > 0 {
            ReplenishVerdict::Produced
        } else {
            ReplenishVerdict::Exhausted
        };

        state
            .audit_repository
            .record_action(
                user_id,
                campaign_id,
                StockAuditAction::Produced,
                json!({
                    "requested": produce_count,
                    "produced": produced_count,
                    "failed": failed_count,
                    "watermark": watermark,
                    "forced": force
                }),
            )
            .await?;

        info!(
            "🏭 [REPLENISH]: Campaign [{}] minted {}/{} items (watermark {}).",
            campaign_id, produced_count, produce_count, watermark
        );

        Ok(ReplenishReport {
            user_id: user_id.to_string(),
            campaign_id: campaign_id.to_string(),
            verdict,
            watermark,
            available_before,
            produced_count,
            failed_count,
        })
    }

    /// Disparo fire-and-forget (asignaciones con inventario vacío).
    pub fn trigger_background_replenish(&self, user_id: &str, campaign_id: &str) {
        let state = self.application_state.clone();
        let user_snapshot = user_id.to_string();
        let campaign_snapshot = campaign_id.to_string();

        tokio::spawn(async move {
            let producer = StockProducer::new(state);
            if let Err(fault) = producer
                .replenish_campaign(&user_snapshot, &campaign_snapshot, false)
                .await
            {
                warn!(
                    "🏭 [REPLENISH_ASYNC]: Background replenish collapsed for [{}]: {}",
                    campaign_snapshot, fault
                );
            }
        });
    }

    /**
     * BARRIDO POR LOTES: repone todas las campañas elegibles bajo el
     * limitador externo. Los fallos por campaña no abortan el barrido;
     * se acumulan y emiten una única alerta agregada.
     */
    #[instrument(skip(self, progress))]
    pub async fn sweep_all_campaigns(
        &self,
        progress: Option<ProgressEmitter>,
    ) -> Result<serde_json::Value, RotationFault> {
        let state = &self.application_state;
        let eligible_campaigns = state.campaign_repository.producible_campaigns().await?;
        let total_campaigns = eligible_campaigns.len() as u64;

        if let Some(emitter) = &progress {
            emitter
                .emit(ProgressEvent {
                    stage: ProgressStage::Init,
                    current: 0,
                    total: total_campaigns,
                    message: format!("sweep over {} eligible campaigns", total_campaigns),
                    extra: Some(json!({
                        // El contador de progreso reporta la concurrencia CONFIGURADA.
                        "campaignConcurrency": state.config.campaign_concurrency
                    })),
                })
                .await;
        }

        let sweep_limiter = Arc::new(Semaphore::new(state.config.campaign_concurrency));
        let mut sweep_handles = Vec::with_capacity(eligible_campaigns.len());

        for campaign in eligible_campaigns {
            // Cancelación observada entre despachos.
            if progress.as_ref().map(|p| p.is_cancelled()).unwrap_or(false) {
                warn!("🧹 [SWEEP]: Consumer cancelled; halting campaign dispatch.");
                break;
            }

            let limiter = sweep_limiter.clone();
            let producer_state = state.clone();
            sweep_handles.push(tokio::spawn(async move {
                let Ok(_permit) = limiter.acquire_owned().await else {
                    return (campaign, Err(RotationFault::Internal("limiter closed".into())));
                };
                let producer = StockProducer::new(producer_state);
                let verdict = producer
                    .replenish_campaign(&campaign.user_id, &campaign.campaign_id, false)
                    .await;
                (campaign, verdict)
            }));
        }

        let mut completed: u64 = 0;
        let mut produced_total: i64 = 0;
        let mut failures: Vec<String> = Vec::new();

        for handle in sweep_handles {
            let Ok((campaign, verdict)) = handle.await else {
                failures.push("worker panic".to_string());
                continue;
            };
            completed += 1;

            match verdict {
                Ok(report) => produced_total += report.produced_count,
                Err(fault) => failures.push(format!("{}: {}", campaign.campaign_id, fault)),
            }

            if let Some(emitter) = &progress {
                let keep_going = emitter
                    .emit(ProgressEvent::milestone(
                        ProgressStage::Processing,
                        completed,
                        total_campaigns,
                        &format!("campaign {}/{} processed", completed, total_campaigns),
                    ))
                    .await;
                if !keep_going {
                    break;
                }
            }
        }

        // Alerta agregada única por barrido con fallos.
        if !failures.is_empty() {
            let _ = state
                .alert_repository
                .insert_alert(
                    None,
                    kylink_domain_models::AlertKind::SystemHealth,
                    kylink_domain_models::AlertLevel::Warning,
                    "stock sweep completed with failures",
                    &format!("{} campaigns failed during replenish sweep", failures.len()),
                    json!({ "failures": failures }),
                )
                .await;
        }

        Ok(json!({
            "campaigns": total_campaigns,
            "completed": completed,
            "producedTotal": produced_total,
        }))
    }
}
