// [apps/orchestrator/src/services/alert_evaluator.rs]
/*!
 * =================================================================
 * APARATO: ALERT EVALUATOR SERVICE (V4.2 - FOUR RULE MONITOR)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: EVALUACIÓN PERIÓDICA DE REGLAS Y DESPACHO WEBHOOK
 *
 * # Logic:
 * Cuatro reglas contra el Ledger: low_stock (inventario bajo la marca
 * de agua, severidad por conteo), lease_timeout (lease arrendado más
 * antiguo >= 10m), high_failure_rate (fallos/total >= 10% en 60m) y
 * no_stock_frequent (acción de auditoría repetida >= 10 veces en 24h).
 * Además, cada evaluación drena el ledger de colapsos de Argos: todo
 * pánico de daemon sellado desde la pasada anterior se convierte en
 * una señal system_health. Cada señal se persiste y, si hay webhook
 * configurado, se despacha en segundo plano sin bloquear.
 * =================================================================
 */

use crate::services::stock_producer::StockProducer;
use crate::state::AppState;
use kylink_domain_models::{Alert, AlertKind, AlertLevel, StockAuditAction};
use kylink_infra_db::DbError;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Umbral de espera del lease más antiguo (minutos).
const LEASE_TIMEOUT_THRESHOLD_MINUTES: i64 = 10;

/// Ventana y umbral de la tasa de fallos.
const FAILURE_RATE_WINDOW_MINUTES: i64 = 60;
const FAILURE_RATE_THRESHOLD: f64 = 0.10;

/// Umbral de frecuencia de la acción no_stock en 24h.
const NO_STOCK_FREQUENT_THRESHOLD: i64 = 10;

pub struct AlertEvaluator {
    application_state: AppState,
}

impl AlertEvaluator {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    /// Despacho webhook en segundo plano (mejor esfuerzo).
    fn dispatch_webhook(&self, alert: &Alert) {
        let Some(webhook_url) = self.application_state.config.alert_webhook_url.clone() else {
            return;
        };
        let alert_payload = match serde_json::to_value(alert) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        tokio::spawn(async move {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build();
            let Ok(client) = client else { return };

            if let Err(dispatch_fault) = client.post(&webhook_url).json(&alert_payload).send().await {
                warn!("📣 [WEBHOOK]: Alert dispatch failed: {}", dispatch_fault);
            }
        });
    }

    /**
     * EVALUACIÓN COMPLETA: corre las cuatro reglas más el drenado del
     * ledger de colapsos y devuelve la cantidad de señales emitidas.
     */
    #[instrument(skip(self))]
    pub async fn evaluate_all(&self) -> Result<u64, DbError> {
        let mut emitted_count: u64 = 0;

        emitted_count += self.rule_low_stock().await? as u64;
        emitted_count += self.rule_lease_timeout().await? as u64;
        emitted_count += self.rule_high_failure_rate().await? as u64;
        emitted_count += self.rule_no_stock_frequent().await? as u64;
        emitted_count += self.rule_process_collapses().await? as u64;

        if emitted_count > 0 {
            info!("🚨 [MONITOR]: {} alert signals emitted this evaluation.", emitted_count);
        }
        Ok(emitted_count)
    }

    /// REGLA 1: campañas con inventario bajo su marca de agua.
    async fn rule_low_stock(&self) -> Result<usize, DbError> {
        let state = &self.application_state;
        let producer = StockProducer::new(state.clone());
        let levels = state.stock_repository.available_levels().await?;

        let mut breached_campaigns: Vec<serde_json::Value> = Vec::new();
        for (user_id, campaign_id, available_count) in levels {
            let watermark = producer.dynamic_watermark(&user_id, &campaign_id).await;
            if available_count < watermark {
                breached_campaigns.push(json!({
                    "userId": user_id,
                    "campaignId": campaign_id,
                    "available": available_count,
                    "watermark": watermark
                }));
            }
        }

        if breached_campaigns.is_empty() {
            return Ok(0);
        }

        let severity = match breached_campaigns.len() {
            count if count > 5 => AlertLevel::Critical,
            count if count > 2 => AlertLevel::Warning,
            _ => AlertLevel::Info,
        };

        let alert = self
            .application_state
            .alert_repository
            .insert_alert(
                None,
                AlertKind::LowStock,
                severity,
                "campaigns below stock watermark",
                &format!("{} campaigns below their dynamic watermark", breached_campaigns.len()),
                json!({ "campaigns": breached_campaigns }),
            )
            .await?;
        self.dispatch_webhook(&alert);
        Ok(1)
    }

    /// REGLA 2: el lease arrendado más antiguo espera demasiado.
    async fn rule_lease_timeout(&self) -> Result<usize, DbError> {
        let Some(oldest_age_minutes) = self
            .application_state
            .lease_repository
            .oldest_leased_age_minutes()
            .await?
        else {
            return Ok(0);
        };

        if oldest_age_minutes < LEASE_TIMEOUT_THRESHOLD_MINUTES {
            return Ok(0);
        }

        let alert = self
            .application_state
            .alert_repository
            .insert_alert(
                None,
                AlertKind::LeaseTimeout,
                AlertLevel::Warning,
                "oldest leased suffix exceeds wait threshold",
                &format!("oldest lease has waited {} minutes without ack", oldest_age_minutes),
                json!({ "oldestAgeMinutes": oldest_age_minutes }),
            )
            .await?;
        self.dispatch_webhook(&alert);
        Ok(1)
    }

    /// REGLA 3: tasa de acks fallidos sobre la última hora.
    async fn rule_high_failure_rate(&self) -> Result<usize, DbError> {
        let (consumed_count, failed_count) = self
            .application_state
            .lease_repository
            .ack_window_counts(FAILURE_RATE_WINDOW_MINUTES)
            .await?;

        let total = consumed_count + failed_count;
        if total == 0 {
            return Ok(0);
        }

        let failure_rate = failed_count as f64 / total as f64;
        if failure_rate < FAILURE_RATE_THRESHOLD {
            return Ok(0);
        }

        let alert = self
            .application_state
            .alert_repository
            .insert_alert(
                None,
                AlertKind::HighFailureRate,
                AlertLevel::Critical,
                "rotation failure rate above threshold",
                &format!("{:.1}% of acked rotations failed in the last hour", failure_rate * 100.0),
                json!({ "consumed": consumed_count, "failed": failed_count, "rate": failure_rate }),
            )
            .await?;
        self.dispatch_webhook(&alert);
        Ok(1)
    }

    /// LEDGER DE COLAPSOS: pánicos de daemons sellados por Argos desde
    /// la evaluación anterior se vuelven señales system_health.
    async fn rule_process_collapses(&self) -> Result<usize, DbError> {
        let collapse_records = kylink_shared_argos::drain_panic_records();
        if collapse_records.is_empty() {
            return Ok(0);
        }

        let rendered_collapses: Vec<serde_json::Value> = collapse_records
            .iter()
            .map(|record| {
                json!({
                    "service": record.service,
                    "location": record.location,
                    "payload": record.payload,
                    "capturedAt": record.captured_at.to_rfc3339(),
                })
            })
            .collect();

        let alert = self
            .application_state
            .alert_repository
            .insert_alert(
                None,
                AlertKind::SystemHealth,
                AlertLevel::Critical,
                "daemon panic captured by collapse ledger",
                &format!("{} panic(s) sealed since last evaluation", collapse_records.len()),
                json!({ "collapses": rendered_collapses }),
            )
            .await?;
        self.dispatch_webhook(&alert);
        Ok(1)
    }

    /// REGLA 4: asignaciones sin inventario repetidas en 24h.
    async fn rule_no_stock_frequent(&self) -> Result<usize, DbError> {
        let no_stock_count = self
            .application_state
            .audit_repository
            .count_action_in_window(StockAuditAction::NoStock, 24)
            .await?;

        if no_stock_count < NO_STOCK_FREQUENT_THRESHOLD {
            return Ok(0);
        }

        let alert = self
            .application_state
            .alert_repository
            .insert_alert(
                None,
                AlertKind::NoStockFrequent,
                AlertLevel::Warning,
                "frequent empty-inventory allocations",
                &format!("{} no-stock allocations recorded in 24h", no_stock_count),
                json!({ "noStockCount": no_stock_count }),
            )
            .await?;
        self.dispatch_webhook(&alert);
        Ok(1)
    }
}
