// [apps/orchestrator/src/services/click_executor.rs]
/*!
 * =================================================================
 * APARATO: CLICK EXECUTOR SERVICE (V4.2 - HUMAN PACING)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L2-APP)
 * RESPONSABILIDAD: EJECUCIÓN SERIAL DE ITEMS DE INUNDACIÓN VENCIDOS
 *
 * # Logic:
 * Cada tick drena a lo sumo 20 items vencidos en orden scheduled_at.
 * Los items se agrupan por tarea; el carrusel de egreso se adquiere
 * una vez por tarea y se reinicia el conjunto de intentados por item
 * para forzar diversidad de canal. Entre items media una pausa
 * humana uniforme de 3 a 9 segundos.
 * =================================================================
 */

use crate::state::AppState;
use kylink_core_pacing::{pick_random_referer, pick_random_user_agent};
use kylink_core_proxy::ProxyCarousel;
use kylink_core_tracker::{RedirectTracer, TraceRequest};
use kylink_domain_models::ExitIpIdentity;
use kylink_infra_db::repositories::DueClickItem;
use kylink_infra_db::DbError;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Tope de items drenados por tick.
const TICK_FETCH_LIMIT: i64 = 20;

/// Parámetros de rastreo del contexto de click.
const CLICK_MAX_REDIRECTS: u32 = 15;
const CLICK_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);
const CLICK_TOTAL_TIMEOUT: Duration = Duration::from_secs(120);
const CLICK_RETRY_COUNT: u32 = 1;

/// Pausa humana entre items (milisegundos).
const HUMAN_PACING_FLOOR_MS: u64 = 3_000;
const HUMAN_PACING_CEILING_MS: u64 = 9_000;

/// Resumen de un tick de ejecución.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub drained: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub tasks_touched: usize,
}

pub struct ClickExecutor {
    application_state: AppState,
}

impl ClickExecutor {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    /// Agrupa los items vencidos por tarea preservando el orden global.
    fn group_by_task(due_items: Vec<DueClickItem>) -> Vec<(String, Vec<DueClickItem>)> {
        let mut grouped: Vec<(String, Vec<DueClickItem>)> = Vec::new();
        for item in due_items {
            match grouped.iter_mut().find(|(task_id, _)| *task_id == item.task_id) {
                Some((_, bucket)) => bucket.push(item),
                None => grouped.push((item.task_id.clone(), vec![item])),
            }
        }
        grouped
    }

    /**
     * TICK DE EJECUCIÓN: drena y ejecuta los items vencidos.
     */
    #[instrument(skip(self))]
    pub async fn execute_tick(&self) -> Result<TickReport, DbError> {
        let state = &self.application_state;
        let due_items = state.click_task_repository.due_items(TICK_FETCH_LIMIT).await?;

        if due_items.is_empty() {
            return Ok(TickReport { drained: 0, succeeded: 0, failed: 0, tasks_touched: 0 });
        }

        let grouped = Self::group_by_task(due_items);
        let mut touched_tasks: HashSet<String> = HashSet::new();
        let mut report = TickReport {
            drained: 0,
            succeeded: 0,
            failed: 0,
            tasks_touched: grouped.len(),
        };

        for (task_id, task_items) in grouped {
            touched_tasks.insert(task_id.clone());

            // Coordenadas de la tarea: campaña, país y enlace efectivo.
            let first_item = &task_items[0];
            let Some(campaign) = state
                .campaign_repository
                .find_campaign(&first_item.user_id, &first_item.campaign_id)
                .await?
            else {
                warn!("🖱️ [CLICK_TICK]: Campaign vanished for task [{}].", task_id);
                continue;
            };

            let Some(affiliate_link) = state
                .campaign_repository
                .effective_affiliate_link(&first_item.user_id, &first_item.campaign_id)
                .await?
            else {
                warn!("🖱️ [CLICK_TICK]: No enabled link for task [{}].", task_id);
                continue;
            };

            // Un carrusel por tarea, reutilizado entre items para diversidad.
            let providers = state
                .proxy_repository
                .providers_for_user(&first_item.user_id)
                .await
                .unwrap_or_default();
            let used_exit_ips = state
                .proxy_repository
                .used_exit_ips(&first_item.user_id, &first_item.campaign_id)
                .await
                .unwrap_or_default();
            let mut carousel =
                ProxyCarousel::new(providers, used_exit_ips, &campaign.country_code);

            for due_item in task_items {
                // Captura condicional: otra instancia pudo ganarla.
                if !state
                    .click_task_repository
                    .mark_item_executing(&due_item.item_id)
                    .await?
                {
                    continue;
                }
                report.drained += 1;

                // Diversidad por item: selección fresca forzada.
                carousel.reset_tried();
                let channel = carousel.acquire().await;

                let execution_started = Instant::now();
                let (success, exit_ip, error_message) = match &channel {
                    Some(resolved_channel) => {
                        let outcome = RedirectTracer::trace(&TraceRequest {
                            url: affiliate_link.target_url.clone(),
                            proxy_socks_url: Some(resolved_channel.socks_url.clone()),
                            target_domain: if campaign.final_url.is_empty() {
                                None
                            } else {
                                Some(campaign.final_url.clone())
                            },
                            initial_referer: pick_random_referer().map(str::to_string),
                            max_redirects: CLICK_MAX_REDIRECTS,
                            request_timeout: CLICK_REQUEST_TIMEOUT,
                            total_timeout: CLICK_TOTAL_TIMEOUT,
                            retry_count: CLICK_RETRY_COUNT,
                            user_agent: pick_random_user_agent().to_string(),
                        })
                        .await;

                        let observed_ip = match &resolved_channel.exit_ip {
                            ExitIpIdentity::Observed(address) => Some(address.clone()),
                            ExitIpIdentity::Unknown => None,
                        };
                        (outcome.success, observed_ip, outcome.error_message)
                    }
                    None => (false, None, Some("NO_PROXY_AVAILABLE: carousel exhausted".into())),
                };

                let duration_milliseconds = execution_started.elapsed().as_millis() as i64;

                state
                    .click_task_repository
                    .record_item_outcome(
                        &due_item.item_id,
                        &due_item.task_id,
                        success,
                        exit_ip.as_deref(),
                        error_message.as_deref(),
                        duration_milliseconds,
                    )
                    .await?;

                if success {
                    report.succeeded += 1;
                } else {
                    report.failed += 1;
                }

                // Pausa humana uniforme entre items.
                let pacing_milliseconds =
                    rand::thread_rng().gen_range(HUMAN_PACING_FLOOR_MS..=HUMAN_PACING_CEILING_MS);
                tokio::time::sleep(Duration::from_millis(pacing_milliseconds)).await;
            }
        }

        // Finalización de tareas drenadas tras el tick.
        for task_id in touched_tasks {
            if !state.click_task_repository.task_has_open_items(&task_id).await? {
                state.click_task_repository.finalize_drained_task(&task_id).await?;
            }
        }

        info!(
            "🖱️ [CLICK_TICK]: {} executed ({} ok, {} failed) across {} tasks.",
            report.drained, report.succeeded, report.failed, report.tasks_touched
        );
        Ok(report)
    }
}
