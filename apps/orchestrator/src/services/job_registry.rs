// [apps/orchestrator/src/services/job_registry.rs]
/*!
 * =================================================================
 * APARATO: JOB REGISTRY SERVICE (V4.2 - NAMED DAEMON LEDGER)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: TRABAJOS NOMINALES, TICKERS Y RING DE HISTORIAL
 *
 * # Logic:
 * Singleton de proceso con ciclo de vida explícito: el kernel lo
 * construye, opcionalmente lanza un ticker interno por trabajo, y los
 * despliegues de producción pueden apagar los tickers y conducir cada
 * trabajo por el endpoint de cron externo. Toda ejecución, interna o
 * ad-hoc, queda sellada en un ring de 100 entradas.
 * =================================================================
 */

use crate::config::RotationConfig;
use crate::services::{
    AlertEvaluator, ClickExecutor, RecoveryService, RotationFault, StockProducer,
};
use crate::state::AppState;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Capacidad del ring de historial de ejecuciones.
const EXECUTION_HISTORY_CAPACITY: usize = 100;

/// Definición inmutable de un trabajo nominal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub interval_minutes: u64,
    pub enabled: bool,
}

/// Registro sellado de una ejecución.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecutionRecord {
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub duration_milliseconds: u64,
    pub success: bool,
    pub outcome: String,
}

pub struct JobRegistry {
    definitions: Vec<JobDefinition>,
    execution_history: Mutex<VecDeque<JobExecutionRecord>>,
    last_runs: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl JobRegistry {
    /// Construye el registro con los trabajos por defecto del núcleo.
    pub fn new(config: &RotationConfig) -> Self {
        let definitions = vec![
            JobDefinition {
                name: "stock_replenish",
                description: "Batch sweep replenishing every eligible campaign",
                interval_minutes: config.stock_replenish_interval_minutes,
                enabled: true,
            },
            JobDefinition {
                name: "monitoring_alert",
                description: "Evaluate the four alert rules against the ledger",
                interval_minutes: config.monitoring_interval_minutes,
                enabled: true,
            },
            JobDefinition {
                name: "click_task_execute",
                description: "Drain due click-task items with human pacing",
                interval_minutes: config.click_execute_interval_minutes,
                enabled: true,
            },
            JobDefinition {
                name: "lease_expiry",
                description: "Reclaim leased suffixes that missed their ack window",
                interval_minutes: config.lease_expiry_interval_minutes,
                enabled: true,
            },
            JobDefinition {
                name: "stock_aging",
                description: "Expire available stock older than the suffix TTL",
                interval_minutes: config.stock_aging_interval_minutes,
                enabled: true,
            },
            JobDefinition {
                name: "exit_ip_reaper",
                description: "Purge expired rows from the exit-IP dedup ledger",
                interval_minutes: config.stock_aging_interval_minutes,
                enabled: true,
            },
        ];

        Self {
            definitions,
            execution_history: Mutex::new(VecDeque::with_capacity(EXECUTION_HISTORY_CAPACITY)),
            last_runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn definitions(&self) -> &[JobDefinition] {
        &self.definitions
    }

    /// Sella una ejecución en el ring acotado.
    fn seal_execution_record(&self, record: JobExecutionRecord) {
        if let Ok(mut history_guard) = self.execution_history.lock() {
            if history_guard.len() == EXECUTION_HISTORY_CAPACITY {
                history_guard.pop_front();
            }
            history_guard.push_back(record);
        }
    }

    /**
     * EJECUCIÓN AD-HOC: despacha el trabajo nominal y sella historial.
     * Es el mismo camino que usan los tickers internos y el cron externo.
     */
    #[instrument(skip(self, application_state))]
    pub async fn execute_job(
        &self,
        job_name: &str,
        application_state: AppState,
    ) -> Result<Value, RotationFault> {
        if !self.definitions.iter().any(|definition| definition.name == job_name) {
            return Err(RotationFault::NotFound(format!("job [{}]", job_name)));
        }

        let started_at = Utc::now();
        let stopwatch = Instant::now();

        let execution_result: Result<Value, RotationFault> = match job_name {
            "stock_replenish" => {
                StockProducer::new(application_state)
                    .sweep_all_campaigns(None)
                    .await
            }
            "monitoring_alert" => AlertEvaluator::new(application_state)
                .evaluate_all()
                .await
                .map(|emitted| json!({ "alertsEmitted": emitted }))
                .map_err(RotationFault::from),
            "click_task_execute" => ClickExecutor::new(application_state)
                .execute_tick()
                .await
                .map(|report| serde_json::to_value(report).unwrap_or(Value::Null))
                .map_err(RotationFault::from),
            "lease_expiry" => RecoveryService::new(application_state)
                .expire_stale_leases()
                .await
                .map(|reclaimed| json!({ "leasesReclaimed": reclaimed }))
                .map_err(RotationFault::from),
            "stock_aging" => RecoveryService::new(application_state)
                .age_stale_stock()
                .await
                .map(|expired| json!({ "stockExpired": expired }))
                .map_err(RotationFault::from),
            "exit_ip_reaper" => RecoveryService::new(application_state)
                .reap_exit_ip_ledger()
                .await
                .map(|reaped| json!({ "rowsReaped": reaped }))
                .map_err(RotationFault::from),
            _ => Err(RotationFault::NotFound(format!("job [{}]", job_name))),
        };

        let duration_milliseconds = stopwatch.elapsed().as_millis() as u64;

        if let Ok(mut last_runs_guard) = self.last_runs.lock() {
            last_runs_guard.insert(job_name.to_string(), started_at);
        }

        match &execution_result {
            Ok(outcome) => {
                self.seal_execution_record(JobExecutionRecord {
                    job_name: job_name.to_string(),
                    started_at,
                    duration_milliseconds,
                    success: true,
                    outcome: outcome.to_string(),
                });
                info!("🧭 [JOBS]: [{}] completed in {}ms.", job_name, duration_milliseconds);
            }
            Err(fault) => {
                self.seal_execution_record(JobExecutionRecord {
                    job_name: job_name.to_string(),
                    started_at,
                    duration_milliseconds,
                    success: false,
                    outcome: fault.to_string(),
                });
                error!("🧭 [JOBS]: [{}] collapsed: {}", job_name, fault);
            }
        }

        execution_result
    }

    /// Vista de estado: definiciones, última corrida y próxima estimada.
    pub fn status_snapshot(&self) -> Value {
        let last_runs_guard = self.last_runs.lock().ok();
        let history_guard = self.execution_history.lock().ok();

        let jobs: Vec<Value> = self
            .definitions
            .iter()
            .map(|definition| {
                let last_run = last_runs_guard
                    .as_ref()
                    .and_then(|runs| runs.get(definition.name).copied());
                let next_run = last_run.map(|run| {
                    run + ChronoDuration::minutes(definition.interval_minutes as i64)
                });
                json!({
                    "name": definition.name,
                    "description": definition.description,
                    "intervalMinutes": definition.interval_minutes,
                    "enabled": definition.enabled,
                    "lastRun": last_run,
                    "nextRun": next_run,
                })
            })
            .collect();

        let recent_history: Vec<JobExecutionRecord> = history_guard
            .map(|history| history.iter().rev().take(20).cloned().collect())
            .unwrap_or_default();

        json!({ "jobs": jobs, "recentHistory": recent_history })
    }

    /**
     * TICKERS INTERNOS: un daemon por trabajo habilitado. Producción
     * puede apagarlos (JOBS_INTERNAL_TICKER=0) y conducir los trabajos
     * exclusivamente por el endpoint de cron externo.
     */
    pub fn spawn_internal_tickers(application_state: AppState) {
        if !application_state.config.internal_tickers_enabled {
            warn!("🧭 [JOBS]: Internal tickers disabled; external cron drives all jobs.");
            return;
        }

        for definition in application_state.job_registry.definitions().to_vec() {
            if !definition.enabled {
                continue;
            }

            let ticker_state = application_state.clone();
            tokio::spawn(async move {
                let mut maintenance_ticker =
                    tokio::time::interval(Duration::from_secs(definition.interval_minutes * 60));
                // El primer tick es inmediato; lo consumimos para espaciar.
                maintenance_ticker.tick().await;

                info!(
                    "🧭 [JOBS]: Ticker armed for [{}] every {}m.",
                    definition.name, definition.interval_minutes
                );

                loop {
                    maintenance_ticker.tick().await;
                    let registry = ticker_state.job_registry.clone();
                    let _ = registry
                        .execute_job(definition.name, ticker_state.clone())
                        .await;
                }
            });
        }
    }
}
