// [apps/orchestrator/src/config.rs]
/*!
 * =================================================================
 * APARATO: ROTATION CONFIG CAPTURE (V4.1 - ENV SOVEREIGNTY)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: CAPTURA TIPADA Y ÚNICA DEL ENTORNO DE EJECUCIÓN
 *
 * # Logic:
 * Toda perilla operativa del núcleo se captura una única vez en el
 * arranque. Los daemons y servicios leen esta estructura inmutable;
 * ningún estrato vuelve a consultar el entorno en caliente.
 * =================================================================
 */

use kylink_infra_db::repositories::AllocationMode;
use std::env;

/// Lee una variable numérica con valor por defecto.
fn environment_number<T: std::str::FromStr>(key: &str, default_value: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default_value)
}

/// Lee una bandera booleana ("1"/"true" encienden).
fn environment_flag(key: &str, default_value: bool) -> bool {
    env::var(key)
        .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default_value)
}

/// Configuración completa del núcleo de rotación (perillas de §operación).
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Items acuñados como mínimo por pasada de reposición.
    pub produce_batch_size: i64,
    /// Marca de agua estática de contingencia.
    pub static_low_watermark: i64,
    /// TTL de un lease sin ack antes de la reclamación.
    pub lease_ttl_minutes: i64,
    /// TTL de un item disponible antes del envejecimiento.
    pub suffix_ttl_hours: i64,
    /// Límite de producción concurrente por campaña.
    pub stock_concurrency: usize,
    /// Límite de campañas procesadas en paralelo por el barrido.
    pub campaign_concurrency: usize,
    /// Tope de elementos por solicitud batch.
    pub max_batch_size: usize,
    /// Habilita sufijos sintéticos cuando todos los proxies fallan.
    pub allow_mock_suffix: bool,
    /// Webhook opcional para el despacho de alertas.
    pub alert_webhook_url: Option<String>,
    /// Política de compromiso del motor de leases.
    pub lease_commit_policy: AllocationMode,
    /// Secreto compartido para los endpoints iniciados por cron externo.
    pub cron_shared_secret: Option<String>,
    /// Tickers internos del registro de trabajos (producción puede
    /// apagarlos y conducir los jobs exclusivamente por cron externo).
    pub internal_tickers_enabled: bool,

    // --- MARCA DE AGUA DINÁMICA ---
    pub watermark_window_hours: i64,
    pub watermark_safety_factor: f64,
    pub watermark_default: i64,
    pub watermark_min: i64,
    pub watermark_max: i64,

    // --- CADENCIAS DE TRABAJOS ---
    pub stock_replenish_interval_minutes: u64,
    pub monitoring_interval_minutes: u64,
    pub click_execute_interval_minutes: u64,
    pub lease_expiry_interval_minutes: u64,
    pub stock_aging_interval_minutes: u64,
}

impl RotationConfig {
    /// Captura soberana del entorno con los defaults documentados.
    pub fn from_environment() -> Self {
        let lease_commit_policy = match env::var("LEASE_COMMIT_POLICY")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "deferred_ack" => AllocationMode::DeferredAck,
            _ => AllocationMode::ImmediateCommit,
        };

        Self {
            produce_batch_size: environment_number("PRODUCE_BATCH_SIZE", 10),
            static_low_watermark: environment_number("LOW_WATERMARK", 3),
            lease_ttl_minutes: environment_number("LEASE_TTL_MINUTES", 15),
            suffix_ttl_hours: environment_number("SUFFIX_TTL_HOURS", 48),
            stock_concurrency: environment_number("STOCK_CONCURRENCY", 5),
            campaign_concurrency: environment_number("CAMPAIGN_CONCURRENCY", 3),
            max_batch_size: environment_number("MAX_BATCH_SIZE", 500),
            allow_mock_suffix: environment_flag("ALLOW_MOCK_SUFFIX", false),
            alert_webhook_url: env::var("ALERT_WEBHOOK_URL").ok().filter(|url| !url.is_empty()),
            lease_commit_policy,
            cron_shared_secret: env::var("CRON_SHARED_SECRET").ok().filter(|secret| !secret.is_empty()),
            internal_tickers_enabled: environment_flag("JOBS_INTERNAL_TICKER", true),

            watermark_window_hours: environment_number("WATERMARK_WINDOW_HOURS", 24),
            watermark_safety_factor: environment_number("WATERMARK_SAFETY_FACTOR", 2.0),
            watermark_default: environment_number("WATERMARK_DEFAULT", 5),
            watermark_min: environment_number("WATERMARK_MIN", 3),
            watermark_max: environment_number("WATERMARK_MAX", 20),

            stock_replenish_interval_minutes: environment_number("STOCK_REPLENISH_INTERVAL_MINUTES", 10),
            monitoring_interval_minutes: environment_number("MONITORING_INTERVAL_MINUTES", 10),
            click_execute_interval_minutes: environment_number("CLICK_EXECUTE_INTERVAL_MINUTES", 1),
            lease_expiry_interval_minutes: environment_number("LEASE_EXPIRY_INTERVAL_MINUTES", 5),
            stock_aging_interval_minutes: environment_number("STOCK_AGING_INTERVAL_MINUTES", 60),
        }
    }

    /// Configuración determinista para el Proving Grounds.
    pub fn for_tests() -> Self {
        Self {
            produce_batch_size: 10,
            static_low_watermark: 3,
            lease_ttl_minutes: 15,
            suffix_ttl_hours: 48,
            stock_concurrency: 5,
            campaign_concurrency: 3,
            max_batch_size: 500,
            allow_mock_suffix: true,
            alert_webhook_url: None,
            lease_commit_policy: AllocationMode::ImmediateCommit,
            cron_shared_secret: None,
            internal_tickers_enabled: false,
            watermark_window_hours: 24,
            watermark_safety_factor: 2.0,
            watermark_default: 5,
            watermark_min: 3,
            watermark_max: 20,
            stock_replenish_interval_minutes: 10,
            monitoring_interval_minutes: 10,
            click_execute_interval_minutes: 1,
            lease_expiry_interval_minutes: 5,
            stock_aging_interval_minutes: 60,
        }
    }
}
