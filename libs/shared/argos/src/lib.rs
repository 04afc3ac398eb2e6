// [libs/shared/argos/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ARGOS NEURAL OBSERVER (V9.0 - COLLAPSE LEDGER)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4/L6)
 * RESPONSABILIDAD: TRAZADO, GOBERNANZA DE RUIDO Y LEDGER DE COLAPSOS
 *
 * # Logic:
 * Los pánicos no se limitan a morir en stderr: el hook los sella en
 * un ledger de proceso acotado que el monitor de alertas drena en su
 * siguiente evaluación, convirtiendo cada colapso de daemon en una
 * señal system_health persistida. La gobernanza de ruido es una tabla
 * de directivas, no código: evolucionar el filtrado significa editar
 * datos.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::VecDeque;
use std::panic;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Gobernanza de ruido: directivas de silenciamiento por sub-sistema.
/// El dominio de rotación habla; las capas de transporte susurran.
const NOISE_GOVERNANCE: &[&str] = &[
    "tower_http=warn",
    "hyper=warn",
    "reqwest=warn",
    "rustls=warn",
    "libsql=error",
];

/// Capacidad del ledger de colapsos (los más viejos se desplazan).
const PANIC_LEDGER_CAPACITY: usize = 8;

/// Registro sellado de un colapso de hilo capturado por el hook.
#[derive(Debug, Clone)]
pub struct PanicRecord {
    /// Servicio que instaló el observador.
    pub service: String,
    /// Coordenadas fuente del colapso (archivo:línea), si existen.
    pub location: String,
    /// Payload textual del pánico.
    pub payload: String,
    pub captured_at: DateTime<Utc>,
}

static PANIC_LEDGER: Mutex<VecDeque<PanicRecord>> = Mutex::new(VecDeque::new());

/// Sella un registro en el ledger acotado.
fn seal_panic_record(record: PanicRecord) {
    if let Ok(mut ledger_guard) = PANIC_LEDGER.lock() {
        if ledger_guard.len() == PANIC_LEDGER_CAPACITY {
            ledger_guard.pop_front();
        }
        ledger_guard.push_back(record);
    }
}

/**
 * Drena el ledger de colapsos. El monitor de alertas invoca esto en
 * cada evaluación: los registros drenados se vuelven señales
 * system_health y el ledger queda vacío.
 */
pub fn drain_panic_records() -> Vec<PanicRecord> {
    PANIC_LEDGER
        .lock()
        .map(|mut ledger_guard| ledger_guard.drain(..).collect())
        .unwrap_or_default()
}

/// Extrae el texto del payload de un pánico arbitrario.
fn collapse_payload_text(raw_payload: &(dyn Any + Send)) -> String {
    if let Some(static_message) = raw_payload.downcast_ref::<&str>() {
        return (*static_message).to_string();
    }
    if let Some(owned_message) = raw_payload.downcast_ref::<String>() {
        return owned_message.clone();
    }
    "OPAQUE_COLLAPSE_PAYLOAD".to_string()
}

/// Construye el filtro de entorno: dominio + gobernanza de ruido.
fn build_environment_filter(service_nominal_identifier: &str) -> EnvFilter {
    if let Ok(operator_supplied_filter) = EnvFilter::try_from_default_env() {
        return operator_supplied_filter;
    }

    let domain_level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let mut filter_directives = vec![format!("{}={}", service_nominal_identifier, domain_level)];
    filter_directives.extend(NOISE_GOVERNANCE.iter().map(|directive| directive.to_string()));

    EnvFilter::new(filter_directives.join(","))
}

/// Inicializa el sistema de trazas Argos y el ledger de colapsos.
///
/// # Comportamiento:
/// - Desarrollo: formato compacto para el Arquitecto.
/// - Producción: tramas JSON aplanadas para agregadores externos.
/// - Todo pánico de cualquier hilo queda sellado en el ledger para su
///   conversión en alerta por el monitor.
///
/// # Errors:
/// Provoca pánico si otro suscriptor global ya fue inicializado.
pub fn init_tracing(service_nominal_identifier: &str) {
    let governance_filter = build_environment_filter(service_nominal_identifier);

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(governance_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(governance_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    }

    // LEDGER DE COLAPSOS: el hook sella antes de que el hilo muera.
    let observing_service = service_nominal_identifier.to_string();
    panic::set_hook(Box::new(move |collapse_metadata| {
        let collapse_location = collapse_metadata
            .location()
            .map(|source| format!("{}:{}", source.file(), source.line()))
            .unwrap_or_else(|| "UNLOCATED_COLLAPSE".to_string());

        let collapse_payload = collapse_payload_text(collapse_metadata.payload());

        seal_panic_record(PanicRecord {
            service: observing_service.clone(),
            location: collapse_location.clone(),
            payload: collapse_payload.clone(),
            captured_at: Utc::now(),
        });

        error!(
            target: "collapse_ledger",
            service = %observing_service,
            location = %collapse_location,
            "💥 [PANIC_SEALED]: {}",
            collapse_payload
        );
    }));

    info!(
        "👁️  [ARGOS_ONLINE]: Observability levelized for [{}]. Collapse ledger armed ({} slots).",
        service_nominal_identifier, PANIC_LEDGER_CAPACITY
    );
}
