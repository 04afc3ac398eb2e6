// [libs/core/redirect-tracker/src/lib.rs]
/*!
 * =================================================================
 * APARATO: REDIRECT TRACKER ROOT (V5.0 - CHAIN AUTHORITY)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: EXPOSICIÓN DEL MOTOR DE RASTREO DE REDIRECCIONES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RESULT TUPLES: El rastreador jamás propaga Err a través de su
 *    contrato. Todo fallo queda codificado en el TraceOutcome
 *    (success=false, final_status_code=0, error_message="CODE: ...").
 * 2. DATA-DRIVEN HEURISTICS: La biblioteca de patrones de salto
 *    JavaScript es una tabla de datos nombrada, no código.
 * 3. SEQUENTIAL PURITY: Un rastreo es estrictamente secuencial; el
 *    paralelismo vive en los estratos superiores.
 * =================================================================
 */

/// Contratos de entrada/salida del rastreo.
pub mod contract;
/// Biblioteca de patrones de redirección embebidos en HTML/JS.
pub mod js_patterns;
/// Extracción de dominio raíz con lista cerrada de TLDs compuestos.
pub mod root_domain;
/// Motor secuencial de rastreo paso a paso.
pub mod tracer;

pub use contract::{DomainValidation, TraceOutcome, TraceRequest, TraceStep};
pub use root_domain::{extract_root_domain, same_root_domain};
pub use tracer::RedirectTracer;

/**
 * PRELUDIO DEL RASTREADOR
 *
 * Tipos de alta frecuencia para inyección directa en los estratos de
 * producción de stock y ejecución de clicks.
 */
pub mod prelude {
    pub use crate::contract::{TraceOutcome, TraceRequest};
    pub use crate::tracer::RedirectTracer;
}
