// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY ROOT (V4.0 - MODULE AUTHORITY)
 * CLASIFICACIÓN: CRATE ROOT (ESTRATO L3)
 * RESPONSABILIDAD: DEFINICIÓN SUPREMA DEL ÁRBOL DE MÓDULOS
 *
 * # Logic:
 * Al declarar 'pub mod' aquí, 'crate::' se resuelve de forma
 * determinista tanto en la librería como en los binarios y en la
 * matriz de certificación del Proving Grounds.
 * =================================================================
 */

// --- ESTRATO DE CONFIGURACIÓN Y ESTADO (L1-APP) ---
/// Captura tipada y única del entorno de ejecución.
pub mod config;
/// Gestor del sistema nervioso central del orquestador.
pub mod state;

// --- ESTRATO DE TRANSPORTE Y ACCIÓN ---
/// Adaptadores de entrada para ráfagas HTTP y streams SSE.
pub mod handlers;
/// Núcleo de mando para la ignición de servicios.
pub mod kernel;
/// El túnel de mando: definición de rutas y topología de red.
pub mod routes;

// --- ESTRATO DE SEGURIDAD Y SOPORTE ---
/// Guardianes perimetrales de autenticación.
pub mod middleware;
/// Servicios del núcleo: leases, producción, clicks y recuperación.
pub mod services;

/**
 * PRELUDIO DEL ORQUESTADOR
 *
 * Re-exportación estratégica de los componentes necesarios para la
 * ignición mínima del sistema desde 'main.rs'.
 */
pub mod prelude {
    pub use crate::config::RotationConfig;
    pub use crate::kernel::RotationKernel;
    pub use crate::state::AppState;
}
