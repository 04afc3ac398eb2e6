// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLER REGISTRY (V4.0 - API ADAPTERS)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DE LOS ADAPTADORES HTTP
 * =================================================================
 */

pub mod admin;
pub mod campaign;
pub mod jobs;
pub mod rotation;
pub mod stream;
pub mod tasks;
