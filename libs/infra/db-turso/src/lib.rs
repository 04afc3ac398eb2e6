// [libs/infra/db-turso/src/lib.rs]
/*!
 * =================================================================
 * APARATO: INFRA DB ROOT (V4.0 - ROTATION LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DEL ADAPTADOR DE PERSISTENCIA TÁCTICA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. REPOSITORY AUTHORITY: Toda mutación del estado compartido pasa
 *    por los repositorios; los invariantes de dos filas (lease↔stock,
 *    lease↔click-state) viven en transacciones ACID.
 * 2. MEMORY PARITY: El cliente soporta Turso remoto, SQLite en disco
 *    y :memory: anclado para el Proving Grounds.
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::{LinkProfile, TursoClient};
pub use errors::DbError;
