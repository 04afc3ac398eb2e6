// [libs/infra/db-turso/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V4.1 - ROTATION TAXONOMY)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STABLE TOKENS: Los prefijos de estrato permiten el triaje
 *    programático sin inspección de texto libre.
 * 2. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    // --- ESTRATO DEL MOTOR DE LEASES (L2/L3) ---

    /// El lease solicitado no existe en las tablas activas.
    #[error("[L3_LEASE_FAULT]: IDENTIFIER_NOT_FOUND")]
    LeaseNotFound,

    /// El lease fue reclamado por el janitor antes del ack.
    #[error("[L3_LEASE_FAULT]: LEASE_EXPIRED")]
    LeaseExpired,

    /// El item de stock fue capturado por un lease concurrente.
    #[error("[L3_STOCK_FAULT]: ALLOCATION_CONFLICT")]
    AllocationConflict,

    /// No existe inventario disponible para la campaña.
    #[error("[L3_STOCK_FAULT]: NO_STOCK")]
    NoStock,

    // --- ESTRATO DE CAMPAÑAS ---

    /// La campaña no existe y no se suministraron metadatos.
    #[error("[L3_CAMPAIGN_FAULT]: PENDING_IMPORT")]
    CampaignPendingImport,

    /// La entidad solicitada no existe en las tablas activas.
    #[error("[L3_CAMPAIGN_FAULT]: IDENTIFIER_NOT_FOUND")]
    CampaignNotFound,

    // --- ESTRATO DE TAREAS DE CLICKS ---

    /// La tarea solicitada no existe o pertenece a otro operador.
    #[error("[L3_TASK_FAULT]: IDENTIFIER_NOT_FOUND")]
    TaskNotFound,

    /// La tarea no admite la transición solicitada.
    #[error("[L3_TASK_FAULT]: INVALID_STATE_TRANSITION")]
    InvalidTaskState,
}
