// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICE REGISTRY (V4.0 - ROTATION DAEMONS)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L2-APP)
 * RESPONSABILIDAD: EXPOSICIÓN DE SERVICIOS Y TAXONOMÍA DE FALLOS
 * =================================================================
 */

pub mod alert_evaluator;
pub mod click_executor;
pub mod job_registry;
pub mod lease_engine;
pub mod progress;
pub mod recovery;
pub mod stock_producer;
pub mod suffix_generator;

pub use alert_evaluator::AlertEvaluator;
pub use click_executor::ClickExecutor;
pub use job_registry::JobRegistry;
pub use lease_engine::LeaseEngine;
pub use progress::{progress_channel, ProgressEmitter};
pub use recovery::RecoveryService;
pub use stock_producer::StockProducer;
pub use suffix_generator::SuffixGenerator;

use axum::http::StatusCode;
use kylink_infra_db::DbError;
use thiserror::Error;

/// Taxonomía estable de fallos del núcleo expuesta a los handlers.
#[derive(Error, Debug)]
pub enum RotationFault {
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),

    #[error("PENDING_IMPORT: campaign metadata unavailable")]
    PendingImport,

    #[error("NO_STOCK: no available suffix for allocation")]
    NoStock,

    #[error("LEASE_EXPIRED: lease was reclaimed before ack")]
    LeaseExpired,

    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    #[error("NO_PROXY_AVAILABLE: all egress channels failed including fallback")]
    NoProxyAvailable,

    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl RotationFault {
    /// Token estable del contrato externo.
    pub fn code(&self) -> &'static str {
        match self {
            RotationFault::Validation(_) => "VALIDATION_ERROR",
            RotationFault::PendingImport => "PENDING_IMPORT",
            RotationFault::NoStock => "NO_STOCK",
            RotationFault::LeaseExpired => "LEASE_EXPIRED",
            RotationFault::NotFound(_) => "NOT_FOUND",
            RotationFault::NoProxyAvailable => "NO_PROXY_AVAILABLE",
            RotationFault::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Mapeo HTTP del token.
    pub fn http_status(&self) -> StatusCode {
        match self {
            RotationFault::Validation(_) => StatusCode::BAD_REQUEST,
            RotationFault::PendingImport | RotationFault::NoStock => StatusCode::CONFLICT,
            RotationFault::LeaseExpired => StatusCode::GONE,
            RotationFault::NotFound(_) => StatusCode::NOT_FOUND,
            RotationFault::NoProxyAvailable => StatusCode::SERVICE_UNAVAILABLE,
            RotationFault::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for RotationFault {
    /// La capa HTTP jamás filtra el detalle interno de persistencia.
    fn from(fault: DbError) -> Self {
        match fault {
            DbError::NoStock => RotationFault::NoStock,
            DbError::CampaignPendingImport => RotationFault::PendingImport,
            DbError::LeaseExpired => RotationFault::LeaseExpired,
            DbError::LeaseNotFound => RotationFault::NotFound("lease".into()),
            DbError::TaskNotFound => RotationFault::NotFound("click task".into()),
            other => RotationFault::Internal(other.to_string()),
        }
    }
}
