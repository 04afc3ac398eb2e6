// [libs/infra/db-turso/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY REGISTRY (V4.0 - ACCESS MATRIX)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DE LOS REPOSITORIOS DEL LEDGER
 * =================================================================
 */

pub mod alert_repository;
pub mod api_key_repository;
pub mod audit_repository;
pub mod campaign_repository;
pub mod click_state_repository;
pub mod click_task_repository;
pub mod lease;
pub mod proxy_repository;
pub mod stock;

pub use alert_repository::AlertRepository;
pub use api_key_repository::{
    digest_bearer_token, token_has_valid_shape, ApiKeyRepository, AuthenticatedOperator,
};
pub use audit_repository::AuditRepository;
pub use campaign_repository::CampaignRepository;
pub use click_state_repository::ClickStateRepository;
pub use click_task_repository::{ClickTaskRepository, DueClickItem};
pub use lease::{AllocationMode, AllocationRequest, LeaseRepository};
pub use proxy_repository::ProxyRepository;
pub use stock::{NewStockItem, StockRepository};

/// Utilidades internas de mapeo fila -> dominio.
pub(crate) mod mapping {
    use crate::errors::DbError;
    use chrono::{DateTime, NaiveDateTime, Utc};

    /// Parsea una marca temporal persistida (RFC3339 o formato SQLite).
    pub fn timestamp(raw_value: &str) -> Result<DateTime<Utc>, DbError> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw_value) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw_value, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|_| DbError::MappingError(format!("unparseable timestamp [{}]", raw_value)))
    }

    /// Variante tolerante para columnas opcionales.
    pub fn optional_timestamp(raw_value: Option<String>) -> Option<DateTime<Utc>> {
        raw_value.as_deref().and_then(|value| timestamp(value).ok())
    }

    /// Materializa un texto opcional como valor libSQL (NULL si ausente).
    pub fn opt_text<S: AsRef<str>>(value: Option<S>) -> libsql::Value {
        match value {
            Some(text) => libsql::Value::Text(text.as_ref().to_string()),
            None => libsql::Value::Null,
        }
    }
}
