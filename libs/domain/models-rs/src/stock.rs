// [libs/domain/models-rs/src/stock.rs]
/*!
 * =================================================================
 * APARATO: SUFFIX STOCK DOMAIN MODELS (V4.0 - INVENTORY CONTRACTS)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CICLO DE VIDA DEL INVENTARIO DE SUFIJOS
 *
 * # Logic:
 * Un item de stock nace 'available', transita a 'leased' en la
 * asignación, a 'consumed' en el ack exitoso, regresa a 'available'
 * en el ack fallido y muere 'expired' por envejecimiento. Exactamente
 * un lease puede referenciar un item no terminal.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado de un item de stock dentro de su máquina de estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Available,
    Leased,
    Consumed,
    Expired,
    Invalid,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "available",
            StockStatus::Leased => "leased",
            StockStatus::Consumed => "consumed",
            StockStatus::Expired => "expired",
            StockStatus::Invalid => "invalid",
        }
    }

    pub fn from_str(raw_status: &str) -> Self {
        match raw_status {
            "leased" => StockStatus::Leased,
            "consumed" => StockStatus::Consumed,
            "expired" => StockStatus::Expired,
            "invalid" => StockStatus::Invalid,
            _ => StockStatus::Available,
        }
    }
}

/// Sufijo pre-producido listo para ser arrendado a una rotación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuffixStockItem {
    pub id: String,
    pub user_id: String,
    pub campaign_id: String,
    /// El fragmento de query-string que el tracker extrae de la URL final.
    pub suffix: String,
    pub status: StockStatus,
    /// IP de salida observada durante la producción (deduplicación 24h).
    pub exit_ip: Option<String>,
    /// Enlace de afiliado que originó la cadena de redirecciones.
    pub source_affiliate_link_id: String,
    pub created_at: DateTime<Utc>,
    pub leased_at: Option<DateTime<Utc>>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Acción registrada en la bitácora de auditoría del productor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAuditAction {
    /// El productor acuñó items frescos.
    Produced,
    /// Stock suficiente: la reposición fue omitida.
    Skipped,
    /// Una asignación encontró el inventario vacío.
    NoStock,
    /// Un barrido por lotes acumuló fallos por campaña.
    SweepFailed,
}

impl StockAuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockAuditAction::Produced => "produced",
            StockAuditAction::Skipped => "skipped",
            StockAuditAction::NoStock => "no_stock",
            StockAuditAction::SweepFailed => "sweep_failed",
        }
    }
}

/// Veredicto de una pasada de reposición de campaña individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplenishVerdict {
    /// Se acuñaron items nuevos.
    Produced,
    /// El inventario ya cubría la marca de agua.
    Skipped,
    /// Ningún proxy produjo un sufijo utilizable.
    Exhausted,
}

/// Reporte estructurado de una reposición (auditoría + respuesta de API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplenishReport {
    pub user_id: String,
    pub campaign_id: String,
    pub verdict: ReplenishVerdict,
    /// Marca de agua dinámica calculada para esta pasada.
    pub watermark: i64,
    pub available_before: i64,
    pub produced_count: i64,
    pub failed_count: i64,
}
