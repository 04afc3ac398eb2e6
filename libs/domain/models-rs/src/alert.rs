// [libs/domain/models-rs/src/alert.rs]
/*!
 * =================================================================
 * APARATO: ALERT DOMAIN MODELS (V4.0 - MONITORING CONTRACTS)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: SEÑALES DE MONITOREO DEL NÚCLEO DE ROTACIÓN
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Taxonomía de reglas de alerta evaluadas por el monitor periódico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Alguna campaña cayó bajo su marca de agua de stock.
    LowStock,
    /// El lease arrendado más antiguo superó el umbral de espera.
    LeaseTimeout,
    /// La tasa de acks fallidos superó el umbral en la última hora.
    HighFailureRate,
    /// La acción de auditoría 'no_stock' se repitió en exceso en 24h.
    NoStockFrequent,
    /// Fallos agregados de barridos u otros daemons.
    SystemHealth,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowStock => "low_stock",
            AlertKind::LeaseTimeout => "lease_timeout",
            AlertKind::HighFailureRate => "high_failure_rate",
            AlertKind::NoStockFrequent => "no_stock_frequent",
            AlertKind::SystemHealth => "system_health",
        }
    }
}

/// Severidad de la señal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }

    pub fn from_str(raw_level: &str) -> Self {
        match raw_level {
            "critical" => AlertLevel::Critical,
            "warning" => AlertLevel::Warning,
            _ => AlertLevel::Info,
        }
    }
}

/// Señal de alerta persistida y opcionalmente despachada vía webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    /// Propietario afectado; None para señales de salud globales.
    pub user_id: Option<String>,
    pub kind: AlertKind,
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    /// Metadatos estructurados para el triaje programático.
    pub metadata: serde_json::Value,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}
