// [libs/domain/models-rs/src/rotation.rs]
/*!
 * =================================================================
 * APARATO: ROTATION DOMAIN MODELS (V4.1 - LEASE CONTRACTS)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DEL MOTOR DE LEASES Y ESTADO DE CLICKS
 *
 * # Mathematical Proof (Idempotency Key Collapse):
 * La clave de idempotencia tiene la forma {campaignId}:{windowStart}:
 * {nowClicks}. Dos reintentos de la misma observación producen la misma
 * clave, y el índice único (user_id, idempotency_key) colapsa ambos en
 * una única fila de lease, garantizando semántica at-most-once por
 * incremento de clicks observado.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignMetaPayload;

/// Estado de un lease de sufijo dentro de su máquina de estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    /// Asignado y pendiente de confirmación explícita (política diferida).
    Leased,
    /// Rotación confirmada: el item de stock queda consumido.
    Consumed,
    /// El cliente reportó fallo de aplicación: el item se recicla.
    Failed,
    /// Reclamado por el janitor tras agotar el TTL sin confirmación.
    Expired,
}

impl LeaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseStatus::Leased => "leased",
            LeaseStatus::Consumed => "consumed",
            LeaseStatus::Failed => "failed",
            LeaseStatus::Expired => "expired",
        }
    }

    pub fn from_str(raw_status: &str) -> Self {
        match raw_status {
            "leased" => LeaseStatus::Leased,
            "failed" => LeaseStatus::Failed,
            "expired" => LeaseStatus::Expired,
            _ => LeaseStatus::Consumed,
        }
    }

    /// Un estado terminal no admite más transiciones (ack idempotente).
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeaseStatus::Consumed | LeaseStatus::Failed | LeaseStatus::Expired)
    }
}

/// Intento de rotación: la asignación de un sufijo a un incremento de
/// clicks observado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuffixLease {
    pub id: String,
    pub user_id: String,
    pub campaign_id: String,
    /// Fila de stock referenciada por identificador opaco.
    pub stock_item_id: String,
    /// Clave suministrada por el cliente: {campaignId}:{windowStart}:{nowClicks}.
    pub idempotency_key: String,
    /// Contador de clicks observado en el momento del lease.
    pub clicks_at_lease_time: i64,
    /// Inicio de la ventana de observación en epoch seconds.
    pub window_start_epoch_seconds: i64,
    pub status: LeaseStatus,
    /// Confirmación de aplicación por parte del cliente.
    pub applied: bool,
    pub error_message: Option<String>,
    pub leased_at: DateTime<Utc>,
    pub acked_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Estado de monotonicidad de clicks por (user_id, campaign_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignClickState {
    pub user_id: String,
    pub campaign_id: String,
    /// Clicks en la última rotación exitosa. Monótonamente no decreciente
    /// dentro del día calendario; se reinicia a 0 en el cambio de día.
    pub last_applied_clicks: i64,
    /// Último valor observado por cualquier lease.
    pub last_observed_clicks: i64,
    pub last_observed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Solicitud de lease emitida por los scripts de Google Ads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRequest {
    pub campaign_id: String,
    /// Contador de clicks observado (≥ 0).
    pub now_clicks: i64,
    /// Marca temporal de la observación (ISO-8601).
    pub observed_at: DateTime<Utc>,
    /// Inicio de la ventana en epoch seconds (> 0).
    pub window_start_epoch_seconds: i64,
    pub idempotency_key: String,
    /// Metadatos para el upsert perezoso de campaña.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<CampaignMetaPayload>,
}

/// Respuesta polimórfica del motor de leases.
///
/// La forma del JSON distingue los tres contratos del cliente:
/// `{action:"APPLY",...}` | `{action:"NOOP",...}` | `{code:...,message:...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeaseResponse {
    /// El cliente debe aplicar el sufijo entregado.
    #[serde(rename_all = "camelCase")]
    Apply {
        action: String,
        lease_id: String,
        final_url_suffix: String,
        reason: String,
    },
    /// No corresponde rotación para esta observación.
    #[serde(rename_all = "camelCase")]
    Noop { action: String, reason: String },
    /// Condición declinante: NO_STOCK o PENDING_IMPORT.
    #[serde(rename_all = "camelCase")]
    Declined { code: String, message: String },
}

impl LeaseResponse {
    /// Constructor nominal del contrato APPLY.
    pub fn apply(lease_id: String, final_url_suffix: String, reason: &str) -> Self {
        LeaseResponse::Apply {
            action: "APPLY".to_string(),
            lease_id,
            final_url_suffix,
            reason: reason.to_string(),
        }
    }

    /// Constructor nominal del contrato NOOP.
    pub fn noop(reason: &str) -> Self {
        LeaseResponse::Noop {
            action: "NOOP".to_string(),
            reason: reason.to_string(),
        }
    }

    /// Constructor nominal de las condiciones declinantes.
    pub fn declined(code: &str, message: &str) -> Self {
        LeaseResponse::Declined {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Confirmación (ack) de una rotación previamente arrendada.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    pub lease_id: String,
    pub campaign_id: String,
    /// true: el script escribió el sufijo; false: la escritura falló.
    pub applied: bool,
    pub applied_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Respuesta del ack: siempre idempotente sobre estados terminales.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    pub ok: bool,
    /// Estado previo cuando el ack golpea una fila ya terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,
}
