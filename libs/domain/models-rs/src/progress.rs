// [libs/domain/models-rs/src/progress.rs]
/*!
 * =================================================================
 * APARATO: PROGRESS STREAM CONTRACTS (V4.0 - SSE FRAMING)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: EVENTOS ORDENADOS DE TRABAJOS DE LARGA DURACIÓN
 *
 * # Logic:
 * Un trabajo de larga duración emite eventos en orden y exactamente un
 * evento terminal (done | error) cierra el stream. El productor observa
 * la cancelación del consumidor y detiene el trabajo restante.
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Etapa del evento de progreso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Init,
    Fetching,
    Saving,
    Processing,
    Done,
    Error,
}

impl ProgressStage {
    /// Los eventos terminales cierran el stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStage::Done | ProgressStage::Error)
    }
}

/// Evento individual del stream de progreso (framing SSE `data: {...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub current: u64,
    pub total: u64,
    pub message: String,
    /// Carga estructurada adicional específica del trabajo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl ProgressEvent {
    /// Constructor abreviado para hitos intermedios.
    pub fn milestone(stage: ProgressStage, current: u64, total: u64, message: &str) -> Self {
        Self {
            stage,
            current,
            total,
            message: message.to_string(),
            extra: None,
        }
    }
}
