// [libs/domain/models-rs/src/click_task.rs]
/*!
 * =================================================================
 * APARATO: CLICK TASK DOMAIN MODELS (V4.0 - FLOOD CONTRACTS)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE INUNDACIÓN DE ROTACIONES PROGRAMADAS
 *
 * # Logic:
 * Una tarea posee N items, cada uno con su marca temporal planificada
 * por la curva diurna. La cancelación voltea atómicamente los items
 * 'pending' a 'cancelled'; los items en ejecución terminan su vuelo.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado agregado de una tarea de inundación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickTaskStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl ClickTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickTaskStatus::Running => "running",
            ClickTaskStatus::Completed => "completed",
            ClickTaskStatus::Cancelled => "cancelled",
            ClickTaskStatus::Failed => "failed",
        }
    }

    pub fn from_str(raw_status: &str) -> Self {
        match raw_status {
            "completed" => ClickTaskStatus::Completed,
            "cancelled" => ClickTaskStatus::Cancelled,
            "failed" => ClickTaskStatus::Failed,
            _ => ClickTaskStatus::Running,
        }
    }
}

/// Estado de un item individual de la tarea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickItemStatus {
    Pending,
    Executing,
    Success,
    Failed,
    Cancelled,
}

impl ClickItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickItemStatus::Pending => "pending",
            ClickItemStatus::Executing => "executing",
            ClickItemStatus::Success => "success",
            ClickItemStatus::Failed => "failed",
            ClickItemStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(raw_status: &str) -> Self {
        match raw_status {
            "executing" => ClickItemStatus::Executing,
            "success" => ClickItemStatus::Success,
            "failed" => ClickItemStatus::Failed,
            "cancelled" => ClickItemStatus::Cancelled,
            _ => ClickItemStatus::Pending,
        }
    }
}

/// Tarea de inundación de rotaciones encolada por el operador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickTask {
    pub id: String,
    pub user_id: String,
    pub campaign_id: String,
    /// Cantidad de clicks solicitada por el operador.
    pub target_clicks: i64,
    pub completed_clicks: i64,
    pub failed_clicks: i64,
    pub status: ClickTaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item individual planificado dentro de una tarea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickTaskItem {
    pub id: String,
    pub task_id: String,
    /// Marca temporal asignada por la distribución diurna.
    pub scheduled_at: DateTime<Utc>,
    pub status: ClickItemStatus,
    /// IP de salida empleada en la ejecución, si hubo.
    pub exit_ip: Option<String>,
    pub error_message: Option<String>,
    /// Duración física de la ejecución en milisegundos.
    pub duration_milliseconds: Option<i64>,
    pub executed_at: Option<DateTime<Utc>>,
}
