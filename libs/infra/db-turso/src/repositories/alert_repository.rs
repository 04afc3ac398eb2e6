// [libs/infra/db-turso/src/repositories/alert_repository.rs]
/*!
 * =================================================================
 * APARATO: ALERT REPOSITORY (V4.0 - SIGNAL LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE SEÑALES DE MONITOREO
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::TursoClient;
use chrono::Utc;
use kylink_domain_models::{Alert, AlertKind, AlertLevel};
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;

const SELECT_ALERT_COLUMNS: &str = "SELECT id, user_id, kind, level, title, message, \
    metadata, acknowledged, created_at FROM alerts";

pub struct AlertRepository {
    database_client: TursoClient,
}

impl AlertRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    fn map_alert_row(row: &Row) -> Result<Alert, DbError> {
        let kind_raw = row.get::<String>(2)?;
        let kind = match kind_raw.as_str() {
            "low_stock" => AlertKind::LowStock,
            "lease_timeout" => AlertKind::LeaseTimeout,
            "high_failure_rate" => AlertKind::HighFailureRate,
            "no_stock_frequent" => AlertKind::NoStockFrequent,
            _ => AlertKind::SystemHealth,
        };

        Ok(Alert {
            id: row.get::<String>(0)?,
            user_id: row.get::<String>(1).ok(),
            kind,
            level: AlertLevel::from_str(&row.get::<String>(3)?),
            title: row.get::<String>(4)?,
            message: row.get::<String>(5)?,
            metadata: serde_json::from_str(&row.get::<String>(6)?)
                .unwrap_or(serde_json::Value::Null),
            acknowledged: row.get::<i64>(7)? != 0,
            created_at: mapping::timestamp(&row.get::<String>(8)?)?,
        })
    }

    /// Sella una señal de alerta en el ledger.
    #[instrument(skip(self, metadata))]
    pub async fn insert_alert(
        &self,
        user_id: Option<&str>,
        kind: AlertKind,
        level: AlertLevel,
        title: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<Alert, DbError> {
        let new_identifier = Uuid::new_v4().to_string();
        let metadata_rendered = metadata.to_string();
        let connection = self.database_client.get_connection()?;

        connection
            .execute(
                "INSERT INTO alerts (id, user_id, kind, level, title, message, metadata, \
                 acknowledged, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
                params![
                    new_identifier.clone(),
                    mapping::opt_text(user_id),
                    kind.as_str(),
                    level.as_str(),
                    title,
                    message,
                    metadata_rendered,
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        info!(
            "🚨 [ALERT_SEALED]: {} ({}) -> {}",
            kind.as_str(),
            level.as_str(),
            title
        );

        let mut query_results = connection
            .query(
                &format!("{} WHERE id = ? LIMIT 1", SELECT_ALERT_COLUMNS),
                params![new_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Self::map_alert_row(&row),
            None => Err(DbError::MappingError("inserted alert vanished".into())),
        }
    }

    /// Señales recientes, las no reconocidas primero.
    pub async fn list_recent(&self, fetch_limit: i64) -> Result<Vec<Alert>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} ORDER BY acknowledged ASC, created_at DESC LIMIT ?",
                    SELECT_ALERT_COLUMNS
                ),
                params![fetch_limit],
            )
            .await?;

        let mut alerts = Vec::new();
        while let Some(row) = query_results.next().await? {
            alerts.push(Self::map_alert_row(&row)?);
        }
        Ok(alerts)
    }

    /// Reconocimiento idempotente de una señal.
    pub async fn acknowledge(&self, alert_id: &str) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let acknowledged_rows = connection
            .execute(
                "UPDATE alerts SET acknowledged = 1 WHERE id = ?",
                params![alert_id],
            )
            .await?;
        Ok(acknowledged_rows == 1)
    }
}
