// [libs/infra/db-turso/src/repositories/audit_repository.rs]
/*!
 * =================================================================
 * APARATO: STOCK AUDIT REPOSITORY (V4.0 - PRODUCTION TRAIL)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: BITÁCORA DE ACCIONES DEL PRODUCTOR DE STOCK
 * =================================================================
 */

use crate::errors::DbError;
use crate::TursoClient;
use chrono::{Duration, Utc};
use kylink_domain_models::StockAuditAction;
use libsql::params;
use tracing::instrument;
use uuid::Uuid;

pub struct AuditRepository {
    database_client: TursoClient,
}

impl AuditRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Sella una acción del productor con su carga estructurada.
    #[instrument(skip(self, detail))]
    pub async fn record_action(
        &self,
        user_id: &str,
        campaign_id: &str,
        action: StockAuditAction,
        detail: serde_json::Value,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO stock_audit_log (id, user_id, campaign_id, action, detail, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    campaign_id,
                    action.as_str(),
                    detail.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Frecuencia de una acción dentro de la ventana de horas dada.
    #[instrument(skip(self))]
    pub async fn count_action_in_window(
        &self,
        action: StockAuditAction,
        window_hours: i64,
    ) -> Result<i64, DbError> {
        let window_floor = (Utc::now() - Duration::hours(window_hours)).to_rfc3339();
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                "SELECT COUNT(*) FROM stock_audit_log WHERE action = ? AND created_at >= ?",
                params![action.as_str(), window_floor],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}
