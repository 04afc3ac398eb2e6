// [apps/orchestrator/src/services/recovery.rs]
/*!
 * =================================================================
 * APARATO: RECOVERY SERVICE (V4.1 - RECLAMATION SWEEPS)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: RECLAMACIÓN DE LEASES, ENVEJECIMIENTO Y PURGAS
 *
 * # Logic:
 * Tres barridos independientes: (1) leases arrendados sin ack más
 * allá del TTL vuelven al inventario; (2) stock disponible más viejo
 * que el TTL de sufijo se sella como expirado; (3) el ledger de IPs
 * de salida purga sus filas vencidas.
 * =================================================================
 */

use crate::state::AppState;
use kylink_infra_db::DbError;
use serde::Serialize;
use tracing::{info, instrument};

/// Resumen de una pasada de reclamación.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub leases_reclaimed: u64,
    pub stock_expired: u64,
    pub exit_ip_rows_reaped: u64,
}

pub struct RecoveryService {
    application_state: AppState,
}

impl RecoveryService {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    /**
     * Reclama los leases estancados: cada uno transiciona a 'expired'
     * y su item de stock regresa a 'available' en una transacción.
     */
    #[instrument(skip(self))]
    pub async fn expire_stale_leases(&self) -> Result<u64, DbError> {
        let state = &self.application_state;
        let stale_leases = state
            .lease_repository
            .find_stale_leased(state.config.lease_ttl_minutes)
            .await?;

        let mut reclaimed_count: u64 = 0;
        for stale_lease in &stale_leases {
            if state.lease_repository.expire_lease(stale_lease).await? {
                reclaimed_count += 1;
            }
        }

        if reclaimed_count > 0 {
            info!(
                "⏰ [RECOVERY]: {} stale leases reclaimed to inventory.",
                reclaimed_count
            );
        }
        Ok(reclaimed_count)
    }

    /// Envejecimiento del inventario disponible más allá del TTL.
    #[instrument(skip(self))]
    pub async fn age_stale_stock(&self) -> Result<u64, DbError> {
        self.application_state
            .stock_repository
            .expire_aged(self.application_state.config.suffix_ttl_hours)
            .await
    }

    /// Purga de filas vencidas del ledger de IPs de salida.
    #[instrument(skip(self))]
    pub async fn reap_exit_ip_ledger(&self) -> Result<u64, DbError> {
        self.application_state
            .proxy_repository
            .reap_expired_usage()
            .await
    }

    /// Pasada completa de recuperación (invocación ad-hoc).
    pub async fn full_sweep(&self) -> Result<RecoveryReport, DbError> {
        Ok(RecoveryReport {
            leases_reclaimed: self.expire_stale_leases().await?,
            stock_expired: self.age_stale_stock().await?,
            exit_ip_rows_reaped: self.reap_exit_ip_ledger().await?,
        })
    }
}
