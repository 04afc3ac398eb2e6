// [libs/infra/db-turso/src/repositories/proxy_repository.rs]
/*!
 * =================================================================
 * APARATO: PROXY REPOSITORY (V4.1 - DEDUP LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: PROVEEDORES SOCKS5 Y LEDGER DE IPs DE SALIDA
 *
 * # Logic:
 * El ledger (user_id, campaign_id, exit_ip) con vencimiento a 24h es
 * la única fuente de verdad de deduplicación. Un conjunto de
 * asignación vacío en el proveedor significa disponibilidad global.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::TursoClient;
use chrono::{Duration, Utc};
use kylink_domain_models::ProxyProvider;
use libsql::{params, Row};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Ventana de descalificación de una IP de salida usada.
const EXIT_IP_DEDUP_WINDOW_HOURS: i64 = 24;

const SELECT_PROVIDER_COLUMNS: &str = "SELECT id, label, host, port, priority, \
    username_template, password, enabled, assigned_user_ids, created_at, updated_at \
    FROM proxy_providers";

pub struct ProxyRepository {
    database_client: TursoClient,
}

impl ProxyRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    fn map_provider_row(row: &Row) -> Result<ProxyProvider, DbError> {
        let assigned_raw = row.get::<String>(8)?;
        let assigned_user_ids: Vec<String> =
            serde_json::from_str(&assigned_raw).unwrap_or_default();

        Ok(ProxyProvider {
            id: row.get::<String>(0)?,
            label: row.get::<String>(1)?,
            host: row.get::<String>(2)?,
            port: row.get::<i64>(3)? as u16,
            priority: row.get::<i64>(4)?,
            username_template: row.get::<String>(5)?,
            password: row.get::<String>(6)?,
            enabled: row.get::<i64>(7)? != 0,
            assigned_user_ids,
            created_at: mapping::timestamp(&row.get::<String>(9)?)?,
            updated_at: mapping::timestamp(&row.get::<String>(10)?)?,
        })
    }

    /**
     * Proveedores habilitados visibles para el operador, en prioridad
     * ascendente. Asignación vacía = proveedor global.
     */
    #[instrument(skip(self))]
    pub async fn providers_for_user(&self, user_id: &str) -> Result<Vec<ProxyProvider>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} WHERE enabled = 1 ORDER BY priority ASC, created_at ASC",
                    SELECT_PROVIDER_COLUMNS
                ),
                (),
            )
            .await?;

        let mut visible_providers = Vec::new();
        while let Some(row) = query_results.next().await? {
            let provider = Self::map_provider_row(&row)?;
            if provider.assigned_user_ids.is_empty()
                || provider.assigned_user_ids.iter().any(|assigned| assigned == user_id)
            {
                visible_providers.push(provider);
            }
        }
        Ok(visible_providers)
    }

    /// IPs de salida descalificadas para (operador, campaña) ahora mismo.
    #[instrument(skip(self))]
    pub async fn used_exit_ips(
        &self,
        user_id: &str,
        campaign_id: &str,
    ) -> Result<HashSet<String>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                "SELECT exit_ip FROM proxy_exit_ip_usage \
                 WHERE user_id = ? AND campaign_id = ? AND expires_at > ?",
                params![user_id, campaign_id, Utc::now().to_rfc3339()],
            )
            .await?;

        let mut disqualified = HashSet::new();
        while let Some(row) = query_results.next().await? {
            disqualified.insert(row.get::<String>(0)?);
        }
        Ok(disqualified)
    }

    /**
     * Registra el uso exitoso de una IP de salida observada.
     * El camino de contingencia (identidad 'Unknown') jamás llega aquí.
     */
    #[instrument(skip(self))]
    pub async fn record_exit_ip_usage(
        &self,
        user_id: &str,
        campaign_id: &str,
        exit_ip: &str,
    ) -> Result<(), DbError> {
        let now = Utc::now();
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO proxy_exit_ip_usage \
                 (user_id, campaign_id, exit_ip, used_at, expires_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    user_id,
                    campaign_id,
                    exit_ip,
                    now.to_rfc3339(),
                    (now + Duration::hours(EXIT_IP_DEDUP_WINDOW_HOURS)).to_rfc3339()
                ],
            )
            .await?;

        debug!(
            "🧾 [EXIT_IP_LEDGER]: Usage sealed [{}] for campaign [{}] (24h window).",
            exit_ip, campaign_id
        );
        Ok(())
    }

    /// Janitor: purga filas del ledger con vencimiento cumplido.
    #[instrument(skip(self))]
    pub async fn reap_expired_usage(&self) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let reaped_count = connection
            .execute(
                "DELETE FROM proxy_exit_ip_usage WHERE expires_at < ?",
                params![Utc::now().to_rfc3339()],
            )
            .await?;

        if reaped_count > 0 {
            info!("💀 [EXIT_IP_REAPER]: {} expired ledger rows purged.", reaped_count);
        }
        Ok(reaped_count)
    }

    /// Alta de proveedor (seed y Proving Grounds).
    pub async fn insert_provider(
        &self,
        label: &str,
        host: &str,
        port: u16,
        priority: i64,
        username_template: &str,
        password: &str,
        assigned_user_ids: &[String],
    ) -> Result<String, DbError> {
        let new_identifier = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let assigned_rendered = serde_json::to_string(assigned_user_ids)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO proxy_providers (id, label, host, port, priority, username_template, \
                 password, enabled, assigned_user_ids, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
                params![
                    new_identifier.clone(),
                    label,
                    host,
                    port as i64,
                    priority,
                    username_template,
                    password,
                    assigned_rendered,
                    now.clone(),
                    now
                ],
            )
            .await?;

        Ok(new_identifier)
    }
}
