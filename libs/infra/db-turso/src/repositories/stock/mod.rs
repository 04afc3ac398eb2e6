// [libs/infra/db-turso/src/repositories/stock/mod.rs]
/*!
 * =================================================================
 * APARATO: STOCK REPOSITORY (V4.2 - INVENTORY LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: INVENTARIO DE SUFIJOS Y ENVEJECIMIENTO
 *
 * # Logic:
 * El repositorio gobierna las consultas de inventario; las
 * transiciones acopladas a leases (claim condicional, consumo,
 * reciclaje) viven en el LeaseRepository dentro de transacciones.
 * =================================================================
 */

pub mod queries;

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::TursoClient;
use chrono::{Duration, Utc};
use kylink_domain_models::{StockStatus, SuffixStockItem};
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use self::queries as sql_registry;

/// Material de un item recién producido, previo a su inserción.
#[derive(Debug, Clone)]
pub struct NewStockItem {
    pub user_id: String,
    pub campaign_id: String,
    pub suffix: String,
    /// IP de salida observada durante la producción; None en contingencia.
    pub exit_ip: Option<String>,
    pub source_affiliate_link_id: String,
}

pub struct StockRepository {
    database_client: TursoClient,
}

impl StockRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    pub(crate) fn map_item_row(row: &Row) -> Result<SuffixStockItem, DbError> {
        Ok(SuffixStockItem {
            id: row.get::<String>(0)?,
            user_id: row.get::<String>(1)?,
            campaign_id: row.get::<String>(2)?,
            suffix: row.get::<String>(3)?,
            status: StockStatus::from_str(&row.get::<String>(4)?),
            exit_ip: row.get::<String>(5).ok(),
            source_affiliate_link_id: row.get::<String>(6)?,
            created_at: mapping::timestamp(&row.get::<String>(7)?)?,
            leased_at: mapping::optional_timestamp(row.get::<String>(8).ok()),
            consumed_at: mapping::optional_timestamp(row.get::<String>(9).ok()),
            expired_at: mapping::optional_timestamp(row.get::<String>(10).ok()),
            deleted_at: mapping::optional_timestamp(row.get::<String>(11).ok()),
        })
    }

    /// Inventario disponible de la campaña.
    #[instrument(skip(self))]
    pub async fn count_available(
        &self,
        user_id: &str,
        campaign_id: &str,
    ) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(sql_registry::COUNT_AVAILABLE, params![user_id, campaign_id])
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Items consumidos en la ventana reciente (marca de agua dinámica).
    #[instrument(skip(self))]
    pub async fn consumed_in_window(
        &self,
        user_id: &str,
        campaign_id: &str,
        window_hours: i64,
    ) -> Result<i64, DbError> {
        let window_floor = (Utc::now() - Duration::hours(window_hours)).to_rfc3339();
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                sql_registry::CONSUMED_COUNT_SINCE,
                params![user_id, campaign_id, window_floor],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    /// Inserción masiva de items recién producidos con status=available.
    #[instrument(skip(self, fresh_items))]
    pub async fn bulk_insert_available(
        &self,
        fresh_items: &[NewStockItem],
    ) -> Result<u64, DbError> {
        if fresh_items.is_empty() {
            return Ok(0);
        }

        let connection = self.database_client.get_connection()?;
        let now = Utc::now().to_rfc3339();
        let mut inserted_count: u64 = 0;

        for item in fresh_items {
            connection
                .execute(
                    sql_registry::INSERT_ITEM,
                    params![
                        Uuid::new_v4().to_string(),
                        item.user_id.clone(),
                        item.campaign_id.clone(),
                        item.suffix.clone(),
                        mapping::opt_text(item.exit_ip.as_deref()),
                        item.source_affiliate_link_id.clone(),
                        now.clone()
                    ],
                )
                .await?;
            inserted_count += 1;
        }

        info!(
            "📦 [STOCK]: {} fresh suffix items crystallized for campaign [{}].",
            inserted_count,
            fresh_items[0].campaign_id
        );
        Ok(inserted_count)
    }

    /// Recupera un item individual (Proving Grounds y diagnósticos).
    pub async fn find_item(&self, item_id: &str) -> Result<Option<SuffixStockItem>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!("{} WHERE id = ? LIMIT 1", sql_registry::SELECT_ITEM_COLUMNS),
                params![item_id],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(Some(Self::map_item_row(&row)?)),
            None => Ok(None),
        }
    }

    /**
     * Envejecimiento: expira items disponibles más viejos que el TTL.
     * Devuelve la cantidad de filas selladas.
     */
    #[instrument(skip(self))]
    pub async fn expire_aged(&self, ttl_hours: i64) -> Result<u64, DbError> {
        let now = Utc::now().to_rfc3339();
        let aging_floor = (Utc::now() - Duration::hours(ttl_hours)).to_rfc3339();
        let connection = self.database_client.get_connection()?;

        let expired_count = connection
            .execute(sql_registry::EXPIRE_AGED, params![now.clone(), now, aging_floor])
            .await?;

        if expired_count > 0 {
            info!("🍂 [STOCK_AGING]: {} stale suffix items sealed as expired.", expired_count);
        }
        Ok(expired_count)
    }

    /// Niveles de inventario disponibles agrupados por campaña (monitor).
    #[instrument(skip(self))]
    pub async fn available_levels(&self) -> Result<Vec<(String, String, i64)>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(sql_registry::AVAILABLE_LEVELS_GROUPED, ())
            .await?;

        let mut levels = Vec::new();
        while let Some(row) = query_results.next().await? {
            levels.push((
                row.get::<String>(0)?,
                row.get::<String>(1)?,
                row.get::<i64>(2)?,
            ));
        }
        Ok(levels)
    }
}
