// [libs/infra/db-turso/src/repositories/campaign_repository.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGN REPOSITORY (V4.1 - LAZY UPSERT GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CAMPAÑAS, ENLACES DE AFILIADO Y ELEGIBILIDAD
 *
 * # Logic:
 * El motor de leases registra campañas de forma perezosa cuando el
 * cliente suministra metadatos. El enlace efectivo de una campaña es
 * la fila habilitada, no borrada, de mayor prioridad. Una campaña es
 * producible si está activa, tiene país y posee al menos un enlace
 * habilitado.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::TursoClient;
use chrono::Utc;
use kylink_domain_models::{AffiliateLink, Campaign, CampaignMetaPayload, CampaignStatus};
use libsql::{params, Row};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SELECT_CAMPAIGN_COLUMNS: &str = "SELECT id, user_id, campaign_id, campaign_name, \
    country_code, final_url, external_cid, external_mcc_id, status, created_at, updated_at, deleted_at \
    FROM campaigns";

const SELECT_LINK_COLUMNS: &str = "SELECT id, user_id, campaign_id, target_url, enabled, \
    priority, created_at, updated_at, deleted_at FROM affiliate_links";

pub struct CampaignRepository {
    database_client: TursoClient,
}

impl CampaignRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    fn map_campaign_row(row: &Row) -> Result<Campaign, DbError> {
        Ok(Campaign {
            id: row.get::<String>(0)?,
            user_id: row.get::<String>(1)?,
            campaign_id: row.get::<String>(2)?,
            campaign_name: row.get::<String>(3)?,
            country_code: row.get::<String>(4)?,
            final_url: row.get::<String>(5)?,
            external_cid: row.get::<String>(6)?,
            external_mcc_id: row.get::<String>(7)?,
            status: CampaignStatus::from_str(&row.get::<String>(8)?),
            created_at: mapping::timestamp(&row.get::<String>(9)?)?,
            updated_at: mapping::timestamp(&row.get::<String>(10)?)?,
            deleted_at: mapping::optional_timestamp(row.get::<String>(11).ok()),
        })
    }

    fn map_link_row(row: &Row) -> Result<AffiliateLink, DbError> {
        Ok(AffiliateLink {
            id: row.get::<String>(0)?,
            user_id: row.get::<String>(1)?,
            campaign_id: row.get::<String>(2)?,
            target_url: row.get::<String>(3)?,
            enabled: row.get::<i64>(4)? != 0,
            priority: row.get::<i64>(5)?,
            created_at: mapping::timestamp(&row.get::<String>(6)?)?,
            updated_at: mapping::timestamp(&row.get::<String>(7)?)?,
            deleted_at: mapping::optional_timestamp(row.get::<String>(8).ok()),
        })
    }

    /// Busca una campaña activa (no borrada) por su identificador externo.
    #[instrument(skip(self))]
    pub async fn find_campaign(
        &self,
        user_id: &str,
        campaign_id: &str,
    ) -> Result<Option<Campaign>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} WHERE user_id = ? AND campaign_id = ? AND deleted_at IS NULL LIMIT 1",
                    SELECT_CAMPAIGN_COLUMNS
                ),
                params![user_id, campaign_id],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(Some(Self::map_campaign_row(&row)?)),
            None => Ok(None),
        }
    }

    /**
     * Upsert perezoso desde los metadatos del lease: crea la campaña si
     * no existe, o nivela in-place los campos que difieren.
     */
    #[instrument(skip(self, meta))]
    pub async fn upsert_from_meta(
        &self,
        user_id: &str,
        campaign_id: &str,
        meta: &CampaignMetaPayload,
    ) -> Result<Campaign, DbError> {
        let normalized_country = meta.country.trim().to_ascii_uppercase();
        let now = Utc::now().to_rfc3339();
        let connection = self.database_client.get_connection()?;

        if let Some(existing) = self.find_campaign(user_id, campaign_id).await? {
            let differs = existing.campaign_name != meta.campaign_name
                || existing.country_code != normalized_country
                || existing.final_url != meta.final_url
                || existing.external_cid != meta.cid
                || existing.external_mcc_id != meta.mcc_id;

            if differs {
                connection
                    .execute(
                        "UPDATE campaigns SET campaign_name = ?, country_code = ?, final_url = ?, \
                         external_cid = ?, external_mcc_id = ?, updated_at = ? WHERE id = ?",
                        params![
                            meta.campaign_name.clone(),
                            normalized_country.clone(),
                            meta.final_url.clone(),
                            meta.cid.clone(),
                            meta.mcc_id.clone(),
                            now,
                            existing.id.clone()
                        ],
                    )
                    .await?;
                debug!("🧾 [CAMPAIGN]: Metadata levelized in-place for [{}].", campaign_id);
            }

            return self
                .find_campaign(user_id, campaign_id)
                .await?
                .ok_or(DbError::CampaignNotFound);
        }

        let new_identifier = Uuid::new_v4().to_string();
        connection
            .execute(
                "INSERT INTO campaigns (id, user_id, campaign_id, campaign_name, country_code, \
                 final_url, external_cid, external_mcc_id, status, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)",
                params![
                    new_identifier,
                    user_id,
                    campaign_id,
                    meta.campaign_name.clone(),
                    normalized_country,
                    meta.final_url.clone(),
                    meta.cid.clone(),
                    meta.mcc_id.clone(),
                    now.clone(),
                    now
                ],
            )
            .await?;

        info!("✨ [CAMPAIGN]: Lazy registration of campaign [{}] for operator [{}].", campaign_id, user_id);

        self.find_campaign(user_id, campaign_id)
            .await?
            .ok_or(DbError::CampaignNotFound)
    }

    /// Enlace de afiliado efectivo: habilitado, no borrado, mayor prioridad.
    #[instrument(skip(self))]
    pub async fn effective_affiliate_link(
        &self,
        user_id: &str,
        campaign_id: &str,
    ) -> Result<Option<AffiliateLink>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} WHERE user_id = ? AND campaign_id = ? AND enabled = 1 AND deleted_at IS NULL \
                     ORDER BY priority DESC, created_at ASC LIMIT 1",
                    SELECT_LINK_COLUMNS
                ),
                params![user_id, campaign_id],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(Some(Self::map_link_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Alta de enlace de afiliado (importador, seed y Proving Grounds).
    pub async fn insert_affiliate_link(
        &self,
        user_id: &str,
        campaign_id: &str,
        target_url: &str,
        priority: i64,
    ) -> Result<AffiliateLink, DbError> {
        let connection = self.database_client.get_connection()?;
        let new_identifier = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        connection
            .execute(
                "INSERT INTO affiliate_links (id, user_id, campaign_id, target_url, enabled, \
                 priority, created_at, updated_at) VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
                params![
                    new_identifier.clone(),
                    user_id,
                    campaign_id,
                    target_url,
                    priority,
                    now.clone(),
                    now
                ],
            )
            .await?;

        let mut query_results = connection
            .query(
                &format!("{} WHERE id = ? LIMIT 1", SELECT_LINK_COLUMNS),
                params![new_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Self::map_link_row(&row),
            None => Err(DbError::MappingError("inserted link vanished".into())),
        }
    }

    /**
     * Campañas elegibles para producción: activas, con país y con al
     * menos un enlace habilitado no borrado.
     */
    #[instrument(skip(self))]
    pub async fn producible_campaigns(&self) -> Result<Vec<Campaign>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} WHERE status = 'active' AND country_code <> '' AND deleted_at IS NULL \
                     AND EXISTS (SELECT 1 FROM affiliate_links l WHERE l.user_id = campaigns.user_id \
                     AND l.campaign_id = campaigns.campaign_id AND l.enabled = 1 AND l.deleted_at IS NULL) \
                     ORDER BY user_id, campaign_id",
                    SELECT_CAMPAIGN_COLUMNS
                ),
                (),
            )
            .await?;

        let mut campaigns = Vec::new();
        while let Some(row) = query_results.next().await? {
            campaigns.push(Self::map_campaign_row(&row)?);
        }
        Ok(campaigns)
    }

    /**
     * Consulta masiva: URL de tracking efectiva por campaña (o None).
     */
    #[instrument(skip(self, campaign_ids))]
    pub async fn lookup_tracking_urls(
        &self,
        user_id: &str,
        campaign_ids: &[String],
    ) -> Result<HashMap<String, Option<String>>, DbError> {
        let mut resolution_map = HashMap::with_capacity(campaign_ids.len());

        for campaign_id in campaign_ids {
            let effective_url = self
                .effective_affiliate_link(user_id, campaign_id)
                .await?
                .map(|link| link.target_url);
            resolution_map.insert(campaign_id.clone(), effective_url);
        }

        Ok(resolution_map)
    }
}
