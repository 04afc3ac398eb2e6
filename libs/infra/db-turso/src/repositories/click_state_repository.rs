// [libs/infra/db-turso/src/repositories/click_state_repository.rs]
/*!
 * =================================================================
 * APARATO: CLICK STATE REPOSITORY (V4.1 - MONOTONIC GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: MONOTONICIDAD DE CLICKS Y REINICIO DIARIO
 *
 * # Mathematical Proof (Monotone Safety):
 * El avance de last_applied_clicks usa MAX(valor_actual, candidato):
 * cualquier reordenamiento de transacciones concurrentes produce el
 * mismo supremo, por lo que la monotonicidad intra-día es invariante
 * bajo carreras. El único descenso permitido es el reinicio a 0 en el
 * cambio de día calendario.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::TursoClient;
use chrono::{DateTime, Utc};
use kylink_domain_models::CampaignClickState;
use libsql::{params, Row};
use tracing::{info, instrument};

const SELECT_STATE_COLUMNS: &str = "SELECT user_id, campaign_id, last_applied_clicks, \
    last_observed_clicks, last_observed_at, updated_at FROM campaign_click_state";

pub struct ClickStateRepository {
    database_client: TursoClient,
}

impl ClickStateRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    fn map_state_row(row: &Row) -> Result<CampaignClickState, DbError> {
        Ok(CampaignClickState {
            user_id: row.get::<String>(0)?,
            campaign_id: row.get::<String>(1)?,
            last_applied_clicks: row.get::<i64>(2)?,
            last_observed_clicks: row.get::<i64>(3)?,
            last_observed_at: mapping::timestamp(&row.get::<String>(4)?)?,
            updated_at: mapping::timestamp(&row.get::<String>(5)?)?,
        })
    }

    /// Recupera el estado de clicks de la campaña, si existe.
    #[instrument(skip(self))]
    pub async fn get_state(
        &self,
        user_id: &str,
        campaign_id: &str,
    ) -> Result<Option<CampaignClickState>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} WHERE user_id = ? AND campaign_id = ? LIMIT 1",
                    SELECT_STATE_COLUMNS
                ),
                params![user_id, campaign_id],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(Some(Self::map_state_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Crea el estado inicial: applied=0, observed=valor del primer lease.
    #[instrument(skip(self))]
    pub async fn create_state(
        &self,
        user_id: &str,
        campaign_id: &str,
        observed_clicks: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<CampaignClickState, DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO campaign_click_state (user_id, campaign_id, last_applied_clicks, \
                 last_observed_clicks, last_observed_at, updated_at) VALUES (?, ?, 0, ?, ?, ?)",
                params![
                    user_id,
                    campaign_id,
                    observed_clicks,
                    observed_at.to_rfc3339(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        self.get_state(user_id, campaign_id)
            .await?
            .ok_or(DbError::MappingError("created click state vanished".into()))
    }

    /// Refresca los campos de observación sin tocar el contador aplicado.
    #[instrument(skip(self))]
    pub async fn refresh_observation(
        &self,
        user_id: &str,
        campaign_id: &str,
        observed_clicks: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE campaign_click_state SET last_observed_clicks = ?, last_observed_at = ?, \
                 updated_at = ? WHERE user_id = ? AND campaign_id = ?",
                params![
                    observed_clicks,
                    observed_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    user_id,
                    campaign_id
                ],
            )
            .await?;
        Ok(())
    }

    /**
     * Reinicio diario: un nuevo día calendario con observación menor al
     * contador aplicado implica que Google Ads reinició el contador.
     */
    #[instrument(skip(self))]
    pub async fn reset_for_new_day(
        &self,
        user_id: &str,
        campaign_id: &str,
        observed_clicks: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE campaign_click_state SET last_applied_clicks = 0, last_observed_clicks = ?, \
                 last_observed_at = ?, updated_at = ? WHERE user_id = ? AND campaign_id = ?",
                params![
                    observed_clicks,
                    observed_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    user_id,
                    campaign_id
                ],
            )
            .await?;

        info!(
            "🌅 [CLICK_STATE]: Daily reset applied for campaign [{}] (observed={}).",
            campaign_id, observed_clicks
        );
        Ok(())
    }

    /// Avance monótono fuera de transacción (Proving Grounds y janitors).
    pub async fn bump_applied_clicks_monotone(
        &self,
        user_id: &str,
        campaign_id: &str,
        candidate_clicks: i64,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE campaign_click_state SET last_applied_clicks = MAX(last_applied_clicks, ?), \
                 updated_at = ? WHERE user_id = ? AND campaign_id = ?",
                params![candidate_clicks, Utc::now().to_rfc3339(), user_id, campaign_id],
            )
            .await?;
        Ok(())
    }
}
