// [libs/infra/db-turso/src/repositories/click_task_repository.rs]
/*!
 * =================================================================
 * APARATO: CLICK TASK REPOSITORY (V4.2 - FLOOD LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TAREAS DE INUNDACIÓN Y SUS ITEMS PLANIFICADOS
 *
 * # Logic:
 * Los items se despachan en orden scheduled_at dentro de cada tick.
 * La cancelación voltea atómicamente los pendientes; los items en
 * vuelo terminan su ejecución y reportan sobre una tarea cancelada
 * sin efecto agregado.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::TursoClient;
use chrono::{DateTime, Utc};
use kylink_domain_models::{ClickItemStatus, ClickTask, ClickTaskItem, ClickTaskStatus};
use libsql::{params, Row};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const SELECT_TASK_COLUMNS: &str = "SELECT id, user_id, campaign_id, target_clicks, \
    completed_clicks, failed_clicks, status, created_at, updated_at FROM click_tasks";

const SELECT_ITEM_COLUMNS: &str = "SELECT id, task_id, scheduled_at, status, exit_ip, \
    error_message, duration_milliseconds, executed_at FROM click_task_items";

/// Item vencido unido a las coordenadas de su tarea propietaria.
#[derive(Debug, Clone)]
pub struct DueClickItem {
    pub item_id: String,
    pub task_id: String,
    pub user_id: String,
    pub campaign_id: String,
    pub scheduled_at: DateTime<Utc>,
}

pub struct ClickTaskRepository {
    database_client: TursoClient,
}

impl ClickTaskRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    fn map_task_row(row: &Row) -> Result<ClickTask, DbError> {
        Ok(ClickTask {
            id: row.get::<String>(0)?,
            user_id: row.get::<String>(1)?,
            campaign_id: row.get::<String>(2)?,
            target_clicks: row.get::<i64>(3)?,
            completed_clicks: row.get::<i64>(4)?,
            failed_clicks: row.get::<i64>(5)?,
            status: ClickTaskStatus::from_str(&row.get::<String>(6)?),
            created_at: mapping::timestamp(&row.get::<String>(7)?)?,
            updated_at: mapping::timestamp(&row.get::<String>(8)?)?,
        })
    }

    fn map_item_row(row: &Row) -> Result<ClickTaskItem, DbError> {
        Ok(ClickTaskItem {
            id: row.get::<String>(0)?,
            task_id: row.get::<String>(1)?,
            scheduled_at: mapping::timestamp(&row.get::<String>(2)?)?,
            status: ClickItemStatus::from_str(&row.get::<String>(3)?),
            exit_ip: row.get::<String>(4).ok(),
            error_message: row.get::<String>(5).ok(),
            duration_milliseconds: row.get::<i64>(6).ok(),
            executed_at: mapping::optional_timestamp(row.get::<String>(7).ok()),
        })
    }

    /**
     * Alta de tarea con sus items planificados, en una transacción.
     */
    #[instrument(skip(self, schedule))]
    pub async fn create_task_with_schedule(
        &self,
        user_id: &str,
        campaign_id: &str,
        schedule: &[DateTime<Utc>],
    ) -> Result<ClickTask, DbError> {
        let connection = self.database_client.get_connection()?;
        let database_transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let task_identifier = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        database_transaction
            .execute(
                "INSERT INTO click_tasks (id, user_id, campaign_id, target_clicks, status, \
                 created_at, updated_at) VALUES (?, ?, ?, ?, 'running', ?, ?)",
                params![
                    task_identifier.clone(),
                    user_id,
                    campaign_id,
                    schedule.len() as i64,
                    now.clone(),
                    now
                ],
            )
            .await?;

        for scheduled_at in schedule {
            database_transaction
                .execute(
                    "INSERT INTO click_task_items (id, task_id, scheduled_at, status) \
                     VALUES (?, ?, ?, 'pending')",
                    params![
                        Uuid::new_v4().to_string(),
                        task_identifier.clone(),
                        scheduled_at.to_rfc3339()
                    ],
                )
                .await?;
        }

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!(
            "🗓️ [CLICK_TASK]: Task [{}] sealed with {} scheduled items.",
            task_identifier,
            schedule.len()
        );

        self.get_task(user_id, &task_identifier)
            .await?
            .ok_or(DbError::TaskNotFound)
    }

    /// Recupera una tarea bajo el aislamiento del operador.
    pub async fn get_task(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<ClickTask>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!("{} WHERE id = ? AND user_id = ? LIMIT 1", SELECT_TASK_COLUMNS),
                params![task_id, user_id],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(Some(Self::map_task_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Items de una tarea (estado y rastro de ejecución).
    pub async fn task_items(&self, task_id: &str) -> Result<Vec<ClickTaskItem>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} WHERE task_id = ? ORDER BY scheduled_at ASC",
                    SELECT_ITEM_COLUMNS
                ),
                params![task_id],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = query_results.next().await? {
            items.push(Self::map_item_row(&row)?);
        }
        Ok(items)
    }

    /**
     * Items vencidos de tareas en ejecución, más antiguos primero.
     */
    #[instrument(skip(self))]
    pub async fn due_items(&self, fetch_limit: i64) -> Result<Vec<DueClickItem>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                "SELECT i.id, i.task_id, t.user_id, t.campaign_id, i.scheduled_at \
                 FROM click_task_items i JOIN click_tasks t ON t.id = i.task_id \
                 WHERE i.status = 'pending' AND i.scheduled_at <= ? AND t.status = 'running' \
                 ORDER BY i.scheduled_at ASC LIMIT ?",
                params![Utc::now().to_rfc3339(), fetch_limit],
            )
            .await?;

        let mut due = Vec::new();
        while let Some(row) = query_results.next().await? {
            due.push(DueClickItem {
                item_id: row.get::<String>(0)?,
                task_id: row.get::<String>(1)?,
                user_id: row.get::<String>(2)?,
                campaign_id: row.get::<String>(3)?,
                scheduled_at: mapping::timestamp(&row.get::<String>(4)?)?,
            });
        }
        Ok(due)
    }

    /// Captura condicional del item para ejecución (carrera segura).
    pub async fn mark_item_executing(&self, item_id: &str) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let claimed_rows = connection
            .execute(
                "UPDATE click_task_items SET status = 'executing' WHERE id = ? AND status = 'pending'",
                params![item_id],
            )
            .await?;
        Ok(claimed_rows == 1)
    }

    /**
     * Sella el resultado del item y avanza los contadores agregados de
     * la tarea en una transacción.
     */
    #[instrument(skip(self))]
    pub async fn record_item_outcome(
        &self,
        item_id: &str,
        task_id: &str,
        success: bool,
        exit_ip: Option<&str>,
        error_message: Option<&str>,
        duration_milliseconds: i64,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let database_transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let now = Utc::now().to_rfc3339();
        let final_status = if success { "success" } else { "failed" };

        database_transaction
            .execute(
                "UPDATE click_task_items SET status = ?, exit_ip = ?, error_message = ?, \
                 duration_milliseconds = ?, executed_at = ? WHERE id = ?",
                params![
                    final_status,
                    mapping::opt_text(exit_ip),
                    mapping::opt_text(error_message),
                    duration_milliseconds,
                    now.clone(),
                    item_id
                ],
            )
            .await?;

        let counter_column = if success { "completed_clicks" } else { "failed_clicks" };
        database_transaction
            .execute(
                &format!(
                    "UPDATE click_tasks SET {} = {} + 1, updated_at = ? WHERE id = ?",
                    counter_column, counter_column
                ),
                params![now, task_id],
            )
            .await?;

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;
        Ok(())
    }

    /// ¿Quedan items pendientes o en vuelo en la tarea?
    pub async fn task_has_open_items(&self, task_id: &str) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                "SELECT COUNT(*) FROM click_task_items \
                 WHERE task_id = ? AND status IN ('pending', 'executing')",
                params![task_id],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? > 0),
            None => Ok(false),
        }
    }

    /**
     * Finalización: completed si hubo al menos un éxito, failed si no.
     * Solo transiciona tareas aún en ejecución.
     */
    #[instrument(skip(self))]
    pub async fn finalize_drained_task(&self, task_id: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                "SELECT completed_clicks FROM click_tasks WHERE id = ? AND status = 'running' LIMIT 1",
                params![task_id],
            )
            .await?;

        let Some(row) = query_results.next().await? else {
            return Ok(());
        };
        let completed_clicks: i64 = row.get(0)?;
        let final_status = if completed_clicks > 0 { "completed" } else { "failed" };

        connection
            .execute(
                "UPDATE click_tasks SET status = ?, updated_at = ? WHERE id = ? AND status = 'running'",
                params![final_status, Utc::now().to_rfc3339(), task_id],
            )
            .await?;

        info!("🏁 [CLICK_TASK]: Task [{}] sealed as {}.", task_id, final_status);
        Ok(())
    }

    /**
     * CANCELACIÓN ATÓMICA: tarea cancelada + items pendientes volteados.
     * Los items en ejecución no se abortan en vuelo.
     */
    #[instrument(skip(self))]
    pub async fn cancel_task(&self, user_id: &str, task_id: &str) -> Result<ClickTask, DbError> {
        let connection = self.database_client.get_connection()?;
        let database_transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let cancelled_rows = database_transaction
            .execute(
                "UPDATE click_tasks SET status = 'cancelled', updated_at = ? \
                 WHERE id = ? AND user_id = ? AND status = 'running'",
                params![Utc::now().to_rfc3339(), task_id, user_id],
            )
            .await?;

        if cancelled_rows == 0 {
            warn!("🚫 [CLICK_TASK]: Cancellation rejected for task [{}].", task_id);
            return Err(DbError::InvalidTaskState);
        }

        database_transaction
            .execute(
                "UPDATE click_task_items SET status = 'cancelled' \
                 WHERE task_id = ? AND status = 'pending'",
                params![task_id],
            )
            .await?;

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        self.get_task(user_id, task_id)
            .await?
            .ok_or(DbError::TaskNotFound)
    }
}
