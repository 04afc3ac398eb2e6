// [libs/infra/db-turso/src/repositories/lease/mod.rs]
/*!
 * =================================================================
 * APARATO: LEASE REPOSITORY (V4.3 - TWO-ROW TRANSACTIONS)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ASIGNACIÓN ATÓMICA, ACK Y RECLAMACIÓN DE LEASES
 *
 * # Mathematical Proof (Single Allocation):
 * La captura del item de stock usa un UPDATE condicional sobre
 * status='available' dentro de la transacción. Dos transacciones
 * concurrentes sobre la misma fila serializan en el motor: solo una
 * observa filas afectadas = 1; la otra reintenta sobre el siguiente
 * item más antiguo. El índice único (user_id, idempotency_key)
 * colapsa reintentos del mismo incremento observado.
 * =================================================================
 */

pub mod queries;

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::TursoClient;
use chrono::{Duration, Utc};
use kylink_domain_models::{LeaseStatus, SuffixLease};
use libsql::{params, Row};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use self::queries as sql_registry;

/// Mensaje estándar sellado en los leases reclamados por el janitor.
const EXPIRY_RECLAMATION_MESSAGE: &str = "lease reclaimed after ack timeout";

/// Reintentos de captura ante conflictos de asignación concurrente.
const ALLOCATION_CLAIM_ATTEMPTS: u32 = 3;

/// Política de compromiso de la asignación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// Contrato principal: lease y consumo sellados en una transacción.
    ImmediateCommit,
    /// Contrato legado: el item queda 'leased' hasta el ack explícito.
    DeferredAck,
}

/// Parámetros de una asignación de lease.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub user_id: String,
    pub campaign_id: String,
    pub idempotency_key: String,
    pub now_clicks: i64,
    pub window_start_epoch_seconds: i64,
}

pub struct LeaseRepository {
    database_client: TursoClient,
}

impl LeaseRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    fn map_lease_row(row: &Row) -> Result<SuffixLease, DbError> {
        Ok(SuffixLease {
            id: row.get::<String>(0)?,
            user_id: row.get::<String>(1)?,
            campaign_id: row.get::<String>(2)?,
            stock_item_id: row.get::<String>(3)?,
            idempotency_key: row.get::<String>(4)?,
            clicks_at_lease_time: row.get::<i64>(5)?,
            window_start_epoch_seconds: row.get::<i64>(6)?,
            status: LeaseStatus::from_str(&row.get::<String>(7)?),
            applied: row.get::<i64>(8)? != 0,
            error_message: row.get::<String>(9).ok(),
            leased_at: mapping::timestamp(&row.get::<String>(10)?)?,
            acked_at: mapping::optional_timestamp(row.get::<String>(11).ok()),
            deleted_at: mapping::optional_timestamp(row.get::<String>(12).ok()),
        })
    }

    /**
     * Cortocircuito de idempotencia: lease existente con su sufijo unido.
     */
    #[instrument(skip(self))]
    pub async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        idempotency_key: &str,
    ) -> Result<Option<(SuffixLease, Option<String>)>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                sql_registry::FIND_BY_IDEMPOTENCY,
                params![user_id, idempotency_key],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => {
                let lease = Self::map_lease_row(&row)?;
                let joined_suffix = row.get::<String>(13).ok();
                Ok(Some((lease, joined_suffix)))
            }
            None => Ok(None),
        }
    }

    /// Recupera un lease por identificador bajo el aislamiento del operador.
    #[instrument(skip(self))]
    pub async fn find_lease(
        &self,
        user_id: &str,
        campaign_id: &str,
        lease_id: &str,
    ) -> Result<Option<SuffixLease>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                &format!(
                    "{} WHERE id = ? AND user_id = ? AND campaign_id = ? AND deleted_at IS NULL LIMIT 1",
                    sql_registry::SELECT_LEASE_COLUMNS
                ),
                params![lease_id, user_id, campaign_id],
            )
            .await?;

        match query_results.next().await? {
            Some(row) => Ok(Some(Self::map_lease_row(&row)?)),
            None => Ok(None),
        }
    }

    /**
     * ASIGNACIÓN ATÓMICA: captura el item disponible más antiguo, sella
     * el lease y (en modo inmediato) avanza el contador aplicado, todo
     * dentro de una única transacción.
     *
     * # Errors:
     * - `DbError::NoStock`: inventario vacío para la campaña.
     * - `DbError::AllocationConflict`: carreras agotaron los reintentos
     *   o la clave idempotente fue sellada por una transacción hermana.
     */
    #[instrument(skip(self, request))]
    pub async fn allocate(
        &self,
        request: &AllocationRequest,
        mode: AllocationMode,
    ) -> Result<(SuffixLease, String), DbError> {
        let connection = self.database_client.get_connection()?;

        for claim_attempt in 1..=ALLOCATION_CLAIM_ATTEMPTS {
            let database_transaction = connection
                .transaction()
                .await
                .map_err(|_| DbError::TransactionError)?;

            // --- FASE 1: ITEM DISPONIBLE MÁS ANTIGUO ---
            let mut candidate_results = database_transaction
                .query(
                    sql_registry::OLDEST_AVAILABLE_ITEM,
                    params![request.user_id.clone(), request.campaign_id.clone()],
                )
                .await?;

            let Some(candidate_row) = candidate_results.next().await? else {
                return Err(DbError::NoStock);
            };
            let stock_item_id: String = candidate_row.get(0)?;
            let stock_suffix: String = candidate_row.get(1)?;

            // --- FASE 2: CAPTURA CONDICIONAL (DEFENSA ANTI-DOBLE-ASIGNACIÓN) ---
            let now = Utc::now();
            let now_rendered = now.to_rfc3339();

            let (stock_status, stock_consumed_at) = match mode {
                AllocationMode::ImmediateCommit => ("consumed", Some(now_rendered.clone())),
                AllocationMode::DeferredAck => ("leased", None),
            };

            let claimed_rows = database_transaction
                .execute(
                    sql_registry::CLAIM_STOCK_ITEM,
                    params![
                        stock_status,
                        now_rendered.clone(),
                        mapping::opt_text(stock_consumed_at),
                        stock_item_id.clone()
                    ],
                )
                .await?;

            if claimed_rows == 0 {
                // Carrera perdida: otra transacción capturó la fila.
                warn!(
                    "⚔️ [ALLOCATION_RACE]: Claim attempt {}/{} lost on item [{}].",
                    claim_attempt, ALLOCATION_CLAIM_ATTEMPTS, stock_item_id
                );
                continue;
            }

            // --- FASE 3: SELLADO DEL LEASE ---
            let lease_identifier = Uuid::new_v4().to_string();
            let (lease_status, lease_applied, lease_acked_at) = match mode {
                AllocationMode::ImmediateCommit => ("consumed", 1i64, Some(now_rendered.clone())),
                AllocationMode::DeferredAck => ("leased", 0i64, None),
            };

            let lease_insert_result = database_transaction
                .execute(
                    sql_registry::INSERT_LEASE,
                    params![
                        lease_identifier.clone(),
                        request.user_id.clone(),
                        request.campaign_id.clone(),
                        stock_item_id.clone(),
                        request.idempotency_key.clone(),
                        request.now_clicks,
                        request.window_start_epoch_seconds,
                        lease_status,
                        lease_applied,
                        now_rendered.clone(),
                        mapping::opt_text(lease_acked_at)
                    ],
                )
                .await;

            if let Err(insert_fault) = lease_insert_result {
                // Colisión de clave idempotente: una hermana selló primero.
                if insert_fault.to_string().to_ascii_uppercase().contains("UNIQUE") {
                    return Err(DbError::AllocationConflict);
                }
                return Err(DbError::QueryError(insert_fault));
            }

            // --- FASE 4: AVANCE MONÓTONO DEL CONTADOR (MODO INMEDIATO) ---
            if mode == AllocationMode::ImmediateCommit {
                database_transaction
                    .execute(
                        sql_registry::BUMP_APPLIED_CLICKS,
                        params![
                            request.now_clicks,
                            now_rendered.clone(),
                            request.user_id.clone(),
                            request.campaign_id.clone()
                        ],
                    )
                    .await?;
            }

            database_transaction
                .commit()
                .await
                .map_err(|_| DbError::TransactionError)?;

            info!(
                "🎫 [LEASE_SEALED]: Lease [{}] bound to stock [{}] for campaign [{}] ({:?}).",
                lease_identifier, stock_item_id, request.campaign_id, mode
            );

            let sealed_lease = self
                .find_lease(&request.user_id, &request.campaign_id, &lease_identifier)
                .await?
                .ok_or(DbError::LeaseNotFound)?;

            return Ok((sealed_lease, stock_suffix));
        }

        Err(DbError::AllocationConflict)
    }

    /**
     * ACK EXITOSO: lease consumido + stock consumido + avance monótono,
     * en una única transacción. Idempotente sobre estados terminales en
     * el estrato de servicio.
     */
    #[instrument(skip(self, lease))]
    pub async fn ack_success(&self, lease: &SuffixLease) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let database_transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let now_rendered = Utc::now().to_rfc3339();

        database_transaction
            .execute(
                sql_registry::MARK_LEASE_CONSUMED,
                params![now_rendered.clone(), lease.id.clone()],
            )
            .await?;

        database_transaction
            .execute(
                sql_registry::MARK_STOCK_CONSUMED,
                params![now_rendered.clone(), lease.stock_item_id.clone()],
            )
            .await?;

        database_transaction
            .execute(
                sql_registry::BUMP_APPLIED_CLICKS,
                params![
                    lease.clicks_at_lease_time,
                    now_rendered,
                    lease.user_id.clone(),
                    lease.campaign_id.clone()
                ],
            )
            .await?;

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!("✅ [ACK_SEALED]: Lease [{}] consumed with monotone bump.", lease.id);
        Ok(())
    }

    /**
     * ACK FALLIDO: lease fallido con mensaje + item reciclado a
     * 'available' (el sufijo es reutilizable), en una transacción.
     */
    #[instrument(skip(self, lease))]
    pub async fn ack_failure(
        &self,
        lease: &SuffixLease,
        failure_message: &str,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let database_transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        database_transaction
            .execute(
                sql_registry::MARK_LEASE_FAILED,
                params![failure_message, Utc::now().to_rfc3339(), lease.id.clone()],
            )
            .await?;

        database_transaction
            .execute(
                sql_registry::RESTORE_STOCK_AVAILABLE,
                params![lease.stock_item_id.clone()],
            )
            .await?;

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        info!("♻️  [ACK_RECYCLED]: Lease [{}] failed; stock item restored to available.", lease.id);
        Ok(())
    }

    /// Leases arrendados más viejos que el TTL (candidatos a reclamación).
    #[instrument(skip(self))]
    pub async fn find_stale_leased(&self, ttl_minutes: i64) -> Result<Vec<SuffixLease>, DbError> {
        let staleness_floor = (Utc::now() - Duration::minutes(ttl_minutes)).to_rfc3339();
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(sql_registry::FIND_STALE_LEASED, params![staleness_floor])
            .await?;

        let mut stale_leases = Vec::new();
        while let Some(row) = query_results.next().await? {
            stale_leases.push(Self::map_lease_row(&row)?);
        }
        Ok(stale_leases)
    }

    /**
     * RECLAMACIÓN: sella el lease como expirado y devuelve el item al
     * inventario, en una transacción. El guard de status='leased' hace
     * la operación segura ante acks concurrentes tardíos.
     */
    #[instrument(skip(self, lease))]
    pub async fn expire_lease(&self, lease: &SuffixLease) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let database_transaction = connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        let expired_rows = database_transaction
            .execute(
                sql_registry::MARK_LEASE_EXPIRED,
                params![
                    EXPIRY_RECLAMATION_MESSAGE,
                    Utc::now().to_rfc3339(),
                    lease.id.clone()
                ],
            )
            .await?;

        if expired_rows == 0 {
            // Un ack llegó primero: nada que reclamar.
            return Ok(false);
        }

        database_transaction
            .execute(
                sql_registry::RESTORE_STOCK_AVAILABLE,
                params![lease.stock_item_id.clone()],
            )
            .await?;

        database_transaction
            .commit()
            .await
            .map_err(|_| DbError::TransactionError)?;

        warn!("⏰ [LEASE_RECLAIMED]: Lease [{}] expired; stock restored.", lease.id);
        Ok(true)
    }

    /// Edad en minutos del lease arrendado más antiguo, si existe.
    pub async fn oldest_leased_age_minutes(&self) -> Result<Option<i64>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(sql_registry::OLDEST_LEASED_TIMESTAMP, ())
            .await?;

        match query_results.next().await? {
            Some(row) => {
                let leased_at = mapping::timestamp(&row.get::<String>(0)?)?;
                Ok(Some((Utc::now() - leased_at).num_minutes()))
            }
            None => Ok(None),
        }
    }

    /// Conteo (consumidos, fallidos) de leases arrendados en la ventana.
    pub async fn ack_window_counts(&self, window_minutes: i64) -> Result<(i64, i64), DbError> {
        let window_floor = (Utc::now() - Duration::minutes(window_minutes)).to_rfc3339();
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(sql_registry::ACK_WINDOW_COUNTS, params![window_floor])
            .await?;

        match query_results.next().await? {
            Some(row) => Ok((
                row.get::<i64>(0).unwrap_or(0),
                row.get::<i64>(1).unwrap_or(0),
            )),
            None => Ok((0, 0)),
        }
    }
}
