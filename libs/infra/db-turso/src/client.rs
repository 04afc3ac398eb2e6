// [libs/infra/db-turso/src/client.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL LINK CLIENT (V5.0 - PROFILE GOVERNED)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CLASIFICACIÓN DEL ENLACE, IGNICIÓN CON REINTENTOS
 *                  Y BOOTSTRAP GÉNESIS DEL ESQUEMA
 *
 * # Logic:
 * La URL de conexión se clasifica en un perfil (cluster remoto,
 * archivo local o memoria compartida) ANTES de tocar el driver: el
 * perfil decide el constructor, la exigencia de token y la retención
 * de la conexión génesis. La ignición del driver reintenta con
 * backoff lineal: un cluster Turso recién desplegado puede rechazar
 * los primeros enlaces del arranque en frío.
 *
 * # Mathematical Proof (Schema Survival):
 * En memoria compartida, SQLite descarta la base cuando muere su
 * última conexión. Retener la conexión génesis (la misma que ejecutó
 * el bootstrap) garantiza refcount >= 1 durante toda la vida del
 * proceso, y por lo tanto la visibilidad del esquema para cualquier
 * conexión posterior.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_full_rotation_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Intentos de ignición del driver antes de declarar el enlace muerto.
const DRIVER_IGNITION_ATTEMPTS: u32 = 3;

/// Backoff lineal entre intentos de ignición (milisegundos × intento).
const DRIVER_IGNITION_BACKOFF_MILLISECONDS: u64 = 250;

/// Perfil del enlace de persistencia, resuelto desde la URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProfile {
    /// Cluster Turso remoto (libsql:// o https://): exige token.
    RemoteCluster,
    /// Archivo SQLite en el disco del nodo.
    LocalFile,
    /// Memoria compartida del proceso (Proving Grounds).
    SharedMemory,
}

impl LinkProfile {
    /// Clasifica la URL sin abrir ningún socket.
    fn classify(database_connection_url: &str) -> Self {
        let normalized = database_connection_url.trim();
        if normalized.starts_with("libsql://") || normalized.starts_with("https://") {
            return LinkProfile::RemoteCluster;
        }
        if normalized.contains(":memory:") || normalized.contains("mode=memory") {
            return LinkProfile::SharedMemory;
        }
        LinkProfile::LocalFile
    }

    /// El token solo es obligatorio contra el cluster remoto.
    fn demands_access_token(&self) -> bool {
        matches!(self, LinkProfile::RemoteCluster)
    }
}

#[derive(Clone)]
pub struct TursoClient {
    tactical_database: Arc<Database>,
    link_profile: LinkProfile,
    /// Conexión génesis retenida solo en memoria compartida: mientras
    /// viva, el esquema solidificado sobrevive (ver prueba del header).
    genesis_keeper: Option<Arc<Connection>>,
}

impl TursoClient {
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
    ) -> Result<Self, DbError> {
        if database_connection_url.trim().is_empty() {
            return Err(DbError::ConfigurationError(
                "DATABASE_URL_UNDEFINED in runtime environment".into(),
            ));
        }

        let link_profile = LinkProfile::classify(database_connection_url);

        if link_profile.demands_access_token() && database_access_token.is_none() {
            return Err(DbError::ConfigurationError(
                "remote cluster link demands TURSO_AUTH_TOKEN".into(),
            ));
        }

        info!(
            "🔌 [DATABASE]: Igniting {:?} link to [{}]",
            link_profile, database_connection_url
        );

        let tactical_database = Arc::new(
            Self::ignite_driver_with_retry(
                database_connection_url,
                database_access_token,
                link_profile,
            )
            .await?,
        );

        // BOOTSTRAP GÉNESIS: una única conexión solidifica el esquema
        // en los tres perfiles; solo la memoria compartida la retiene.
        let genesis_connection = tactical_database
            .connect()
            .map_err(|fault| DbError::ConnectionError(format!("GENESIS_LINK_FAULT: {}", fault)))?;

        apply_full_rotation_schema(&genesis_connection)
            .await
            .map_err(|fault| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {}", fault)))?;

        let genesis_keeper = if link_profile == LinkProfile::SharedMemory {
            info!("⚓ [DATABASE]: Shared-memory strata pinned by genesis connection.");
            Some(Arc::new(genesis_connection))
        } else {
            None
        };

        Ok(Self {
            tactical_database,
            link_profile,
            genesis_keeper,
        })
    }

    /// Ignición del driver con reintentos lineales sobre arranques fríos.
    async fn ignite_driver_with_retry(
        database_connection_url: &str,
        database_access_token: Option<String>,
        link_profile: LinkProfile,
    ) -> Result<Database, DbError> {
        let mut last_ignition_fault = String::new();

        for ignition_attempt in 1..=DRIVER_IGNITION_ATTEMPTS {
            if ignition_attempt > 1 {
                tokio::time::sleep(Duration::from_millis(
                    DRIVER_IGNITION_BACKOFF_MILLISECONDS * ignition_attempt as u64,
                ))
                .await;
            }

            let ignition_result = match link_profile {
                LinkProfile::RemoteCluster => {
                    Builder::new_remote(
                        database_connection_url.to_string(),
                        database_access_token.clone().unwrap_or_default(),
                    )
                    .build()
                    .await
                }
                LinkProfile::LocalFile | LinkProfile::SharedMemory => {
                    Builder::new_local(database_connection_url).build().await
                }
            };

            match ignition_result {
                Ok(ignited_database) => return Ok(ignited_database),
                Err(ignition_fault) => {
                    warn!(
                        "🔌 [DATABASE_RETRY]: Ignition attempt {}/{} rejected: {}",
                        ignition_attempt, DRIVER_IGNITION_ATTEMPTS, ignition_fault
                    );
                    last_ignition_fault = ignition_fault.to_string();
                }
            }
        }

        Err(DbError::ConnectionError(format!(
            "DRIVER_IGNITION_FAILURE after {} attempts -> {}",
            DRIVER_IGNITION_ATTEMPTS, last_ignition_fault
        )))
    }

    /// Perfil del enlace resuelto en la ignición.
    pub fn link_profile(&self) -> LinkProfile {
        self.link_profile
    }

    /// ¿El esquema está anclado por la conexión génesis?
    pub fn is_memory_pinned(&self) -> bool {
        self.genesis_keeper.is_some()
    }

    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.tactical_database.connect().map_err(|fault| {
            error!("⚠️ [POOL_FAULT]: Tactical connection allocation failed: {}", fault);
            DbError::ConnectionError(fault.to_string())
        })
    }
}
