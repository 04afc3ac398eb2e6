// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: ROTATION STATE HUB (V4.2 - COMPOSITION ROOT)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS Y CONFIGURACIÓN
 *
 * # Mathematical Proof (Deterministic State Hub):
 * El estado es un grafo inmutable de Arc<T>: clonarlo es O(1) y todo
 * daemon observa exactamente las mismas instancias de repositorio.
 * La única verdad mutable compartida vive en el Ledger Táctico.
 * =================================================================
 */

use crate::config::RotationConfig;
use crate::services::job_registry::JobRegistry;
use kylink_infra_db::repositories::{
    AlertRepository, ApiKeyRepository, AuditRepository, CampaignRepository,
    ClickStateRepository, ClickTaskRepository, LeaseRepository, ProxyRepository,
    StockRepository,
};
use kylink_infra_db::TursoClient;
use std::sync::Arc;

/**
 * Contenedor de estado compartido (Thread-Safe) para el Orquestador.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente táctico hacia el cluster libSQL.
    pub database_client: TursoClient,
    /// Configuración inmutable capturada en el arranque.
    pub config: Arc<RotationConfig>,

    // --- REPOSITORIOS DEL LEDGER (ESTRATO L3) ---
    pub campaign_repository: Arc<CampaignRepository>,
    pub click_state_repository: Arc<ClickStateRepository>,
    pub stock_repository: Arc<StockRepository>,
    pub lease_repository: Arc<LeaseRepository>,
    pub proxy_repository: Arc<ProxyRepository>,
    pub click_task_repository: Arc<ClickTaskRepository>,
    pub alert_repository: Arc<AlertRepository>,
    pub audit_repository: Arc<AuditRepository>,
    pub api_key_repository: Arc<ApiKeyRepository>,

    /// Registro de trabajos con historial de ejecuciones.
    pub job_registry: Arc<JobRegistry>,
}

impl AppState {
    /// Construye el estado neural completo sobre el cliente táctico.
    pub fn new(database_client: TursoClient, config: RotationConfig) -> Self {
        let shared_config = Arc::new(config);

        Self {
            campaign_repository: Arc::new(CampaignRepository::new(database_client.clone())),
            click_state_repository: Arc::new(ClickStateRepository::new(database_client.clone())),
            stock_repository: Arc::new(StockRepository::new(database_client.clone())),
            lease_repository: Arc::new(LeaseRepository::new(database_client.clone())),
            proxy_repository: Arc::new(ProxyRepository::new(database_client.clone())),
            click_task_repository: Arc::new(ClickTaskRepository::new(database_client.clone())),
            alert_repository: Arc::new(AlertRepository::new(database_client.clone())),
            audit_repository: Arc::new(AuditRepository::new(database_client.clone())),
            api_key_repository: Arc::new(ApiKeyRepository::new(database_client.clone())),
            job_registry: Arc::new(JobRegistry::new(&shared_config)),
            database_client,
            config: shared_config,
        }
    }
}
