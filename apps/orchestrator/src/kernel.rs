// [apps/orchestrator/src/kernel.rs]
/**
 * =================================================================
 * APARATO: ROTATION KERNEL (V4.3 - COMPOSITION ROOT)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios:
 * enlace al Ledger, estado neural, tickers del registro de trabajos
 * y transporte HTTP. Los despliegues conducidos por cron externo
 * arrancan con los tickers apagados.
 * =================================================================
 */

use crate::config::RotationConfig;
use crate::routes::create_rotation_router;
use crate::services::JobRegistry;
use crate::state::AppState;
use kylink_infra_db::TursoClient;
use std::net::{IpAddr, SocketAddr};
use tracing::{error, info, instrument};

pub struct RotationKernel {
    pub server_network_port: u16,
    pub application_shared_state: AppState,
}

impl RotationKernel {
    /**
     * Realiza la ignición del cliente táctico y el estado neural.
     * Establece la conexión a la base de datos antes de levantar servicios.
     */
    #[instrument(skip(database_access_token, config))]
    pub async fn ignite(
        database_connection_url: &str,
        database_access_token: Option<String>,
        listening_port: u16,
        config: RotationConfig,
    ) -> Self {
        let database_client = TursoClient::connect(database_connection_url, database_access_token)
            .await
            .expect("FATAL: Database link collapse. Ignition aborted.");

        Self {
            server_network_port: listening_port,
            application_shared_state: AppState::new(database_client, config),
        }
    }

    /**
     * Lanza la ejecución de todas las operaciones autónomas del núcleo.
     * Configura los daemons de fondo y el servidor HTTP principal.
     */
    pub async fn launch_rotation_operations(self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. TICKERS DEL REGISTRO DE TRABAJOS ---
        // stock_replenish, monitoring_alert, click_task_execute y los
        // janitors de recuperación, cada uno con su cadencia nominal.
        JobRegistry::spawn_internal_tickers(shared_application_state.clone());

        // --- 2. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let rotation_router = create_rotation_router(shared_application_state);

        let bind_address = SocketAddr::new(
            "0.0.0.0".parse::<IpAddr>().expect("static bind address"),
            self.server_network_port,
        );

        info!("🚀 [KERNEL_ONLINE]: Rotation core listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        if let Err(server_error) = axum::serve(tcp_listener, rotation_router).await {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            std::process::exit(1);
        }
    }
}
