// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT (V4.1 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * La captura de entorno y la sincronización del esquema ocurren antes
 * de la apertura del socket TCP, previniendo estados de carrera donde
 * un script solicite un lease contra tablas aún no solidificadas.
 * =================================================================
 */

use kylink_orchestrator::prelude::*;

use dotenvy::dotenv;
use kylink_shared_argos::init_tracing;
use tracing::info;

/**
 * Punto de ignición supremo del binario del Orquestador.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (ARGOS)
    init_tracing("kylink_orchestrator");

    // 3. CONFIGURACIÓN DEL RUNTIME SOBERANO CON PROTECCIÓN DE PILA (4MB)
    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime_orchestrator.block_on(async {
        info!("🛰️  [COMMAND_CENTER]: Rotation core ignition sequence starting...");

        // 4. ADQUISICIÓN DE COORDENADAS TÁCTICAS
        let database_connection_url = std::env::var("DATABASE_URL")
            .expect("CRITICAL_FAULT: DATABASE_URL not defined in runtime environment.");

        let database_access_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let listening_network_port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        // 5. CAPTURA ÚNICA DE CONFIGURACIÓN OPERATIVA
        let rotation_config = RotationConfig::from_environment();

        // 6. CONSTRUCCIÓN DEL KERNEL SOBERANO (ESTRATO L1-APP)
        let kernel_instance = RotationKernel::ignite(
            &database_connection_url,
            database_access_token,
            listening_network_port,
            rotation_config,
        )
        .await;

        // 7. IGNICIÓN DE OPERACIONES DEL NÚCLEO
        info!(
            "🚀 [KYLINK_ONLINE]: System fully operational on port {}.",
            listening_network_port
        );
        kernel_instance.launch_rotation_operations().await;

        Ok(())
    })
}
