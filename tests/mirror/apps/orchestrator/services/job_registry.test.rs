// [tests/mirror/apps/orchestrator/services/job_registry.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL REGISTRO DE TRABAJOS (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE DESPACHO NOMINAL Y RING DE HISTORIAL
 * =================================================================
 */

use kylink_infra_db::TursoClient;
use kylink_orchestrator::config::RotationConfig;
use kylink_orchestrator::state::AppState;

const DEFAULT_JOBS: &[&str] = &[
    "stock_replenish",
    "monitoring_alert",
    "click_task_execute",
    "lease_expiry",
    "stock_aging",
    "exit_ip_reaper",
];

async fn ignite_state(database_name: &str) -> AppState {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_name),
        None,
    )
    .await
    .expect("memory strata ignition failed");
    AppState::new(client, RotationConfig::for_tests())
}

/**
 * CERTIFICACIÓN: Los trabajos nominales del núcleo están registrados.
 */
#[tokio::test]
async fn certify_default_job_roster() {
    let state = ignite_state("jobs_roster").await;
    let registered: Vec<&str> = state
        .job_registry
        .definitions()
        .iter()
        .map(|definition| definition.name)
        .collect();

    for expected_job in DEFAULT_JOBS {
        assert!(
            registered.contains(expected_job),
            "missing default job [{}]",
            expected_job
        );
    }

    println!("✅ L4_JOBS: Default roster certified.");
}

/**
 * CERTIFICACIÓN: Ejecución ad-hoc sobre ledger vacío, rechazo de
 * nombres desconocidos y sellado en el ring de historial.
 */
#[tokio::test]
async fn certify_adhoc_execution_and_history_ring() {
    let state = ignite_state("jobs_adhoc").await;
    let registry = state.job_registry.clone();

    // Janitors sobre un ledger vacío: cero trabajo, ejecución limpia.
    let aging_outcome = registry
        .execute_job("stock_aging", state.clone())
        .await
        .expect("stock_aging collapsed");
    assert_eq!(aging_outcome["stockExpired"], 0);

    let reaper_outcome = registry
        .execute_job("exit_ip_reaper", state.clone())
        .await
        .expect("exit_ip_reaper collapsed");
    assert_eq!(reaper_outcome["rowsReaped"], 0);

    let expiry_outcome = registry
        .execute_job("lease_expiry", state.clone())
        .await
        .expect("lease_expiry collapsed");
    assert_eq!(expiry_outcome["leasesReclaimed"], 0);

    // Nombre desconocido: rechazo nominal.
    let unknown_result = registry.execute_job("ghost_job", state.clone()).await;
    assert!(unknown_result.is_err());

    // El snapshot refleja las corridas selladas.
    let snapshot = registry.status_snapshot();
    let jobs = snapshot["jobs"].as_array().expect("jobs array missing");
    assert_eq!(jobs.len(), DEFAULT_JOBS.len());

    let history = snapshot["recentHistory"].as_array().expect("history missing");
    assert!(history.len() >= 3, "three executions must be sealed");
    assert!(history.iter().all(|record| record["success"].as_bool() == Some(true)));

    let aging_entry = jobs
        .iter()
        .find(|job| job["name"] == "stock_aging")
        .expect("stock_aging entry missing");
    assert!(aging_entry["lastRun"].is_string());
    assert!(aging_entry["nextRun"].is_string());

    println!("✅ L4_JOBS: Ad-hoc execution and history ring certified.");
}
