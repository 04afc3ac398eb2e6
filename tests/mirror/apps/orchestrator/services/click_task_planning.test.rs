// [tests/mirror/apps/orchestrator/services/click_task_planning.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE TAREAS DE CLICKS (V1.3 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE PLANIFICACIÓN, DESPACHO Y CANCELACIÓN
 * =================================================================
 */

use chrono::{Duration, NaiveDate, Utc};
use kylink_core_pacing::plan_click_schedule;
use kylink_domain_models::{ClickItemStatus, ClickTaskStatus};
use kylink_infra_db::repositories::ClickTaskRepository;
use kylink_infra_db::{DbError, TursoClient};

const OPERATOR: &str = "operator-clicks";
const CAMPAIGN: &str = "606060606";

async fn ignite_repository(database_name: &str) -> (TursoClient, ClickTaskRepository) {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_name),
        None,
    )
    .await
    .expect("memory strata ignition failed");
    (client.clone(), ClickTaskRepository::new(client))
}

/**
 * CERTIFICACIÓN: La planificación diurna entrega exactamente N marcas
 * ordenadas dentro del día restante.
 */
#[test]
fn certify_diurnal_plan_cardinality() {
    let from = NaiveDate::from_ymd_opt(2026, 3, 14)
        .unwrap()
        .and_hms_opt(10, 15, 0)
        .unwrap();

    for click_count in [1u32, 7, 25, 120] {
        let schedule = plan_click_schedule(click_count, from);
        assert_eq!(schedule.len(), click_count as usize);
        for window in schedule.windows(2) {
            assert!(window[0] <= window[1]);
        }
    }

    println!("✅ L2_CLICKS: Diurnal plan cardinality certified.");
}

/**
 * CERTIFICACIÓN: Despacho en orden scheduled_at, captura condicional
 * y finalización de la tarea drenada.
 */
#[tokio::test]
async fn certify_due_dispatch_and_finalization() {
    let (_client, repository) = ignite_repository("click_dispatch").await;

    // Dos items vencidos y uno futuro.
    let schedule = vec![
        Utc::now() - Duration::minutes(10),
        Utc::now() - Duration::minutes(5),
        Utc::now() + Duration::hours(2),
    ];
    let task = repository
        .create_task_with_schedule(OPERATOR, CAMPAIGN, &schedule)
        .await
        .expect("task creation collapsed");
    assert_eq!(task.status, ClickTaskStatus::Running);
    assert_eq!(task.target_clicks, 3);

    let due = repository.due_items(20).await.expect("due query failed");
    assert_eq!(due.len(), 2, "only overdue items are dispatched");
    assert!(due[0].scheduled_at <= due[1].scheduled_at);

    // Captura condicional: la segunda toma del mismo item pierde.
    assert!(repository.mark_item_executing(&due[0].item_id).await.expect("claim failed"));
    assert!(!repository.mark_item_executing(&due[0].item_id).await.expect("re-claim failed"));

    // Resultado de ejecución + contadores agregados.
    repository
        .record_item_outcome(&due[0].item_id, &task.id, true, Some("198.51.100.9"), None, 4200)
        .await
        .expect("outcome seal failed");
    repository
        .record_item_outcome(&due[1].item_id, &task.id, false, None, Some("TIMEOUT: wall"), 9000)
        .await
        .expect("outcome seal failed");

    let refreshed = repository
        .get_task(OPERATOR, &task.id)
        .await
        .expect("task query failed")
        .expect("task vanished");
    assert_eq!(refreshed.completed_clicks, 1);
    assert_eq!(refreshed.failed_clicks, 1);

    // Con un item futuro pendiente la tarea sigue abierta.
    assert!(repository.task_has_open_items(&task.id).await.expect("open query failed"));

    println!("✅ L2_CLICKS: Due dispatch and counters certified.");
}

/**
 * CERTIFICACIÓN: La cancelación voltea los pendientes y es terminal.
 */
#[tokio::test]
async fn certify_cancellation_semantics() {
    let (_client, repository) = ignite_repository("click_cancel").await;

    let schedule = vec![
        Utc::now() + Duration::hours(1),
        Utc::now() + Duration::hours(2),
        Utc::now() + Duration::hours(3),
    ];
    let task = repository
        .create_task_with_schedule(OPERATOR, CAMPAIGN, &schedule)
        .await
        .expect("task creation collapsed");

    let cancelled = repository
        .cancel_task(OPERATOR, &task.id)
        .await
        .expect("cancellation collapsed");
    assert_eq!(cancelled.status, ClickTaskStatus::Cancelled);

    let items = repository.task_items(&task.id).await.expect("items query failed");
    assert!(items.iter().all(|item| item.status == ClickItemStatus::Cancelled));

    // Los items cancelados jamás vuelven al despacho.
    let due = repository.due_items(20).await.expect("due query failed");
    assert!(due.is_empty());

    // La cancelación repetida es una transición inválida.
    let second_cancel = repository.cancel_task(OPERATOR, &task.id).await;
    assert!(matches!(second_cancel, Err(DbError::InvalidTaskState)));

    println!("✅ L2_CLICKS: Cancellation semantics certified.");
}
