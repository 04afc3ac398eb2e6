// [tests/mirror/libs/infra/db_turso/exit_ip_ledger.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL LEDGER DE IPs DE SALIDA (V1.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA VENTANA DE DEDUPLICACIÓN 24H
 * =================================================================
 */

use chrono::{Duration, Utc};
use kylink_infra_db::repositories::ProxyRepository;
use kylink_infra_db::TursoClient;
use libsql::params;

const OPERATOR: &str = "operator-ledger";
const CAMPAIGN: &str = "333222111";

/**
 * CERTIFICACIÓN: Registro, visibilidad en ventana y purga del ledger.
 */
#[tokio::test]
async fn certify_ledger_window_and_reaper() {
    let client = TursoClient::connect("file:exit_ip_ledger?mode=memory&cache=shared", None)
        .await
        .expect("memory strata ignition failed");

    let proxy_repository = ProxyRepository::new(client.clone());

    // 1. REGISTRO: la IP observada queda descalificada por 24h.
    proxy_repository
        .record_exit_ip_usage(OPERATOR, CAMPAIGN, "203.0.113.50")
        .await
        .expect("ledger write failed");

    let disqualified = proxy_repository
        .used_exit_ips(OPERATOR, CAMPAIGN)
        .await
        .expect("ledger read failed");
    assert!(disqualified.contains("203.0.113.50"));

    // 2. RE-REGISTRO: el triple repetido renueva sin colisión.
    proxy_repository
        .record_exit_ip_usage(OPERATOR, CAMPAIGN, "203.0.113.50")
        .await
        .expect("ledger re-write failed");

    // 3. AISLAMIENTO: otra campaña no hereda la descalificación.
    let other_campaign_set = proxy_repository
        .used_exit_ips(OPERATOR, "999")
        .await
        .expect("isolation read failed");
    assert!(other_campaign_set.is_empty());

    // 4. PURGA: el janitor solo remueve filas vencidas.
    let reaped_fresh = proxy_repository.reap_expired_usage().await.expect("reap failed");
    assert_eq!(reaped_fresh, 0);

    let expired_stamp = (Utc::now() - Duration::hours(1)).to_rfc3339();
    client
        .get_connection()
        .expect("connection failed")
        .execute(
            "UPDATE proxy_exit_ip_usage SET expires_at = ? WHERE exit_ip = ?",
            params![expired_stamp, "203.0.113.50"],
        )
        .await
        .expect("backdating failed");

    let reaped_expired = proxy_repository.reap_expired_usage().await.expect("reap failed");
    assert_eq!(reaped_expired, 1);

    let after_reap = proxy_repository
        .used_exit_ips(OPERATOR, CAMPAIGN)
        .await
        .expect("post-reap read failed");
    assert!(after_reap.is_empty());

    println!("✅ L3_LEDGER: 24h dedup window and reaper certified.");
}

/**
 * CERTIFICACIÓN: Visibilidad de proveedores por asignación de operador.
 */
#[tokio::test]
async fn certify_provider_assignment_visibility() {
    let client = TursoClient::connect("file:provider_visibility?mode=memory&cache=shared", None)
        .await
        .expect("memory strata ignition failed");

    let proxy_repository = ProxyRepository::new(client.clone());

    proxy_repository
        .insert_provider("global", "gate-a.example", 1080, 20, "u-{COUNTRY}", "p", &[])
        .await
        .expect("global provider insert failed");
    proxy_repository
        .insert_provider(
            "private",
            "gate-b.example",
            1080,
            10,
            "u-{COUNTRY}",
            "p",
            &["someone-else".to_string()],
        )
        .await
        .expect("private provider insert failed");

    let visible = proxy_repository
        .providers_for_user(OPERATOR)
        .await
        .expect("visibility query failed");

    // Solo el proveedor global es visible, pese a su menor prioridad.
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].label, "global");

    println!("✅ L3_LEDGER: Provider assignment visibility certified.");
}
