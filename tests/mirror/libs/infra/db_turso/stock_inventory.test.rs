// [tests/mirror/libs/infra/db_turso/stock_inventory.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE INVENTARIO DE SUFIJOS (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE CONTEOS, VENTANAS Y ENVEJECIMIENTO
 * =================================================================
 */

use chrono::{Duration, Utc};
use kylink_infra_db::repositories::{NewStockItem, StockRepository};
use kylink_infra_db::TursoClient;
use libsql::params;

const OPERATOR: &str = "operator-stock";
const CAMPAIGN: &str = "111222333";

fn fresh_item(suffix: &str) -> NewStockItem {
    NewStockItem {
        user_id: OPERATOR.into(),
        campaign_id: CAMPAIGN.into(),
        suffix: suffix.into(),
        exit_ip: Some("198.51.100.7".into()),
        source_affiliate_link_id: "link-3".into(),
    }
}

/**
 * CERTIFICACIÓN: Inserción masiva, conteos, envejecimiento y niveles.
 */
#[tokio::test]
async fn certify_inventory_counts_and_aging() {
    let client = TursoClient::connect("file:stock_inventory?mode=memory&cache=shared", None)
        .await
        .expect("memory strata ignition failed");

    let stock_repository = StockRepository::new(client.clone());

    let inserted = stock_repository
        .bulk_insert_available(&[fresh_item("a=1"), fresh_item("b=2"), fresh_item("c=3")])
        .await
        .expect("bulk insert failed");
    assert_eq!(inserted, 3);
    assert_eq!(
        stock_repository.count_available(OPERATOR, CAMPAIGN).await.expect("count failed"),
        3
    );

    // Un item se envejece quirúrgicamente más allá del TTL de 48h.
    let aged_stamp = (Utc::now() - Duration::hours(49)).to_rfc3339();
    client
        .get_connection()
        .expect("connection failed")
        .execute(
            "UPDATE suffix_stock_items SET created_at = ? WHERE suffix = 'a=1'",
            params![aged_stamp],
        )
        .await
        .expect("backdating failed");

    let expired = stock_repository.expire_aged(48).await.expect("aging sweep failed");
    assert_eq!(expired, 1);
    assert_eq!(
        stock_repository.count_available(OPERATOR, CAMPAIGN).await.expect("count failed"),
        2
    );

    // El barrido es idempotente sobre el mismo horizonte.
    let second_sweep = stock_repository.expire_aged(48).await.expect("second sweep failed");
    assert_eq!(second_sweep, 0);

    // Niveles agrupados para el monitor.
    let levels = stock_repository.available_levels().await.expect("levels query failed");
    assert!(levels
        .iter()
        .any(|(user, campaign, count)| user == OPERATOR && campaign == CAMPAIGN && *count == 2));

    println!("✅ L3_STOCK: Inventory counts and aging certified.");
}

/**
 * CERTIFICACIÓN: La ventana de consumo alimenta la marca de agua.
 */
#[tokio::test]
async fn certify_consumed_window_counting() {
    let client = TursoClient::connect("file:stock_window?mode=memory&cache=shared", None)
        .await
        .expect("memory strata ignition failed");

    let stock_repository = StockRepository::new(client.clone());
    stock_repository
        .bulk_insert_available(&[fresh_item("w=1"), fresh_item("w=2")])
        .await
        .expect("bulk insert failed");

    let connection = client.get_connection().expect("connection failed");

    // Un consumo dentro de la ventana y otro fuera de ella.
    connection
        .execute(
            "UPDATE suffix_stock_items SET status = 'consumed', consumed_at = ? WHERE suffix = 'w=1'",
            params![Utc::now().to_rfc3339()],
        )
        .await
        .expect("in-window consume failed");
    connection
        .execute(
            "UPDATE suffix_stock_items SET status = 'consumed', consumed_at = ? WHERE suffix = 'w=2'",
            params![(Utc::now() - Duration::hours(30)).to_rfc3339()],
        )
        .await
        .expect("out-of-window consume failed");

    let consumed_24h = stock_repository
        .consumed_in_window(OPERATOR, CAMPAIGN, 24)
        .await
        .expect("window count failed");
    assert_eq!(consumed_24h, 1);

    println!("✅ L3_STOCK: Consumption window certified.");
}
