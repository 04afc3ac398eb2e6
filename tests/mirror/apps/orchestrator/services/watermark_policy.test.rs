// [tests/mirror/apps/orchestrator/services/watermark_policy.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE MARCA DE AGUA DINÁMICA (V1.3 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL DIMENSIONADO DEL INVENTARIO
 *
 * # Mathematical Proof (Watermark Bounds):
 * C24=0 -> default 5. C24>0 -> clamp(ceil((C24/24)×2), 3, 20): dos
 * horas de buffer a la tasa observada con piso 3 y techo 20.
 * =================================================================
 */

use chrono::Utc;
use kylink_domain_models::{CampaignMetaPayload, ReplenishVerdict};
use kylink_infra_db::repositories::NewStockItem;
use kylink_infra_db::TursoClient;
use kylink_orchestrator::config::RotationConfig;
use kylink_orchestrator::services::StockProducer;
use kylink_orchestrator::state::AppState;
use libsql::params;

const OPERATOR: &str = "operator-watermark";
const CAMPAIGN: &str = "777888999";

async fn ignite_state(database_name: &str) -> AppState {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_name),
        None,
    )
    .await
    .expect("memory strata ignition failed");
    AppState::new(client, RotationConfig::for_tests())
}

/// Siembra N items consumidos dentro de la ventana de 24h.
async fn seed_consumed_in_window(state: &AppState, consumed_count: usize) {
    let items: Vec<NewStockItem> = (0..consumed_count)
        .map(|index| NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: format!("w={}", index),
            exit_ip: None,
            source_affiliate_link_id: "link-w".into(),
        })
        .collect();
    state
        .stock_repository
        .bulk_insert_available(&items)
        .await
        .expect("window seed failed");

    state
        .database_client
        .get_connection()
        .expect("connection failed")
        .execute(
            "UPDATE suffix_stock_items SET status = 'consumed', consumed_at = ? \
             WHERE user_id = ? AND campaign_id = ?",
            params![Utc::now().to_rfc3339(), OPERATOR, CAMPAIGN],
        )
        .await
        .expect("consumption surgery failed");
}

/**
 * CERTIFICACIÓN: Default, piso y techo de la marca de agua.
 */
#[tokio::test]
async fn certify_watermark_bounds() {
    // C24 == 0 -> default 5.
    let cold_state = ignite_state("watermark_cold").await;
    let cold_producer = StockProducer::new(cold_state.clone());
    assert_eq!(cold_producer.dynamic_watermark(OPERATOR, CAMPAIGN).await, 5);

    // C24 == 24 -> ceil(1 × 2) = 2 -> piso 3.
    let floor_state = ignite_state("watermark_floor").await;
    seed_consumed_in_window(&floor_state, 24).await;
    let floor_producer = StockProducer::new(floor_state.clone());
    assert_eq!(floor_producer.dynamic_watermark(OPERATOR, CAMPAIGN).await, 3);

    // C24 == 120 -> ceil(5 × 2) = 10 dentro de los límites.
    let mid_state = ignite_state("watermark_mid").await;
    seed_consumed_in_window(&mid_state, 120).await;
    let mid_producer = StockProducer::new(mid_state.clone());
    assert_eq!(mid_producer.dynamic_watermark(OPERATOR, CAMPAIGN).await, 10);

    // C24 == 600 -> ceil(25 × 2) = 50 -> techo 20.
    let hot_state = ignite_state("watermark_hot").await;
    seed_consumed_in_window(&hot_state, 600).await;
    let hot_producer = StockProducer::new(hot_state.clone());
    assert_eq!(hot_producer.dynamic_watermark(OPERATOR, CAMPAIGN).await, 20);

    println!("✅ L2_PRODUCER: Watermark bounds certified.");
}

/**
 * CERTIFICACIÓN: Inventario sobre la marca -> reposición omitida;
 * inventario vacío con modo mock -> acuñación del lote mínimo.
 */
#[tokio::test]
async fn certify_replenish_skip_and_mock_floor() {
    let state = ignite_state("watermark_replenish").await;

    state
        .campaign_repository
        .upsert_from_meta(
            OPERATOR,
            CAMPAIGN,
            &CampaignMetaPayload {
                campaign_name: "Watermark".into(),
                country: "IT".into(),
                final_url: "example.it".into(),
                cid: "1".into(),
                mcc_id: "2".into(),
            },
        )
        .await
        .expect("campaign seed failed");
    state
        .campaign_repository
        .insert_affiliate_link(OPERATOR, CAMPAIGN, "https://aff.example.net/o?x=1", 5)
        .await
        .expect("link seed failed");

    // Fase 1: 6 disponibles >= marca 5 -> skipped.
    let surplus: Vec<NewStockItem> = (0..6)
        .map(|index| NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: format!("s={}", index),
            exit_ip: None,
            source_affiliate_link_id: "link-w".into(),
        })
        .collect();
    state
        .stock_repository
        .bulk_insert_available(&surplus)
        .await
        .expect("surplus seed failed");

    let producer = StockProducer::new(state.clone());
    let skip_report = producer
        .replenish_campaign(OPERATOR, CAMPAIGN, false)
        .await
        .expect("skip pass collapsed");
    assert_eq!(skip_report.verdict, ReplenishVerdict::Skipped);
    assert_eq!(skip_report.available_before, 6);

    // Fase 2: forzada sin proxies -> el modo mock acuña el lote mínimo.
    let forced_report = producer
        .replenish_campaign(OPERATOR, CAMPAIGN, true)
        .await
        .expect("forced pass collapsed");
    assert_eq!(forced_report.verdict, ReplenishVerdict::Produced);
    assert!(forced_report.produced_count >= 10, "mock batch floor expected");

    let available_after = state
        .stock_repository
        .count_available(OPERATOR, CAMPAIGN)
        .await
        .expect("count failed");
    assert!(available_after >= 16);

    println!("✅ L2_PRODUCER: Replenish skip + mock floor certified.");
}
