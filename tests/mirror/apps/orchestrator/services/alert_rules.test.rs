// [tests/mirror/apps/orchestrator/services/alert_rules.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE REGLAS DE ALERTA (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LAS CUATRO REGLAS DEL MONITOR
 * =================================================================
 */

use chrono::{Duration, Utc};
use kylink_domain_models::{AlertKind, CampaignMetaPayload, StockAuditAction};
use kylink_infra_db::repositories::{AllocationMode, AllocationRequest, NewStockItem};
use kylink_infra_db::TursoClient;
use kylink_orchestrator::config::RotationConfig;
use kylink_orchestrator::services::AlertEvaluator;
use kylink_orchestrator::state::AppState;
use libsql::params;
use serde_json::json;

const OPERATOR: &str = "operator-alerts";
const CAMPAIGN: &str = "121212121";

async fn ignite_state(database_name: &str) -> AppState {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_name),
        None,
    )
    .await
    .expect("memory strata ignition failed");
    AppState::new(client, RotationConfig::for_tests())
}

async fn emitted_kinds(state: &AppState) -> Vec<AlertKind> {
    state
        .alert_repository
        .list_recent(100)
        .await
        .expect("alert listing failed")
        .into_iter()
        .map(|alert| alert.kind)
        .collect()
}

/**
 * REGLA 1: inventario bajo la marca de agua emite low_stock.
 */
#[tokio::test]
async fn certify_low_stock_rule() {
    let state = ignite_state("alerts_low_stock").await;

    // 1 disponible contra la marca default de 5.
    state
        .stock_repository
        .bulk_insert_available(&[NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: "lone=1".into(),
            exit_ip: None,
            source_affiliate_link_id: "link-a".into(),
        }])
        .await
        .expect("stock seed failed");

    let emitted = AlertEvaluator::new(state.clone())
        .evaluate_all()
        .await
        .expect("evaluation collapsed");
    assert!(emitted >= 1);
    assert!(emitted_kinds(&state).await.contains(&AlertKind::LowStock));

    println!("✅ L4_MONITOR: low_stock rule certified.");
}

/**
 * REGLA 2: el lease arrendado más antiguo supera el umbral de espera.
 */
#[tokio::test]
async fn certify_lease_timeout_rule() {
    let state = ignite_state("alerts_lease_timeout").await;

    state
        .campaign_repository
        .upsert_from_meta(
            OPERATOR,
            CAMPAIGN,
            &CampaignMetaPayload {
                campaign_name: "Timeout".into(),
                country: "PT".into(),
                final_url: "example.pt".into(),
                cid: "1".into(),
                mcc_id: "2".into(),
            },
        )
        .await
        .expect("campaign seed failed");
    state
        .click_state_repository
        .create_state(OPERATOR, CAMPAIGN, 1, Utc::now())
        .await
        .expect("state seed failed");
    state
        .stock_repository
        .bulk_insert_available(&[NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: "t=1".into(),
            exit_ip: None,
            source_affiliate_link_id: "link-t".into(),
        }])
        .await
        .expect("stock seed failed");

    let (waiting_lease, _) = state
        .lease_repository
        .allocate(
            &AllocationRequest {
                user_id: OPERATOR.into(),
                campaign_id: CAMPAIGN.into(),
                idempotency_key: "121212121:1:2".into(),
                now_clicks: 2,
                window_start_epoch_seconds: 1,
            },
            AllocationMode::DeferredAck,
        )
        .await
        .expect("allocation collapsed");

    // Envejecemos el lease 20 minutos.
    state
        .database_client
        .get_connection()
        .expect("connection failed")
        .execute(
            "UPDATE suffix_leases SET leased_at = ? WHERE id = ?",
            params![(Utc::now() - Duration::minutes(20)).to_rfc3339(), waiting_lease.id],
        )
        .await
        .expect("backdating failed");

    AlertEvaluator::new(state.clone())
        .evaluate_all()
        .await
        .expect("evaluation collapsed");
    assert!(emitted_kinds(&state).await.contains(&AlertKind::LeaseTimeout));

    println!("✅ L4_MONITOR: lease_timeout rule certified.");
}

/**
 * REGLA 3: tasa de fallos >= 10% sobre la última hora.
 */
#[tokio::test]
async fn certify_high_failure_rate_rule() {
    let state = ignite_state("alerts_failure_rate").await;

    state
        .campaign_repository
        .upsert_from_meta(
            OPERATOR,
            CAMPAIGN,
            &CampaignMetaPayload {
                campaign_name: "Failure Rate".into(),
                country: "NL".into(),
                final_url: "example.nl".into(),
                cid: "1".into(),
                mcc_id: "2".into(),
            },
        )
        .await
        .expect("campaign seed failed");
    state
        .click_state_repository
        .create_state(OPERATOR, CAMPAIGN, 1, Utc::now())
        .await
        .expect("state seed failed");
    state
        .stock_repository
        .bulk_insert_available(&[NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: "f=1".into(),
            exit_ip: None,
            source_affiliate_link_id: "link-f".into(),
        }])
        .await
        .expect("stock seed failed");

    let (doomed_lease, _) = state
        .lease_repository
        .allocate(
            &AllocationRequest {
                user_id: OPERATOR.into(),
                campaign_id: CAMPAIGN.into(),
                idempotency_key: "121212121:1:9".into(),
                now_clicks: 9,
                window_start_epoch_seconds: 1,
            },
            AllocationMode::DeferredAck,
        )
        .await
        .expect("allocation collapsed");
    state
        .lease_repository
        .ack_failure(&doomed_lease, "synthetic write failure")
        .await
        .expect("failure ack collapsed");

    AlertEvaluator::new(state.clone())
        .evaluate_all()
        .await
        .expect("evaluation collapsed");
    assert!(emitted_kinds(&state).await.contains(&AlertKind::HighFailureRate));

    println!("✅ L4_MONITOR: high_failure_rate rule certified.");
}

/**
 * REGLA 4: diez asignaciones sin inventario en 24h.
 */
#[tokio::test]
async fn certify_no_stock_frequent_rule() {
    let state = ignite_state("alerts_no_stock").await;

    for burst_index in 0..10 {
        state
            .audit_repository
            .record_action(
                OPERATOR,
                CAMPAIGN,
                StockAuditAction::NoStock,
                json!({ "burst": burst_index }),
            )
            .await
            .expect("audit seed failed");
    }

    AlertEvaluator::new(state.clone())
        .evaluate_all()
        .await
        .expect("evaluation collapsed");
    assert!(emitted_kinds(&state).await.contains(&AlertKind::NoStockFrequent));

    println!("✅ L4_MONITOR: no_stock_frequent rule certified.");
}
