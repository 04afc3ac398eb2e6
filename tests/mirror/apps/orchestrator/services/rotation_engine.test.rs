// [tests/mirror/apps/orchestrator/services/rotation_engine.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL MOTOR DE ROTACIÓN (V1.4 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE ESCENARIOS EXTREMO A EXTREMO
 *
 * # Logic:
 * Certifica los escenarios canónicos del motor: replay idempotente,
 * camino feliz con ack, reciclaje por ack fallido, PENDING_IMPORT y
 * NO_STOCK, bajo ambas políticas de compromiso.
 * =================================================================
 */

use chrono::Utc;
use kylink_domain_models::{
    AckRequest, CampaignMetaPayload, LeaseRequest, LeaseResponse, StockStatus,
};
use kylink_infra_db::repositories::{AllocationMode, NewStockItem};
use kylink_infra_db::TursoClient;
use kylink_orchestrator::config::RotationConfig;
use kylink_orchestrator::services::LeaseEngine;
use kylink_orchestrator::state::AppState;

const OPERATOR: &str = "operator-engine";
const CAMPAIGN: &str = "987654321";

async fn ignite_state(database_name: &str, mode: AllocationMode) -> AppState {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_name),
        None,
    )
    .await
    .expect("memory strata ignition failed");

    let mut config = RotationConfig::for_tests();
    config.lease_commit_policy = mode;
    AppState::new(client, config)
}

fn campaign_meta() -> CampaignMetaPayload {
    CampaignMetaPayload {
        campaign_name: "Engine Scenarios".into(),
        country: "ES".into(),
        final_url: "example.com".into(),
        cid: "111".into(),
        mcc_id: "222".into(),
    }
}

async fn seed_rotation_bed(state: &AppState, applied_clicks: i64, suffixes: &[&str]) {
    state
        .campaign_repository
        .upsert_from_meta(OPERATOR, CAMPAIGN, &campaign_meta())
        .await
        .expect("campaign seed failed");

    state
        .click_state_repository
        .create_state(OPERATOR, CAMPAIGN, applied_clicks, Utc::now())
        .await
        .expect("state seed failed");
    state
        .click_state_repository
        .bump_applied_clicks_monotone(OPERATOR, CAMPAIGN, applied_clicks)
        .await
        .expect("applied seed failed");

    let items: Vec<NewStockItem> = suffixes
        .iter()
        .map(|suffix| NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: suffix.to_string(),
            exit_ip: None,
            source_affiliate_link_id: "link-1".into(),
        })
        .collect();
    if !items.is_empty() {
        state
            .stock_repository
            .bulk_insert_available(&items)
            .await
            .expect("stock seed failed");
    }
}

fn lease_request(key: &str, clicks: i64) -> LeaseRequest {
    LeaseRequest {
        campaign_id: CAMPAIGN.into(),
        now_clicks: clicks,
        observed_at: Utc::now(),
        window_start_epoch_seconds: 1_773_980_000,
        idempotency_key: key.into(),
        meta: None,
    }
}

/**
 * ESCENARIO S1: sin avance del contador, la política diferida responde
 * NOOP y la re-invocación es idéntica sin consumir inventario.
 */
#[tokio::test]
async fn certify_noop_without_click_advance() {
    let state = ignite_state("engine_noop", AllocationMode::DeferredAck).await;
    seed_rotation_bed(&state, 100, &["gclid=idle"]).await;

    let engine = LeaseEngine::new(state.clone());
    let request = lease_request("987654321:1:100", 100);

    for _ in 0..2 {
        match engine.lease(OPERATOR, &request).await.expect("lease collapsed") {
            LeaseResponse::Noop { action, .. } => assert_eq!(action, "NOOP"),
            other => panic!("expected NOOP, observed {:?}", other),
        }
    }

    let available = state
        .stock_repository
        .count_available(OPERATOR, CAMPAIGN)
        .await
        .expect("count failed");
    assert_eq!(available, 1, "NOOP must not touch inventory");

    println!("✅ L2_ENGINE: S1 NOOP-by-no-advance certified.");
}

/**
 * ESCENARIO S1-bis: bajo compromiso inmediato la re-invocación con la
 * misma clave colapsa en el mismo lease.
 */
#[tokio::test]
async fn certify_idempotent_replay_under_immediate_commit() {
    let state = ignite_state("engine_replay", AllocationMode::ImmediateCommit).await;
    seed_rotation_bed(&state, 100, &["gclid=one", "gclid=two"]).await;

    let engine = LeaseEngine::new(state.clone());
    let request = lease_request("987654321:1:101", 101);

    let first = engine.lease(OPERATOR, &request).await.expect("first lease collapsed");
    let second = engine.lease(OPERATOR, &request).await.expect("replay collapsed");

    let (first_id, first_suffix) = match first {
        LeaseResponse::Apply { lease_id, final_url_suffix, .. } => (lease_id, final_url_suffix),
        other => panic!("expected APPLY, observed {:?}", other),
    };
    let (second_id, second_suffix, second_reason) = match second {
        LeaseResponse::Apply { lease_id, final_url_suffix, reason, .. } => {
            (lease_id, final_url_suffix, reason)
        }
        other => panic!("expected APPLY replay, observed {:?}", other),
    };

    assert_eq!(first_id, second_id);
    assert_eq!(first_suffix, second_suffix);
    assert_eq!(second_reason, "idempotent_replay");

    let available = state
        .stock_repository
        .count_available(OPERATOR, CAMPAIGN)
        .await
        .expect("count failed");
    assert_eq!(available, 1, "replay must not consume a second item");

    println!("✅ L2_ENGINE: Idempotent replay certified.");
}

/**
 * ESCENARIO S2 + S3: camino feliz con ack y reciclaje por ack fallido.
 */
#[tokio::test]
async fn certify_happy_path_and_failed_ack_recycle() {
    let state = ignite_state("engine_s2_s3", AllocationMode::DeferredAck).await;
    seed_rotation_bed(&state, 100, &["gclid=x", "gclid=y"]).await;

    let engine = LeaseEngine::new(state.clone());

    // --- S2: APPLY + ack exitoso ---
    let apply = engine
        .lease(OPERATOR, &lease_request("987654321:1:101", 101))
        .await
        .expect("lease collapsed");
    let (lease_id, suffix) = match apply {
        LeaseResponse::Apply { lease_id, final_url_suffix, .. } => (lease_id, final_url_suffix),
        other => panic!("expected APPLY, observed {:?}", other),
    };
    assert_eq!(suffix, "gclid=x", "oldest available item wins");

    let ack = engine
        .ack(
            OPERATOR,
            &AckRequest {
                lease_id: lease_id.clone(),
                campaign_id: CAMPAIGN.into(),
                applied: true,
                applied_at: Utc::now(),
                error_message: None,
            },
        )
        .await
        .expect("ack collapsed");
    assert!(ack.ok);

    let state_after_s2 = state
        .click_state_repository
        .get_state(OPERATOR, CAMPAIGN)
        .await
        .expect("state query failed")
        .expect("state vanished");
    assert_eq!(state_after_s2.last_applied_clicks, 101);

    // Ack repetido: idempotente con estado previo.
    let replay_ack = engine
        .ack(
            OPERATOR,
            &AckRequest {
                lease_id,
                campaign_id: CAMPAIGN.into(),
                applied: true,
                applied_at: Utc::now(),
                error_message: None,
            },
        )
        .await
        .expect("ack replay collapsed");
    assert_eq!(replay_ack.previous_status.as_deref(), Some("consumed"));

    // --- S3: ack fallido recicla ---
    let second_apply = engine
        .lease(OPERATOR, &lease_request("987654321:1:102", 102))
        .await
        .expect("second lease collapsed");
    let second_lease_id = match second_apply {
        LeaseResponse::Apply { lease_id, final_url_suffix, .. } => {
            assert_eq!(final_url_suffix, "gclid=y");
            lease_id
        }
        other => panic!("expected APPLY, observed {:?}", other),
    };

    engine
        .ack(
            OPERATOR,
            &AckRequest {
                lease_id: second_lease_id.clone(),
                campaign_id: CAMPAIGN.into(),
                applied: false,
                applied_at: Utc::now(),
                error_message: Some("write denied".into()),
            },
        )
        .await
        .expect("failure ack collapsed");

    let recycled_lease = state
        .lease_repository
        .find_lease(OPERATOR, CAMPAIGN, &second_lease_id)
        .await
        .expect("lease query failed")
        .expect("lease vanished");
    let recycled_item = state
        .stock_repository
        .find_item(&recycled_lease.stock_item_id)
        .await
        .expect("stock query failed")
        .expect("stock vanished");
    assert_eq!(recycled_item.status, StockStatus::Available);

    let final_state = state
        .click_state_repository
        .get_state(OPERATOR, CAMPAIGN)
        .await
        .expect("state query failed")
        .expect("state vanished");
    assert_eq!(final_state.last_applied_clicks, 101, "failed ack must not bump");

    println!("✅ L2_ENGINE: S2 happy path + S3 recycle certified.");
}

/**
 * ESCENARIO: campaña desconocida sin metadatos -> PENDING_IMPORT;
 * con metadatos -> registro perezoso y NO_STOCK sobre inventario vacío.
 */
#[tokio::test]
async fn certify_pending_import_and_no_stock() {
    let state = ignite_state("engine_declines", AllocationMode::ImmediateCommit).await;
    let engine = LeaseEngine::new(state.clone());

    let bare_request = lease_request("987654321:1:5", 5);
    match engine.lease(OPERATOR, &bare_request).await.expect("lease collapsed") {
        LeaseResponse::Declined { code, .. } => assert_eq!(code, "PENDING_IMPORT"),
        other => panic!("expected PENDING_IMPORT, observed {:?}", other),
    }

    let mut meta_request = lease_request("987654321:1:6", 6);
    meta_request.meta = Some(campaign_meta());
    match engine.lease(OPERATOR, &meta_request).await.expect("lease collapsed") {
        LeaseResponse::Declined { code, .. } => assert_eq!(code, "NO_STOCK"),
        other => panic!("expected NO_STOCK, observed {:?}", other),
    }

    // El upsert perezoso dejó la campaña registrada.
    let registered = state
        .campaign_repository
        .find_campaign(OPERATOR, CAMPAIGN)
        .await
        .expect("campaign query failed");
    assert!(registered.is_some());

    println!("✅ L2_ENGINE: PENDING_IMPORT + NO_STOCK certified.");
}
