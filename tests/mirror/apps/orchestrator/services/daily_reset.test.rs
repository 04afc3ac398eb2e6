// [tests/mirror/apps/orchestrator/services/daily_reset.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE REINICIO DIARIO (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL ESCENARIO DE CAMBIO DE DÍA
 *
 * # Logic:
 * Un contador observado menor al aplicado, visto en un día calendario
 * distinto, significa que Google Ads reinició el contador: el estado
 * se reinicia a 0 y la asignación procede. El mismo descenso dentro
 * del mismo día NO reinicia.
 * =================================================================
 */

use chrono::{Duration, Utc};
use kylink_domain_models::{CampaignMetaPayload, LeaseRequest, LeaseResponse};
use kylink_infra_db::repositories::{AllocationMode, NewStockItem};
use kylink_infra_db::TursoClient;
use kylink_orchestrator::config::RotationConfig;
use kylink_orchestrator::services::LeaseEngine;
use kylink_orchestrator::state::AppState;

const OPERATOR: &str = "operator-reset";
const CAMPAIGN: &str = "444555666";

async fn ignite_state(database_name: &str) -> AppState {
    let client = TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_name),
        None,
    )
    .await
    .expect("memory strata ignition failed");

    let mut config = RotationConfig::for_tests();
    config.lease_commit_policy = AllocationMode::ImmediateCommit;
    AppState::new(client, config)
}

async fn seed_yesterday_state(state: &AppState, applied_clicks: i64) {
    state
        .campaign_repository
        .upsert_from_meta(
            OPERATOR,
            CAMPAIGN,
            &CampaignMetaPayload {
                campaign_name: "Daily Reset".into(),
                country: "FR".into(),
                final_url: "example.fr".into(),
                cid: "1".into(),
                mcc_id: "2".into(),
            },
        )
        .await
        .expect("campaign seed failed");

    // La última observación quedó sellada AYER.
    state
        .click_state_repository
        .create_state(OPERATOR, CAMPAIGN, applied_clicks, Utc::now() - Duration::days(1))
        .await
        .expect("state seed failed");
    state
        .click_state_repository
        .bump_applied_clicks_monotone(OPERATOR, CAMPAIGN, applied_clicks)
        .await
        .expect("applied seed failed");

    state
        .stock_repository
        .bulk_insert_available(&[NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: "gclid=dawn".into(),
            exit_ip: None,
            source_affiliate_link_id: "link-7".into(),
        }])
        .await
        .expect("stock seed failed");
}

/**
 * ESCENARIO S6: 500 clicks ayer, 3 clicks hoy -> reinicio y asignación.
 */
#[tokio::test]
async fn certify_new_day_resets_applied_counter() {
    let state = ignite_state("daily_reset_new_day").await;
    seed_yesterday_state(&state, 500).await;

    let engine = LeaseEngine::new(state.clone());
    let response = engine
        .lease(
            OPERATOR,
            &LeaseRequest {
                campaign_id: CAMPAIGN.into(),
                now_clicks: 3,
                observed_at: Utc::now(),
                window_start_epoch_seconds: 1_774_000_000,
                idempotency_key: "444555666:1774000000:3".into(),
                meta: None,
            },
        )
        .await
        .expect("lease collapsed");

    assert!(
        matches!(response, LeaseResponse::Apply { .. }),
        "new-day observation must allocate"
    );

    let click_state = state
        .click_state_repository
        .get_state(OPERATOR, CAMPAIGN)
        .await
        .expect("state query failed")
        .expect("state vanished");

    // Reinicio a 0 y avance monótono hasta la observación nueva.
    assert_eq!(click_state.last_applied_clicks, 3);
    assert_eq!(click_state.last_observed_clicks, 3);

    println!("✅ L2_ENGINE: S6 daily reset certified.");
}

/**
 * CONTROL: un descenso dentro del MISMO día no reinicia el contador.
 */
#[tokio::test]
async fn certify_same_day_regression_does_not_reset() {
    let state = ignite_state("daily_reset_same_day").await;

    state
        .campaign_repository
        .upsert_from_meta(
            OPERATOR,
            CAMPAIGN,
            &CampaignMetaPayload {
                campaign_name: "Same Day".into(),
                country: "FR".into(),
                final_url: "example.fr".into(),
                cid: "1".into(),
                mcc_id: "2".into(),
            },
        )
        .await
        .expect("campaign seed failed");

    // Observación previa HOY con 500 aplicados.
    state
        .click_state_repository
        .create_state(OPERATOR, CAMPAIGN, 500, Utc::now())
        .await
        .expect("state seed failed");
    state
        .click_state_repository
        .bump_applied_clicks_monotone(OPERATOR, CAMPAIGN, 500)
        .await
        .expect("applied seed failed");

    let engine = LeaseEngine::new(state.clone());
    let _ = engine
        .lease(
            OPERATOR,
            &LeaseRequest {
                campaign_id: CAMPAIGN.into(),
                now_clicks: 3,
                observed_at: Utc::now(),
                window_start_epoch_seconds: 1_774_000_000,
                idempotency_key: "444555666:1774000000:3b".into(),
                meta: None,
            },
        )
        .await
        .expect("lease collapsed");

    let click_state = state
        .click_state_repository
        .get_state(OPERATOR, CAMPAIGN)
        .await
        .expect("state query failed")
        .expect("state vanished");

    // El aplicado conserva el supremo intra-día.
    assert_eq!(click_state.last_applied_clicks, 500);

    println!("✅ L2_ENGINE: Same-day regression guard certified.");
}
