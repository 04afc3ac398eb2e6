// [tests/mirror/libs/infra/db_turso/lease_lifecycle.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CICLO DE VIDA DE LEASES (V1.3 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE TRANSACCIONES ACID DEL MOTOR DE LEASES
 *
 * # Mathematical Proof (ACID Lease Lifecycle):
 * El test certifica que la asignación captura el item más antiguo con
 * un claim condicional, que la clave idempotente colapsa reintentos y
 * que el ack fallido recicla el item sin retroceder el contador.
 * =================================================================
 */

use chrono::Utc;
use kylink_domain_models::{CampaignMetaPayload, LeaseStatus, StockStatus};
use kylink_infra_db::repositories::{
    AllocationMode, AllocationRequest, CampaignRepository, ClickStateRepository,
    LeaseRepository, NewStockItem, StockRepository,
};
use kylink_infra_db::{DbError, TursoClient};

const OPERATOR: &str = "operator-lease";
const CAMPAIGN: &str = "987654321";

async fn ignite_proving_grounds(database_name: &str) -> TursoClient {
    TursoClient::connect(
        &format!("file:{}?mode=memory&cache=shared", database_name),
        None,
    )
    .await
    .expect("CRITICAL_FAULT: memory strata ignition failed")
}

async fn seed_campaign_and_state(client: &TursoClient, applied_clicks: i64) {
    let campaign_repository = CampaignRepository::new(client.clone());
    campaign_repository
        .upsert_from_meta(
            OPERATOR,
            CAMPAIGN,
            &CampaignMetaPayload {
                campaign_name: "Lease Lifecycle".into(),
                country: "ES".into(),
                final_url: "example.com".into(),
                cid: "1".into(),
                mcc_id: "2".into(),
            },
        )
        .await
        .expect("campaign seed failed");

    let click_state_repository = ClickStateRepository::new(client.clone());
    click_state_repository
        .create_state(OPERATOR, CAMPAIGN, applied_clicks, Utc::now())
        .await
        .expect("click state seed failed");
    click_state_repository
        .bump_applied_clicks_monotone(OPERATOR, CAMPAIGN, applied_clicks)
        .await
        .expect("applied seed failed");
}

fn stock_item(suffix: &str) -> NewStockItem {
    NewStockItem {
        user_id: OPERATOR.into(),
        campaign_id: CAMPAIGN.into(),
        suffix: suffix.into(),
        exit_ip: Some("203.0.113.10".into()),
        source_affiliate_link_id: "link-1".into(),
    }
}

fn allocation(key: &str, clicks: i64) -> AllocationRequest {
    AllocationRequest {
        user_id: OPERATOR.into(),
        campaign_id: CAMPAIGN.into(),
        idempotency_key: key.into(),
        now_clicks: clicks,
        window_start_epoch_seconds: 1_773_980_000,
    }
}

/**
 * CERTIFICACIÓN: Asignación inmediata consume el item y avanza el contador.
 */
#[tokio::test]
async fn certify_immediate_allocation_commits_lease_and_stock() {
    let client = ignite_proving_grounds("lease_immediate").await;
    seed_campaign_and_state(&client, 100).await;

    let stock_repository = StockRepository::new(client.clone());
    stock_repository
        .bulk_insert_available(&[stock_item("gclid=x")])
        .await
        .expect("stock seed failed");

    let lease_repository = LeaseRepository::new(client.clone());
    let (sealed_lease, suffix) = lease_repository
        .allocate(&allocation("987654321:1773980000:101", 101), AllocationMode::ImmediateCommit)
        .await
        .expect("allocation collapsed");

    assert_eq!(suffix, "gclid=x");
    assert_eq!(sealed_lease.status, LeaseStatus::Consumed);
    assert!(sealed_lease.applied);

    let stock_after = stock_repository
        .find_item(&sealed_lease.stock_item_id)
        .await
        .expect("stock query failed")
        .expect("stock item vanished");
    assert_eq!(stock_after.status, StockStatus::Consumed);

    let click_state = ClickStateRepository::new(client.clone())
        .get_state(OPERATOR, CAMPAIGN)
        .await
        .expect("state query failed")
        .expect("state vanished");
    assert_eq!(click_state.last_applied_clicks, 101);

    println!("✅ L3_LEASE: Immediate commit lifecycle certified.");
}

/**
 * CERTIFICACIÓN: La clave idempotente colapsa la segunda asignación.
 */
#[tokio::test]
async fn certify_idempotency_key_collapses_retry() {
    let client = ignite_proving_grounds("lease_idempotent").await;
    seed_campaign_and_state(&client, 100).await;

    let stock_repository = StockRepository::new(client.clone());
    stock_repository
        .bulk_insert_available(&[stock_item("gclid=a"), stock_item("gclid=b")])
        .await
        .expect("stock seed failed");

    let lease_repository = LeaseRepository::new(client.clone());
    let request = allocation("987654321:1773980000:101", 101);

    let (first_lease, _) = lease_repository
        .allocate(&request, AllocationMode::ImmediateCommit)
        .await
        .expect("first allocation collapsed");

    // El reintento con la misma clave golpea el índice único.
    let retry_result = lease_repository
        .allocate(&request, AllocationMode::ImmediateCommit)
        .await;
    assert!(matches!(retry_result, Err(DbError::AllocationConflict)));

    // El cortocircuito devuelve el lease original con su sufijo unido.
    let (replayed_lease, replayed_suffix) = lease_repository
        .find_by_idempotency_key(OPERATOR, &request.idempotency_key)
        .await
        .expect("replay query failed")
        .expect("replay row missing");
    assert_eq!(replayed_lease.id, first_lease.id);
    assert_eq!(replayed_suffix.as_deref(), Some("gclid=a"));

    // El inventario solo perdió un item.
    let remaining = stock_repository
        .count_available(OPERATOR, CAMPAIGN)
        .await
        .expect("count failed");
    assert_eq!(remaining, 1);

    println!("✅ L3_LEASE: Idempotency collapse certified.");
}

/**
 * CERTIFICACIÓN: Ciclo diferido con ack exitoso y ack fallido reciclado.
 */
#[tokio::test]
async fn certify_deferred_ack_success_and_recycle() {
    let client = ignite_proving_grounds("lease_deferred").await;
    seed_campaign_and_state(&client, 100).await;

    let stock_repository = StockRepository::new(client.clone());
    stock_repository
        .bulk_insert_available(&[stock_item("gclid=s2"), stock_item("gclid=s3")])
        .await
        .expect("stock seed failed");

    let lease_repository = LeaseRepository::new(client.clone());

    // --- FASE 1: ack exitoso sella lease + stock + contador ---
    let (leased, _) = lease_repository
        .allocate(&allocation("987654321:1773980000:101", 101), AllocationMode::DeferredAck)
        .await
        .expect("deferred allocation collapsed");
    assert_eq!(leased.status, LeaseStatus::Leased);
    assert!(!leased.applied);

    lease_repository.ack_success(&leased).await.expect("ack collapsed");

    let after_ack = lease_repository
        .find_lease(OPERATOR, CAMPAIGN, &leased.id)
        .await
        .expect("lease query failed")
        .expect("lease vanished");
    assert_eq!(after_ack.status, LeaseStatus::Consumed);

    let click_state = ClickStateRepository::new(client.clone())
        .get_state(OPERATOR, CAMPAIGN)
        .await
        .expect("state query failed")
        .expect("state vanished");
    assert_eq!(click_state.last_applied_clicks, 101);

    // --- FASE 2: ack fallido recicla el item sin retroceder el contador ---
    let (second_lease, _) = lease_repository
        .allocate(&allocation("987654321:1773980000:102", 102), AllocationMode::DeferredAck)
        .await
        .expect("second allocation collapsed");

    lease_repository
        .ack_failure(&second_lease, "write denied")
        .await
        .expect("failure ack collapsed");

    let failed_lease = lease_repository
        .find_lease(OPERATOR, CAMPAIGN, &second_lease.id)
        .await
        .expect("lease query failed")
        .expect("lease vanished");
    assert_eq!(failed_lease.status, LeaseStatus::Failed);
    assert_eq!(failed_lease.error_message.as_deref(), Some("write denied"));

    let recycled_item = stock_repository
        .find_item(&second_lease.stock_item_id)
        .await
        .expect("stock query failed")
        .expect("stock vanished");
    assert_eq!(recycled_item.status, StockStatus::Available);
    assert!(recycled_item.leased_at.is_none());

    let final_state = ClickStateRepository::new(client.clone())
        .get_state(OPERATOR, CAMPAIGN)
        .await
        .expect("state query failed")
        .expect("state vanished");
    assert_eq!(final_state.last_applied_clicks, 101, "failed ack must not bump");

    println!("✅ L3_LEASE: Deferred ack + recycle certified.");
}
