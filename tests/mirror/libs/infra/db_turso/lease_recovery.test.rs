// [tests/mirror/libs/infra/db_turso/lease_recovery.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE RECLAMACIÓN DE LEASES (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL CIERRE DE RECUPERACIÓN
 *
 * # Mathematical Proof (Recovery Closure):
 * Tras el barrido de expiración no puede quedar ningún lease con
 * status='leased' y leased_at < now - TTL, y cada item de stock de un
 * lease reclamado debe estar nuevamente 'available'.
 * =================================================================
 */

use chrono::{Duration, Utc};
use kylink_domain_models::{CampaignMetaPayload, LeaseStatus, StockStatus};
use kylink_infra_db::repositories::{
    AllocationMode, AllocationRequest, CampaignRepository, ClickStateRepository,
    LeaseRepository, NewStockItem, StockRepository,
};
use kylink_infra_db::TursoClient;
use libsql::params;

const OPERATOR: &str = "operator-recovery";
const CAMPAIGN: &str = "555000111";
const LEASE_TTL_MINUTES: i64 = 15;

/**
 * CERTIFICACIÓN: Cierre de recuperación tras el barrido de expiración.
 */
#[tokio::test]
async fn certify_recovery_closure_after_expiry_sweep() {
    let client = TursoClient::connect("file:lease_recovery?mode=memory&cache=shared", None)
        .await
        .expect("memory strata ignition failed");

    CampaignRepository::new(client.clone())
        .upsert_from_meta(
            OPERATOR,
            CAMPAIGN,
            &CampaignMetaPayload {
                campaign_name: "Recovery".into(),
                country: "DE".into(),
                final_url: "example.de".into(),
                cid: "1".into(),
                mcc_id: "2".into(),
            },
        )
        .await
        .expect("campaign seed failed");

    ClickStateRepository::new(client.clone())
        .create_state(OPERATOR, CAMPAIGN, 10, Utc::now())
        .await
        .expect("state seed failed");

    let stock_repository = StockRepository::new(client.clone());
    stock_repository
        .bulk_insert_available(&[NewStockItem {
            user_id: OPERATOR.into(),
            campaign_id: CAMPAIGN.into(),
            suffix: "gclid=stale".into(),
            exit_ip: None,
            source_affiliate_link_id: "link-9".into(),
        }])
        .await
        .expect("stock seed failed");

    let lease_repository = LeaseRepository::new(client.clone());
    let (stale_lease, _) = lease_repository
        .allocate(
            &AllocationRequest {
                user_id: OPERATOR.into(),
                campaign_id: CAMPAIGN.into(),
                idempotency_key: "555000111:1:11".into(),
                now_clicks: 11,
                window_start_epoch_seconds: 1,
            },
            AllocationMode::DeferredAck,
        )
        .await
        .expect("allocation collapsed");

    // Envejecemos el lease más allá del TTL mediante cirugía directa.
    let backdated = (Utc::now() - Duration::minutes(LEASE_TTL_MINUTES + 5)).to_rfc3339();
    client
        .get_connection()
        .expect("connection failed")
        .execute(
            "UPDATE suffix_leases SET leased_at = ? WHERE id = ?",
            params![backdated, stale_lease.id.clone()],
        )
        .await
        .expect("backdating failed");

    // --- BARRIDO DE EXPIRACIÓN ---
    let stale_set = lease_repository
        .find_stale_leased(LEASE_TTL_MINUTES)
        .await
        .expect("stale query failed");
    assert_eq!(stale_set.len(), 1);

    for lease in &stale_set {
        assert!(lease_repository.expire_lease(lease).await.expect("expiry failed"));
    }

    // CIERRE: no queda ningún lease arrendado estancado.
    let remaining_stale = lease_repository
        .find_stale_leased(LEASE_TTL_MINUTES)
        .await
        .expect("stale re-query failed");
    assert!(remaining_stale.is_empty());

    let reclaimed_lease = lease_repository
        .find_lease(OPERATOR, CAMPAIGN, &stale_lease.id)
        .await
        .expect("lease query failed")
        .expect("lease vanished");
    assert_eq!(reclaimed_lease.status, LeaseStatus::Expired);

    let recycled_item = stock_repository
        .find_item(&stale_lease.stock_item_id)
        .await
        .expect("stock query failed")
        .expect("stock vanished");
    assert_eq!(recycled_item.status, StockStatus::Available);

    // El barrido es idempotente: reclamar de nuevo no hace nada.
    assert!(!lease_repository
        .expire_lease(&stale_lease)
        .await
        .expect("second expiry failed"));

    println!("✅ L3_RECOVERY: Expiry sweep closure certified.");
}
