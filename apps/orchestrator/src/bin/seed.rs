// [apps/orchestrator/src/bin/seed.rs]
/*!
 * =================================================================
 * APARATO: LOCAL SEED BINARY (V4.1 - IGNITION DATA)
 * CLASIFICACIÓN: OPERATIONS TOOLING (ESTRATO L0)
 * RESPONSABILIDAD: SIEMBRA DE DATOS DEMO PARA IGNICIÓN LOCAL
 *
 * # Logic:
 * Siembra un operador demo con campaña, enlace de afiliado, proveedor
 * SOCKS5 y API key, e imprime el token en claro una única vez.
 * =================================================================
 */

use dotenvy::dotenv;
use kylink_domain_models::CampaignMetaPayload;
use kylink_infra_db::repositories::{
    ApiKeyRepository, CampaignRepository, ProxyRepository,
};
use kylink_infra_db::TursoClient;
use kylink_shared_argos::init_tracing;
use rand::Rng;
use tracing::info;

/// Genera un token demo con la forma nominal ky_test_ + 32 hex.
fn generate_demo_token() -> String {
    let mut generator = rand::thread_rng();
    let tail: String = (0..32)
        .map(|_| {
            let nibble: u8 = generator.gen_range(0..16);
            char::from_digit(nibble as u32, 16).unwrap_or('0')
        })
        .collect();
    format!("ky_test_{}", tail)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("kylink_seed");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let database_connection_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "kylink-local.db".to_string());
        let database_access_token = std::env::var("TURSO_AUTH_TOKEN").ok();

        let database_client =
            TursoClient::connect(&database_connection_url, database_access_token)
                .await
                .expect("FATAL: Database link collapse during seed.");

        let demo_operator = "demo-operator";
        let demo_campaign = "987654321";

        // 1. CAMPAÑA + ENLACE DE AFILIADO
        let campaign_repository = CampaignRepository::new(database_client.clone());
        campaign_repository
            .upsert_from_meta(
                demo_operator,
                demo_campaign,
                &CampaignMetaPayload {
                    campaign_name: "Demo Brand Search".into(),
                    country: "ES".into(),
                    final_url: "example.com".into(),
                    cid: "111-222-3333".into(),
                    mcc_id: "444-555-6666".into(),
                },
            )
            .await
            .expect("seed: campaign upsert failed");

        campaign_repository
            .insert_affiliate_link(
                demo_operator,
                demo_campaign,
                "https://tracker.example.net/aff?offer=77",
                10,
            )
            .await
            .expect("seed: affiliate link insert failed");

        // 2. PROVEEDOR SOCKS5 DEMO
        let proxy_repository = ProxyRepository::new(database_client.clone());
        proxy_repository
            .insert_provider(
                "residential-demo",
                "proxy.demo.example",
                1080,
                10,
                "user-{COUNTRY}-{session:8}",
                "demo-password",
                &[demo_operator.to_string()],
            )
            .await
            .expect("seed: proxy provider insert failed");

        // 3. API KEY DEL OPERADOR DEMO
        let api_key_repository = ApiKeyRepository::new(database_client);
        let demo_token = generate_demo_token();
        api_key_repository
            .insert_key(demo_operator, &demo_token, "demo seed key")
            .await
            .expect("seed: api key insert failed");

        info!("🌱 [SEED]: Demo operator ready. Campaign [{}].", demo_campaign);
        println!("DEMO_API_KEY={}", demo_token);
    });

    Ok(())
}
