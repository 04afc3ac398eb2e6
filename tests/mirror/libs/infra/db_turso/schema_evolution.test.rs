// [tests/mirror/libs/infra/db_turso/schema_evolution.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE EVOLUCIÓN DE ESQUEMA (V1.1 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE IDEMPOTENCIA DEL BOOTSTRAP
 * =================================================================
 */

use kylink_infra_db::schema::apply_full_rotation_schema;
use kylink_infra_db::{LinkProfile, TursoClient};

const EXPECTED_TABLES: &[&str] = &[
    "campaigns",
    "affiliate_links",
    "campaign_click_state",
    "suffix_stock_items",
    "suffix_leases",
    "proxy_providers",
    "proxy_exit_ip_usage",
    "click_tasks",
    "click_task_items",
    "alerts",
    "stock_audit_log",
    "api_keys",
];

/**
 * CERTIFICACIÓN: Las doce tablas del núcleo se solidifican y la
 * re-aplicación del esquema es idempotente.
 */
#[tokio::test]
async fn certify_schema_bootstrap_idempotence() {
    let client = TursoClient::connect("file:schema_evolution?mode=memory&cache=shared", None)
        .await
        .expect("memory strata ignition failed");

    // El perfil de memoria compartida ancla el esquema vía génesis.
    assert_eq!(client.link_profile(), LinkProfile::SharedMemory);
    assert!(client.is_memory_pinned());

    let connection = client.get_connection().expect("connection failed");

    // Re-aplicación en caliente: debe ser un no-op sin errores.
    apply_full_rotation_schema(&connection)
        .await
        .expect("hot re-application collapsed");

    let mut table_rows = connection
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            (),
        )
        .await
        .expect("catalog query failed");

    let mut observed_tables: Vec<String> = Vec::new();
    while let Some(row) = table_rows.next().await.expect("row iteration failed") {
        observed_tables.push(row.get::<String>(0).expect("table name unreadable"));
    }

    for expected_table in EXPECTED_TABLES {
        assert!(
            observed_tables.iter().any(|name| name == expected_table),
            "missing table [{}] in {:?}",
            expected_table,
            observed_tables
        );
    }

    // El índice único de idempotencia debe existir físicamente.
    let mut index_rows = connection
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'suffix_leases'",
            (),
        )
        .await
        .expect("index catalog query failed");
    let index_count: i64 = index_rows
        .next()
        .await
        .expect("index row missing")
        .expect("index row void")
        .get(0)
        .expect("index count unreadable");
    assert!(index_count >= 1, "suffix_leases must carry its unique index");

    println!("✅ L3_SCHEMA: Bootstrap idempotence certified.");
}
