// [libs/infra/db-turso/src/schema.rs]
/**
 * =================================================================
 * APARATO: ROTATION DATABASE SCHEMA (V4.2 - LEDGER STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 2. TWO-ROW INVARIANTS: El índice único (user_id, idempotency_key)
 *    es la garantía física de la idempotencia del motor de leases.
 * 3. PERFORMANCE: Índices de aceleración para la asignación de stock,
 *    los barridos de expiración y el despacho de items de clicks.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del ecosistema de rotación Kylink.
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_CAMPAIGNS", r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            campaign_name TEXT NOT NULL DEFAULT '',
            country_code TEXT NOT NULL DEFAULT '',
            final_url TEXT NOT NULL DEFAULT '',
            external_cid TEXT NOT NULL DEFAULT '',
            external_mcc_id TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            UNIQUE(user_id, campaign_id)
        );
    "#),
    ("TABLE_AFFILIATE_LINKS", r#"
        CREATE TABLE IF NOT EXISTS affiliate_links (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            target_url TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            priority INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
    "#),
    ("TABLE_CAMPAIGN_CLICK_STATE", r#"
        CREATE TABLE IF NOT EXISTS campaign_click_state (
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            last_applied_clicks INTEGER NOT NULL DEFAULT 0,
            last_observed_clicks INTEGER NOT NULL DEFAULT 0,
            last_observed_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY(user_id, campaign_id)
        );
    "#),
    ("TABLE_SUFFIX_STOCK_ITEMS", r#"
        CREATE TABLE IF NOT EXISTS suffix_stock_items (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            suffix TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'available',
            exit_ip TEXT,
            source_affiliate_link_id TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            leased_at TEXT,
            consumed_at TEXT,
            expired_at TEXT,
            deleted_at TEXT
        );
    "#),
    ("TABLE_SUFFIX_LEASES", r#"
        CREATE TABLE IF NOT EXISTS suffix_leases (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            stock_item_id TEXT NOT NULL,
            idempotency_key TEXT NOT NULL,
            clicks_at_lease_time INTEGER NOT NULL DEFAULT 0,
            window_start_epoch_seconds INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'leased',
            applied INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            leased_at TEXT NOT NULL,
            acked_at TEXT,
            deleted_at TEXT,
            UNIQUE(user_id, idempotency_key)
        );
    "#),
    ("TABLE_PROXY_PROVIDERS", r#"
        CREATE TABLE IF NOT EXISTS proxy_providers (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL DEFAULT '',
            host TEXT NOT NULL,
            port INTEGER NOT NULL,
            priority INTEGER NOT NULL DEFAULT 100,
            username_template TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT '',
            enabled INTEGER NOT NULL DEFAULT 1,
            assigned_user_ids TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_PROXY_EXIT_IP_USAGE", r#"
        CREATE TABLE IF NOT EXISTS proxy_exit_ip_usage (
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            exit_ip TEXT NOT NULL,
            used_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            PRIMARY KEY(user_id, campaign_id, exit_ip)
        );
    "#),
    ("TABLE_CLICK_TASKS", r#"
        CREATE TABLE IF NOT EXISTS click_tasks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            target_clicks INTEGER NOT NULL,
            completed_clicks INTEGER NOT NULL DEFAULT 0,
            failed_clicks INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'running',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_CLICK_TASK_ITEMS", r#"
        CREATE TABLE IF NOT EXISTS click_task_items (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            exit_ip TEXT,
            error_message TEXT,
            duration_milliseconds INTEGER,
            executed_at TEXT
        );
    "#),
    ("TABLE_ALERTS", r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            kind TEXT NOT NULL,
            level TEXT NOT NULL DEFAULT 'info',
            title TEXT NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            metadata TEXT NOT NULL DEFAULT '{}',
            acknowledged INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_STOCK_AUDIT_LOG", r#"
        CREATE TABLE IF NOT EXISTS stock_audit_log (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL,
            action TEXT NOT NULL,
            detail TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_API_KEYS", r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            token_digest TEXT NOT NULL UNIQUE,
            label TEXT NOT NULL DEFAULT '',
            suspended INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_used_at TEXT
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que las tablas existentes se adapten a las nuevas capacidades.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // --- OBSERVABILIDAD DE PRODUCCIÓN ---
    ("STOCK_EXIT_IP", "ALTER TABLE suffix_stock_items ADD COLUMN exit_ip TEXT"),
    ("STOCK_SOURCE_LINK", "ALTER TABLE suffix_stock_items ADD COLUMN source_affiliate_link_id TEXT NOT NULL DEFAULT ''"),

    // --- RASTRO DE EJECUCIÓN DE CLICKS ---
    ("CLICK_ITEM_DURATION", "ALTER TABLE click_task_items ADD COLUMN duration_milliseconds INTEGER"),
    ("CLICK_ITEM_EXECUTED", "ALTER TABLE click_task_items ADD COLUMN executed_at TEXT"),

    // --- GOBERNANZA DE ACCESO ---
    ("API_KEY_SUSPENDED", "ALTER TABLE api_keys ADD COLUMN suspended INTEGER NOT NULL DEFAULT 0"),
    ("API_KEY_LAST_USED", "ALTER TABLE api_keys ADD COLUMN last_used_at TEXT"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 * Optimiza la asignación de stock, los barridos y el despacho de clicks.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_STOCK_ALLOCATION", "CREATE INDEX IF NOT EXISTS idx_stock_allocation ON suffix_stock_items(user_id, campaign_id, status, created_at);"),
    ("IDX_LEASES_STATUS", "CREATE INDEX IF NOT EXISTS idx_leases_status ON suffix_leases(status, leased_at);"),
    ("IDX_LEASES_CAMPAIGN", "CREATE INDEX IF NOT EXISTS idx_leases_campaign ON suffix_leases(user_id, campaign_id);"),
    ("IDX_LINKS_RESOLUTION", "CREATE INDEX IF NOT EXISTS idx_links_resolution ON affiliate_links(user_id, campaign_id, enabled, priority);"),
    ("IDX_EXIT_IP_EXPIRY", "CREATE INDEX IF NOT EXISTS idx_exit_ip_expiry ON proxy_exit_ip_usage(expires_at);"),
    ("IDX_CLICK_ITEMS_DUE", "CREATE INDEX IF NOT EXISTS idx_click_items_due ON click_task_items(status, scheduled_at);"),
    ("IDX_AUDIT_ACTION", "CREATE INDEX IF NOT EXISTS idx_audit_action ON stock_audit_log(action, created_at);"),
    ("IDX_ALERTS_ACK", "CREATE INDEX IF NOT EXISTS idx_alerts_ack ON alerts(acknowledged, created_at);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con el motor libSQL.
 */
#[instrument(skip(database_connection))]
pub async fn apply_full_rotation_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V4.2...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Rotation Ledger V4.2 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => debug!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
