// [libs/infra/db-turso/src/repositories/stock/queries.rs]
/*!
 * =================================================================
 * APARATO: STOCK SQL REGISTRY (V4.0 - QUERY LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONSULTAS NOMINALES DEL INVENTARIO DE SUFIJOS
 * =================================================================
 */

pub const SELECT_ITEM_COLUMNS: &str = "SELECT id, user_id, campaign_id, suffix, status, \
    exit_ip, source_affiliate_link_id, created_at, leased_at, consumed_at, expired_at, deleted_at \
    FROM suffix_stock_items";

pub const COUNT_AVAILABLE: &str = "SELECT COUNT(*) FROM suffix_stock_items \
    WHERE user_id = ? AND campaign_id = ? AND status = 'available' AND deleted_at IS NULL";

pub const INSERT_ITEM: &str = "INSERT INTO suffix_stock_items \
    (id, user_id, campaign_id, suffix, status, exit_ip, source_affiliate_link_id, created_at) \
    VALUES (?, ?, ?, ?, 'available', ?, ?, ?)";

pub const CONSUMED_COUNT_SINCE: &str = "SELECT COUNT(*) FROM suffix_stock_items \
    WHERE user_id = ? AND campaign_id = ? AND status = 'consumed' AND consumed_at >= ?";

pub const EXPIRE_AGED: &str = "UPDATE suffix_stock_items \
    SET status = 'expired', expired_at = ?, deleted_at = ? \
    WHERE status = 'available' AND deleted_at IS NULL AND created_at < ?";

pub const AVAILABLE_LEVELS_GROUPED: &str = "SELECT user_id, campaign_id, COUNT(*) \
    FROM suffix_stock_items WHERE status = 'available' AND deleted_at IS NULL \
    GROUP BY user_id, campaign_id";
