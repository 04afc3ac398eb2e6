// [libs/infra/db-turso/src/repositories/lease/queries.rs]
/*!
 * =================================================================
 * APARATO: LEASE SQL REGISTRY (V4.1 - QUERY LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONSULTAS NOMINALES DEL MOTOR DE LEASES
 * =================================================================
 */

pub const SELECT_LEASE_COLUMNS: &str = "SELECT id, user_id, campaign_id, stock_item_id, \
    idempotency_key, clicks_at_lease_time, window_start_epoch_seconds, status, applied, \
    error_message, leased_at, acked_at, deleted_at FROM suffix_leases";

pub const FIND_BY_IDEMPOTENCY: &str = "SELECT l.id, l.user_id, l.campaign_id, l.stock_item_id, \
    l.idempotency_key, l.clicks_at_lease_time, l.window_start_epoch_seconds, l.status, l.applied, \
    l.error_message, l.leased_at, l.acked_at, l.deleted_at, s.suffix \
    FROM suffix_leases l LEFT JOIN suffix_stock_items s ON s.id = l.stock_item_id \
    WHERE l.user_id = ? AND l.idempotency_key = ? AND l.deleted_at IS NULL LIMIT 1";

pub const OLDEST_AVAILABLE_ITEM: &str = "SELECT id, suffix FROM suffix_stock_items \
    WHERE user_id = ? AND campaign_id = ? AND status = 'available' AND deleted_at IS NULL \
    ORDER BY created_at ASC, id ASC LIMIT 1";

/// Claim condicional: solo captura la fila si sigue disponible.
/// La condición de status es la defensa contra la doble asignación.
pub const CLAIM_STOCK_ITEM: &str = "UPDATE suffix_stock_items \
    SET status = ?, leased_at = ?, consumed_at = ? WHERE id = ? AND status = 'available'";

pub const INSERT_LEASE: &str = "INSERT INTO suffix_leases \
    (id, user_id, campaign_id, stock_item_id, idempotency_key, clicks_at_lease_time, \
     window_start_epoch_seconds, status, applied, leased_at, acked_at) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Avance monótono: MAX garantiza seguridad ante reordenamientos.
pub const BUMP_APPLIED_CLICKS: &str = "UPDATE campaign_click_state \
    SET last_applied_clicks = MAX(last_applied_clicks, ?), updated_at = ? \
    WHERE user_id = ? AND campaign_id = ?";

pub const MARK_LEASE_CONSUMED: &str = "UPDATE suffix_leases \
    SET status = 'consumed', applied = 1, acked_at = ? WHERE id = ?";

pub const MARK_LEASE_FAILED: &str = "UPDATE suffix_leases \
    SET status = 'failed', applied = 0, error_message = ?, acked_at = ? WHERE id = ?";

pub const MARK_LEASE_EXPIRED: &str = "UPDATE suffix_leases \
    SET status = 'expired', error_message = ?, acked_at = ? WHERE id = ? AND status = 'leased'";

pub const MARK_STOCK_CONSUMED: &str = "UPDATE suffix_stock_items \
    SET status = 'consumed', consumed_at = ? WHERE id = ?";

pub const RESTORE_STOCK_AVAILABLE: &str = "UPDATE suffix_stock_items \
    SET status = 'available', leased_at = NULL, consumed_at = NULL WHERE id = ?";

pub const FIND_STALE_LEASED: &str = "SELECT id, user_id, campaign_id, stock_item_id, \
    idempotency_key, clicks_at_lease_time, window_start_epoch_seconds, status, applied, \
    error_message, leased_at, acked_at, deleted_at FROM suffix_leases \
    WHERE status = 'leased' AND leased_at < ? ORDER BY leased_at ASC";

pub const OLDEST_LEASED_TIMESTAMP: &str = "SELECT leased_at FROM suffix_leases \
    WHERE status = 'leased' ORDER BY leased_at ASC LIMIT 1";

pub const ACK_WINDOW_COUNTS: &str = "SELECT \
    SUM(CASE WHEN status = 'consumed' THEN 1 ELSE 0 END), \
    SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) \
    FROM suffix_leases WHERE leased_at >= ?";
