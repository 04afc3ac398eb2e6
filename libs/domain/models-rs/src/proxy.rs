// [libs/domain/models-rs/src/proxy.rs]
/*!
 * =================================================================
 * APARATO: PROXY DOMAIN MODELS (V4.0 - EGRESS CONTRACTS)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: PROVEEDORES SOCKS5 Y LEDGER DE IPs DE SALIDA
 *
 * # Logic:
 * La identidad efectiva de un proxy es su IP de salida observada por
 * un reportero externo, no su host. El ledger de uso (24h) es la única
 * fuente de verdad de deduplicación; la identidad sintética 'Unknown'
 * del camino de contingencia jamás se registra en él.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proveedor SOCKS5 configurado con plantilla de credenciales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyProvider {
    pub id: String,
    /// Etiqueta humana del proveedor.
    pub label: String,
    pub host: String,
    pub port: u16,
    /// Prioridad de selección: el valor más bajo gana.
    pub priority: i64,
    /// Plantilla con marcadores {COUNTRY}/{country}/{random:N}/{session:N}.
    pub username_template: String,
    pub password: String,
    pub enabled: bool,
    /// Usuarios autorizados a enrutar por este proveedor.
    pub assigned_user_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fila del ledger de deduplicación de IPs de salida.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyExitIpUsage {
    pub user_id: String,
    pub campaign_id: String,
    pub exit_ip: String,
    pub used_at: DateTime<Utc>,
    /// Vencimiento de la descalificación (used_at + 24h).
    pub expires_at: DateTime<Utc>,
}

/// Identidad de salida resuelta para un canal de proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "address", rename_all = "snake_case")]
pub enum ExitIpIdentity {
    /// IP observada por un reportero externo: apta para el ledger.
    Observed(String),
    /// Identidad sintética del camino de contingencia: NUNCA se registra.
    Unknown,
}

impl ExitIpIdentity {
    /// Dirección registrable en el ledger, si la identidad es observada.
    pub fn recordable_address(&self) -> Option<&str> {
        match self {
            ExitIpIdentity::Observed(address) => Some(address),
            ExitIpIdentity::Unknown => None,
        }
    }
}

/// Canal de egreso listo para uso: proveedor + credenciales materializadas
/// + identidad de salida resuelta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedProxyChannel {
    pub provider_id: String,
    pub provider_label: String,
    /// URL socks5:// con credenciales url-encoded, lista para reqwest.
    pub socks_url: String,
    pub exit_ip: ExitIpIdentity,
}
