// [libs/domain/models-rs/src/campaign.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGN DOMAIN MODELS (V4.0 - ROTATION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE CAMPAÑA Y ENLACES DE AFILIADO
 *
 * # Logic:
 * La campaña es la unidad de aislamiento del sistema: cada fila de
 * stock, lease y uso de proxy está segregada por (user_id, campaign_id).
 * El enlace de afiliado efectivo es la fila habilitada, no borrada,
 * de mayor prioridad.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Estado operativo de una campaña dentro del ecosistema de rotación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// La campaña participa en producción de stock y rotación.
    Active,
    /// La campaña está congelada: ni producción ni rotación.
    Inactive,
}

impl CampaignStatus {
    /// Representación canónica persistida en el Ledger Táctico.
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Inactive => "inactive",
        }
    }

    /// Rehidratación desde el sustrato de persistencia.
    pub fn from_str(raw_status: &str) -> Self {
        match raw_status {
            "inactive" => CampaignStatus::Inactive,
            _ => CampaignStatus::Active,
        }
    }
}

/// Campaña publicitaria soberana registrada por el importador o por el
/// motor de leases mediante upsert perezoso.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Identificador interno único (UUID).
    pub id: String,
    /// Propietario de la campaña (aislamiento multi-tenant).
    pub user_id: String,
    /// Identificador externo de la campaña en Google Ads.
    pub campaign_id: String,
    /// Nombre humano de la campaña.
    pub campaign_name: String,
    /// Código de país ISO-2 en mayúsculas (origen de la selección de proxy).
    pub country_code: String,
    /// URL final en forma de dominio raíz (criterio de parada temprana).
    pub final_url: String,
    /// Identificador de cuenta externa (CID).
    pub external_cid: String,
    /// Identificador de la cuenta administradora (MCC).
    pub external_mcc_id: String,
    /// Estado operativo.
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Borrado lógico: las campañas nunca se eliminan físicamente.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Enlace de afiliado propiedad de una campaña (1:1 activo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateLink {
    pub id: String,
    pub user_id: String,
    pub campaign_id: String,
    /// URL objetivo cuya cadena de redirecciones produce el sufijo.
    pub target_url: String,
    /// Solo los enlaces habilitados participan en la producción.
    pub enabled: bool,
    /// Prioridad de resolución: el valor más alto gana.
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Metadatos de campaña suministrados por los scripts en el primer lease.
/// Habilita el upsert perezoso cuando el importador aún no la registró.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetaPayload {
    pub campaign_name: String,
    /// Código ISO-2; se normaliza a mayúsculas al persistir.
    pub country: String,
    pub final_url: String,
    pub cid: String,
    pub mcc_id: String,
}

/// Entrada individual de la consulta masiva de campañas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignLookupEntry {
    pub campaign_id: String,
}

/// Solicitud de consulta de campañas para los scripts externos (≤ 500).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignLookupRequest {
    pub campaigns: Vec<CampaignLookupEntry>,
}

/// Resultado por campaña: URL de tracking efectiva o ausencia declarada.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignLookupResult {
    /// URL del enlace de afiliado efectivo (mayor prioridad habilitado).
    pub tracking_url: Option<String>,
    pub found: bool,
}

/// Métricas agregadas de la consulta masiva.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupStatistics {
    pub requested: usize,
    pub found: usize,
    pub missing: usize,
}

/// Sobre de respuesta de la consulta masiva de campañas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignLookupResponse {
    pub success: bool,
    pub campaign_results: HashMap<String, CampaignLookupResult>,
    pub stats: LookupStatistics,
}
