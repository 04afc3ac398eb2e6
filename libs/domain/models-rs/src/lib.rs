// [libs/domain/models-rs/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS ROOT (V4.0 - ROTATION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: AUTORIDAD ÚNICA DE CONTRATOS DEL ECOSISTEMA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE SOURCE OF TRUTH: Todas las entidades persistidas y los
 *    sobres de transporte JSON del núcleo de rotación viven aquí.
 * 2. WIRE PARITY: Los DTOs de la API usan camelCase para mantener la
 *    paridad bit-perfecta con los scripts externos de Google Ads.
 * 3. NOMINAL PURITY: Erradicación total de abreviaciones.
 * =================================================================
 */

pub mod alert;
pub mod campaign;
pub mod click_task;
pub mod progress;
pub mod proxy;
pub mod rotation;
pub mod stock;

pub use alert::{Alert, AlertKind, AlertLevel};
pub use campaign::{
    AffiliateLink, Campaign, CampaignLookupRequest, CampaignLookupResponse,
    CampaignLookupResult, CampaignMetaPayload, CampaignStatus, LookupStatistics,
};
pub use click_task::{ClickItemStatus, ClickTask, ClickTaskItem, ClickTaskStatus};
pub use progress::{ProgressEvent, ProgressStage};
pub use proxy::{ExitIpIdentity, ProxyExitIpUsage, ProxyProvider, ResolvedProxyChannel};
pub use rotation::{
    AckRequest, AckResponse, CampaignClickState, LeaseRequest, LeaseResponse,
    LeaseStatus, SuffixLease,
};
pub use stock::{ReplenishReport, ReplenishVerdict, StockAuditAction, StockStatus, SuffixStockItem};
