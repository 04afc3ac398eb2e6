// [apps/orchestrator/src/services/suffix_generator.rs]
/*!
 * =================================================================
 * APARATO: SUFFIX GENERATOR SERVICE (V4.2 - CHAIN COMPOSER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L2-APP)
 * RESPONSABILIDAD: PRODUCCIÓN DE UN SUFIJO FRESCO POR CAMPAÑA
 *
 * # Logic:
 * Compone el carrusel de egreso con el rastreador de redirecciones:
 * para cada canal con identidad fresca rastrea la cadena del enlace
 * de afiliado; en éxito deriva el sufijo de la URL final y registra
 * el uso de la IP de salida. El camino de contingencia entrega
 * identidad sintética que jamás toca el ledger. El modo mock solo
 * existe detrás de la bandera ALLOW_MOCK_SUFFIX.
 * =================================================================
 */

use crate::state::AppState;
use kylink_core_pacing::pick_random_user_agent;
use kylink_core_proxy::ProxyCarousel;
use kylink_core_tracker::{RedirectTracer, TraceRequest};
use kylink_domain_models::{AffiliateLink, Campaign, ExitIpIdentity};
use kylink_infra_db::repositories::NewStockItem;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Referer fijo del primer salto en producción de stock.
const PRODUCTION_INITIAL_REFERER: &str = "https://t.co";

/// Parámetros de rastreo del contexto de producción.
const PRODUCTION_MAX_REDIRECTS: u32 = 15;
const PRODUCTION_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);
const PRODUCTION_TOTAL_TIMEOUT: Duration = Duration::from_secs(90);
const PRODUCTION_RETRY_COUNT: u32 = 1;

pub struct SuffixGenerator {
    application_state: AppState,
}

impl SuffixGenerator {
    pub fn new(application_state: AppState) -> Self {
        Self { application_state }
    }

    /// Sintetiza la query mínima cuando la URL final no porta sufijo.
    fn synthesize_minimal_suffix(exit_identity: &ExitIpIdentity) -> String {
        let generated_gclid = Uuid::new_v4().simple().to_string();
        let exit_marker = match exit_identity {
            ExitIpIdentity::Observed(address) => address.replace(['.', ':'], "-"),
            ExitIpIdentity::Unknown => "unknown".to_string(),
        };
        format!("gclid=ky{}&kysrc=aff&kyexit={}", generated_gclid, exit_marker)
    }

    /**
     * Produce UN sufijo fresco para la campaña, o None si todos los
     * canales fallan y el modo mock está apagado.
     */
    #[instrument(skip(self, campaign, affiliate_link), fields(campaign = %campaign.campaign_id))]
    pub async fn generate_one(
        &self,
        campaign: &Campaign,
        affiliate_link: &AffiliateLink,
    ) -> Option<NewStockItem> {
        let providers = match self
            .application_state
            .proxy_repository
            .providers_for_user(&campaign.user_id)
            .await
        {
            Ok(providers) => providers,
            Err(fault) => {
                warn!("🏭 [GENERATOR]: Provider roster unavailable: {}", fault);
                Vec::new()
            }
        };

        let used_exit_ips = self
            .application_state
            .proxy_repository
            .used_exit_ips(&campaign.user_id, &campaign.campaign_id)
            .await
            .unwrap_or_default();

        let mut carousel = ProxyCarousel::new(providers, used_exit_ips, &campaign.country_code);

        // --- FASE NOMINAL: canales con identidad de salida fresca ---
        while let Some(channel) = carousel.next_fresh_channel().await {
            if let Some(item) = self
                .trace_through_channel(campaign, affiliate_link, &channel.socks_url, &channel.exit_ip)
                .await
            {
                if let Some(observed_address) = channel.exit_ip.recordable_address() {
                    if let Err(ledger_fault) = self
                        .application_state
                        .proxy_repository
                        .record_exit_ip_usage(
                            &campaign.user_id,
                            &campaign.campaign_id,
                            observed_address,
                        )
                        .await
                    {
                        warn!("🏭 [GENERATOR]: Exit ledger write failed: {}", ledger_fault);
                    }
                }
                return Some(item);
            }
        }

        // --- FASE DE CONTINGENCIA: sonda de conectividad ---
        if let Some(fallback_channel) = carousel.fallback_channel().await {
            if let Some(item) = self
                .trace_through_channel(
                    campaign,
                    affiliate_link,
                    &fallback_channel.socks_url,
                    &fallback_channel.exit_ip,
                )
                .await
            {
                // Identidad sintética: el ledger de deduplicación no se toca.
                return Some(item);
            }
        }

        // --- MODO MOCK (apagado en producción) ---
        if self.application_state.config.allow_mock_suffix {
            warn!(
                "🎭 [GENERATOR_MOCK]: All channels failed; emitting synthetic suffix for [{}].",
                campaign.campaign_id
            );
            return Some(NewStockItem {
                user_id: campaign.user_id.clone(),
                campaign_id: campaign.campaign_id.clone(),
                suffix: format!("gclid=mock{}&kysrc=mock", Uuid::new_v4().simple()),
                exit_ip: None,
                source_affiliate_link_id: affiliate_link.id.clone(),
            });
        }

        warn!(
            "🏭 [GENERATOR]: NO_PROXY_AVAILABLE for campaign [{}] after {} attempts.",
            campaign.campaign_id,
            carousel.attempt_log().len()
        );
        None
    }

    /// Rastrea la cadena por un canal concreto y deriva el sufijo.
    async fn trace_through_channel(
        &self,
        campaign: &Campaign,
        affiliate_link: &AffiliateLink,
        socks_url: &str,
        exit_identity: &ExitIpIdentity,
    ) -> Option<NewStockItem> {
        let trace_request = TraceRequest {
            url: affiliate_link.target_url.clone(),
            proxy_socks_url: Some(socks_url.to_string()),
            target_domain: if campaign.final_url.is_empty() {
                None
            } else {
                Some(campaign.final_url.clone())
            },
            initial_referer: Some(PRODUCTION_INITIAL_REFERER.to_string()),
            max_redirects: PRODUCTION_MAX_REDIRECTS,
            request_timeout: PRODUCTION_REQUEST_TIMEOUT,
            total_timeout: PRODUCTION_TOTAL_TIMEOUT,
            retry_count: PRODUCTION_RETRY_COUNT,
            user_agent: pick_random_user_agent().to_string(),
        };

        let outcome = RedirectTracer::trace(&trace_request).await;
        if !outcome.success {
            return None;
        }

        let derived_suffix = outcome
            .extract_suffix()
            .unwrap_or_else(|| Self::synthesize_minimal_suffix(exit_identity));

        info!(
            "🏭 [GENERATOR]: Suffix crystallized for [{}] after {} hops ({}ms).",
            campaign.campaign_id, outcome.redirect_count, outcome.duration_milliseconds
        );

        Some(NewStockItem {
            user_id: campaign.user_id.clone(),
            campaign_id: campaign.campaign_id.clone(),
            suffix: derived_suffix,
            exit_ip: exit_identity.recordable_address().map(str::to_string),
            source_affiliate_link_id: affiliate_link.id.clone(),
        })
    }
}
