// [libs/core/proxy-forge/src/carousel.rs]
/*!
 * =================================================================
 * APARATO: PROXY SELECTION CAROUSEL (V5.1 - DEDUP GUARDED)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: SELECCIÓN ORDENADA DE CANALES CON IDENTIDAD FRESCA
 *
 * # Logic:
 * Fase nominal: avanza por los proveedores en prioridad ascendente,
 * resuelve la IP de salida y descarta las identidades vistas en la
 * ventana de 24h. Fase de contingencia: si la lista se agota sin
 * identidad fresca, reintenta cada proveedor con una sonda de
 * conectividad y entrega identidad 'Unknown' (jamás registrable).
 * =================================================================
 */

use crate::ip_check::{probe_connectivity, resolve_exit_ip};
use crate::templating::{build_socks_url, materialize_username};
use kylink_domain_models::{ExitIpIdentity, ProxyProvider, ResolvedProxyChannel};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Timeout base del cliente usado para ip-check y sondas.
const CHANNEL_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Carrusel de selección de canales de egreso para un (usuario, campaña).
pub struct ProxyCarousel {
    /// Proveedores habilitados, ordenados por prioridad ascendente.
    candidates: Vec<ProxyProvider>,
    /// IPs de salida descalificadas por la ventana de 24h.
    used_exit_ips: HashSet<String>,
    /// Proveedores ya intentados en la pasada actual.
    tried_provider_ids: HashSet<String>,
    /// Bitácora de intentos para el rastro forense.
    attempt_log: Vec<String>,
    /// Código de país que materializa las plantillas de credenciales.
    country_code: String,
}

impl ProxyCarousel {
    /**
     * Construye el carrusel. Los proveedores se filtran por habilitación
     * y se ordenan por prioridad ascendente (el valor más bajo gana).
     */
    pub fn new(
        mut providers: Vec<ProxyProvider>,
        used_exit_ips: HashSet<String>,
        country_code: &str,
    ) -> Self {
        providers.retain(|provider| provider.enabled);
        providers.sort_by_key(|provider| provider.priority);

        Self {
            candidates: providers,
            used_exit_ips,
            tried_provider_ids: HashSet::new(),
            attempt_log: Vec::new(),
            country_code: country_code.to_string(),
        }
    }

    /// Reinicia el conjunto de intentados: fuerza una selección fresca
    /// (diversidad por item en el ejecutor de clicks).
    pub fn reset_tried(&mut self) {
        self.tried_provider_ids.clear();
    }

    /// Bitácora de intentos acumulada.
    pub fn attempt_log(&self) -> &[String] {
        &self.attempt_log
    }

    /// Construye el cliente HTTP enrutado por el canal candidato.
    fn build_channel_client(socks_url: &str) -> Option<Client> {
        let proxy = reqwest::Proxy::all(socks_url).ok()?;
        Client::builder()
            .proxy(proxy)
            .timeout(CHANNEL_CLIENT_TIMEOUT)
            .build()
            .ok()
    }

    /**
     * FASE NOMINAL: siguiente canal con identidad de salida fresca.
     *
     * Devuelve None cuando la lista se agota sin identidad utilizable;
     * el consumidor puede entonces degradar a la fase de contingencia.
     */
    #[instrument(skip(self))]
    pub async fn next_fresh_channel(&mut self) -> Option<ResolvedProxyChannel> {
        let pending: Vec<ProxyProvider> = self
            .candidates
            .iter()
            .filter(|provider| !self.tried_provider_ids.contains(&provider.id))
            .cloned()
            .collect();

        for provider in pending {
            self.tried_provider_ids.insert(provider.id.clone());

            let materialized_username =
                materialize_username(&provider.username_template, &self.country_code);
            let socks_url = build_socks_url(&provider, &materialized_username);

            let Some(channel_client) = Self::build_channel_client(&socks_url) else {
                self.attempt_log
                    .push(format!("{}: client construction rejected", provider.label));
                continue;
            };

            match resolve_exit_ip(&channel_client).await {
                Some(exit_ip) => {
                    if self.used_exit_ips.contains(&exit_ip) {
                        self.attempt_log
                            .push(format!("{}: IP reused [{}]", provider.label, exit_ip));
                        debug!(
                            "🔁 [CAROUSEL]: Provider [{}] exit identity [{}] seen within 24h window.",
                            provider.label, exit_ip
                        );
                        continue;
                    }

                    info!(
                        "🛡️ [CAROUSEL]: Fresh egress channel [{}] with exit identity [{}].",
                        provider.label, exit_ip
                    );
                    return Some(ResolvedProxyChannel {
                        provider_id: provider.id.clone(),
                        provider_label: provider.label.clone(),
                        socks_url,
                        exit_ip: ExitIpIdentity::Observed(exit_ip),
                    });
                }
                None => {
                    self.attempt_log
                        .push(format!("{}: exit identity unresolvable", provider.label));
                }
            }
        }

        None
    }

    /**
     * FASE DE CONTINGENCIA: reintenta cada proveedor con una sonda de
     * conectividad simple. El canal devuelto porta identidad 'Unknown',
     * que NO debe registrarse en el ledger de deduplicación.
     */
    #[instrument(skip(self))]
    pub async fn fallback_channel(&mut self) -> Option<ResolvedProxyChannel> {
        for provider in self.candidates.clone() {
            let materialized_username =
                materialize_username(&provider.username_template, &self.country_code);
            let socks_url = build_socks_url(&provider, &materialized_username);

            let Some(channel_client) = Self::build_channel_client(&socks_url) else {
                continue;
            };

            if probe_connectivity(&channel_client).await {
                warn!(
                    "🧯 [CAROUSEL_FALLBACK]: Provider [{}] passed connectivity with synthetic identity.",
                    provider.label
                );
                return Some(ResolvedProxyChannel {
                    provider_id: provider.id.clone(),
                    provider_label: provider.label.clone(),
                    socks_url,
                    exit_ip: ExitIpIdentity::Unknown,
                });
            }

            self.attempt_log
                .push(format!("{}: connectivity probe failed", provider.label));
        }

        None
    }

    /**
     * Adquisición completa: fase nominal y degradación a contingencia.
     */
    pub async fn acquire(&mut self) -> Option<ResolvedProxyChannel> {
        if let Some(channel) = self.next_fresh_channel().await {
            return Some(channel);
        }
        self.fallback_channel().await
    }
}
