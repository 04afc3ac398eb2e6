// [libs/core/proxy-forge/src/ip_check.rs]
/*!
 * =================================================================
 * APARATO: EXIT-IP RESOLUTION ENGINE (V5.0 - TRIPLE REPORTER)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: OBSERVACIÓN DE LA IDENTIDAD DE SALIDA DEL PROXY
 *
 * # Logic:
 * Tres reporteros externos se consultan en paralelo a través del canal
 * candidato; la primera respuesta válida gana. Si ninguno responde
 * dentro de su timeout, el canal carece de identidad observable y el
 * carrusel puede degradar a la sonda de conectividad.
 * =================================================================
 */

use futures::future::select_ok;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Forma de la respuesta de un reportero de IP.
#[derive(Debug, Clone, Copy)]
enum ReporterShape {
    /// Cuerpo de texto plano con la IP desnuda.
    PlainText,
    /// JSON con campo "ip".
    JsonIpField,
}

/// Registro cerrado de reporteros de IP consultados en paralelo.
const IP_REPORTER_SERVICES: &[(&str, ReporterShape)] = &[
    ("https://api.ipify.org?format=json", ReporterShape::JsonIpField),
    ("https://ifconfig.me/ip", ReporterShape::PlainText),
    ("https://ipinfo.io/json", ReporterShape::JsonIpField),
];

/// Registro cerrado de URLs de sonda para el camino de contingencia.
const CONNECTIVITY_PROBE_URLS: &[&str] = &[
    "https://www.google.com/generate_204",
    "https://www.gstatic.com/generate_204",
    "https://detectportal.firefox.com/success.txt",
];

/// Timeout individual por reportero.
const REPORTER_TIMEOUT: Duration = Duration::from_secs(12);

/// Timeout de la sonda de conectividad.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Valida superficialmente que el texto parezca una dirección IP.
fn looks_like_ip_address(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    !trimmed.is_empty()
        && trimmed.len() <= 45
        && trimmed.chars().all(|c| c.is_ascii_hexdigit() || c == '.' || c == ':')
}

/// Consulta un reportero individual y extrae la IP según su forma.
async fn query_reporter(
    network_client: &Client,
    reporter_url: &str,
    shape: ReporterShape,
) -> Result<String, String> {
    let response = network_client
        .get(reporter_url)
        .timeout(REPORTER_TIMEOUT)
        .send()
        .await
        .map_err(|fault| fault.to_string())?;

    if !response.status().is_success() {
        return Err(format!("reporter status {}", response.status()));
    }

    let extracted = match shape {
        ReporterShape::PlainText => response.text().await.map_err(|fault| fault.to_string())?,
        ReporterShape::JsonIpField => {
            let body: serde_json::Value =
                response.json().await.map_err(|fault| fault.to_string())?;
            body.get("ip")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string()
        }
    };

    let trimmed = extracted.trim().to_string();
    if looks_like_ip_address(&trimmed) {
        Ok(trimmed)
    } else {
        Err(format!("reporter returned non-ip payload [{}]", trimmed))
    }
}

/**
 * Resuelve la IP de salida de un canal candidato.
 *
 * Los tres reporteros se consultan en paralelo; la primera respuesta
 * exitosa resuelve. None significa canal sin identidad observable.
 */
#[instrument(skip(network_client))]
pub async fn resolve_exit_ip(network_client: &Client) -> Option<String> {
    let reporter_futures = IP_REPORTER_SERVICES
        .iter()
        .map(|(reporter_url, shape)| {
            Box::pin(query_reporter(network_client, reporter_url, *shape))
        })
        .collect::<Vec<_>>();

    match select_ok(reporter_futures).await {
        Ok((exit_ip, _remaining)) => {
            debug!("🛰️ [IP_CHECK]: Exit identity observed -> {}", exit_ip);
            Some(exit_ip)
        }
        Err(last_fault) => {
            debug!("🛰️ [IP_CHECK]: All reporters collapsed -> {}", last_fault);
            None
        }
    }
}

/**
 * Sonda de conectividad del camino de contingencia: un GET pequeño
 * contra el registro fijo de URLs; cualquier éxito valida el canal.
 */
#[instrument(skip(network_client))]
pub async fn probe_connectivity(network_client: &Client) -> bool {
    for probe_url in CONNECTIVITY_PROBE_URLS {
        let probe_result = network_client
            .get(*probe_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        if let Ok(response) = probe_result {
            if response.status().is_success() || response.status().as_u16() == 204 {
                debug!("🛰️ [PROBE]: Connectivity certified via [{}]", probe_url);
                return true;
            }
        }
    }
    false
}
