// [libs/core/redirect-tracker/src/tracer.rs]
/*!
 * =================================================================
 * APARATO: SEQUENTIAL REDIRECT TRACER (V5.2 - EARLY STOP SEALED)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: SEGUIMIENTO PASO A PASO DE CADENAS DE REDIRECCIÓN
 *
 * # Mathematical Proof (Bounded Termination):
 * El bucle está acotado por max_redirects y por el timeout de pared.
 * Cada iteración o bien emite una petición (acotada por el timeout por
 * paso y un número finito de reintentos con backoff lineal) o bien
 * termina. Por lo tanto el rastreo siempre concluye dentro de
 * total_timeout + holgura de un paso.
 * =================================================================
 */

use crate::contract::{DomainValidation, HopMechanism, TraceOutcome, TraceRequest, TraceStep};
use crate::js_patterns::{scan_javascript_jump, scan_meta_refresh};
use crate::root_domain::{root_domain_of_url, same_root_domain};
use reqwest::header::{HeaderValue, LOCATION, REFERER};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Tope en BYTES del snippet de cuerpo preservado en fallos HTTP.
const FAILURE_BODY_SNIPPET_BYTES: usize = 500;

/// Recorta el cuerpo a 500 bytes retrocediendo hasta una frontera
/// UTF-8 válida, para que el snippet forense jamás exceda el tope ni
/// quede partido a mitad de un carácter multi-byte.
fn bounded_body_snippet(body: &str) -> &str {
    if body.len() <= FAILURE_BODY_SNIPPET_BYTES {
        return body;
    }
    let mut cut_position = FAILURE_BODY_SNIPPET_BYTES;
    while cut_position > 0 && !body.is_char_boundary(cut_position) {
        cut_position -= 1;
    }
    &body[..cut_position]
}

/// Backoff lineal entre reintentos de un mismo paso.
const RETRY_BACKOFF_BASE_MILLISECONDS: u64 = 100;

/// Resultado interno de una petición individual.
enum StepFetch {
    Response(reqwest::Response),
    TransportFault { code: &'static str, detail: String },
}

/// Motor de rastreo secuencial. Una instancia por rastreo.
pub struct RedirectTracer;

impl RedirectTracer {
    /**
     * Ejecuta el rastreo completo de una cadena de redirecciones.
     *
     * El contrato jamás devuelve Err: todo fallo queda codificado en el
     * TraceOutcome con final_status_code=0 y error_message="CODE: detalle".
     */
    #[instrument(skip(request), fields(start_url = %request.url))]
    pub async fn trace(request: &TraceRequest) -> TraceOutcome {
        let trace_started_at = Instant::now();

        let network_client = match Self::build_step_client(request) {
            Ok(client) => client,
            Err(build_fault) => {
                return Self::transport_failure_outcome(
                    request,
                    "PROXY_UNAVAILABLE",
                    &format!("client construction rejected: {}", build_fault),
                    Vec::new(),
                    Vec::new(),
                    trace_started_at,
                );
            }
        };

        let mut current_url = request.url.clone();
        let mut chain: Vec<String> = Vec::new();
        let mut steps: Vec<TraceStep> = Vec::new();
        let mut redirect_count: u32 = 0;
        let mut early_stop = false;

        let mut terminal: Option<(bool, u16, Option<String>)> = None;

        for step_number in 1..=request.max_redirects {
            // 1. GUARDIA DE PARED: el rastreo completo está acotado.
            if trace_started_at.elapsed() >= request.total_timeout {
                terminal = Some((
                    false,
                    0,
                    Some(format!(
                        "TOTAL_TIMEOUT: wall clock exceeded after {} hops",
                        redirect_count
                    )),
                ));
                break;
            }

            // 2. PARADA TEMPRANA: la llegada al dominio objetivo no se fetchea.
            if step_number > 1 {
                if let Some(target_domain) = request.target_domain.as_deref() {
                    if same_root_domain(&current_url, target_domain) {
                        early_stop = true;
                        terminal = Some((true, StatusCode::OK.as_u16(), None));
                        break;
                    }
                }
            }

            chain.push(current_url.clone());
            let step_started_at = Instant::now();

            // 3. REFERER: el primer paso usa el inicial; el resto, la URL previa.
            let referer_value = if step_number == 1 {
                request.initial_referer.clone()
            } else {
                chain.get(chain.len().wrapping_sub(2)).cloned()
            };

            let remaining_wall = request
                .total_timeout
                .saturating_sub(trace_started_at.elapsed());

            let fetch_result = Self::fetch_with_retries(
                &network_client,
                &current_url,
                referer_value.as_deref(),
                request.request_timeout.min(remaining_wall.max(Duration::from_millis(1))),
                request.retry_count,
            )
            .await;

            let response = match fetch_result {
                StepFetch::Response(response) => response,
                StepFetch::TransportFault { code, detail } => {
                    steps.push(TraceStep {
                        step_number,
                        url: current_url.clone(),
                        status_code: 0,
                        mechanism: HopMechanism::Terminal,
                        resolved_target: None,
                        duration_milliseconds: step_started_at.elapsed().as_millis() as u64,
                    });
                    terminal = Some((false, 0, Some(format!("{}: {}", code, detail))));
                    break;
                }
            };

            let status = response.status();

            // 4. REDIRECCIÓN HTTP 3xx
            if status.is_redirection() {
                let location_raw = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);

                let Some(location_raw) = location_raw else {
                    steps.push(Self::step_record(step_number, &current_url, status.as_u16(), HopMechanism::HttpLocation, None, step_started_at));
                    terminal = Some((false, status.as_u16(), Some("REDIRECT_TRACK_FAILED: 3xx without Location header".to_string())));
                    break;
                };

                match Self::resolve_navigable(&current_url, &location_raw) {
                    Some(next_url) => {
                        steps.push(Self::step_record(step_number, &current_url, status.as_u16(), HopMechanism::HttpLocation, Some(next_url.clone()), step_started_at));
                        redirect_count += 1;
                        current_url = next_url;
                        continue;
                    }
                    None => {
                        steps.push(Self::step_record(step_number, &current_url, status.as_u16(), HopMechanism::HttpLocation, None, step_started_at));
                        terminal = Some((false, status.as_u16(), Some(format!("REDIRECT_TRACK_FAILED: non-navigable Location [{}]", location_raw))));
                        break;
                    }
                }
            }

            // 5. RESPUESTA 2xx: inspección del cuerpo en busca de saltos embebidos.
            if status.is_success() {
                let is_html_body = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(|content_type| content_type.contains("text/html"))
                    .unwrap_or(false);

                if !is_html_body {
                    steps.push(Self::step_record(step_number, &current_url, status.as_u16(), HopMechanism::Terminal, None, step_started_at));
                    terminal = Some((true, status.as_u16(), None));
                    break;
                }

                let body_text = response.text().await.unwrap_or_default();

                let embedded_jump = scan_meta_refresh(&body_text, &current_url)
                    .map(|candidate| (candidate, HopMechanism::MetaRefresh))
                    .or_else(|| {
                        scan_javascript_jump(&body_text, &current_url)
                            .map(|(candidate, _)| (candidate, HopMechanism::JavascriptJump))
                    });

                match embedded_jump {
                    Some((candidate, mechanism)) => match Self::resolve_navigable(&current_url, &candidate) {
                        Some(next_url) => {
                            steps.push(Self::step_record(step_number, &current_url, status.as_u16(), mechanism, Some(next_url.clone()), step_started_at));
                            redirect_count += 1;
                            current_url = next_url;
                            continue;
                        }
                        None => {
                            steps.push(Self::step_record(step_number, &current_url, status.as_u16(), HopMechanism::Terminal, None, step_started_at));
                            terminal = Some((true, status.as_u16(), None));
                            break;
                        }
                    },
                    None => {
                        steps.push(Self::step_record(step_number, &current_url, status.as_u16(), HopMechanism::Terminal, None, step_started_at));
                        terminal = Some((true, status.as_u16(), None));
                        break;
                    }
                }
            }

            // 6. 4xx/5xx: fallo terminal con snippet forense acotado en bytes.
            let failure_body = response.text().await.unwrap_or_default();
            let body_snippet = bounded_body_snippet(&failure_body);

            steps.push(Self::step_record(step_number, &current_url, status.as_u16(), HopMechanism::Terminal, None, step_started_at));
            terminal = Some((
                false,
                status.as_u16(),
                Some(format!("REDIRECT_TRACK_FAILED: HTTP {} body [{}]", status.as_u16(), body_snippet)),
            ));
            break;
        }

        // 7. AGOTAMIENTO DE SALTOS SIN TERMINAL
        let (success, final_status_code, error_message) = terminal.unwrap_or((
            false,
            0,
            Some(format!(
                "REDIRECT_TRACK_FAILED: exceeded max redirects ({})",
                request.max_redirects
            )),
        ));

        chain.push(current_url.clone());

        let domain_validation = request.target_domain.as_deref().map(|target_domain| {
            let expected_root = root_domain_of_url(target_domain);
            let observed_root = root_domain_of_url(&current_url);
            DomainValidation {
                matched: !expected_root.is_empty() && expected_root == observed_root,
                expected_root_domain: expected_root,
                observed_root_domain: observed_root,
            }
        });

        if !success {
            warn!(
                "🧭 [TRACER_FAULT]: Chain collapsed at [{}] after {} hops: {:?}",
                current_url, redirect_count, error_message
            );
        }

        TraceOutcome {
            success,
            final_url: current_url,
            final_status_code,
            redirect_count,
            chain,
            steps,
            duration_milliseconds: trace_started_at.elapsed().as_millis() as u64,
            domain_validation,
            error_message,
            early_stop,
        }
    }

    /// Construye el cliente del rastreo con política de redirección manual.
    fn build_step_client(request: &TraceRequest) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .timeout(request.request_timeout)
            .user_agent(request.user_agent.clone());

        if let Some(socks_url) = request.proxy_socks_url.as_deref() {
            builder = builder.proxy(reqwest::Proxy::all(socks_url)?);
        }

        builder.build()
    }

    /// Emite una petición con reintentos lineales sobre fallos recuperables.
    async fn fetch_with_retries(
        network_client: &Client,
        step_url: &str,
        referer_value: Option<&str>,
        step_timeout: Duration,
        retry_count: u32,
    ) -> StepFetch {
        let mut last_fault: Option<(&'static str, String)> = None;

        for attempt_number in 0..=retry_count {
            if attempt_number > 0 {
                // Backoff lineal: 100ms × intento.
                tokio::time::sleep(Duration::from_millis(
                    RETRY_BACKOFF_BASE_MILLISECONDS * attempt_number as u64,
                ))
                .await;
            }

            let mut request_builder = network_client.get(step_url).timeout(step_timeout);
            if let Some(referer) = referer_value {
                if let Ok(header_value) = HeaderValue::from_str(referer) {
                    request_builder = request_builder.header(REFERER, header_value);
                }
            }

            match request_builder.send().await {
                Ok(response) => return StepFetch::Response(response),
                Err(network_fault) => {
                    let (code, retryable) = Self::classify_transport_fault(&network_fault);
                    let detail = network_fault.to_string();
                    debug!(
                        "🧭 [TRACER_RETRY]: attempt {}/{} on [{}] -> {} ({})",
                        attempt_number + 1,
                        retry_count + 1,
                        step_url,
                        code,
                        detail
                    );
                    last_fault = Some((code, detail));
                    if !retryable {
                        break;
                    }
                }
            }
        }

        let (code, detail) = last_fault.unwrap_or(("REDIRECT_TRACK_FAILED", "unreachable".to_string()));
        StepFetch::TransportFault { code, detail }
    }

    /// Clasifica un fallo de transporte en token estable + retryabilidad.
    fn classify_transport_fault(network_fault: &reqwest::Error) -> (&'static str, bool) {
        if network_fault.is_timeout() {
            return ("TIMEOUT", true);
        }
        if network_fault.is_connect() {
            return ("PROXY_UNAVAILABLE", true);
        }

        let rendered = network_fault.to_string();
        let recoverable_markers = ["reset", "aborted", "dns", "not found", "closed"];
        if recoverable_markers.iter().any(|marker| rendered.to_ascii_lowercase().contains(marker)) {
            return ("REDIRECT_TRACK_FAILED", true);
        }

        ("REDIRECT_TRACK_FAILED", false)
    }

    /// Resuelve un candidato contra la URL actual; solo http(s) es navegable.
    fn resolve_navigable(current_url: &str, candidate: &str) -> Option<String> {
        let base = Url::parse(current_url).ok()?;
        let resolved = base.join(candidate.trim()).ok()?;
        match resolved.scheme() {
            "http" | "https" => Some(resolved.to_string()),
            _ => None,
        }
    }

    /// Registro forense de un paso.
    fn step_record(
        step_number: u32,
        step_url: &str,
        status_code: u16,
        mechanism: HopMechanism,
        resolved_target: Option<String>,
        step_started_at: Instant,
    ) -> TraceStep {
        TraceStep {
            step_number,
            url: step_url.to_string(),
            status_code,
            mechanism,
            resolved_target,
            duration_milliseconds: step_started_at.elapsed().as_millis() as u64,
        }
    }

    /// Sobre de fallo de transporte previo a cualquier paso.
    fn transport_failure_outcome(
        request: &TraceRequest,
        code: &str,
        detail: &str,
        chain: Vec<String>,
        steps: Vec<TraceStep>,
        trace_started_at: Instant,
    ) -> TraceOutcome {
        TraceOutcome {
            success: false,
            final_url: request.url.clone(),
            final_status_code: 0,
            redirect_count: 0,
            chain,
            steps,
            duration_milliseconds: trace_started_at.elapsed().as_millis() as u64,
            domain_validation: None,
            error_message: Some(format!("{}: {}", code, detail)),
            early_stop: false,
        }
    }
}
