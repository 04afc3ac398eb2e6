// [tests/mirror/libs/core/redirect_tracker/tracker_chain.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CADENAS DE REDIRECCIÓN (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL RASTREADOR CONTRA SERVIDOR SINTÉTICO
 *
 * # Mathematical Proof (Chain Fidelity):
 * Un servidor local sirve hop1 -> hop2 vía 302, hop2 -> hop3 vía
 * meta-refresh y hop3 terminal con query de tracking. El rastreador
 * debe reportar la cadena completa, el estado final 200 y derivar el
 * sufijo exacto de la URL final.
 * =================================================================
 */

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use kylink_core_tracker::{RedirectTracer, TraceRequest};
use std::time::Duration;

/// Levanta el servidor sintético de la cadena en un puerto efímero.
async fn spawn_chain_server() -> String {
    let chain_router = Router::new()
        .route(
            "/hop1",
            get(|| async {
                (StatusCode::FOUND, [(header::LOCATION, "/hop2")]).into_response()
            }),
        )
        .route(
            "/hop2",
            get(|| async {
                Html(r#"<html><head><meta http-equiv="refresh" content="0;url=/hop3?gclid=abc"></head></html>"#)
            }),
        )
        .route(
            "/hop3",
            get(|| async { Html("<html><body>terminal landing</body></html>") }),
        )
        .route(
            "/js-hop",
            get(|| async {
                Html(r#"<html><script>window.location.href = '/hop3?gclid=js77';</script></html>"#)
            }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "synthetic collapse") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port bind failed");
    let bound_address = listener.local_addr().expect("local addr unavailable");

    tokio::spawn(async move {
        let _ = axum::serve(listener, chain_router).await;
    });

    format!("http://{}", bound_address)
}

fn trace_request_for(url: String) -> TraceRequest {
    TraceRequest {
        url,
        proxy_socks_url: None,
        target_domain: None,
        initial_referer: Some("https://t.co".to_string()),
        max_redirects: 15,
        request_timeout: Duration::from_secs(10),
        total_timeout: Duration::from_secs(30),
        retry_count: 1,
        user_agent: "Mozilla/5.0 (ProvingGrounds) Kylink/1.0".to_string(),
    }
}

/**
 * CERTIFICACIÓN: Cadena 302 -> meta-refresh -> terminal con sufijo.
 */
#[tokio::test]
async fn certify_http_meta_chain_with_suffix() {
    let base_url = spawn_chain_server().await;
    let outcome = RedirectTracer::trace(&trace_request_for(format!("{}/hop1", base_url))).await;

    assert!(outcome.success, "chain should terminate cleanly: {:?}", outcome.error_message);
    assert_eq!(outcome.final_status_code, 200);
    assert_eq!(outcome.redirect_count, 2);
    assert_eq!(outcome.chain.len(), 4, "chain closes with the final URL");
    assert!(outcome.final_url.ends_with("/hop3?gclid=abc"));
    assert_eq!(outcome.extract_suffix().as_deref(), Some("gclid=abc"));

    println!("✅ L1_TRACKER: HTTP + meta-refresh chain certified.");
}

/**
 * CERTIFICACIÓN: Salto JavaScript detectado por la biblioteca de patrones.
 */
#[tokio::test]
async fn certify_javascript_jump_chain() {
    let base_url = spawn_chain_server().await;
    let outcome = RedirectTracer::trace(&trace_request_for(format!("{}/js-hop", base_url))).await;

    assert!(outcome.success);
    assert_eq!(outcome.redirect_count, 1);
    assert_eq!(outcome.extract_suffix().as_deref(), Some("gclid=js77"));

    println!("✅ L1_TRACKER: JavaScript jump chain certified.");
}

/**
 * CERTIFICACIÓN: Parada temprana al alcanzar el dominio objetivo.
 */
#[tokio::test]
async fn certify_early_stop_on_target_domain() {
    let base_url = spawn_chain_server().await;

    let mut request = trace_request_for(format!("{}/hop1", base_url));
    request.target_domain = Some("127.0.0.1".to_string());

    let outcome = RedirectTracer::trace(&request).await;

    assert!(outcome.success);
    assert!(outcome.early_stop, "arrival at target root must skip the final fetch");
    // Solo hop1 fue fetcheado: el paso 2 se detuvo antes de la petición.
    assert_eq!(outcome.steps.len(), 1);
    let validation = outcome.domain_validation.expect("domain validation expected");
    assert!(validation.matched);

    println!("✅ L1_TRACKER: Early stop certified.");
}

/**
 * CERTIFICACIÓN: Fallo HTTP terminal con snippet forense acotado.
 */
#[tokio::test]
async fn certify_http_failure_snippet() {
    let base_url = spawn_chain_server().await;
    let outcome = RedirectTracer::trace(&trace_request_for(format!("{}/broken", base_url))).await;

    assert!(!outcome.success);
    assert_eq!(outcome.final_status_code, 500);
    let message = outcome.error_message.expect("failure message expected");
    assert!(message.starts_with("REDIRECT_TRACK_FAILED"));
    assert!(message.contains("synthetic collapse"));

    println!("✅ L1_TRACKER: Terminal failure snippet certified.");
}

/**
 * CERTIFICACIÓN: Terminación acotada ante un destino inalcanzable.
 */
#[tokio::test]
async fn certify_bounded_termination_on_unreachable_target() {
    // Puerto cerrado: el rastreador debe reportar fallo de transporte.
    let mut request = trace_request_for("http://127.0.0.1:9/never".to_string());
    request.retry_count = 1;
    request.request_timeout = Duration::from_secs(2);
    request.total_timeout = Duration::from_secs(6);

    let outcome = RedirectTracer::trace(&request).await;

    assert!(!outcome.success);
    assert_eq!(outcome.final_status_code, 0);
    assert!(outcome.error_message.is_some());

    println!("✅ L1_TRACKER: Bounded termination certified.");
}
