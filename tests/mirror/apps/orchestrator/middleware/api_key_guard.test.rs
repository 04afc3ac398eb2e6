// [tests/mirror/apps/orchestrator/middleware/api_key_guard.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL GUARDIA PERIMETRAL (V1.2 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE FORMA DE TOKEN Y CIUDADANÍA DIGEST
 * =================================================================
 */

use kylink_infra_db::repositories::{
    digest_bearer_token, token_has_valid_shape, ApiKeyRepository,
};
use kylink_infra_db::TursoClient;

const OPERATOR: &str = "operator-guard";
const VALID_TOKEN: &str = "ky_live_0123456789abcdef0123456789abcdef";

/**
 * CERTIFICACIÓN: Solo ky_live_/ky_test_ + 32 hex pasa el gate de forma.
 */
#[test]
fn certify_token_shape_gate() {
    assert!(token_has_valid_shape(VALID_TOKEN));
    assert!(token_has_valid_shape("ky_test_ffffffffffffffffffffffffffffffff"));

    assert!(!token_has_valid_shape("ky_live_short"));
    assert!(!token_has_valid_shape("ky_prod_0123456789abcdef0123456789abcdef"));
    assert!(!token_has_valid_shape("ky_live_0123456789abcdef0123456789abcdeZ"));
    assert!(!token_has_valid_shape(""));

    println!("✅ L4_GUARD: Token shape gate certified.");
}

/**
 * CERTIFICACIÓN: El digest SHA-256 es determinista y jamás igual al token.
 */
#[test]
fn certify_digest_determinism() {
    let first_digest = digest_bearer_token(VALID_TOKEN);
    let second_digest = digest_bearer_token(VALID_TOKEN);

    assert_eq!(first_digest, second_digest);
    assert_eq!(first_digest.len(), 64, "sha-256 renders as 64 hex chars");
    assert_ne!(first_digest, VALID_TOKEN);
    assert_ne!(digest_bearer_token("ky_test_ffffffffffffffffffffffffffffffff"), first_digest);

    println!("✅ L4_GUARD: Digest determinism certified.");
}

/**
 * CERTIFICACIÓN: Resolución de identidad por digest y suspensión.
 */
#[tokio::test]
async fn certify_digest_citizenship_and_suspension() {
    let client = TursoClient::connect("file:api_key_guard?mode=memory&cache=shared", None)
        .await
        .expect("memory strata ignition failed");

    let repository = ApiKeyRepository::new(client.clone());
    repository
        .insert_key(OPERATOR, VALID_TOKEN, "guard proving key")
        .await
        .expect("key insert failed");

    // Ciudadanía reconocida.
    let operator = repository
        .authenticate_digest(&digest_bearer_token(VALID_TOKEN))
        .await
        .expect("authentication backend collapsed")
        .expect("operator not resolved");
    assert_eq!(operator.user_id, OPERATOR);
    assert!(!operator.suspended);

    // Digest desconocido: sin identidad.
    let stranger = repository
        .authenticate_digest(&digest_bearer_token("ky_live_deadbeefdeadbeefdeadbeefdeadbeef"))
        .await
        .expect("authentication backend collapsed");
    assert!(stranger.is_none());

    // Suspensión administrativa visible en la resolución.
    repository
        .set_suspended(OPERATOR, true)
        .await
        .expect("suspension failed");
    let suspended_operator = repository
        .authenticate_digest(&digest_bearer_token(VALID_TOKEN))
        .await
        .expect("authentication backend collapsed")
        .expect("operator not resolved");
    assert!(suspended_operator.suspended);

    println!("✅ L4_GUARD: Digest citizenship and suspension certified.");
}
