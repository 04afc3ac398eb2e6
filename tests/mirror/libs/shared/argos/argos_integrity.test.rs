// [tests/mirror/libs/shared/argos/argos_integrity.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE OBSERVABILIDAD ARGOS (V2.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE IGNICIÓN Y DEL LEDGER DE COLAPSOS
 * =================================================================
 */

use kylink_shared_argos::{drain_panic_records, init_tracing};

/**
 * CERTIFICACIÓN: La ignición no colapsa y todo pánico capturado queda
 * sellado en el ledger para el monitor de alertas.
 */
#[test]
fn certify_ignition_and_collapse_ledger() {
    init_tracing("kylink_argos_proving_grounds");

    tracing::info!("🧪 [PROVING_GROUNDS]: Argos emission path certified.");
    tracing::debug!("debug stratum reachable");

    // Un colapso controlado debe atravesar el hook y quedar sellado.
    let collapse_result = std::panic::catch_unwind(|| {
        panic!("controlled collapse for ledger certification");
    });
    assert!(collapse_result.is_err());

    let sealed_records = drain_panic_records();
    assert_eq!(sealed_records.len(), 1, "exactly one collapse must be sealed");

    let record = &sealed_records[0];
    assert_eq!(record.service, "kylink_argos_proving_grounds");
    assert!(record.payload.contains("controlled collapse"));
    assert!(record.location.contains("argos_integrity"), "collapse coordinates expected");

    // El drenado deja el ledger vacío para la siguiente evaluación.
    assert!(drain_panic_records().is_empty());

    println!("✅ L4_ARGOS: Ignition and collapse ledger certified.");
}
