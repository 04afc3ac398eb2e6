// [libs/domain/models-rs/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION TEST (V4.0 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DE LOS CONTRATOS
 *
 * # Mathematical Proof (Wire Parity):
 * Los scripts de Google Ads serializan en camelCase. El test certifica
 * que el renombrado serde preserva bit-perfecto cada clave del contrato
 * externo (leaseId, finalUrlSuffix, nowClicks) en ambos sentidos.
 * =================================================================
 */
