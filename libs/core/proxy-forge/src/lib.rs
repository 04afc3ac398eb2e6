// [libs/core/proxy-forge/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PROXY FORGE ROOT (V5.0 - EGRESS AUTHORITY)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: EXPOSICIÓN DE LA FORJA DE CANALES DE EGRESO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXIT-IP IDENTITY: La identidad efectiva de un proxy es la IP de
 *    salida observada por reporteros externos, no su host físico.
 * 2. LEDGER DISCIPLINE: El carrusel consulta el conjunto de IPs usadas
 *    en 24h pero jamás escribe en él; el registro es responsabilidad
 *    del consumidor tras el uso exitoso.
 * 3. FALLBACK HONESTY: El camino de contingencia por sonda de
 *    conectividad entrega identidad 'Unknown', que nunca se registra.
 * =================================================================
 */

/// Carrusel de selección por prioridad con deduplicación de IP de salida.
pub mod carousel;
/// Resolución paralela de la IP de salida vía reporteros externos.
pub mod ip_check;
/// Materialización de plantillas de credenciales.
pub mod templating;

pub use carousel::ProxyCarousel;
pub use ip_check::{probe_connectivity, resolve_exit_ip};
pub use templating::{build_socks_url, materialize_username};
