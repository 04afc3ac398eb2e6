// [libs/core/pacing/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CLICK PACING ROOT (V5.0 - DIURNAL AUTHORITY)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: MATEMÁTICA PURA DE PLANIFICACIÓN Y DIVERSIDAD
 *
 * # Logic:
 * Esta crate es deliberadamente pura: no hace I/O ni conoce zonas
 * horarias. Opera sobre tiempos de pared locales (NaiveDateTime) y el
 * orquestador realiza la conversión a UTC en el borde de persistencia.
 * =================================================================
 */

/// Bibliotecas de diversidad: User-Agents y Referers.
pub mod diversity;
/// Distribución diurna de N clicks sobre el resto del día.
pub mod schedule;

pub use diversity::{pick_random_referer, pick_random_user_agent, REFERER_LIBRARY, USER_AGENT_LIBRARY};
pub use schedule::{plan_click_schedule, HOUR_WEIGHTS};
