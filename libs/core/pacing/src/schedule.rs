// [libs/core/pacing/src/schedule.rs]
/*!
 * =================================================================
 * APARATO: DIURNAL SCHEDULE PLANNER (V5.1 - RESIDUAL SEALED)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: DISTRIBUCIÓN HUMANA DE N CLICKS EN EL DÍA RESTANTE
 *
 * # Mathematical Proof (Exact Allocation):
 * Los cupos por franja se redondean proporcionalmente al peso, con el
 * cupo acumulado acotado por N en cada paso; la última franja absorbe
 * el residuo N - asignado, que es no negativo por la cota anterior.
 * Por lo tanto Σ slotCounts == N para todo N y todo instante de inicio.
 * =================================================================
 */

use chrono::{Duration, NaiveDateTime, Timelike};
use rand::Rng;

/// Curva diurna fija de intensidad de navegación humana (índices 0..23).
/// Pico 18-20h, valle 02-04h.
pub const HOUR_WEIGHTS: [f64; 24] = [
    0.1, 0.05, 0.02, 0.02, 0.03, 0.05, 0.15, 0.4, 0.8, 1.2, 1.5, 1.6,
    1.3, 1.4, 1.6, 1.7, 1.8, 1.9, 2.0, 2.2, 2.0, 1.6, 1.0, 0.5,
];

/// Franja horaria candidata con su ventana efectiva y peso ponderado.
struct HourSlot {
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    weighted_share: f64,
}

/// Sorteo uniforme de un instante dentro de una ventana.
fn draw_uniform_instant<R: Rng>(
    generator: &mut R,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> NaiveDateTime {
    let span_milliseconds = (window_end - window_start).num_milliseconds().max(1);
    window_start + Duration::milliseconds(generator.gen_range(0..span_milliseconds))
}

/**
 * Planifica N marcas temporales humanas entre `from` y el fin del día.
 *
 * # Edge cases:
 * - N == 0 devuelve vacío.
 * - `from` en o después de 23:59:59.999 distribuye N uniformemente en
 *   los 60 segundos siguientes.
 */
pub fn plan_click_schedule(click_count: u32, from: NaiveDateTime) -> Vec<NaiveDateTime> {
    if click_count == 0 {
        return Vec::new();
    }

    let mut generator = rand::thread_rng();

    let end_of_day = from
        .date()
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("static wall-clock components");

    // RÁFAGA NOCTURNA: sin día restante, todo cae en el próximo minuto.
    if from >= end_of_day {
        let mut burst: Vec<NaiveDateTime> = (0..click_count)
            .map(|_| from + Duration::milliseconds(generator.gen_range(0..60_000)))
            .collect();
        burst.sort();
        return burst;
    }

    // 1. CONSTRUCCIÓN DE FRANJAS: peso × fracción disponible de la hora.
    let mut slots: Vec<HourSlot> = Vec::new();
    for hour in from.hour()..24 {
        let hour_start = from
            .date()
            .and_hms_opt(hour, 0, 0)
            .expect("static wall-clock components");
        let hour_end = if hour == 23 {
            end_of_day
        } else {
            from.date()
                .and_hms_opt(hour + 1, 0, 0)
                .expect("static wall-clock components")
        };

        let window_start = hour_start.max(from);
        if window_start >= hour_end {
            continue;
        }

        let available_fraction =
            (hour_end - window_start).num_milliseconds() as f64 / 3_600_000.0;
        slots.push(HourSlot {
            window_start,
            window_end: hour_end,
            weighted_share: HOUR_WEIGHTS[hour as usize] * available_fraction,
        });
    }

    let total_weight: f64 = slots.iter().map(|slot| slot.weighted_share).sum();
    if slots.is_empty() || total_weight <= f64::EPSILON {
        let mut burst: Vec<NaiveDateTime> = (0..click_count)
            .map(|_| from + Duration::milliseconds(generator.gen_range(0..60_000)))
            .collect();
        burst.sort();
        return burst;
    }

    // 2. ASIGNACIÓN PROPORCIONAL: la última franja absorbe el residuo.
    let mut allocated_total: u32 = 0;
    let mut scheduled: Vec<NaiveDateTime> = Vec::with_capacity(click_count as usize);

    for (slot_index, slot) in slots.iter().enumerate() {
        let is_last_slot = slot_index == slots.len() - 1;

        let slot_quota = if is_last_slot {
            click_count - allocated_total
        } else {
            let proportional =
                (click_count as f64 * slot.weighted_share / total_weight).round() as u32;
            proportional.min(click_count - allocated_total)
        };

        allocated_total += slot_quota;

        // 3. SORTEO UNIFORME DENTRO DE LA FRANJA
        for _ in 0..slot_quota {
            scheduled.push(draw_uniform_instant(
                &mut generator,
                slot.window_start,
                slot.window_end,
            ));
        }
    }

    scheduled.sort();
    scheduled
}
