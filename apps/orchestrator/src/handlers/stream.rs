// [apps/orchestrator/src/handlers/stream.rs]
/*!
 * =================================================================
 * APARATO: PROGRESS STREAM HANDLER (V4.2 - SSE GATEWAY)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: STREAMING ORDENADO DE TRABAJOS DE LARGA DURACIÓN
 *
 * # Mathematical Proof (Cancellation Propagation):
 * El transporte SSE posee el receptor del canal mpsc. Cuando el
 * cliente desconecta, Axum suelta el stream, el receptor muere y el
 * siguiente emit() del productor devuelve false: el barrido observa
 * la cancelación y detiene el trabajo restante sin fugas de tareas.
 * =================================================================
 */

use crate::middleware::OperatorIdentity;
use crate::services::{progress_channel, StockProducer};
use crate::state::AppState;
use axum::{
    extract::{Extension, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use futures_util::StreamExt;
use kylink_domain_models::ProgressStage;
use std::convert::Infallible;
use tracing::{instrument, warn};

pub struct ProgressStreamHandler;

impl ProgressStreamHandler {
    /**
     * Endpoint: GET /api/v1/stream/replenish
     *
     * Lanza el barrido de reposición y transmite sus eventos en orden;
     * un único evento terminal (done | error) cierra el stream.
     */
    #[instrument(skip(application_state, operator), fields(operator = %operator.operator_identifier))]
    pub async fn stream_replenish_sweep(
        State(application_state): State<AppState>,
        Extension(operator): Extension<OperatorIdentity>,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        let (progress_emitter, event_receiver) = progress_channel();

        let producer_emitter = progress_emitter.clone();
        tokio::spawn(async move {
            let producer = StockProducer::new(application_state);
            match producer.sweep_all_campaigns(Some(producer_emitter.clone())).await {
                Ok(summary) => {
                    let completed = summary
                        .get("completed")
                        .and_then(|value| value.as_u64())
                        .unwrap_or(0);
                    producer_emitter
                        .finish(ProgressStage::Done, completed, "replenish sweep complete")
                        .await;
                }
                Err(sweep_fault) => {
                    warn!("📡 [STREAM]: Sweep collapsed: {}", sweep_fault);
                    producer_emitter
                        .finish(ProgressStage::Error, 0, "replenish sweep failed")
                        .await;
                }
            }
        });

        let sse_events = event_receiver.map(|progress_event| {
            Ok(Event::default()
                .json_data(&progress_event)
                .unwrap_or_else(|_| Event::default().data("{}")))
        });

        Sse::new(sse_events).keep_alive(KeepAlive::default())
    }
}
