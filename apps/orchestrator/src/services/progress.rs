// [apps/orchestrator/src/services/progress.rs]
/*!
 * =================================================================
 * APARATO: PROGRESS STREAM BRIDGE (V4.0 - CANCELLATION AWARE)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L2-APP)
 * RESPONSABILIDAD: CANAL PRODUCTOR-CONSUMIDOR DE EVENTOS ORDENADOS
 *
 * # Logic:
 * El cuerpo del trabajo emite eventos por un canal mpsc; la capa HTTP
 * drena el receptor hacia el stream SSE. Cuando el transporte cae, el
 * receptor se suelta, el envío falla y el productor observa la
 * cancelación deteniendo el trabajo restante tan pronto como puede.
 * =================================================================
 */

use kylink_domain_models::{ProgressEvent, ProgressStage};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Capacidad del buffer de eventos entre el trabajo y el transporte.
const PROGRESS_BUFFER_CAPACITY: usize = 64;

/// Emisor de progreso entregado al cuerpo del trabajo.
#[derive(Clone)]
pub struct ProgressEmitter {
    event_sender: mpsc::Sender<ProgressEvent>,
}

impl ProgressEmitter {
    /**
     * Emite un evento en orden. Devuelve false cuando el consumidor
     * canceló el stream: el productor debe detenerse.
     */
    pub async fn emit(&self, event: ProgressEvent) -> bool {
        if self.event_sender.send(event).await.is_err() {
            debug!("📡 [PROGRESS]: Consumer vanished; signalling cancellation to producer.");
            return false;
        }
        true
    }

    /// Emite el evento terminal del stream (done | error).
    pub async fn finish(&self, stage: ProgressStage, total: u64, message: &str) {
        let _ = self
            .event_sender
            .send(ProgressEvent::milestone(stage, total, total, message))
            .await;
    }

    /// Observación no bloqueante de la cancelación del consumidor.
    pub fn is_cancelled(&self) -> bool {
        self.event_sender.is_closed()
    }
}

/// Construye el puente productor-consumidor para un trabajo streaming.
pub fn progress_channel() -> (ProgressEmitter, ReceiverStream<ProgressEvent>) {
    let (event_sender, event_receiver) = mpsc::channel(PROGRESS_BUFFER_CAPACITY);
    (
        ProgressEmitter { event_sender },
        ReceiverStream::new(event_receiver),
    )
}
