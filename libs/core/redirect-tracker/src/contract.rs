// [libs/core/redirect-tracker/src/contract.rs]
/*!
 * =================================================================
 * APARATO: TRACE CONTRACTS (V5.0 - RESULT TUPLES)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: SOBRES DE ENTRADA Y SALIDA DEL RASTREADOR
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Solicitud de rastreo de una cadena de redirecciones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRequest {
    /// URL de arranque de la cadena.
    pub url: String,
    /// URL socks5:// con credenciales materializadas; None = egreso directo.
    pub proxy_socks_url: Option<String>,
    /// Dominio objetivo para la parada temprana (forma raíz).
    pub target_domain: Option<String>,
    /// Referer del primer salto; los siguientes usan la URL previa.
    pub initial_referer: Option<String>,
    /// Tope de saltos de la cadena.
    pub max_redirects: u32,
    /// Timeout de cada petición individual.
    #[serde(with = "duration_seconds")]
    pub request_timeout: Duration,
    /// Timeout de pared de la cadena completa.
    #[serde(with = "duration_seconds")]
    pub total_timeout: Duration,
    /// Reintentos por petición ante fallos recuperables.
    pub retry_count: u32,
    /// User-Agent emitido en cada petición.
    pub user_agent: String,
}

/// Serialización de duraciones como segundos enteros para los reportes.
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Mecanismo que produjo el avance de un paso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopMechanism {
    /// Redirección HTTP 3xx con cabecera Location.
    HttpLocation,
    /// Etiqueta <meta http-equiv="refresh"> en el cuerpo.
    MetaRefresh,
    /// Asignación de location detectada por la biblioteca de patrones JS.
    JavascriptJump,
    /// Paso terminal sin redirección.
    Terminal,
}

/// Registro forense de un paso individual del rastreo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    /// Número de paso (1-indexado).
    pub step_number: u32,
    /// URL solicitada en este paso.
    pub url: String,
    /// Código de estado devuelto (0 si la petición no llegó a responder).
    pub status_code: u16,
    /// Mecanismo de avance detectado.
    pub mechanism: HopMechanism,
    /// Destino resuelto del salto, si hubo.
    pub resolved_target: Option<String>,
    /// Duración física del paso en milisegundos.
    pub duration_milliseconds: u64,
}

/// Veredicto de validación del dominio objetivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainValidation {
    /// Dominio raíz esperado.
    pub expected_root_domain: String,
    /// Dominio raíz observado en la URL final.
    pub observed_root_domain: String,
    pub matched: bool,
}

/// Resultado completo de un rastreo. Nunca se propaga como Err.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceOutcome {
    pub success: bool,
    /// Última URL alcanzada por la cadena.
    pub final_url: String,
    /// Estado HTTP del último paso (0 en fallos de transporte).
    pub final_status_code: u16,
    /// Cantidad de redirecciones seguidas.
    pub redirect_count: u32,
    /// URLs visitadas en orden, cerrando con la URL final.
    pub chain: Vec<String>,
    /// Rastro forense paso a paso.
    pub steps: Vec<TraceStep>,
    /// Duración de pared total en milisegundos.
    pub duration_milliseconds: u64,
    /// Validación contra el dominio objetivo, si fue suministrado.
    pub domain_validation: Option<DomainValidation>,
    /// "CODE: detalle" en fallos; None en éxito.
    pub error_message: Option<String>,
    /// true si la cadena se detuvo por coincidencia de dominio objetivo.
    pub early_stop: bool,
}

impl TraceOutcome {
    /// Sufijo de tracking: subcadena de la URL final tras `?` y antes de `#`.
    pub fn extract_suffix(&self) -> Option<String> {
        let after_query = self.final_url.split_once('?')?.1;
        let before_fragment = after_query.split('#').next().unwrap_or(after_query);
        if before_fragment.is_empty() {
            None
        } else {
            Some(before_fragment.to_string())
        }
    }
}
