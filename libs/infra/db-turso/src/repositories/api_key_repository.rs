// [libs/infra/db-turso/src/repositories/api_key_repository.rs]
/*!
 * =================================================================
 * APARATO: API KEY REPOSITORY (V4.1 - DIGEST GOVERNANCE)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: AUTENTICACIÓN POR DIGEST SHA-256 DE TOKENS
 *
 * # Logic:
 * El token en claro jamás se persiste: la tabla guarda su digest
 * SHA-256 en hexadecimal. El formato aceptado es ky_live_/ky_test_
 * seguido de 32 caracteres hexadecimales.
 * =================================================================
 */

use crate::errors::DbError;
use crate::TursoClient;
use chrono::Utc;
use libsql::params;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Identidad autenticada resuelta desde un digest de token.
#[derive(Debug, Clone)]
pub struct AuthenticatedOperator {
    pub user_id: String,
    pub suspended: bool,
}

/// Digest SHA-256 hexadecimal de un bearer token.
pub fn digest_bearer_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Valida el formato nominal del token: ky_live_/ky_test_ + 32 hex.
pub fn token_has_valid_shape(raw_token: &str) -> bool {
    let suffix = raw_token
        .strip_prefix("ky_live_")
        .or_else(|| raw_token.strip_prefix("ky_test_"));

    match suffix {
        Some(tail) => tail.len() == 32 && tail.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub struct ApiKeyRepository {
    database_client: TursoClient,
}

impl ApiKeyRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Resuelve la identidad del operador desde el digest del token y
     * sella la marca de último uso.
     */
    #[instrument(skip(self, token_digest))]
    pub async fn authenticate_digest(
        &self,
        token_digest: &str,
    ) -> Result<Option<AuthenticatedOperator>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut query_results = connection
            .query(
                "SELECT user_id, suspended FROM api_keys WHERE token_digest = ? LIMIT 1",
                params![token_digest],
            )
            .await?;

        let Some(row) = query_results.next().await? else {
            return Ok(None);
        };

        let operator = AuthenticatedOperator {
            user_id: row.get::<String>(0)?,
            suspended: row.get::<i64>(1)? != 0,
        };

        connection
            .execute(
                "UPDATE api_keys SET last_used_at = ? WHERE token_digest = ?",
                params![Utc::now().to_rfc3339(), token_digest],
            )
            .await?;

        debug!("🔐 [API_KEY]: Operator [{}] resolved from digest.", operator.user_id);
        Ok(Some(operator))
    }

    /// Alta de clave (seed y Proving Grounds). Persiste solo el digest.
    pub async fn insert_key(
        &self,
        user_id: &str,
        raw_token: &str,
        label: &str,
    ) -> Result<String, DbError> {
        let new_identifier = Uuid::new_v4().to_string();
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO api_keys (id, user_id, token_digest, label, suspended, created_at) \
                 VALUES (?, ?, ?, ?, 0, ?)",
                params![
                    new_identifier.clone(),
                    user_id,
                    digest_bearer_token(raw_token),
                    label,
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(new_identifier)
    }

    /// Suspensión administrativa del operador completo.
    pub async fn set_suspended(&self, user_id: &str, suspended: bool) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE api_keys SET suspended = ? WHERE user_id = ?",
                params![if suspended { 1i64 } else { 0i64 }, user_id],
            )
            .await?;
        Ok(affected)
    }
}
