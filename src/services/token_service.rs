//! Access token minting, hashing and revocation.
//!
//! Tokens are 32 random bytes rendered as 64 hex characters. The database
//! only ever sees their SHA-256 hash.

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{AccessToken, AccessTokenResponse},
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a cryptographically secure random token.
///
/// # Output
///
/// 64 hex characters (32 random bytes)
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 hash of a token, hex encoded.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mint a token for `user_id` and return it with its plaintext.
///
/// Generic over the executor so callers can mint inside a transaction.
pub async fn mint<'e, E>(
    executor: E,
    user_id: Uuid,
    label: &str,
) -> Result<(AccessToken, String), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let token = generate_token();

    let record = sqlx::query_as::<_, AccessToken>(
        r#"
        INSERT INTO access_tokens (user_id, label, token_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(label)
    .bind(hash_token(&token))
    .fetch_one(executor)
    .await?;

    Ok((record, token))
}

/// Mint a labelled token for the calling user.
pub async fn create_token(
    pool: &DbPool,
    user_id: Uuid,
    label: &str,
) -> Result<AccessTokenResponse, AppError> {
    let label = label.trim();
    if label.is_empty() || label.len() > 100 {
        return Err(AppError::InvalidRequest(
            "Token label must be 1-100 characters".to_string(),
        ));
    }

    let (record, token) = mint(pool, user_id, label).await?;
    tracing::info!(user_id = %user_id, token_id = %record.id, "Access token created");

    Ok(AccessTokenResponse::from(record).with_token(token))
}

/// List a user's tokens, newest first. Secrets are never returned.
pub async fn list_tokens(
    pool: &DbPool,
    user_id: Uuid,
) -> Result<Vec<AccessTokenResponse>, AppError> {
    let tokens = sqlx::query_as::<_, AccessToken>(
        "SELECT * FROM access_tokens WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(tokens.into_iter().map(Into::into).collect())
}

/// Revoke one of the user's tokens (soft delete).
pub async fn revoke_token(pool: &DbPool, user_id: Uuid, token_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE access_tokens
        SET revoked_at = NOW()
        WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL
        "#,
    )
    .bind(token_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("token"));
    }

    tracing::info!(user_id = %user_id, token_id = %token_id, "Access token revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_matches_known_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn hash_is_not_the_token() {
        let token = generate_token();
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token(&token), hash_token(&token));
    }
}
