//! Store interfaces the core depends on, plus their Postgres
//! implementations.
//!
//! The failed-attempt increment is a single store call so two concurrent
//! failures against the same principal can never lose an increment; the
//! Postgres implementation computes increment-or-trip inside one UPDATE.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::models::{AttemptOutcome, Principal, PrincipalKind, RefreshTokenRecord};

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>>;

    /// Lookup by normalized email, active or not.
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>>;

    /// Lookup a parent still inside its set-password window.
    async fn find_by_verify_token(&self, token: &str) -> Result<Option<Principal>>;

    /// Lookup an unpaired child by its one-time pairing code.
    async fn find_by_pairing_code(&self, code: &str) -> Result<Option<Principal>>;

    /// Resolve a family code to the active child of that family.
    async fn find_active_child_by_family_code(&self, code: &str) -> Result<Option<Principal>>;

    async fn create(&self, principal: &Principal) -> Result<()>;

    /// Set credentials on a parent: stores name/phone/secret hash, consumes
    /// the verify token, and activates the account in one update.
    async fn set_credentials(
        &self,
        id: Uuid,
        name: &str,
        phone_number: Option<&str>,
        secret_hash: &str,
    ) -> Result<()>;

    /// Activate a child: clears both pairing fields and flips `active`, the
    /// irreversible CREATED -> ACTIVE transition.
    async fn activate_child(&self, id: Uuid) -> Result<()>;

    /// Atomic increment-with-threshold: bumps the failure counter, and when
    /// the incremented value reaches `max_attempts` resets it to zero and
    /// imposes the lock instead.
    async fn record_failure(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<AttemptOutcome>;

    /// Reset the counter and clear any lock after a verified success.
    async fn clear_attempts(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<()>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Mark matching tokens revoked. Idempotent: already-revoked rows keep
    /// their original timestamp and missing rows are a no-op.
    async fn revoke_by_hash(&self, token_hash: &str, revoked_at: DateTime<Utc>) -> Result<()>;
}

const PRINCIPAL_COLUMNS: &str = "id, kind, name, email, phone_number, secret_hash, active, \
     failed_attempts, locked_until, family_code, verify_token, pairing_code, \
     pairing_code_expires_at, parent_id";

pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, where_clause: &str, bind: &str) -> Result<Option<Principal>> {
        let query =
            format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE {where_clause} LIMIT 1");
        let row = sqlx::query(&query)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .context("failed to query principal")?;
        row.map(|row| principal_from_row(&row)).transpose()
    }
}

fn principal_from_row(row: &PgRow) -> Result<Principal> {
    let kind: String = row.try_get("kind")?;
    let kind = PrincipalKind::parse(&kind).map_err(anyhow::Error::msg)?;
    Ok(Principal {
        id: row.try_get("id")?,
        kind,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        secret_hash: row.try_get("secret_hash")?,
        active: row.try_get("active")?,
        failed_attempts: row.try_get("failed_attempts")?,
        locked_until: row.try_get("locked_until")?,
        family_code: row.try_get("family_code")?,
        verify_token: row.try_get("verify_token")?,
        pairing_code: row.try_get("pairing_code")?,
        pairing_code_expires_at: row.try_get("pairing_code_expires_at")?,
        parent_id: row.try_get("parent_id")?,
    })
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>> {
        let query = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to query principal by id")?;
        row.map(|row| principal_from_row(&row)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
        self.find_one("email = $1", email).await
    }

    async fn find_by_verify_token(&self, token: &str) -> Result<Option<Principal>> {
        self.find_one("verify_token = $1 AND kind = 'PARENT'", token)
            .await
    }

    async fn find_by_pairing_code(&self, code: &str) -> Result<Option<Principal>> {
        self.find_one("pairing_code = $1 AND kind = 'CHILD'", code)
            .await
    }

    async fn find_active_child_by_family_code(&self, code: &str) -> Result<Option<Principal>> {
        let query = format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals \
             WHERE kind = 'CHILD' AND active \
               AND parent_id = (SELECT id FROM principals WHERE family_code = $1) \
             LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("failed to query child by family code")?;
        row.map(|row| principal_from_row(&row)).transpose()
    }

    async fn create(&self, principal: &Principal) -> Result<()> {
        let query = format!(
            "INSERT INTO principals ({PRINCIPAL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&query)
            .bind(principal.id)
            .bind(principal.kind.as_str())
            .bind(&principal.name)
            .bind(&principal.email)
            .bind(&principal.phone_number)
            .bind(&principal.secret_hash)
            .bind(principal.active)
            .bind(principal.failed_attempts)
            .bind(principal.locked_until)
            .bind(&principal.family_code)
            .bind(&principal.verify_token)
            .bind(&principal.pairing_code)
            .bind(principal.pairing_code_expires_at)
            .bind(principal.parent_id)
            .execute(&self.pool)
            .await
            .context("failed to insert principal")?;
        Ok(())
    }

    async fn set_credentials(
        &self,
        id: Uuid,
        name: &str,
        phone_number: Option<&str>,
        secret_hash: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE principals \
             SET name = $2, phone_number = $3, secret_hash = $4, \
                 verify_token = NULL, active = TRUE \
             WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(phone_number)
        .bind(secret_hash)
        .execute(&self.pool)
        .await
        .context("failed to set principal credentials")?;
        Ok(())
    }

    async fn activate_child(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE principals \
             SET active = TRUE, pairing_code = NULL, pairing_code_expires_at = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("failed to activate child")?;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<AttemptOutcome> {
        // Increment and trip decided in one statement so concurrent failures
        // against the same principal cannot lose an increment.
        let row = sqlx::query(
            "UPDATE principals \
             SET failed_attempts = CASE WHEN failed_attempts + 1 >= $2 \
                                        THEN 0 ELSE failed_attempts + 1 END, \
                 locked_until    = CASE WHEN failed_attempts + 1 >= $2 \
                                        THEN $3 ELSE locked_until END \
             WHERE id = $1 \
             RETURNING failed_attempts",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_until)
        .fetch_one(&self.pool)
        .await
        .context("failed to record failed attempt")?;

        let attempts: i32 = row.try_get("failed_attempts")?;
        if attempts == 0 {
            Ok(AttemptOutcome::Locked)
        } else {
            Ok(AttemptOutcome::Counted(attempts))
        }
    }

    async fn clear_attempts(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE principals SET failed_attempts = 0, locked_until = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to clear attempts")?;
        Ok(())
    }
}

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, owner_id, token_hash, issued_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(&record.token_hash)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .context("failed to insert refresh token")?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            "SELECT id, owner_id, token_hash, issued_at, expires_at, revoked_at \
             FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .context("failed to query refresh token")?;

        row.map(|row| -> Result<RefreshTokenRecord> {
            Ok(RefreshTokenRecord {
                id: row.try_get("id")?,
                owner_id: row.try_get("owner_id")?,
                token_hash: row.try_get("token_hash")?,
                issued_at: row.try_get("issued_at")?,
                expires_at: row.try_get("expires_at")?,
                revoked_at: row.try_get("revoked_at")?,
            })
        })
        .transpose()
    }

    async fn revoke_by_hash(&self, token_hash: &str, revoked_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .bind(revoked_at)
        .execute(&self.pool)
        .await
        .context("failed to revoke refresh token")?;
        Ok(())
    }
}
