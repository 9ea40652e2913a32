//! Postgres credential store backend.
//!
//! Every mutating call is a single SQL statement, which gives the per-row
//! atomicity the lifecycle managers rely on: concurrent usage recording,
//! extension and revocation of the same key serialize at the row level
//! without any application locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::error::{CredentialError, Result};
use crate::models::{
    AccountCredential, ApiKeyCredential, ApiKeyEnvironment, ApiKeyPermission, ApiKeyValidity,
    OtpChallenge, OtpPurpose, Role, VerificationChannel,
};
use crate::store::CredentialStore;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured database URL.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| CredentialError::Validation("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Apply schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CredentialError::Store(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_account(&self, account: AccountCredential) -> Result<AccountCredential> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, username, email, phone, password_hash,
                 is_verified, is_email_verified, is_phone_verified,
                 roles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(account.is_verified)
        .bind(account.is_email_verified)
        .bind(account.is_phone_verified)
        .bind(account.role_labels())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CredentialError::CredentialAlreadyExists
            }
            _ => CredentialError::from(e),
        })?;

        Ok(account)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<AccountCredential>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountCredential>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountCredential>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_phone(&self, phone: &str) -> Result<Option<AccountCredential>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn mark_account_verified(
        &self,
        id: Uuid,
        channel: VerificationChannel,
    ) -> Result<AccountCredential> {
        let sql = match channel {
            VerificationChannel::Email => {
                r#"
                UPDATE accounts
                SET is_verified = TRUE, is_email_verified = TRUE, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#
            }
            VerificationChannel::Phone => {
                r#"
                UPDATE accounts
                SET is_verified = TRUE, is_phone_verified = TRUE, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#
            }
        };

        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CredentialError::CredentialNotFound)?;

        account_from_row(&row)
    }

    async fn update_account_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CredentialError::CredentialNotFound);
        }
        Ok(())
    }

    async fn insert_api_key(&self, key: ApiKeyCredential) -> Result<ApiKeyCredential> {
        sqlx::query(
            r#"
            INSERT INTO api_keys
                (id, tenant_id, user_id, name, description, permissions, environment,
                 key_hash, key_prefix, active, validity,
                 effective_expires_at, max_allowed_expiration,
                 last_extended_at, extension_count, usage_count, last_used_at,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(key.id)
        .bind(key.tenant_id)
        .bind(key.user_id)
        .bind(&key.name)
        .bind(&key.description)
        .bind(key.permission_labels())
        .bind(key.environment.as_str())
        .bind(&key.key_hash)
        .bind(&key.key_prefix)
        .bind(key.active)
        .bind(key.validity.as_str())
        .bind(key.effective_expires_at)
        .bind(key.max_allowed_expiration)
        .bind(key.last_extended_at)
        .bind(key.extension_count)
        .bind(key.usage_count)
        .bind(key.last_used_at)
        .bind(key.created_at)
        .bind(key.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(key)
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyCredential>> {
        let row = sqlx::query(
            "SELECT * FROM api_keys WHERE key_hash = $1 AND active = TRUE AND validity = 'VALID'",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(api_key_from_row).transpose()
    }

    async fn find_api_key(
        &self,
        owner_id: Uuid,
        key_id: Uuid,
    ) -> Result<Option<ApiKeyCredential>> {
        let row = sqlx::query("SELECT * FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(key_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(api_key_from_row).transpose()
    }

    async fn record_api_key_usage(
        &self,
        key_id: Uuid,
        used_at: DateTime<Utc>,
        extend_to: Option<DateTime<Utc>>,
    ) -> Result<Option<ApiKeyCredential>> {
        // One statement so usage bump and window extension commit together;
        // the liveness guard makes a racing revoke win.
        let row = sqlx::query(
            r#"
            UPDATE api_keys
            SET usage_count = usage_count + 1,
                last_used_at = $2,
                effective_expires_at = COALESCE($3, effective_expires_at),
                last_extended_at = CASE WHEN $3 IS NULL THEN last_extended_at ELSE $2 END,
                extension_count = extension_count + CASE WHEN $3 IS NULL THEN 0 ELSE 1 END,
                updated_at = $2
            WHERE id = $1 AND active = TRUE AND validity = 'VALID'
            RETURNING *
            "#,
        )
        .bind(key_id)
        .bind(used_at)
        .bind(extend_to)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(api_key_from_row).transpose()
    }

    async fn revoke_api_key(
        &self,
        owner_id: Uuid,
        key_id: Uuid,
    ) -> Result<Option<ApiKeyCredential>> {
        // Idempotent; an already-revoked row keeps its terminal state,
        // including updated_at.
        let row = sqlx::query(
            r#"
            UPDATE api_keys
            SET active = FALSE,
                validity = 'REVOKED',
                updated_at = CASE WHEN validity = 'REVOKED' THEN updated_at ELSE NOW() END
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(key_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(api_key_from_row).transpose()
    }

    async fn upsert_otp_challenge(&self, challenge: OtpChallenge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_challenges (account_id, purpose, code, sent_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_id, purpose)
            DO UPDATE SET code = EXCLUDED.code,
                          sent_at = EXCLUDED.sent_at,
                          updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(challenge.account_id)
        .bind(challenge.purpose.as_str())
        .bind(&challenge.code)
        .bind(challenge.sent_at)
        .bind(challenge.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_otp_challenge(
        &self,
        account_id: Uuid,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>> {
        let row = sqlx::query(
            "SELECT * FROM otp_challenges WHERE account_id = $1 AND purpose = $2",
        )
        .bind(account_id)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(otp_challenge_from_row).transpose()
    }

    async fn consume_otp_challenge(
        &self,
        account_id: Uuid,
        purpose: OtpPurpose,
        code: &str,
        consumed_sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        // Conditional on the stored code so a concurrent regeneration is
        // never consumed by the old code.
        let result = sqlx::query(
            r#"
            UPDATE otp_challenges
            SET sent_at = $4, updated_at = NOW()
            WHERE account_id = $1 AND purpose = $2 AND code = $3
            "#,
        )
        .bind(account_id)
        .bind(purpose.as_str())
        .bind(code)
        .bind(consumed_sent_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn account_from_row(row: &PgRow) -> Result<AccountCredential> {
    Ok(AccountCredential {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        is_verified: row.try_get("is_verified")?,
        is_email_verified: row.try_get("is_email_verified")?,
        is_phone_verified: row.try_get("is_phone_verified")?,
        roles: row
            .try_get::<Vec<String>, _>("roles")?
            .into_iter()
            .map(Role::new)
            .collect(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn api_key_from_row(row: &PgRow) -> Result<ApiKeyCredential> {
    let environment: String = row.try_get("environment")?;
    let validity: String = row.try_get("validity")?;
    let permissions: Vec<String> = row.try_get("permissions")?;

    Ok(ApiKeyCredential {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        permissions: permissions
            .iter()
            .map(|p| {
                ApiKeyPermission::from_str(p).ok_or_else(|| {
                    CredentialError::Store(format!("unknown api key permission: {p}"))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        environment: ApiKeyEnvironment::from_str(&environment).ok_or_else(|| {
            CredentialError::Store(format!("unknown api key environment: {environment}"))
        })?,
        key_hash: row.try_get("key_hash")?,
        key_prefix: row.try_get("key_prefix")?,
        active: row.try_get("active")?,
        validity: ApiKeyValidity::from_str(&validity).ok_or_else(|| {
            CredentialError::Store(format!("unknown api key validity: {validity}"))
        })?,
        effective_expires_at: row.try_get("effective_expires_at")?,
        max_allowed_expiration: row.try_get("max_allowed_expiration")?,
        last_extended_at: row.try_get("last_extended_at")?,
        extension_count: row.try_get("extension_count")?,
        usage_count: row.try_get("usage_count")?,
        last_used_at: row.try_get("last_used_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn otp_challenge_from_row(row: &PgRow) -> Result<OtpChallenge> {
    let purpose: String = row.try_get("purpose")?;

    Ok(OtpChallenge {
        account_id: row.try_get("account_id")?,
        purpose: OtpPurpose::from_str(&purpose)
            .ok_or_else(|| CredentialError::Store(format!("unknown otp purpose: {purpose}")))?,
        code: row.try_get("code")?,
        sent_at: row.try_get("sent_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
