use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::errors::AppResult;
use crate::models::UserProfile;
use crate::session::cookies::CookieMirror;
use crate::utils::{token_fingerprint, utc_now};

/// Named storage slots shared by every store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    RememberToken,
    SessionToken,
    UserProfile,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::RememberToken, Slot::SessionToken, Slot::UserProfile];

    pub fn key(&self) -> &'static str {
        match self {
            Slot::RememberToken => "remember_token",
            Slot::SessionToken => "session_token",
            Slot::UserProfile => "user_profile",
        }
    }
}

/// Key/value storage for credential slots.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn get(&self, slot: Slot) -> AppResult<Option<String>>;
    async fn set(&self, slot: Slot, value: &str) -> AppResult<()>;
    async fn remove(&self, slot: Slot) -> AppResult<()>;
}

/// Process-lifetime store; plays the per-tab slot.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<Slot, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn get(&self, slot: Slot) -> AppResult<Option<String>> {
        Ok(self.slots.lock().await.get(&slot).cloned())
    }

    async fn set(&self, slot: Slot, value: &str) -> AppResult<()> {
        self.slots.lock().await.insert(slot, value.to_string());
        Ok(())
    }

    async fn remove(&self, slot: Slot) -> AppResult<()> {
        self.slots.lock().await.remove(&slot);
        Ok(())
    }
}

/// Long-lived store backed by the `credential_slots` table.
#[derive(Debug, Clone)]
pub struct SqliteSlotStore {
    pool: SqlitePool,
}

impl SqliteSlotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotStore for SqliteSlotStore {
    async fn get(&self, slot: Slot) -> AppResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM credential_slots WHERE slot = ?")
            .bind(slot.key())
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, slot: Slot, value: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO credential_slots (slot, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(slot) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(slot.key())
        .bind(value)
        .bind(utc_now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, slot: Slot) -> AppResult<()> {
        sqlx::query("DELETE FROM credential_slots WHERE slot = ?")
            .bind(slot.key())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Raw slot contents as found at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub session_token: Option<String>,
    pub remember_token: Option<String>,
    pub profile: Option<String>,
}

impl StoredSession {
    /// The tab-scoped token wins over the remembered one.
    pub fn token(&self) -> Option<&str> {
        self.session_token
            .as_deref()
            .or(self.remember_token.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.token().is_none() && self.profile.is_none()
    }
}

/// Persists the session across reloads: long-lived slots, tab slots and the
/// cookie mirrors the edge guard reads. All three are caches; the backend
/// decides whether a token is still good.
#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn SlotStore>,
    tab: Arc<dyn SlotStore>,
    cookies: CookieMirror,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn SlotStore>, tab: Arc<dyn SlotStore>, cookies: CookieMirror) -> Self {
        Self { durable, tab, cookies }
    }

    pub fn cookies(&self) -> &CookieMirror {
        &self.cookies
    }

    pub async fn persist_session(&self, token: &str, profile: &UserProfile, remember: bool) -> AppResult<()> {
        self.tab.set(Slot::SessionToken, token).await?;
        if remember {
            self.durable.set(Slot::RememberToken, token).await?;
        }
        self.persist_profile(profile).await?;
        self.cookies.mirror(token, profile.role, remember);

        tracing::debug!(
            user_id = profile.id,
            role = %profile.role,
            remember,
            token = %token_fingerprint(token),
            "session persisted"
        );
        Ok(())
    }

    pub async fn persist_profile(&self, profile: &UserProfile) -> AppResult<()> {
        self.durable.set(Slot::UserProfile, &profile.to_json()?).await
    }

    pub async fn load_session(&self) -> AppResult<StoredSession> {
        Ok(StoredSession {
            session_token: non_empty(self.tab.get(Slot::SessionToken).await?),
            remember_token: non_empty(self.durable.get(Slot::RememberToken).await?),
            profile: non_empty(self.durable.get(Slot::UserProfile).await?),
        })
    }

    /// Removes every slot from both stores and expires the mirrors. Keeps
    /// going after a failed removal and reports the first error.
    pub async fn clear_session(&self) -> AppResult<()> {
        self.cookies.expire_session_cookies();

        let mut first_error = None;
        for store in [&self.tab, &self.durable] {
            for slot in Slot::ALL {
                if let Err(err) = store.remove(slot).await {
                    tracing::warn!(slot = slot.key(), error = %err, "failed to clear credential slot");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
