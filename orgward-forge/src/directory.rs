//! Time-bounded user directory for the supported organisation.
//!
//! Resolves users by login or company email from an audit object produced
//! by an external process. The whole map is rebuilt atomically once the TTL
//! lapses; readers never observe a partially-built map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use orgward_core::model::User;

use crate::port::ForgeError;

/// Object key of the user mapping document within the audit bucket.
pub const USER_MAPPING_KEY: &str = "github-saml-mapping.json";

/// How long a built user map stays fresh.
const CACHE_TTL: Duration = Duration::from_secs(120);

/// Contract over the object store holding the audit document.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Fetch the object at `bucket`/`key` as a UTF-8 string.
    async fn fetch_object(&self, bucket: &str, key: &str) -> Result<String, ForgeError>;
}

/// One tuple of the audit document.
#[derive(Debug, Deserialize)]
struct AuditRecord {
    #[serde(default)]
    github_user: String,
    #[serde(default)]
    saml_user: String,
    #[serde(default)]
    scim_user: String,
}

struct Cache {
    users: HashMap<String, User>,
    refreshed_at: Option<Instant>,
}

/// Login/email → [`User`] directory for one organisation.
pub struct UserDirectory {
    org_name: String,
    bucket: String,
    ttl: Duration,
    store: Arc<dyn AuditStore>,
    cache: Mutex<Cache>,
}

impl UserDirectory {
    pub fn new(
        org_name: impl Into<String>,
        bucket: impl Into<String>,
        store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            org_name: org_name.into(),
            bucket: bucket.into(),
            ttl: CACHE_TTL,
            store,
            cache: Mutex::new(Cache {
                users: HashMap::new(),
                refreshed_at: None,
            }),
        }
    }

    /// Override the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The user with the given company email address.
    pub async fn user_by_email(&self, org_name: &str, email: &str) -> Result<User, ForgeError> {
        self.lookup(org_name, email)
            .await?
            .ok_or_else(|| ForgeError::user_not_found_by_email(org_name, email))
    }

    /// The user with the given login name.
    pub async fn user_by_login(&self, org_name: &str, login: &str) -> Result<User, ForgeError> {
        self.lookup(org_name, login)
            .await?
            .ok_or_else(|| ForgeError::user_not_found_by_login(org_name, login))
    }

    /// Look the id up in the cached map, rebuilding the map first when it is
    /// older than the TTL. The mutex serialises refreshes.
    async fn lookup(&self, org_name: &str, id: &str) -> Result<Option<User>, ForgeError> {
        if org_name != self.org_name {
            return Err(ForgeError::UnsupportedOrg {
                org_name: org_name.to_string(),
            });
        }

        let mut cache = self.cache.lock().await;

        let fresh = cache
            .refreshed_at
            .map(|at| at.elapsed() < self.ttl)
            .unwrap_or(false);
        if !fresh {
            let buf = self.store.fetch_object(&self.bucket, USER_MAPPING_KEY).await?;
            let records: Vec<AuditRecord> = serde_json::from_str(&buf)?;
            cache.users = build_user_map(&records);
            cache.refreshed_at = Some(Instant::now());
            tracing::debug!(
                org = %self.org_name,
                users = cache.users.len(),
                "rebuilt user directory cache"
            );
        }

        Ok(cache.users.get(id).cloned())
    }
}

/// Build the login+email multi-map from audit records.
///
/// Depending on how a user was on-boarded, only one of `scim_user` or
/// `saml_user` carries the company email address; records with neither, or
/// with no forge username, are discarded.
fn build_user_map(records: &[AuditRecord]) -> HashMap<String, User> {
    let mut users = HashMap::new();
    for record in records {
        if record.github_user.is_empty() {
            continue;
        }

        let email = if is_email(&record.scim_user) {
            &record.scim_user
        } else if is_email(&record.saml_user) {
            &record.saml_user
        } else {
            continue;
        };

        let user = User {
            login: record.github_user.clone(),
            email: email.clone(),
        };
        users.insert(user.login.clone(), user.clone());
        users.insert(user.email.clone(), user);
    }
    users
}

fn is_email(v: &str) -> bool {
    v.contains('@')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStore {
        body: String,
        fetches: AtomicUsize,
    }

    impl FakeStore {
        fn new(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_string(),
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuditStore for FakeStore {
        async fn fetch_object(&self, _bucket: &str, _key: &str) -> Result<String, ForgeError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    const MAPPING: &str = r#"[
        {"github_user": "alice", "saml_user": "alice@acme.example", "scim_user": ""},
        {"github_user": "bob", "saml_user": "bob", "scim_user": "bob@acme.example"},
        {"github_user": "", "saml_user": "orphan@acme.example", "scim_user": ""},
        {"github_user": "no-email", "saml_user": "nobody", "scim_user": "nothing"}
    ]"#;

    fn directory(store: Arc<FakeStore>) -> UserDirectory {
        UserDirectory::new("acme", "audit-bucket", store)
    }

    #[tokio::test]
    async fn resolves_by_login_and_email() {
        let store = FakeStore::new(MAPPING);
        let dir = directory(store);

        let by_login = dir.user_by_login("acme", "alice").await.expect("by login");
        assert_eq!(by_login.email, "alice@acme.example");

        let by_email = dir
            .user_by_email("acme", "alice@acme.example")
            .await
            .expect("by email");
        assert_eq!(by_email.login, "alice");
    }

    #[tokio::test]
    async fn prefers_scim_email_over_saml() {
        let store = FakeStore::new(MAPPING);
        let dir = directory(store);

        let bob = dir.user_by_login("acme", "bob").await.expect("bob");
        assert_eq!(bob.email, "bob@acme.example");
    }

    #[tokio::test]
    async fn discards_records_without_username_or_email() {
        let store = FakeStore::new(MAPPING);
        let dir = directory(store);

        let orphan = dir.user_by_email("acme", "orphan@acme.example").await;
        assert!(orphan.expect_err("must fail").is_user_not_found());

        let no_email = dir.user_by_login("acme", "no-email").await;
        assert!(no_email.expect_err("must fail").is_user_not_found());
    }

    #[tokio::test]
    async fn missing_user_is_user_not_found() {
        let store = FakeStore::new(MAPPING);
        let dir = directory(store);

        let err = dir
            .user_by_email("acme", "ghost@acme.example")
            .await
            .expect_err("must fail");
        assert!(err.is_user_not_found());
    }

    #[tokio::test]
    async fn foreign_org_is_unsupported() {
        let store = FakeStore::new(MAPPING);
        let dir = directory(store);

        let err = dir
            .user_by_email("globex", "alice@acme.example")
            .await
            .expect_err("must fail");
        assert!(matches!(err, ForgeError::UnsupportedOrg { .. }));
    }

    #[tokio::test]
    async fn lookups_within_ttl_share_one_fetch() {
        let store = FakeStore::new(MAPPING);
        let dir = directory(store.clone());

        dir.user_by_login("acme", "alice").await.expect("first");
        dir.user_by_login("acme", "bob").await.expect("second");
        dir.user_by_email("acme", "bob@acme.example")
            .await
            .expect("third");

        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn expired_cache_refetches() {
        let store = FakeStore::new(MAPPING);
        let dir = directory(store.clone()).with_ttl(Duration::from_secs(0));

        dir.user_by_login("acme", "alice").await.expect("first");
        dir.user_by_login("acme", "alice").await.expect("second");

        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn malformed_document_is_a_parse_error() {
        let store = FakeStore::new("not json");
        let dir = directory(store);

        let err = dir
            .user_by_login("acme", "alice")
            .await
            .expect_err("must fail");
        assert!(matches!(err, ForgeError::AuditDocument(_)));
    }
}
