use crate::auth::{CredentialStore, SharedTokens};
use crate::config::ServerConfig;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinError;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Client tokens checked by the auth middleware
    pub credentials: Arc<dyn CredentialStore>,

    /// One lock per article id, held while its directory is rewritten
    pub article_locks: Arc<ArticleLocks>,
}

impl ServerState {
    /// Create new server state backed by the configured shared tokens
    pub fn new(config: ServerConfig) -> Self {
        let credentials = Arc::new(SharedTokens::new(config.shared_tokens.clone()));
        Self::with_credentials(config, credentials)
    }

    /// Create server state with a custom credential backend
    pub fn with_credentials(config: ServerConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            config: Arc::new(config),
            credentials,
            article_locks: Arc::new(ArticleLocks::default()),
        }
    }
}

/// Keyed async mutexes.
///
/// Serializes the reset-and-write cycle for a single article inside this
/// process. Separate processes sharing a storage root are not coordinated.
#[derive(Debug, Default)]
pub struct ArticleLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive hold on one article id.
///
/// Dropping the lease unlocks the article and forgets its entry when nobody
/// else holds or waits on it.
#[derive(Debug)]
pub struct ArticleLease {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<ArticleLocks>,
    article_id: String,
}

impl Drop for ArticleLease {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.release_idle(&self.article_id);
    }
}

impl ArticleLocks {
    /// Wait for exclusive access to `article_id`.
    pub async fn lock(self: &Arc<Self>, article_id: &str) -> ArticleLease {
        let mutex = self
            .locks
            .entry(article_id.to_string())
            .or_default()
            .clone();
        let guard = mutex.lock_owned().await;
        ArticleLease {
            guard: Some(guard),
            locks: self.clone(),
            article_id: article_id.to_string(),
        }
    }

    /// Run `job` on the blocking pool while holding the lock for `article_id`.
    ///
    /// The lease moves into the blocking task, so the article stays locked
    /// until `job` returns even if the awaiting future is dropped first.
    pub async fn run_exclusive<F, T>(
        self: &Arc<Self>,
        article_id: &str,
        job: F,
    ) -> Result<T, JoinError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let lease = self.lock(article_id).await;
        tokio::task::spawn_blocking(move || {
            let _lease = lease;
            job()
        })
        .await
    }

    /// True while some lease for `article_id` is alive.
    pub fn is_held(&self, article_id: &str) -> bool {
        self.locks
            .get(article_id)
            .map(|mutex| mutex.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Forget the lock for `article_id` if nobody holds or waits on it.
    ///
    /// A waiter cancelled before acquiring can leave an entry behind; the
    /// next lease on the same id removes it.
    pub fn release_idle(&self, article_id: &str) {
        self.locks
            .remove_if(article_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of tracked article ids.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    async fn wait_until_released(locks: &ArticleLocks, article_id: &str) {
        for _ in 0..200 {
            if !locks.is_held(article_id) && locks.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("lock for {article_id} was never released");
    }

    #[tokio::test]
    async fn test_same_article_is_serialized() {
        let locks = Arc::new(ArticleLocks::default());
        let lease = locks.lock("7").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _lease = locks.lock("7").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(lease);
        contender.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_articles_do_not_block() {
        let locks = Arc::new(ArticleLocks::default());
        let _a = locks.lock("a").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b"))
            .await
            .expect("independent article must not wait");
    }

    #[tokio::test]
    async fn test_dropping_lease_forgets_entry() {
        let locks = Arc::new(ArticleLocks::default());
        let lease = locks.lock("x").await;
        locks.release_idle("x");
        assert_eq!(locks.len(), 1);
        assert!(locks.is_held("x"));

        drop(lease);
        assert!(!locks.is_held("x"));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_outlives_cancelled_caller() {
        let locks = Arc::new(ArticleLocks::default());
        let (release, gate) = mpsc::channel::<()>();

        // The caller gives up long before the blocking job finishes.
        let res = tokio::time::timeout(
            Duration::from_millis(20),
            locks.run_exclusive("5", move || gate.recv().ok()),
        )
        .await;
        assert!(res.is_err());

        assert!(locks.is_held("5"));
        let contender = tokio::time::timeout(Duration::from_millis(20), locks.lock("5")).await;
        assert!(contender.is_err(), "second writer must wait for the job");

        release.send(()).unwrap();
        wait_until_released(&locks, "5").await;
    }

    #[tokio::test]
    async fn test_run_exclusive_returns_job_output() {
        let locks = Arc::new(ArticleLocks::default());
        let out = locks.run_exclusive("9", || 21 * 2).await.unwrap();
        assert_eq!(out, 42);
        wait_until_released(&locks, "9").await;
    }
}
