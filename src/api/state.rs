use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult, FetchResult},
    services::{
        providers::{CatalogProvider, OmdbProvider, VideoProvider, YoutubeProvider},
        Catalog, CategoryBrowser, PhraseDeriver, RelatedPipeline, SessionServices, TrailerService,
        ViewSession,
    },
};

/// Shared application state
///
/// The catalog, its caches and the trailer service are built once here and handed to every
/// handler and view session.
#[derive(Clone)]
pub struct AppState {
    pub services: SessionServices,
    pub browser: Arc<CategoryBrowser>,
    pub sessions: Arc<SessionRegistry>,
    pub imdb_base_url: String,
}

impl AppState {
    pub fn new(
        config: &Config,
        catalog: Arc<dyn CatalogProvider>,
        videos: Arc<dyn VideoProvider>,
    ) -> Self {
        let cancel_policy = config.cancel_policy();
        let catalog = Arc::new(Catalog::new(
            catalog,
            config.cache_max_entries,
            config.cache_ttl(),
            cancel_policy,
        ));

        let services = SessionServices {
            related: Arc::new(RelatedPipeline::new(
                Arc::clone(&catalog),
                config.related_options(),
            )),
            deriver: PhraseDeriver::new(config.max_phrases),
            trailers: Arc::new(TrailerService::new(
                videos,
                config.youtube_search_url.clone(),
                config.cache_max_entries,
                config.cache_ttl(),
                cancel_policy,
            )),
            catalog: Arc::clone(&catalog),
        };

        Self {
            services,
            browser: Arc::new(CategoryBrowser::new(catalog)),
            sessions: Arc::new(SessionRegistry::new(
                config.session_idle(),
                config.max_sessions,
            )),
            imdb_base_url: config.imdb_base_url.clone(),
        }
    }

    /// Wires the OMDb and YouTube providers described by `config`
    pub fn from_config(config: &Config) -> FetchResult<Self> {
        let omdb = OmdbProvider::new(
            config.omdb_api_key.clone(),
            config.omdb_api_url.clone(),
            config.http_timeout(),
        )?;
        let youtube = YoutubeProvider::new(
            config.youtube_api_key.clone(),
            config.youtube_api_url.clone(),
            config.http_timeout(),
        )?;

        tracing::info!(
            catalog = omdb.name(),
            trailers_enabled = config.youtube_api_key.is_some(),
            "Providers configured"
        );

        Ok(Self::new(config, Arc::new(omdb), Arc::new(youtube)))
    }

    pub async fn open_session(&self) -> Arc<ViewSession> {
        let session = ViewSession::new(self.services.clone());
        self.sessions.insert(Arc::clone(&session)).await;
        session
    }

    pub async fn session(&self, id: Uuid) -> AppResult<Arc<ViewSession>> {
        self.sessions
            .touch(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
    }

    /// Removes and tears down a session
    pub async fn close_session(&self, id: Uuid) -> AppResult<()> {
        let session = self
            .sessions
            .remove(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        session.teardown();
        Ok(())
    }
}

struct SessionSlot {
    session: Arc<ViewSession>,
    last_seen: Instant,
}

/// Open view sessions, bounded by idle time and count
///
/// A session untouched for longer than `idle` is gone; opening one past `capacity` drops the
/// least recently used. Every dropped session is torn down.
pub struct SessionRegistry {
    slots: Mutex<HashMap<Uuid, SessionSlot>>,
    idle: Duration,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(idle: Duration, capacity: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            idle,
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn insert(&self, session: Arc<ViewSession>) {
        let now = Instant::now();
        let mut evicted = Vec::new();
        {
            let mut slots = self.slots.lock().await;
            slots.retain(|_, slot| {
                let live = now.duration_since(slot.last_seen) < self.idle;
                if !live {
                    evicted.push(Arc::clone(&slot.session));
                }
                live
            });

            while slots.len() >= self.capacity {
                let oldest = slots
                    .iter()
                    .min_by_key(|(_, slot)| slot.last_seen)
                    .map(|(id, _)| *id);
                match oldest.and_then(|id| slots.remove(&id)) {
                    Some(slot) => evicted.push(slot.session),
                    None => break,
                }
            }

            slots.insert(
                session.id(),
                SessionSlot {
                    session,
                    last_seen: now,
                },
            );
        }

        for session in evicted {
            tracing::info!(session = %session.id(), "Session evicted");
            session.teardown();
        }
    }

    /// Returns a live session and refreshes its idle clock
    async fn touch(&self, id: Uuid) -> Option<Arc<ViewSession>> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(&id)?;

        if now.duration_since(slot.last_seen) >= self.idle {
            let expired = slots.remove(&id)?.session;
            drop(slots);
            tracing::info!(session = %id, "Session expired");
            expired.teardown();
            return None;
        }

        slot.last_seen = now;
        Some(Arc::clone(&slot.session))
    }

    async fn remove(&self, id: Uuid) -> Option<Arc<ViewSession>> {
        self.slots.lock().await.remove(&id).map(|slot| slot.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::{MockCatalogProvider, MockVideoProvider};

    fn state(pairs: &[(&str, &str)]) -> AppState {
        let mut vars = vec![("OMDB_API_KEY".to_string(), "test".to_string())];
        vars.extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        let config: Config = envy::from_iter(vars).unwrap();

        AppState::new(
            &config,
            Arc::new(MockCatalogProvider::new()),
            Arc::new(MockVideoProvider::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires() {
        let state = state(&[("SESSION_IDLE_SECS", "60")]);
        let session = state.open_session().await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(state.session(session.id()).await.is_ok());

        // the lookup above reset the idle clock
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(state.session(session.id()).await.is_ok());

        tokio::time::advance(Duration::from_secs(60)).await;
        let result = state.session(session.id()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(session.is_closed());
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_sessions_are_swept_on_open() {
        let state = state(&[("SESSION_IDLE_SECS", "60")]);
        let stale = state.open_session().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = state.open_session().await;

        assert!(stale.is_closed());
        assert!(!fresh.is_closed());
        assert_eq!(state.sessions.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_least_recently_used_session_is_evicted_when_full() {
        let state = state(&[("MAX_SESSIONS", "2")]);
        let first = state.open_session().await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let second = state.open_session().await;
        tokio::time::advance(Duration::from_secs(1)).await;

        // touching the first makes the second the oldest
        state.session(first.id()).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        let third = state.open_session().await;

        assert!(second.is_closed());
        assert!(!first.is_closed());
        assert_eq!(state.sessions.len().await, 2);
        assert!(state.session(second.id()).await.is_err());
        assert!(state.session(third.id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_session_is_gone() {
        let state = state(&[]);
        let session = state.open_session().await;

        state.close_session(session.id()).await.unwrap();
        assert!(session.is_closed());
        assert!(matches!(
            state.close_session(session.id()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
