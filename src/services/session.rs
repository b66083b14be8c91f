use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{FetchError, FetchResult},
    models::{Candidate, TitleDetails},
    services::{
        auth::{AuthGate, AuthMode, ChannelAuthGate, PromptInbox},
        catalog::Catalog,
        phrases::PhraseDeriver,
        related::RelatedPipeline,
        trailer::{TrailerOutcome, TrailerService},
        trigger::{LazyTrigger, TriggerState},
    },
};

/// Shared services every view session draws on
#[derive(Clone)]
pub struct SessionServices {
    pub catalog: Arc<Catalog>,
    pub related: Arc<RelatedPipeline>,
    pub deriver: PhraseDeriver,
    pub trailers: Arc<TrailerService>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum DetailState {
    Idle,
    Loading,
    Ready(TitleDetails),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum RelatedState {
    Pending,
    Loading,
    Ready(Vec<Candidate>),
    /// Nothing searchable could be derived from the title
    NotApplicable,
    Empty,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title_id: Option<String>,
    pub generation: u64,
    pub detail: DetailState,
    pub trigger: TriggerState,
    pub related: RelatedState,
    /// Title the related list belongs to; lags `title_id` until the new list publishes
    pub related_for: Option<String>,
    pub trailer: Option<TrailerOutcome>,
    pub signed_in: bool,
    pub sign_in_requested: Option<AuthMode>,
}

struct SessionState {
    generation: u64,
    current: Option<String>,
    current_cancel: Option<CancellationToken>,
    detail: DetailState,
    source: Option<TitleDetails>,
    trigger: LazyTrigger,
    related: RelatedState,
    related_for: Option<String>,
    published: HashMap<String, RelatedState>,
    trailer: Option<TrailerOutcome>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionState {
    fn publish(&mut self, id: &str, related: RelatedState) {
        self.published.insert(id.to_string(), related.clone());
        self.related = related;
        self.related_for = Some(id.to_string());
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }
}

/// One viewer's detail page: the current title, its related titles and its trailer
///
/// Every navigation bumps a generation counter and cancels the previous title's token.
/// Work resumed after a suspension compares generations and drops stale results, so a slow
/// response for an old title never overwrites the current one.
pub struct ViewSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    services: SessionServices,
    gate: ChannelAuthGate,
    inbox: PromptInbox,
    lifetime: CancellationToken,
    state: Mutex<SessionState>,
}

impl ViewSession {
    pub fn new(services: SessionServices) -> Arc<Self> {
        let (gate, prompts) = ChannelAuthGate::new();

        Arc::new(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            services,
            gate,
            inbox: PromptInbox::new(prompts),
            lifetime: CancellationToken::new(),
            state: Mutex::new(SessionState {
                generation: 0,
                current: None,
                current_cancel: None,
                detail: DetailState::Idle,
                source: None,
                trigger: LazyTrigger::new(),
                related: RelatedState::Pending,
                related_for: None,
                published: HashMap::new(),
                trailer: None,
                tasks: Vec::new(),
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True once `teardown` has run
    pub fn is_closed(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shows title `id`: resolves its detail, then arms related-title aggregation
    ///
    /// Returns [`FetchError::Canceled`] when another navigation or a teardown superseded
    /// this one before the detail arrived.
    pub async fn navigate(self: &Arc<Self>, id: &str) -> FetchResult<DetailState> {
        let id = id.trim();
        if self.lifetime.is_cancelled() {
            return Err(FetchError::Canceled);
        }

        let (generation, cancel) = {
            let mut state = self.lock();

            if state.current.as_deref() != Some(id) {
                self.switch_title(&mut state, id);
            } else if let DetailState::Ready(_) = state.detail {
                return Ok(state.detail.clone());
            }

            state.detail = DetailState::Loading;
            let cancel = self.current_token(&mut state);
            (state.generation, cancel)
        };

        let result = self.services.catalog.detail(id, &cancel).await;

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(session = %self.id, title_id = %id, "Discarding detail for superseded title");
            return Err(FetchError::Canceled);
        }

        match result {
            Ok(details) => {
                state.source = Some(details.clone());
                state.detail = DetailState::Ready(details);
                state.trigger.arm();
                self.start_related(&mut state);
            }
            Err(FetchError::Canceled) => {
                state.detail = DetailState::Idle;
                return Err(FetchError::Canceled);
            }
            Err(e) => {
                tracing::warn!(session = %self.id, title_id = %id, error = %e, "Title detail unavailable");
                state.detail = DetailState::Unavailable(e.to_string());
            }
        }

        Ok(state.detail.clone())
    }

    fn switch_title(&self, state: &mut SessionState, id: &str) {
        state.generation += 1;
        if let Some(previous) = state.current_cancel.take() {
            previous.cancel();
        }

        state.current = Some(id.to_string());
        state.current_cancel = Some(self.lifetime.child_token());
        state.source = None;
        state.trailer = None;

        if state.trigger.set_source(id) == TriggerState::Done {
            if let Some(related) = state.published.get(id).cloned() {
                state.related = related;
                state.related_for = Some(id.to_string());
            }
        }

        tracing::debug!(
            session = %self.id,
            title_id = %id,
            generation = state.generation,
            "Switched title"
        );
    }

    fn current_token(&self, state: &mut SessionState) -> CancellationToken {
        state
            .current_cancel
            .get_or_insert_with(|| self.lifetime.child_token())
            .clone()
    }

    /// Visibility signal from the related-titles area
    pub fn notify_visible(self: &Arc<Self>) -> TriggerState {
        let mut state = self.lock();
        state.trigger.arm();
        self.start_related(&mut state);
        state.trigger.state()
    }

    fn start_related(self: &Arc<Self>, state: &mut SessionState) {
        let Some(source) = state.source.clone() else {
            return;
        };
        let Some(id) = state.trigger.try_start() else {
            return;
        };

        // Items already on screen stay until the new list replaces them
        if !matches!(state.related, RelatedState::Ready(_)) {
            state.related = RelatedState::Loading;
            state.related_for = Some(id.clone());
        }

        let generation = state.generation;
        let cancel = self.current_token(state);
        let session = Arc::clone(self);
        state.track(tokio::spawn(async move {
            session.run_related(id, source, generation, cancel).await;
        }));
    }

    async fn run_related(
        self: Arc<Self>,
        id: String,
        source: TitleDetails,
        generation: u64,
        cancel: CancellationToken,
    ) {
        let outcome = match self.services.deriver.derive(&source) {
            Ok(phrases) => {
                self.services
                    .related
                    .aggregate(&source, &phrases, &cancel)
                    .await
            }
            Err(e) => Err(e),
        };

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(session = %self.id, title_id = %id, "Discarding related titles for superseded title");
            return;
        }

        match outcome {
            Ok(candidates) => {
                if state.trigger.complete(&id) {
                    let related = if candidates.is_empty() {
                        RelatedState::Empty
                    } else {
                        RelatedState::Ready(candidates)
                    };
                    state.publish(&id, related);
                }
            }
            Err(FetchError::NotApplicable) => {
                if state.trigger.complete(&id) {
                    state.publish(&id, RelatedState::NotApplicable);
                }
            }
            Err(FetchError::Canceled) => state.trigger.abandon(),
            Err(e) => {
                tracing::warn!(session = %self.id, title_id = %id, error = %e, "Related titles unavailable");
                if state.trigger.fail(&id) {
                    state.related = RelatedState::Empty;
                    state.related_for = Some(id);
                }
            }
        }
    }

    /// Plays the current title's trailer, asking for a sign-in first when needed
    ///
    /// A sign-in requested here resumes the lookup automatically once it completes.
    pub async fn play_trailer(self: &Arc<Self>) -> FetchResult<TrailerOutcome> {
        {
            let mut state = self.lock();
            match &state.trailer {
                Some(ready @ TrailerOutcome::Ready { .. }) => return Ok(ready.clone()),
                Some(TrailerOutcome::SignInRequired) => return Ok(TrailerOutcome::SignInRequired),
                _ => {}
            }

            if !self.gate.is_signed_in() {
                let notified = self.gate.request_sign_in(AuthMode::Login);
                self.resume_after_sign_in(&mut state, notified);
                state.trailer = Some(TrailerOutcome::SignInRequired);
                return Ok(TrailerOutcome::SignInRequired);
            }
        }

        self.lookup_trailer().await
    }

    async fn lookup_trailer(&self) -> FetchResult<TrailerOutcome> {
        let (title, generation, cancel) = {
            let mut state = self.lock();
            let title = state
                .source
                .as_ref()
                .map(|source| source.title.clone())
                .unwrap_or_default();
            (title, state.generation, self.current_token(&mut state))
        };

        let outcome = self.services.trailers.lookup(&title, &cancel).await?;

        let mut state = self.lock();
        if state.generation == generation {
            state.trailer = Some(outcome.clone());
        }
        Ok(outcome)
    }

    fn resume_after_sign_in(
        self: &Arc<Self>,
        state: &mut SessionState,
        notified: oneshot::Receiver<()>,
    ) {
        let session = Arc::clone(self);
        let lifetime = self.lifetime.clone();

        state.track(tokio::spawn(async move {
            tokio::select! {
                _ = lifetime.cancelled() => {}
                signed_in = notified => {
                    session.lock().trailer = None;
                    if signed_in.is_err() {
                        return;
                    }
                    match session.lookup_trailer().await {
                        Ok(outcome) => tracing::info!(session = %session.id, outcome = ?outcome, "Trailer resumed after sign-in"),
                        Err(e) => tracing::debug!(session = %session.id, error = %e, "Trailer resume abandoned"),
                    }
                }
            }
        }));
    }

    /// Completes a sign-in, releasing every action that waited for it
    pub fn sign_in(&self) -> usize {
        self.gate.set_signed_in(true);
        let resumed = self.inbox.resolve_all();
        tracing::info!(session = %self.id, resumed = resumed, "Signed in");
        resumed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();

        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            title_id: state.current.clone(),
            generation: state.generation,
            detail: state.detail.clone(),
            trigger: state.trigger.state(),
            related: state.related.clone(),
            related_for: state.related_for.clone(),
            trailer: state.trailer.clone(),
            signed_in: self.gate.is_signed_in(),
            sign_in_requested: self.inbox.pending_mode(),
        }
    }

    /// Waits for the background work spawned so far
    pub async fn settle(&self) {
        loop {
            let tasks = std::mem::take(&mut self.lock().tasks);
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                // Cancellation surfaces as a JoinError and needs no handling
                let _ = task.await;
            }
        }
    }

    /// Cancels everything in flight; results arriving later are discarded
    pub fn teardown(&self) {
        self.lifetime.cancel();
        self.inbox.dismiss_all();

        let mut state = self.lock();
        state.trigger.teardown();
        state.current_cancel = None;
        state.generation += 1;

        tracing::info!(session = %self.id, "Session closed");
    }
}
