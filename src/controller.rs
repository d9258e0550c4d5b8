//! Filter and debounce controller: the feed as seen by a presentation layer.
//!
//! [`NewsFeed`] holds the live filters and the [`Aggregator`], and turns user
//! intent into fetches:
//!
//! - **Filter edits** ([`NewsFeed::on_filters_change`]) are merged into the
//!   active filters and reset the engine *synchronously*, so a view never
//!   shows results of the previous filters. Only the network fetch waits for
//!   the debounce window; a newer edit restarts the window.
//! - **Load more** ([`NewsFeed::load_more`]) is never debounced.
//! - **Snapshots** ([`FeedView`]) are published through a `tokio::sync::watch`
//!   channel after each complete state change, never mid-update.
//!
//! # Phases
//!
//! ```text
//! Idle ──edit──▶ Debouncing ──quiet period──▶ Fetching ──all settled──▶ Idle
//!                    ▲  │                         │
//!                    └──┘ edit restarts timer     └─edit─▶ Debouncing
//! ```
//!
//! A fetch that is in flight when filters change is not cancelled. Its
//! results carry the generation they were issued for and are discarded
//! when they land.
//!
//! # Runtime
//!
//! Fetches and the debounce timer run as Tokio tasks, so [`NewsFeed::mount`],
//! [`NewsFeed::on_filters_change`] and [`NewsFeed::load_more`] must be called
//! from within a Tokio runtime.

use crate::aggregator::{Aggregator, FetchPlan, LoadKind, ProviderState};
use crate::config::FeedConfig;
use crate::error::ProviderFailure;
use crate::models::{Article, DEFAULT_PAGE_SIZE, FilterPatch, NewsFilters, ProviderId};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Callback fired with the active filters every time they change.
pub type ChangeCallback = Box<dyn Fn(&NewsFilters) + Send + Sync>;

/// Where the feed is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPhase {
    Idle,
    /// A filter edit is waiting out the debounce window.
    Debouncing,
    /// Provider calls are pending.
    Fetching,
}

/// A settled, read-only snapshot of the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    pub items: Vec<Article>,
    pub is_loading: bool,
    pub is_loading_more: bool,
    /// `true` while at least one selected provider may have more pages.
    pub has_more: bool,
    pub phase: FeedPhase,
    pub filters: NewsFilters,
    /// Providers that failed during the last applied fetch.
    pub failures: Vec<ProviderFailure>,
    pub generation: u64,
}

impl FeedView {
    pub fn is_settled(&self) -> bool {
        !self.is_loading && !self.is_loading_more
    }
}

/// Mount options for [`NewsFeed`].
pub struct FeedOptions {
    /// Edits applied on top of the default filters before the first fetch.
    pub initial_filters: FilterPatch,
    pub debounce: Duration,
    pub page_size: u32,
    pub on_change: Option<ChangeCallback>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            initial_filters: FilterPatch::default(),
            debounce: Duration::from_millis(crate::config::DEFAULT_DEBOUNCE_MS),
            page_size: DEFAULT_PAGE_SIZE,
            on_change: None,
        }
    }
}

impl fmt::Debug for FeedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedOptions")
            .field("initial_filters", &self.initial_filters)
            .field("debounce", &self.debounce)
            .field("page_size", &self.page_size)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl FeedOptions {
    /// Options taking page size and debounce window from `config`.
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            debounce: config.debounce(),
            page_size: config.page_size,
            ..Self::default()
        }
    }

    pub fn initial_filters(mut self, patch: FilterPatch) -> Self {
        self.initial_filters = patch;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn on_change(mut self, callback: impl Fn(&NewsFilters) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }
}

struct FeedState {
    active: NewsFilters,
    engine: Aggregator,
    phase: FeedPhase,
    debounce_task: Option<JoinHandle<()>>,
}

impl FeedState {
    fn view(&self) -> FeedView {
        FeedView {
            items: self.engine.items(),
            is_loading: self.engine.is_loading(),
            is_loading_more: self.engine.is_loading_more(),
            has_more: self.engine.has_more(&self.active.sources),
            phase: self.phase,
            filters: self.active.clone(),
            failures: self.engine.failures().to_vec(),
            generation: self.engine.generation(),
        }
    }
}

struct Shared<S> {
    source: S,
    state: Mutex<FeedState>,
    views: watch::Sender<FeedView>,
    on_change: Option<ChangeCallback>,
    debounce: Duration,
}

impl<S> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &FeedState) {
        self.views.send_replace(state.view());
    }

    fn notify(&self, filters: &NewsFilters) {
        if let Some(callback) = &self.on_change {
            callback(filters);
        }
    }
}

impl<S: crate::providers::ArticleSource> Shared<S> {
    /// Plan a fetch of the active page and run it in the background.
    fn start_fetch(shared: &Arc<Self>, state: &mut FeedState, kind: LoadKind) {
        match state.engine.plan(&state.active, kind) {
            Some(plan) => {
                state.phase = FeedPhase::Fetching;
                tokio::spawn(Arc::clone(shared).run(plan));
            }
            None => state.phase = FeedPhase::Idle,
        }
        shared.publish(state);
    }

    async fn run(self: Arc<Self>, plan: FetchPlan) {
        let outcomes = Aggregator::fetch(&self.source, &plan).await;
        let mut state = self.lock();
        if state.engine.apply(&plan, outcomes).is_some() {
            state.phase = FeedPhase::Idle;
            self.publish(&state);
        }
    }

    /// Restart the debounce window for the current generation.
    fn schedule(shared: &Arc<Self>, state: &mut FeedState) {
        if let Some(task) = state.debounce_task.take() {
            task.abort();
        }
        let generation = state.engine.generation();
        let delay = shared.debounce;
        let weak: Weak<Self> = Arc::downgrade(shared);
        state.debounce_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut state = shared.lock();
            if state.engine.generation() != generation {
                return;
            }
            state.debounce_task = None;
            debug!(generation, "Debounce window elapsed");
            Self::start_fetch(&shared, &mut state, LoadKind::Initial);
        }));
    }
}

/// A live, filterable news feed over an [`ArticleSource`](crate::providers::ArticleSource).
pub struct NewsFeed<S> {
    shared: Arc<Shared<S>>,
}

impl<S: crate::providers::ArticleSource> NewsFeed<S> {
    /// Seed the filters and start fetching page 1 right away.
    ///
    /// The initial filters are not debounced. `on_change` fires once with
    /// them before this returns.
    #[instrument(level = "info", skip_all, fields(page_size = options.page_size, debounce_ms = options.debounce.as_millis() as u64))]
    pub fn mount(source: S, options: FeedOptions) -> Self {
        let FeedOptions {
            initial_filters,
            debounce,
            page_size,
            on_change,
        } = options;

        let mut active = NewsFilters::with_page_size(page_size);
        active.apply(initial_filters);
        let mut engine = Aggregator::new();
        engine.reset();

        let state = FeedState {
            active,
            engine,
            phase: FeedPhase::Idle,
            debounce_task: None,
        };
        let (views, _) = watch::channel(state.view());
        let shared = Arc::new(Shared {
            source,
            state: Mutex::new(state),
            views,
            on_change,
            debounce,
        });

        let filters = {
            let mut state = shared.lock();
            Shared::start_fetch(&shared, &mut state, LoadKind::Initial);
            state.active.clone()
        };
        info!(sources = filters.sources.len(), "Feed mounted");
        shared.notify(&filters);
        Self { shared }
    }

    /// Apply a filter edit.
    ///
    /// The page goes back to 1 and every provider's pages and cursor are
    /// cleared before this returns. The fetch for the new filters starts
    /// once no further edit has arrived for the debounce window.
    pub fn on_filters_change(&self, patch: FilterPatch) {
        let filters = {
            let mut state = self.shared.lock();
            state.active.apply(patch);
            let generation = state.engine.reset();
            state.phase = FeedPhase::Debouncing;
            Shared::schedule(&self.shared, &mut state);
            self.shared.publish(&state);
            debug!(generation, "Filters changed");
            state.active.clone()
        };
        self.shared.notify(&filters);
    }

    /// Fetch the next page immediately.
    ///
    /// Returns `false`, changing nothing, while a load is running or when no
    /// selected provider has more pages.
    pub fn load_more(&self) -> bool {
        let filters = {
            let mut state = self.shared.lock();
            if !state.engine.can_load_more(&state.active) {
                debug!(
                    is_loading = state.engine.is_loading(),
                    is_loading_more = state.engine.is_loading_more(),
                    "Load more ignored"
                );
                return false;
            }
            state.active.page += 1;
            debug!(page = state.active.page, "Loading more");
            Shared::start_fetch(&self.shared, &mut state, LoadKind::More);
            state.active.clone()
        };
        self.shared.notify(&filters);
        true
    }

    /// The live filters, including the current page.
    pub fn active_filters(&self) -> NewsFilters {
        self.shared.lock().active.clone()
    }

    /// Pagination state of one provider.
    pub fn provider_state(&self, provider: ProviderId) -> ProviderState {
        self.shared.lock().engine.provider_state(provider).clone()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> FeedView {
        self.shared.views.borrow().clone()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<FeedView> {
        self.shared.views.subscribe()
    }

    /// Wait until neither an initial load nor a load-more is running.
    ///
    /// A pending debounce counts as loading, so this waits through the quiet
    /// period and the fetch it triggers.
    pub async fn settled(&self) -> FeedView {
        let mut views = self.subscribe();
        match views.wait_for(FeedView::is_settled).await {
            Ok(view) => view.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

impl<S> Drop for NewsFeed<S> {
    fn drop(&mut self) {
        if let Some(task) = self.shared.lock().debounce_task.take() {
            task.abort();
        }
    }
}

impl<S> fmt::Debug for NewsFeed<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("NewsFeed")
            .field("filters", &state.active)
            .field("phase", &state.phase)
            .field("generation", &state.engine.generation())
            .finish()
    }
}
