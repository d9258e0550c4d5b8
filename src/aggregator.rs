//! Multi-provider pagination and aggregation engine.
//!
//! The engine owns, per provider, a pagination cursor (`has_more`) and the
//! pages fetched so far, and turns them into one ordered feed.
//!
//! # Fetch Lifecycle
//!
//! A fetch is split into three steps so the owner can release its lock while
//! the network calls are pending:
//!
//! 1. [`Aggregator::plan`]: pick the eligible providers (selected in the
//!    filters and not exhausted), raise the matching loading flag, and tag
//!    the plan with the current filter generation
//! 2. [`Aggregator::fetch`]: fan out one call per eligible provider and wait
//!    for all of them to settle
//! 3. [`Aggregator::apply`]: write every outcome in one batch, unless a
//!    filter reset happened meanwhile, in which case the results are dropped
//!
//! [`Aggregator::fetch_page`] runs the three steps in a row for callers that
//! own the engine outright.
//!
//! # Ordering
//!
//! [`Aggregator::items`] is all Guardian pages, then all New York Times
//! pages, then all NewsAPI pages, each provider's pages in ascending order.
//! There is no interleaving by date or relevance.

use crate::error::{FeedError, ProviderFailure};
use crate::models::{Article, NewsFilters, ProviderId};
use crate::providers::ArticleSource;
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// Pagination state of one provider within the current filter generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderState {
    /// `false` once the provider returned a short page. Only a reset
    /// turns it back on.
    pub has_more: bool,
    /// Fetched pages, keyed by 1-based page number.
    pub pages: BTreeMap<u32, Vec<Article>>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            has_more: true,
            pages: BTreeMap::new(),
        }
    }
}

impl ProviderState {
    pub fn article_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }
}

/// Why a fetch is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// First page after mount or a filter change; drives `is_loading`.
    Initial,
    /// A follow-up page; drives `is_loading_more`.
    More,
}

/// The providers to call for one page, and under which generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub generation: u64,
    pub kind: LoadKind,
    pub filters: NewsFilters,
    pub providers: Vec<ProviderId>,
}

/// Settled result of one provider call.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub provider: ProviderId,
    pub result: Result<Vec<Article>, FeedError>,
}

/// Summary of an applied fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub generation: u64,
    pub page: u32,
    /// Providers that answered, with the number of articles they returned.
    pub fetched: Vec<(ProviderId, usize)>,
    pub failures: Vec<ProviderFailure>,
}

/// The aggregation engine.
#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: [ProviderState; 3],
    generation: u64,
    is_loading: bool,
    is_loading_more: bool,
    failures: Vec<ProviderFailure>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            providers: Default::default(),
            generation: 0,
            is_loading: false,
            is_loading_more: false,
            failures: Vec::new(),
        }
    }

    /// Current filter generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn provider_state(&self, provider: ProviderId) -> &ProviderState {
        &self.providers[provider.index()]
    }

    pub(crate) fn set_provider_state(&mut self, provider: ProviderId, state: ProviderState) {
        self.providers[provider.index()] = state;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    /// Failures recorded by the last applied fetch.
    pub fn failures(&self) -> &[ProviderFailure] {
        &self.failures
    }

    /// `true` when at least one of `sources` may still have pages.
    pub fn has_more(&self, sources: &BTreeSet<ProviderId>) -> bool {
        sources.iter().any(|&id| self.provider_state(id).has_more)
    }

    /// Providers that a fetch under `filters` would call, in feed order.
    pub fn eligible(&self, filters: &NewsFilters) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|&id| filters.includes(id) && self.provider_state(id).has_more)
            .collect()
    }

    /// Whether a follow-up page may be requested right now.
    pub fn can_load_more(&self, filters: &NewsFilters) -> bool {
        !self.is_loading && !self.is_loading_more && self.has_more(&filters.sources)
    }

    /// Start a new filter generation.
    ///
    /// Every page is dropped, every provider may have more again, and the
    /// feed reports a fresh initial load. Fetches issued under an older
    /// generation can no longer be applied.
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.providers = Default::default();
        self.is_loading = true;
        self.is_loading_more = false;
        self.failures.clear();
        debug!(generation = self.generation, "Aggregation state reset");
        self.generation
    }

    /// Prepare a fetch of `filters.page`.
    ///
    /// Returns `None`, with both loading flags cleared, when no provider is
    /// eligible.
    pub fn plan(&mut self, filters: &NewsFilters, kind: LoadKind) -> Option<FetchPlan> {
        let providers = self.eligible(filters);
        if providers.is_empty() {
            debug!(page = filters.page, "No eligible providers; nothing to fetch");
            self.is_loading = false;
            self.is_loading_more = false;
            return None;
        }

        self.is_loading = kind == LoadKind::Initial;
        self.is_loading_more = kind == LoadKind::More;
        Some(FetchPlan {
            generation: self.generation,
            kind,
            filters: filters.clone(),
            providers,
        })
    }

    /// Call every planned provider concurrently and wait for all of them.
    ///
    /// All calls are dispatched before any is awaited. A failing provider
    /// does not cancel the others.
    #[instrument(level = "info", skip_all, fields(generation = plan.generation, page = plan.filters.page, providers = plan.providers.len()))]
    pub async fn fetch<S: ArticleSource>(source: &S, plan: &FetchPlan) -> Vec<FetchOutcome> {
        let calls = plan.providers.iter().map(|&provider| async move {
            let result = source.fetch_articles(provider, &plan.filters).await;
            if let Err(e) = &result {
                warn!(provider = %provider, error = %e, "Provider call failed");
            }
            FetchOutcome { provider, result }
        });
        join_all(calls).await
    }

    /// Apply settled outcomes in one batch.
    ///
    /// Returns `None` and leaves the state untouched when `plan` belongs to
    /// an older generation.
    pub fn apply(&mut self, plan: &FetchPlan, outcomes: Vec<FetchOutcome>) -> Option<FetchReport> {
        if plan.generation != self.generation {
            warn!(
                stale_generation = plan.generation,
                current_generation = self.generation,
                page = plan.filters.page,
                "Dropping results of a superseded fetch"
            );
            return None;
        }

        let page = plan.filters.page;
        let page_size = plan.filters.page_size as usize;
        if page == 1 {
            for state in &mut self.providers {
                state.pages.clear();
            }
        }

        let mut report = FetchReport {
            generation: plan.generation,
            page,
            ..FetchReport::default()
        };
        for outcome in outcomes {
            match outcome.result {
                Ok(articles) => {
                    let count = articles.len();
                    let state = &mut self.providers[outcome.provider.index()];
                    state.has_more = state.has_more && count >= page_size;
                    state.pages.insert(page, articles);
                    report.fetched.push((outcome.provider, count));
                }
                Err(error) => report.failures.push(ProviderFailure {
                    provider: outcome.provider,
                    error,
                }),
            }
        }

        self.is_loading = false;
        self.is_loading_more = false;
        self.failures = report.failures.clone();
        info!(
            generation = report.generation,
            page,
            succeeded = report.fetched.len(),
            failed = report.failures.len(),
            "Fetch applied"
        );
        Some(report)
    }

    /// Plan, fetch and apply `filters.page` in one go.
    pub async fn fetch_page<S: ArticleSource>(
        &mut self,
        source: &S,
        filters: &NewsFilters,
    ) -> Option<FetchReport> {
        let kind = if filters.page <= 1 {
            LoadKind::Initial
        } else {
            LoadKind::More
        };
        let plan = self.plan(filters, kind)?;
        let outcomes = Self::fetch(source, &plan).await;
        self.apply(&plan, outcomes)
    }

    /// Every fetched article, in feed order.
    pub fn items(&self) -> Vec<Article> {
        self.providers
            .iter()
            .flat_map(|state| state.pages.values())
            .flatten()
            .cloned()
            .collect()
    }

    /// Number of articles held across all providers.
    pub fn len(&self) -> usize {
        self.providers.iter().map(ProviderState::article_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
