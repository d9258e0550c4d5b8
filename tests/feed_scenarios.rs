//! End-to-end feed behavior against a scripted article source.
//!
//! Every test runs on a paused Tokio clock, so debounce windows and
//! provider latency are exact and instantaneous.

use awful_news_feed::error::Result;
use awful_news_feed::{
    Article, ArticleSource, FeedError, FeedOptions, FeedPhase, FilterPatch, NewsFeed, NewsFilters,
    ProviderId, SourceRef,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Answers each provider with a scripted number of articles after a fixed
/// latency, recording every call and the peak number of calls in flight.
struct StubSource {
    counts: HashMap<ProviderId, usize>,
    failing: HashSet<ProviderId>,
    latency: Duration,
    calls: Mutex<Vec<(ProviderId, NewsFilters)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubSource {
    fn full_pages() -> Self {
        Self {
            counts: HashMap::new(),
            failing: HashSet::new(),
            latency: Duration::from_millis(20),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    fn returning(mut self, provider: ProviderId, count: usize) -> Self {
        self.counts.insert(provider, count);
        self
    }

    fn failing(mut self, provider: ProviderId) -> Self {
        self.failing.insert(provider);
        self
    }

    fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Handle kept by the test while the feed owns the source.
#[derive(Clone)]
struct Probe(Arc<StubSource>);

impl Probe {
    fn calls(&self) -> Vec<(ProviderId, NewsFilters)> {
        self.0.calls.lock().unwrap().clone()
    }

    fn providers_called(&self) -> Vec<(ProviderId, u32)> {
        self.calls().into_iter().map(|(id, f)| (id, f.page)).collect()
    }

    fn clear(&self) {
        self.0.calls.lock().unwrap().clear();
    }

    fn peak_in_flight(&self) -> usize {
        self.0.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl ArticleSource for Probe {
    async fn fetch_articles(&self, provider: ProviderId, filters: &NewsFilters) -> Result<Vec<Article>> {
        let stub = &self.0;
        stub.calls.lock().unwrap().push((provider, filters.clone()));
        let now = stub.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stub.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        sleep(stub.latency).await;
        stub.in_flight.fetch_sub(1, Ordering::SeqCst);

        if stub.failing.contains(&provider) {
            return Err(FeedError::status(500, format!("{provider} is down")));
        }
        let count = stub
            .counts
            .get(&provider)
            .copied()
            .unwrap_or(filters.page_size as usize);
        let tag = filters.search_query().unwrap_or("all").to_string();
        Ok((0..count)
            .map(|n| Article {
                id: format!("{provider}-p{}-{n}-{tag}", filters.page),
                title: format!("{provider} story {n}"),
                description: String::new(),
                content: String::new(),
                url: format!("https://example.com/{provider}/{n}"),
                url_to_image: None,
                published_at: "2024-01-01T00:00:00Z".to_string(),
                author: None,
                source: SourceRef::provider(provider),
            })
            .collect())
    }
}

fn mount(stub: StubSource, initial: FilterPatch) -> (NewsFeed<Probe>, Probe) {
    let probe = Probe(Arc::new(stub));
    let feed = NewsFeed::mount(
        probe.clone(),
        FeedOptions::default()
            .debounce(DEBOUNCE)
            .initial_filters(initial),
    );
    (feed, probe)
}

fn providers_in(items: &[Article]) -> HashSet<String> {
    items.iter().filter_map(|a| a.source.id.clone()).collect()
}

#[tokio::test(start_paused = true)]
async fn fresh_mount_queries_every_provider_once() {
    let (feed, probe) = mount(StubSource::full_pages(), FilterPatch::default());

    let loading = feed.snapshot();
    assert!(loading.is_loading);
    assert!(!loading.is_loading_more);
    assert!(loading.items.is_empty());

    let view = feed.settled().await;
    assert!(!view.is_loading);
    assert_eq!(
        probe.providers_called().into_iter().collect::<HashSet<_>>(),
        ProviderId::ALL.into_iter().map(|id| (id, 1)).collect()
    );
    assert_eq!(probe.calls().len(), 3);
    assert_eq!(view.items.len(), 30);
    assert_eq!(providers_in(&view.items).len(), 3);
    assert!(view.has_more);
    assert_eq!(view.phase, FeedPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn full_page_keeps_cursor_short_page_exhausts() {
    let stub = StubSource::full_pages()
        .returning(ProviderId::Guardian, 10)
        .returning(ProviderId::NyTimes, 3);
    let (feed, _probe) = mount(stub, FilterPatch::default());
    feed.settled().await;

    assert!(feed.provider_state(ProviderId::Guardian).has_more);
    assert!(!feed.provider_state(ProviderId::NyTimes).has_more);
    assert!(feed.provider_state(ProviderId::NewsApi).has_more);
}

#[tokio::test(start_paused = true)]
async fn no_sources_means_no_calls() {
    let (feed, probe) = mount(StubSource::full_pages(), FilterPatch::sources(Vec::<ProviderId>::new()));

    let view = feed.snapshot();
    assert!(!view.is_loading);
    assert!(view.items.is_empty());
    assert!(!view.has_more);
    assert_eq!(view.phase, FeedPhase::Idle);

    sleep(Duration::from_secs(5)).await;
    assert!(probe.calls().is_empty());
    assert!(!feed.load_more());
}

#[tokio::test(start_paused = true)]
async fn load_more_without_more_pages_is_a_no_op() {
    let stub = StubSource::full_pages()
        .returning(ProviderId::Guardian, 2)
        .returning(ProviderId::NyTimes, 0)
        .returning(ProviderId::NewsApi, 9);
    let (feed, probe) = mount(stub, FilterPatch::default());
    let before = feed.settled().await;
    assert!(!before.has_more);
    probe.clear();

    assert!(!feed.load_more());
    sleep(Duration::from_secs(1)).await;

    assert!(probe.calls().is_empty());
    assert_eq!(feed.snapshot(), before);
    assert_eq!(feed.active_filters().page, 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_fetch_once_with_the_last_filters() {
    let (feed, probe) = mount(StubSource::full_pages(), FilterPatch::default());
    feed.settled().await;
    probe.clear();

    feed.on_filters_change(FilterPatch::search("a"));
    sleep(Duration::from_millis(100)).await;
    feed.on_filters_change(FilterPatch::search("ab"));

    sleep(DEBOUNCE - Duration::from_millis(1)).await;
    assert!(probe.calls().is_empty(), "fetch fired before the quiet period ended");

    let view = feed.settled().await;
    let calls = probe.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(_, f)| f.search_query() == Some("ab") && f.page == 1));
    assert!(view.items.iter().all(|a| a.id.ends_with("-ab")));
}

#[tokio::test(start_paused = true)]
async fn one_failing_provider_does_not_block_the_others() {
    let stub = StubSource::full_pages().failing(ProviderId::NyTimes);
    let (feed, _probe) = mount(stub, FilterPatch::default());

    let view = feed.settled().await;
    assert!(!view.is_loading);
    assert_eq!(view.items.len(), 20);
    assert_eq!(
        providers_in(&view.items),
        ["guardian".to_string(), "news-api".to_string()].into_iter().collect()
    );
    assert_eq!(view.failures.len(), 1);
    assert_eq!(view.failures[0].provider, ProviderId::NyTimes);
    assert_eq!(view.failures[0].error, FeedError::status(500, "ny-times is down"));
}

#[tokio::test(start_paused = true)]
async fn failed_provider_is_tried_again_on_the_next_page() {
    let stub = StubSource::full_pages().failing(ProviderId::NewsApi);
    let (feed, probe) = mount(stub, FilterPatch::default());
    feed.settled().await;
    assert!(feed.provider_state(ProviderId::NewsApi).has_more);

    probe.clear();
    assert!(feed.load_more());
    feed.settled().await;
    assert!(probe.providers_called().contains(&(ProviderId::NewsApi, 2)));
}

#[tokio::test(start_paused = true)]
async fn filter_edit_resets_synchronously() {
    let (feed, _probe) = mount(StubSource::full_pages(), FilterPatch::default());
    feed.settled().await;
    assert!(feed.load_more());
    feed.settled().await;
    assert_eq!(feed.active_filters().page, 2);

    feed.on_filters_change(FilterPatch::sources([ProviderId::Guardian]));

    let view = feed.snapshot();
    assert!(view.items.is_empty());
    assert!(view.is_loading);
    assert_eq!(view.phase, FeedPhase::Debouncing);
    assert_eq!(feed.active_filters().page, 1);
    for id in ProviderId::ALL {
        let state = feed.provider_state(id);
        assert!(state.has_more, "{id}");
        assert!(state.pages.is_empty(), "{id}");
    }

    // Same edit again: still a clean slate.
    feed.on_filters_change(FilterPatch::sources([ProviderId::Guardian]));
    assert!(feed.snapshot().items.is_empty());
    assert_eq!(feed.active_filters().page, 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_provider_is_never_queried_again() {
    let stub = StubSource::full_pages().returning(ProviderId::NyTimes, 3);
    let (feed, probe) = mount(stub, FilterPatch::default());
    feed.settled().await;

    for _ in 0..3 {
        assert!(feed.load_more());
        feed.settled().await;
        assert!(!feed.provider_state(ProviderId::NyTimes).has_more);
    }

    let nyt_pages: Vec<u32> = probe
        .providers_called()
        .into_iter()
        .filter(|(id, _)| *id == ProviderId::NyTimes)
        .map(|(_, page)| page)
        .collect();
    assert_eq!(nyt_pages, vec![1]);
    assert_eq!(feed.active_filters().page, 4);
}

#[tokio::test(start_paused = true)]
async fn items_are_ordered_by_provider_then_page() {
    let (feed, _probe) = mount(StubSource::full_pages(), FilterPatch::default());
    feed.settled().await;
    assert!(feed.load_more());
    let view = feed.settled().await;

    let ids: Vec<&str> = view.items.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids.len(), 60);
    assert_eq!(ids[0], "guardian-p1-0-all");
    assert_eq!(ids[19], "guardian-p2-9-all");
    assert_eq!(ids[20], "ny-times-p1-0-all");
    assert_eq!(ids[40], "news-api-p1-0-all");
    assert_eq!(ids[59], "news-api-p2-9-all");
}

#[tokio::test(start_paused = true)]
async fn providers_are_called_concurrently() {
    let stub = StubSource::full_pages().latency(Duration::from_secs(1));
    let (feed, probe) = mount(stub, FilterPatch::default());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(probe.calls().len(), 3);
    assert!(feed.snapshot().items.is_empty(), "no partial results mid-fetch");

    feed.settled().await;
    assert_eq!(probe.peak_in_flight(), 3);
}

#[tokio::test(start_paused = true)]
async fn late_results_of_old_filters_are_dropped() {
    let stub = StubSource::full_pages().latency(Duration::from_secs(1));
    let probe = Probe(Arc::new(stub));
    let feed = NewsFeed::mount(
        probe.clone(),
        FeedOptions::default().debounce(Duration::from_millis(100)),
    );

    sleep(Duration::from_millis(200)).await;
    feed.on_filters_change(FilterPatch::search("new"));

    // The first fetch lands at 1000ms, the second at 1300ms.
    sleep(Duration::from_millis(900)).await;
    let view = feed.snapshot();
    assert!(view.items.is_empty());
    assert!(view.is_loading);
    assert_eq!(view.generation, 2);

    let view = feed.settled().await;
    assert_eq!(probe.calls().len(), 6);
    assert_eq!(view.items.len(), 30);
    assert!(view.items.iter().all(|a| a.id.ends_with("-new")));
}

#[tokio::test(start_paused = true)]
async fn global_has_more_follows_active_providers() {
    let stub = StubSource::full_pages()
        .returning(ProviderId::Guardian, 10)
        .returning(ProviderId::NyTimes, 1)
        .returning(ProviderId::NewsApi, 1);
    let (feed, _probe) = mount(stub, FilterPatch::sources([ProviderId::NyTimes, ProviderId::NewsApi]));

    let view = feed.settled().await;
    assert!(!view.has_more);

    feed.on_filters_change(FilterPatch::sources([ProviderId::Guardian, ProviderId::NyTimes]));
    let view = feed.settled().await;
    assert!(view.has_more);
    assert!(!feed.provider_state(ProviderId::NyTimes).has_more);
}

#[tokio::test(start_paused = true)]
async fn snapshots_never_show_partial_fetches() {
    let stub = StubSource::full_pages().latency(Duration::from_millis(50));
    let (feed, _probe) = mount(stub, FilterPatch::default());
    let mut views = feed.subscribe();

    let mut seen = Vec::new();
    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        let settled = view.is_settled();
        seen.push(view.items.len());
        if settled {
            break;
        }
    }
    assert!(seen.iter().all(|&n| n == 0 || n == 30), "{seen:?}");
    assert_eq!(seen.last(), Some(&30));
}
