//! Top-level feed behaviour of the stories store: paging, single-flight
//! loading, refresh, feed switching and stale responses.

mod support;

use pretty_assertions::assert_eq;
use support::{ids, stories, ScriptedSource};
use threadline::item::{ItemId, ItemPayload};
use threadline::source::SourceError;
use threadline::store::{FeedType, FetchOutcome, Phase, StoreError, StoreEvent, Stories};
use tokio::sync::broadcast::error::TryRecvError;

fn drain(rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_first_page_then_end_reached_appends_next_page() {
    let source = ScriptedSource::new();
    source.push_page(stories("s", 0, 25));
    source.push_page(stories("s", 25, 10));
    let store = Stories::new(source, FeedType::Top, 25);

    let first = store.fetch_stories(0, 25).await.unwrap();
    assert_eq!(first, FetchOutcome::Applied { appended: 25 });
    assert_eq!(store.stories().len(), 25);
    assert!(!store.is_loading());

    let next = store.on_end_reached().await.unwrap();
    assert_eq!(next, FetchOutcome::Applied { appended: 10 });
    assert_eq!(store.cursor().offset(), 25);

    let listed = store.stories();
    assert_eq!(listed.len(), 35);
    assert_eq!(listed[0].id().as_str(), "s0");
    assert_eq!(listed[34].id().as_str(), "s34");
    assert!(listed.iter().all(|s| s.level() == 0 && s.is_root()));

    assert_eq!(
        store.source().page_calls(),
        vec![(FeedType::Top, 0, 25), (FeedType::Top, 25, 25)]
    );
}

#[tokio::test]
async fn test_requests_while_loading_are_dropped() {
    let (source, gate) = ScriptedSource::gated();
    source.push_page(stories("s", 0, 3));
    let store = Stories::new(source, FeedType::Top, 25);

    let (first, second, third, ()) = tokio::join!(
        store.fetch_stories(0, 25),
        store.on_end_reached(),
        store.refresh(),
        async {
            assert!(store.is_loading());
            assert_eq!(store.cursor().phase(), Phase::Loading);
            assert_eq!(store.cursor().offset(), 0);
            gate.notify_one();
        }
    );

    assert_eq!(first.unwrap(), FetchOutcome::Applied { appended: 3 });
    assert_eq!(second.unwrap(), FetchOutcome::Skipped);
    assert_eq!(third.unwrap(), FetchOutcome::Skipped);
    assert_eq!(store.source().page_calls().len(), 1);
    assert_eq!(store.cursor().offset(), 0);
    assert_eq!(store.stories().len(), 3);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_refresh_replaces_list_and_rewinds() {
    let source = ScriptedSource::new();
    source.push_page(stories("old", 0, 3));
    source.push_page(vec![
        ItemPayload::story("x").with_title("X"),
        ItemPayload::story("y").with_title("Y"),
    ]);
    let store = Stories::new(source, FeedType::Top, 10);

    store.fetch_stories(20, 10).await.unwrap();
    assert_eq!(store.cursor().offset(), 20);

    let mut rx = store.subscribe();
    let outcome = store.refresh().await.unwrap();

    assert_eq!(outcome, FetchOutcome::Applied { appended: 2 });
    assert_eq!(ids(&store.stories()), vec!["x", "y"]);
    assert_eq!(store.cursor().offset(), 0);
    assert!(store.item(&ItemId::from("old0")).is_none());
    assert!(!store.is_refreshing());
    assert_eq!(
        drain(&mut rx),
        vec![
            StoreEvent::RootsChanged,
            StoreEvent::LoadingChanged(true),
            StoreEvent::RefreshingChanged(true),
            StoreEvent::RootsChanged,
            StoreEvent::LoadingChanged(false),
            StoreEvent::RefreshingChanged(false),
        ]
    );
}

#[tokio::test]
async fn test_refresh_never_shows_old_and_new_together() {
    let (source, gate) = ScriptedSource::gated();
    source.push_page(stories("old", 0, 3));
    source.push_page(stories("new", 0, 2));
    let store = Stories::new(source, FeedType::Top, 25);

    gate.notify_one();
    store.fetch_stories(0, 25).await.unwrap();
    assert_eq!(store.stories().len(), 3);

    let (outcome, ()) = tokio::join!(store.refresh(), async {
        assert!(store.stories().is_empty());
        assert!(store.is_refreshing());
        assert_eq!(store.cursor().phase(), Phase::Refreshing);
        gate.notify_one();
    });

    assert_eq!(outcome.unwrap(), FetchOutcome::Applied { appended: 2 });
    assert_eq!(ids(&store.stories()), vec!["new0", "new1"]);
}

#[tokio::test]
async fn test_failed_page_leaves_list_and_allows_retry() {
    let source = ScriptedSource::new();
    source.push_page(stories("s", 0, 2));
    source.push_page_error(SourceError::Timeout);
    source.push_page(stories("s", 2, 2));
    let store = Stories::new(source, FeedType::Top, 2);

    store.fetch_stories(0, 2).await.unwrap();
    let err = store.on_end_reached().await.unwrap_err();

    assert!(matches!(err, StoreError::Page { offset: 2, .. }));
    assert!(err.is_connectivity());
    assert_eq!(ids(&store.stories()), vec!["s0", "s1"]);
    assert!(!store.is_loading());
    assert!(!store.is_refreshing());

    // The next scroll asks for the same page again
    let retry = store.on_end_reached().await.unwrap();
    assert_eq!(retry, FetchOutcome::Applied { appended: 2 });
    assert_eq!(ids(&store.stories()), vec!["s0", "s1", "s2", "s3"]);
    assert_eq!(
        store.source().page_calls(),
        vec![
            (FeedType::Top, 0, 2),
            (FeedType::Top, 2, 2),
            (FeedType::Top, 2, 2)
        ]
    );
}

#[tokio::test]
async fn test_http_status_error_is_not_connectivity() {
    let source = ScriptedSource::new();
    source.push_page_error(SourceError::HttpStatus(404));
    let store = Stories::new(source, FeedType::Top, 25);

    let err = store.fetch_stories(0, 25).await.unwrap_err();
    assert!(!err.is_connectivity());
    assert!(matches!(err.source_error(), SourceError::HttpStatus(404)));
}

#[tokio::test]
async fn test_refetching_a_page_adds_no_duplicates() {
    let source = ScriptedSource::new();
    source.push_page(stories("s", 0, 3));
    source.push_page(stories("s", 0, 3));
    source.push_page(stories("s", 2, 3));
    let store = Stories::new(source, FeedType::Top, 3);

    store.fetch_stories(0, 3).await.unwrap();
    let again = store.fetch_stories(0, 3).await.unwrap();
    assert_eq!(again, FetchOutcome::Applied { appended: 0 });

    // s2 slid onto the next page
    let next = store.fetch_stories(3, 3).await.unwrap();
    assert_eq!(next, FetchOutcome::Applied { appended: 2 });
    assert_eq!(ids(&store.stories()), vec!["s0", "s1", "s2", "s3", "s4"]);
    store.snapshot().validate().unwrap();
}

#[tokio::test]
async fn test_repeated_story_refreshes_content() {
    let source = ScriptedSource::new();
    source.push_page(vec![ItemPayload::story("s").with_title("Draft")]);
    source.push_page(vec![ItemPayload::story("s").with_title("Final")]);
    let store = Stories::new(source, FeedType::Top, 25);

    store.fetch_stories(0, 25).await.unwrap();
    store.fetch_stories(0, 25).await.unwrap();

    let story = store.item(&ItemId::from("s")).unwrap();
    assert_eq!(story.content().title.as_deref(), Some("Final"));
    assert_eq!(store.stories().len(), 1);
}

#[tokio::test]
async fn test_story_that_is_already_a_comment_is_skipped() {
    let source = ScriptedSource::new();
    source.push_page(vec![ItemPayload::story("s")
        .with_children(vec![ItemPayload::comment("c")])]);
    source.push_page(vec![ItemPayload::story("c"), ItemPayload::story("t")]);
    let store = Stories::new(source, FeedType::Top, 25);

    store.fetch_stories(0, 25).await.unwrap();
    let outcome = store.fetch_stories(25, 25).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Applied { appended: 1 });
    assert_eq!(ids(&store.stories()), vec!["s", "t"]);
    let c = store.item(&ItemId::from("c")).unwrap();
    assert_eq!(c.parent(), Some(&ItemId::from("s")));
    assert_eq!(c.level(), 1);
}

#[tokio::test]
async fn test_set_type_to_current_is_a_no_op() {
    let source = ScriptedSource::new();
    source.push_page(stories("s", 0, 3));
    let store = Stories::new(source, FeedType::Top, 3);
    store.fetch_stories(0, 3).await.unwrap();
    store.on_end_reached().await.unwrap();

    let mut rx = store.subscribe();
    assert!(!store.set_type(FeedType::Top));

    assert_eq!(store.stories().len(), 3);
    assert_eq!(store.cursor().offset(), 3);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_set_type_switches_without_clearing() {
    let source = ScriptedSource::new();
    source.push_page(stories("s", 0, 3));
    let store = Stories::new(source, FeedType::Top, 25);
    store.fetch_stories(0, 25).await.unwrap();

    let mut rx = store.subscribe();
    assert!(store.set_type(FeedType::Ask));

    assert_eq!(store.feed_type(), FeedType::Ask);
    assert_eq!(store.stories().len(), 3);
    assert_eq!(drain(&mut rx), vec![StoreEvent::TypeChanged(FeedType::Ask)]);
}

#[tokio::test]
async fn test_change_type_clears_and_loads_first_page() {
    let source = ScriptedSource::new();
    source.push_page(stories("top", 0, 3));
    // End of the top feed
    source.push_page(Vec::new());
    source.push_page(stories("new", 0, 2));
    let store = Stories::new(source, FeedType::Top, 3);
    store.fetch_stories(0, 3).await.unwrap();
    store.on_end_reached().await.unwrap();

    let outcome = store.change_type(FeedType::New).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Applied { appended: 2 });
    assert_eq!(ids(&store.stories()), vec!["new0", "new1"]);
    assert_eq!(store.cursor().offset(), 0);
    assert_eq!(
        store.source().page_calls().last(),
        Some(&(FeedType::New, 0, 3))
    );

    let same = store.change_type(FeedType::New).await.unwrap();
    assert_eq!(same, FetchOutcome::Skipped);
    assert_eq!(store.stories().len(), 2);
}

#[tokio::test]
async fn test_change_type_while_loading_fetches_new_first_page() {
    let (source, gate) = ScriptedSource::gated();
    source.push_page_for(FeedType::Top, stories("top", 0, 3));
    source.push_page_for(FeedType::New, stories("new", 0, 2));
    let store = Stories::new(source, FeedType::Top, 3);

    let (first, switched, ()) = tokio::join!(
        store.fetch_stories(0, 3),
        store.change_type(FeedType::New),
        async {
            assert!(store.is_loading());
            assert_eq!(store.feed_type(), FeedType::New);
            gate.notify_one();
            gate.notify_one();
        }
    );

    assert_eq!(first.unwrap(), FetchOutcome::Stale);
    assert_eq!(switched.unwrap(), FetchOutcome::Applied { appended: 2 });
    assert_eq!(ids(&store.stories()), vec!["new0", "new1"]);
    assert_eq!(store.cursor().offset(), 0);
    assert!(!store.is_loading());
    assert_eq!(
        store.source().page_calls(),
        vec![(FeedType::Top, 0, 3), (FeedType::New, 0, 3)]
    );

    // Paging continues from the new first page
    store.on_end_reached().await.unwrap();
    assert_eq!(
        store.source().page_calls().last(),
        Some(&(FeedType::New, 3, 3))
    );
}

#[tokio::test]
async fn test_stale_load_does_not_block_reload_after_clear() {
    let (source, gate) = ScriptedSource::gated();
    source.push_page(stories("s", 0, 2));
    let store = Stories::new(source, FeedType::Top, 25);

    let (stale, reload, ()) = tokio::join!(
        store.fetch_stories(0, 25),
        async {
            store.clear();
            store.fetch_stories(0, 25).await
        },
        async {
            gate.notify_one();
            gate.notify_one();
        }
    );

    assert_eq!(stale.unwrap(), FetchOutcome::Stale);
    // Whichever request read the scripted page, the list ends up consistent
    assert!(matches!(reload.unwrap(), FetchOutcome::Applied { .. }));
    assert!(!store.is_loading());
    assert_eq!(store.source().page_calls().len(), 2);
    store.snapshot().validate().unwrap();
}

#[tokio::test]
async fn test_page_for_cleared_list_is_discarded() {
    let (source, gate) = ScriptedSource::gated();
    source.push_page(stories("s", 0, 3));
    let store = Stories::new(source, FeedType::Top, 25);

    let (outcome, ()) = tokio::join!(store.fetch_stories(0, 25), async {
        store.clear();
        gate.notify_one();
    });

    assert_eq!(outcome.unwrap(), FetchOutcome::Stale);
    assert!(store.stories().is_empty());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_page_for_previous_type_is_discarded() {
    let (source, gate) = ScriptedSource::gated();
    source.push_page(stories("top", 0, 3));
    let store = Stories::new(source, FeedType::Top, 25);

    let (outcome, ()) = tokio::join!(store.fetch_stories(0, 25), async {
        assert!(store.set_type(FeedType::Show));
        gate.notify_one();
    });

    assert_eq!(outcome.unwrap(), FetchOutcome::Stale);
    assert!(store.stories().is_empty());
    assert_eq!(store.feed_type(), FeedType::Show);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_load_events_are_published() {
    let source = ScriptedSource::new();
    source.push_page(stories("s", 0, 1));
    let store = Stories::new(source, FeedType::Top, 25);
    let mut rx = store.subscribe();

    store.fetch_stories(0, 25).await.unwrap();
    // Empty page: no roots changed
    store.on_end_reached().await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            StoreEvent::LoadingChanged(true),
            StoreEvent::RootsChanged,
            StoreEvent::LoadingChanged(false),
            StoreEvent::LoadingChanged(true),
            StoreEvent::LoadingChanged(false),
        ]
    );
}

#[tokio::test]
async fn test_dispose_closes_events_and_ignores_requests() {
    let source = ScriptedSource::new();
    source.push_page(stories("s", 0, 1));
    let store = Stories::new(source, FeedType::Top, 25);
    let mut rx = store.subscribe();

    store.dispose();
    store.dispose();

    assert!(store.is_disposed());
    assert_eq!(rx.recv().await.unwrap(), StoreEvent::Disposed);
    assert!(rx.recv().await.is_err());
    assert!(store.subscribe().recv().await.is_err());

    assert_eq!(store.fetch_stories(0, 25).await.unwrap(), FetchOutcome::Skipped);
    assert_eq!(store.refresh().await.unwrap(), FetchOutcome::Skipped);
    assert_eq!(store.on_end_reached().await.unwrap(), FetchOutcome::Skipped);
    assert!(store.source().page_calls().is_empty());
}

#[tokio::test]
async fn test_page_in_flight_at_dispose_is_discarded() {
    let (source, gate) = ScriptedSource::gated();
    source.push_page(stories("s", 0, 3));
    let store = Stories::new(source, FeedType::Top, 25);

    let (outcome, ()) = tokio::join!(store.fetch_stories(0, 25), async {
        store.dispose();
        gate.notify_one();
    });

    assert_eq!(outcome.unwrap(), FetchOutcome::Stale);
    assert!(store.stories().is_empty());
}
