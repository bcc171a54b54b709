mod common;

use common::{books, Reply, ScriptedService};
use folio_search::controller::DEFAULT_RETRY_DELAY;
use folio_search::{ErrorKind, QueryParameters, SearchController, SearchState, SortOption};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

async fn failed_session(svc: &Arc<ScriptedService>, query: &str) -> SearchController {
    let controller = SearchController::new(svc.clone());
    controller
        .submit(query, QueryParameters::new(SortOption::Newest, true))
        .expect("query")
        .settled()
        .await;
    assert!(matches!(controller.state(), SearchState::Failed { .. }));
    controller
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_fixed_delay_then_reattempts() {
    let svc = Arc::new(ScriptedService::new());
    svc.reply("isbn:000", Reply::Offline);
    let controller = failed_session(&svc, "isbn:000").await;
    assert_eq!(
        controller.state(),
        SearchState::Failed {
            message: "Please check your internet connection and try again.".into(),
            cause: ErrorKind::NetworkUnavailable,
        }
    );

    let start = Instant::now();
    let handle = controller.retry().expect("there is a query to retry");
    assert_eq!(
        controller.state(),
        SearchState::Searching {
            query: "isbn:000".into()
        }
    );

    tokio::time::sleep(DEFAULT_RETRY_DELAY / 2).await;
    assert_eq!(svc.call_count(), 1, "no request before the delay elapses");

    handle.settled().await;
    assert!(start.elapsed() >= DEFAULT_RETRY_DELAY);
    assert_eq!(svc.call_count(), 2);
    assert_eq!(controller.state().cause(), Some(ErrorKind::NetworkUnavailable));
}

#[tokio::test(start_paused = true)]
async fn test_retry_reuses_query_and_parameters() {
    let svc = Arc::new(ScriptedService::new());
    svc.reply("the dispossessed", Reply::TimedOut);
    let controller = failed_session(&svc, "the dispossessed").await;

    svc.reply("the dispossessed", Reply::Books(books("ld", 2)));
    controller.retry().expect("retry").settled().await;

    assert_eq!(controller.state().count(), Some(2));
    let calls = svc.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], calls[0]);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_retries_collapse_into_one_request() {
    let svc = Arc::new(ScriptedService::new());
    svc.reply("kindred", Reply::Offline);
    let controller = failed_session(&svc, "kindred").await;

    let taps: Vec<_> = (0..3)
        .map(|_| controller.retry().expect("retry"))
        .collect();
    futures::future::join_all(taps.into_iter().map(|h| h.settled())).await;

    assert_eq!(svc.call_count(), 2, "one original attempt plus one retry");
    assert!(matches!(controller.state(), SearchState::Failed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_retry_without_query_returns_to_idle() {
    let svc = Arc::new(ScriptedService::new());
    let controller = SearchController::new(svc.clone());

    assert!(controller.retry().is_none());
    assert_eq!(controller.state(), SearchState::Idle);

    svc.reply("lost", Reply::Offline);
    controller
        .submit("lost", QueryParameters::default())
        .unwrap()
        .settled()
        .await;
    controller.clear();
    assert!(controller.retry().is_none());
    assert_eq!(controller.state(), SearchState::Idle);
    assert_eq!(svc.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_search_during_retry_delay_wins() {
    let svc = Arc::new(ScriptedService::new());
    svc.reply("ficciones", Reply::Offline);
    svc.reply("labyrinths", Reply::Books(books("labyrinths", 1)));
    let controller = failed_session(&svc, "ficciones").await;

    let pending_retry = controller.retry().expect("retry");
    let fresh = controller
        .submit("labyrinths", QueryParameters::default())
        .expect("query");

    fresh.settled().await;
    pending_retry.settled().await;

    let queries: Vec<String> = svc.calls().into_iter().map(|c| c.query).collect();
    assert_eq!(queries, vec!["ficciones", "labyrinths"]);
    assert_eq!(controller.state().count(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_clear_during_retry_delay_cancels_request() {
    let svc = Arc::new(ScriptedService::new());
    svc.reply("snow crash", Reply::Offline);
    let controller = failed_session(&svc, "snow crash").await;

    let pending_retry = controller.retry().expect("retry");
    tokio::time::sleep(Duration::from_millis(10)).await;
    controller.clear();
    pending_retry.settled().await;

    assert_eq!(svc.call_count(), 1);
    assert_eq!(controller.state(), SearchState::Idle);
}
