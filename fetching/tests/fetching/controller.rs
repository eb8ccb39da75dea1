use fetching::{
    FetchController, FetchError, FetchMode, FetchOptions, Phase, Severity,
};
use futures::FutureExt;
use jiff::ToSpan;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::helpers::{
    CallCounter, ManualProducer, counting_producer, scripted_producer, start_time,
    test_env,
};

fn countries() -> Vec<String> {
    vec!["US".to_string(), "CA".to_string()]
}

#[tokio::test]
async fn second_controller_is_served_from_cache() -> anyhow::Result<()> {
    let env = test_env();
    let options = FetchOptions::default()
        .cache_key("countries")
        .cache_time(Duration::from_millis(5_000));

    let first_calls = CallCounter::default();
    let first = FetchController::new(
        &env.ctx,
        options.clone(),
        None,
        counting_producer(countries(), &first_calls),
    );
    first.start().await;

    let state = first.state();
    assert_eq!(state.data, Some(countries()));
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
    assert_eq!(first_calls.get(), 1);

    let entry = env.cache.get("countries").unwrap();
    assert_eq!(entry.value::<Vec<String>>(), Some(&countries()));
    assert_eq!(entry.stored_at(), start_time());

    env.time_source.advance(1_000.milliseconds());

    let second_calls = CallCounter::default();
    let second = FetchController::new(
        &env.ctx,
        options,
        None,
        counting_producer(Vec::<String>::new(), &second_calls),
    );
    // Completes on the first poll: no await point is reached.
    assert!(second.start().now_or_never().is_some());

    assert_eq!(second.state().data, Some(countries()));
    assert!(!second.state().is_loading);
    assert_eq!(second.phase(), Phase::Ready);
    assert_eq!(second_calls.get(), 0);

    Ok(())
}

#[tokio::test]
async fn stale_cache_entry_invokes_the_producer() {
    let env = test_env();
    let options = FetchOptions::default()
        .cache_key("countries")
        .cache_time(Duration::from_millis(5_000));
    env.cache.set("countries", vec!["SE".to_string()]);

    env.time_source.advance(5_001.milliseconds());

    let calls = CallCounter::default();
    let controller = FetchController::new(
        &env.ctx,
        options,
        None,
        counting_producer(countries(), &calls),
    );
    controller.start().await;

    assert_eq!(calls.get(), 1);
    assert_eq!(controller.state().data, Some(countries()));
    let entry = env.cache.get("countries").unwrap();
    assert_eq!(entry.stored_at(), start_time() + 5_001.milliseconds());
}

#[tokio::test]
async fn refetch_always_invokes_the_producer() {
    let env = test_env();
    let options = FetchOptions::default().cache_key("cost-centers");
    let calls = CallCounter::default();
    let controller = FetchController::new(
        &env.ctx,
        options,
        None,
        counting_producer(vec![100, 200], &calls),
    );

    controller.start().await;
    assert_eq!(calls.get(), 1);
    assert!(env.cache.get("cost-centers").is_some());

    // The entry is still fresh, yet the explicit refetch goes to the producer.
    controller.refetch(false).await;
    controller.refetch(true).await;
    assert_eq!(calls.get(), 3);

    // A plain initial fetch is answered from the cache again.
    controller.fetch(FetchMode::Initial).await;
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn results_after_dispose_are_discarded() {
    let env = test_env();
    let manual = ManualProducer::<u32>::new();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default().cache_key("headcount"),
        Some(12),
        manual.producer(),
    );
    let disposer = controller.disposer();

    let mut pending = Box::pin(controller.start());
    assert!(futures::poll!(&mut pending).is_pending());

    let before = controller.state();
    assert!(before.is_loading);
    assert_eq!(before.data, Some(12));

    disposer.dispose();
    manual.resolve(0, Ok(15));
    pending.await;

    assert_eq!(controller.state(), before);
    assert!(!controller.is_mounted());
    assert!(!env.cache.contains_key("headcount"));
    assert!(env.notifier.take().is_empty());
}

#[tokio::test]
async fn failures_after_dispose_are_discarded() {
    let env = test_env();
    let manual = ManualProducer::<u32>::new();
    let controller =
        FetchController::new(&env.ctx, FetchOptions::default(), None, manual.producer());

    let mut pending = Box::pin(controller.refetch(true));
    assert!(futures::poll!(&mut pending).is_pending());
    let before = controller.state();
    assert!(before.is_refreshing);

    controller.disposer().dispose();
    manual.resolve(0, Err("connection reset".to_string()));
    pending.await;

    assert_eq!(controller.state(), before);
    assert_eq!(controller.state().error, None);
    assert!(env.notifier.take().is_empty());

    // Nothing runs once disposed.
    controller.refetch(true).await;
    controller.set_data(99);
    assert_eq!(manual.calls(), 1);
    assert_eq!(controller.state(), before);
}

#[tokio::test]
async fn failed_refetch_keeps_last_good_data() {
    let env = test_env();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default(),
        None,
        scripted_producer(vec![
            Ok(vec!["INV-001".to_string()]),
            Err("service unavailable".to_string()),
        ]),
    );

    controller.start().await;
    let loaded = controller.state().data;
    assert_eq!(loaded, Some(vec!["INV-001".to_string()]));

    controller.refetch(true).await;

    let state = controller.state();
    assert_eq!(state.data, loaded);
    assert_eq!(
        state.error,
        Some(FetchError::Producer("service unavailable".to_string()))
    );
    assert!(!state.is_refreshing);
    assert_eq!(controller.phase(), Phase::Errored);
}

#[tokio::test]
async fn producer_failure_notifies_once_with_configured_message() {
    let env = test_env();
    let options = FetchOptions::default()
        .show_error_toast(true)
        .error_message("Could not load the general ledger");
    let controller = FetchController::new(
        &env.ctx,
        options,
        None,
        scripted_producer::<Vec<u32>>(vec![Err("network down".to_string())]),
    );

    controller.start().await;

    let state = controller.state();
    assert_eq!(
        state.error,
        Some(FetchError::Producer("network down".to_string()))
    );
    assert_eq!(
        state.error.as_ref().map(ToString::to_string).as_deref(),
        Some("network down")
    );
    assert!(!state.is_loading);
    assert_eq!(state.data, None);

    let messages = env.notifier.take();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, Severity::Error);
    assert!(messages[0].1.contains("Could not load the general ledger"));
}

#[tokio::test]
async fn error_toast_can_be_disabled() {
    let env = test_env();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default().show_error_toast(false),
        None,
        scripted_producer::<u32>(vec![Err("boom".to_string())]),
    );

    controller.start().await;

    assert!(controller.state().error.is_some());
    assert!(env.notifier.take().is_empty());
}

#[tokio::test]
async fn success_toast_only_for_notifying_refetch() {
    let env = test_env();
    let options = FetchOptions::default()
        .show_success_toast(true)
        .success_message("Payroll refreshed");
    let calls = CallCounter::default();
    let controller =
        FetchController::new(&env.ctx, options, None, counting_producer(3, &calls));

    controller.start().await;
    assert!(env.notifier.take().is_empty());

    controller.refetch(false).await;
    assert!(env.notifier.take().is_empty());

    controller.refetch(true).await;
    assert_eq!(
        env.notifier.take(),
        vec![(Severity::Success, "Payroll refreshed".to_string())]
    );
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn success_clears_previous_error() {
    let env = test_env();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default(),
        None,
        scripted_producer(vec![Err("timeout".to_string()), Ok(42_u32)]),
    );

    controller.start().await;
    assert!(controller.state().error.is_some());

    controller.refetch(false).await;
    let state = controller.state();
    assert_eq!(state.error, None);
    assert_eq!(state.data, Some(42));
    assert_eq!(controller.phase(), Phase::Ready);
}

#[tokio::test]
async fn loading_and_refreshing_are_exclusive() {
    let env = test_env();
    let manual = ManualProducer::<&'static str>::new();
    let controller =
        FetchController::new(&env.ctx, FetchOptions::default(), None, manual.producer());

    let seen = Rc::new(RefCell::new(Vec::new()));
    controller.subscribe({
        let seen = Rc::clone(&seen);
        move |state| {
            seen.borrow_mut()
                .push((state.is_loading, state.is_refreshing))
        }
    });

    let mut initial = Box::pin(controller.start());
    assert!(futures::poll!(&mut initial).is_pending());
    assert_eq!(controller.phase(), Phase::Loading);

    let mut refresh = Box::pin(controller.refetch(false));
    assert!(futures::poll!(&mut refresh).is_pending());
    let state = controller.state();
    assert!(!state.is_loading);
    assert!(state.is_refreshing);
    assert_eq!(manual.calls(), 2);

    manual.resolve(0, Ok("old"));
    initial.await;
    manual.resolve(1, Ok("new"));
    refresh.await;

    assert!(!seen.borrow().is_empty());
    assert!(seen.borrow().iter().all(|(loading, refreshing)| !(*loading && *refreshing)));
    assert_eq!(controller.state().data, Some("new"));
    assert_eq!(controller.phase(), Phase::Ready);
}

#[tokio::test]
async fn superseded_result_is_ignored() {
    let env = test_env();
    let manual = ManualProducer::<&'static str>::new();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default().cache_key("budget"),
        None,
        manual.producer(),
    );

    let mut older = Box::pin(controller.refetch(false));
    assert!(futures::poll!(&mut older).is_pending());
    let mut newer = Box::pin(controller.refetch(false));
    assert!(futures::poll!(&mut newer).is_pending());

    // The newer call settles first; the older one arrives late.
    manual.resolve(1, Ok("Q2 budget"));
    newer.await;
    manual.resolve(0, Ok("Q1 budget"));
    older.await;

    assert_eq!(controller.state().data, Some("Q2 budget"));
    assert_eq!(
        env.cache.get("budget").unwrap().value::<&str>(),
        Some(&"Q2 budget")
    );
}

#[tokio::test]
async fn auto_fetch_disabled_stays_idle() {
    let env = test_env();
    let calls = CallCounter::default();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default().auto_fetch(false),
        Some(Vec::<String>::new()),
        counting_producer(vec!["Q3".to_string()], &calls),
    );

    controller.start().await;
    assert_eq!(calls.get(), 0);
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.state().data, Some(Vec::new()));

    controller.refetch(false).await;
    assert_eq!(calls.get(), 1);
    assert_eq!(controller.state().data, Some(vec!["Q3".to_string()]));
}

#[tokio::test]
async fn set_data_overrides_without_side_effects() {
    let env = test_env();
    let calls = CallCounter::default();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default().cache_key("vendors"),
        None,
        counting_producer(vec!["Acme".to_string()], &calls),
    );
    let changes = Rc::new(RefCell::new(0));
    controller.subscribe({
        let changes = Rc::clone(&changes);
        move |_| *changes.borrow_mut() += 1
    });

    controller.set_data(vec!["Acme".to_string(), "Globex".to_string()]);

    assert_eq!(calls.get(), 0);
    assert!(!env.cache.contains_key("vendors"));
    assert_eq!(*changes.borrow(), 1);
    assert_eq!(
        controller.state().data,
        Some(vec!["Acme".to_string(), "Globex".to_string()])
    );
}

#[tokio::test]
async fn concurrent_initial_fetches_share_one_producer_call() {
    let env = test_env();
    let options = FetchOptions::default().cache_key("chart-of-accounts");
    let first_producer = ManualProducer::<u32>::new();
    let second_producer = ManualProducer::<u32>::new();
    let first = FetchController::new(
        &env.ctx,
        options.clone(),
        None,
        first_producer.producer(),
    );
    let second =
        FetchController::new(&env.ctx, options, None, second_producer.producer());

    let mut first_load = Box::pin(first.start());
    let mut second_load = Box::pin(second.start());
    assert!(futures::poll!(&mut first_load).is_pending());
    assert!(futures::poll!(&mut second_load).is_pending());
    assert!(second.state().is_loading);

    first_producer.resolve(0, Ok(412));
    futures::join!(first_load, second_load);

    assert_eq!(first_producer.calls(), 1);
    assert_eq!(second_producer.calls(), 0);
    assert_eq!(first.state().data, Some(412));
    assert_eq!(second.state().data, Some(412));
    assert_eq!(env.cache.in_flight_count(), 0);
}

#[tokio::test]
async fn dedupe_can_be_disabled() {
    let env = test_env();
    let options = FetchOptions::default()
        .cache_key("chart-of-accounts")
        .dedupe_in_flight(false);
    let first_producer = ManualProducer::<u32>::new();
    let second_producer = ManualProducer::<u32>::new();
    let first = FetchController::new(
        &env.ctx,
        options.clone(),
        None,
        first_producer.producer(),
    );
    let second =
        FetchController::new(&env.ctx, options, None, second_producer.producer());

    let mut first_load = Box::pin(first.start());
    let mut second_load = Box::pin(second.start());
    assert!(futures::poll!(&mut first_load).is_pending());
    assert!(futures::poll!(&mut second_load).is_pending());

    first_producer.resolve(0, Ok(1));
    second_producer.resolve(0, Ok(2));
    futures::join!(first_load, second_load);

    assert_eq!(first_producer.calls(), 1);
    assert_eq!(second_producer.calls(), 1);
    // Last write wins.
    assert_eq!(
        env.cache.get("chart-of-accounts").unwrap().value::<u32>(),
        Some(&2)
    );
}

#[tokio::test]
async fn abandoned_initial_fetch_does_not_block_other_controllers() {
    let env = test_env();
    let options = FetchOptions::default().cache_key("exchange-rates");
    let manual = ManualProducer::<u32>::new();
    let first =
        FetchController::new(&env.ctx, options.clone(), None, manual.producer());

    let mut abandoned = Box::pin(first.start());
    assert!(futures::poll!(&mut abandoned).is_pending());
    drop(abandoned);
    assert_eq!(env.cache.in_flight_count(), 0);

    let calls = CallCounter::default();
    let second =
        FetchController::new(&env.ctx, options, None, counting_producer(108, &calls));
    assert!(second.start().now_or_never().is_some());

    assert_eq!(calls.get(), 1);
    assert_eq!(second.state().data, Some(108));
    assert!(!second.state().is_loading);
}

#[tokio::test]
async fn repeated_initial_fetch_calls_the_producer_again() {
    let env = test_env();
    let manual = ManualProducer::<&'static str>::new();
    let controller = FetchController::new(
        &env.ctx,
        FetchOptions::default().cache_key("cost-center-report"),
        None,
        manual.producer(),
    );

    // Dependencies change while the first load is still running.
    let mut older = Box::pin(controller.start());
    assert!(futures::poll!(&mut older).is_pending());
    let mut newer = Box::pin(controller.start());
    assert!(futures::poll!(&mut newer).is_pending());
    assert_eq!(manual.calls(), 2);

    manual.resolve(1, Ok("2026 report"));
    newer.await;
    manual.resolve(0, Ok("2025 report"));
    older.await;

    assert_eq!(controller.state().data, Some("2026 report"));
    assert_eq!(
        env.cache.get("cost-center-report").unwrap().value::<&str>(),
        Some(&"2026 report")
    );
    assert_eq!(env.cache.in_flight_count(), 0);
}
