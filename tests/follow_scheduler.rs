//! Debounce behavior of the follow scheduler under a paused clock.

use std::sync::Arc;
use std::time::Duration;

use agent_follow::follow::{FollowRequest, FollowScheduler};
use agent_follow::host::{HostEffect, MemoryHost};
use agent_follow::text::line_start;
use agent_follow::viewport::ViewportPositioner;
use agent_follow::{DiffInfo, Location};
use tokio::runtime::Handle;

const DEBOUNCE: Duration = Duration::from_millis(300);

fn numbered_lines(count: usize) -> String {
    (1..=count).map(|n| format!("line {n}\n")).collect()
}

fn setup(paths: &[&str]) -> (Arc<MemoryHost>, FollowScheduler) {
    let host = Arc::new(MemoryHost::new());
    for path in paths {
        host.open_text(path, numbered_lines(50));
    }
    let positioner = Arc::new(ViewportPositioner::with_settle_delays(
        host.clone(),
        Vec::new(),
    ));
    let scheduler = FollowScheduler::new(host.clone(), positioner, Handle::current());
    (host, scheduler)
}

fn show_count(host: &MemoryHost) -> usize {
    host.effects()
        .iter()
        .filter(|e| matches!(e, HostEffect::Show { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_three_requests_in_window_move_once_to_last() {
    let (host, scheduler) = setup(&["/p/a.rs", "/p/b.rs"]);

    scheduler.schedule(
        FollowRequest::new(Location::new("/p/a.rs", Some(3)), None),
        DEBOUNCE,
    );
    scheduler.schedule(
        FollowRequest::new(Location::new("/p/a.rs", Some(10)), None),
        DEBOUNCE,
    );
    scheduler.schedule(
        FollowRequest::new(Location::new("/p/b.rs", Some(20)), None),
        DEBOUNCE,
    );

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(show_count(&host), 1);
    let points = host.view_points();
    assert_eq!(points.len(), 1);
    let text = host.document_text("/p/b.rs").unwrap();
    assert!(matches!(
        &host.effects()[0],
        HostEffect::Show { path, .. } if path.ends_with("b.rs")
    ));
    assert_eq!(points[0].1, line_start(&text, 20));
}

#[tokio::test(start_paused = true)]
async fn test_requests_outside_window_each_move() {
    let (host, scheduler) = setup(&["/p/a.rs"]);

    scheduler.schedule(
        FollowRequest::new(Location::new("/p/a.rs", Some(1)), None),
        DEBOUNCE,
    );
    tokio::time::sleep(Duration::from_millis(400)).await;
    scheduler.schedule(
        FollowRequest::new(Location::new("/p/a.rs", Some(2)), None),
        DEBOUNCE,
    );
    tokio::time::sleep(Duration::from_millis(400)).await;

    let offsets: Vec<usize> = host.view_points().into_iter().map(|(_, o)| o).collect();
    assert_eq!(offsets, vec![0, "line 1\n".len()]);
}

#[tokio::test(start_paused = true)]
async fn test_target_resolved_against_live_document() {
    let (host, scheduler) = setup(&["/p/a.rs"]);

    scheduler.schedule(
        FollowRequest::new(
            Location::new("/p/a.rs", None),
            Some(DiffInfo::new("line 40\n", "line forty\n")),
        ),
        DEBOUNCE,
    );
    // The document shrinks while the timer is pending.
    host.open_text("/p/a.rs", "line 40\n");
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(host.view_points().into_iter().map(|(_, o)| o).collect::<Vec<_>>(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_scheduler_cancels_timer() {
    let (host, scheduler) = setup(&["/p/a.rs"]);

    scheduler.schedule(
        FollowRequest::new(Location::new("/p/a.rs", Some(5)), None),
        DEBOUNCE,
    );
    drop(scheduler);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(host.effects().is_empty());
}
