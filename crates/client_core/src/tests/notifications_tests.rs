use super::*;
use shared::domain::NotificationKind;

use crate::ui::UiEvent;

const DWELL: Duration = Duration::from_secs(5);

fn surface() -> (Arc<UiStore>, NotificationSurface) {
    let ui = Arc::new(UiStore::new());
    let surface = NotificationSurface::new(Arc::clone(&ui), DWELL);
    (ui, surface)
}

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn rendered_notification_expires_after_dwell() {
    let (ui, surface) = surface();
    let id = ui.add_notification(NotificationKind::Success, "saved");

    let rendered = surface.render();
    assert_eq!(rendered.len(), 1);
    assert_eq!(surface.armed_count(), 1);

    tokio::time::advance(Duration::from_millis(4_900)).await;
    settle().await;
    assert!(ui.contains_notification(id), "still inside its dwell time");

    tokio::time::advance(Duration::from_millis(200)).await;
    settle().await;
    assert!(!ui.contains_notification(id));
    assert_eq!(surface.armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn expiry_deadline_is_fixed_when_rendered() {
    let (ui, surface) = surface();
    let id = ui.add_notification(NotificationKind::Info, "counted from render");
    surface.render();

    // The clock moves before the timer task gets its first poll.
    tokio::time::advance(DWELL).await;
    settle().await;
    assert!(!ui.contains_notification(id));
    assert_eq!(surface.armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unrendered_notification_is_not_armed() {
    let (ui, surface) = surface();
    let id = ui.add_notification(NotificationKind::Info, "queued");

    tokio::time::advance(DWELL * 2).await;
    settle().await;
    assert!(ui.contains_notification(id));
    assert_eq!(surface.armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn rerendering_does_not_rearm() {
    let (ui, surface) = surface();
    let id = ui.add_notification(NotificationKind::Info, "once");
    surface.render();

    tokio::time::advance(Duration::from_secs(3)).await;
    settle().await;
    surface.render();
    assert_eq!(surface.armed_count(), 1);

    tokio::time::advance(Duration::from_millis(2_100)).await;
    settle().await;
    assert!(!ui.contains_notification(id), "timer counts from the first render");
}

#[tokio::test(start_paused = true)]
async fn notifications_expire_independently() {
    let (ui, surface) = surface();
    let early = ui.add_notification(NotificationKind::Info, "early");
    surface.render();

    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    let late = ui.add_notification(NotificationKind::Warning, "late");
    surface.render();
    assert_eq!(surface.armed_count(), 2);

    tokio::time::advance(Duration::from_millis(3_100)).await;
    settle().await;
    assert!(!ui.contains_notification(early));
    assert!(ui.contains_notification(late));

    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert!(!ui.contains_notification(late));
}

#[tokio::test(start_paused = true)]
async fn dismissal_cancels_the_timer() {
    let (ui, surface) = surface();
    let dismissed = ui.add_notification(NotificationKind::Error, "dismiss me");
    let other = ui.add_notification(NotificationKind::Info, "other");
    surface.render();

    assert!(surface.dismiss(dismissed));
    assert!(!surface.dismiss(dismissed), "second dismissal is a no-op");
    assert_eq!(surface.armed_count(), 1);
    assert_eq!(ui.notifications().len(), 1);

    tokio::time::advance(DWELL + Duration::from_millis(100)).await;
    settle().await;
    assert!(!ui.contains_notification(other));
    assert!(ui.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timer_is_a_noop_for_entries_removed_elsewhere() {
    let (ui, surface) = surface();
    let id = ui.add_notification(NotificationKind::Info, "raced");
    let survivor = ui.add_notification(NotificationKind::Info, "survivor");
    surface.render();

    assert!(ui.remove_notification(id));
    let mut events = ui.subscribe();

    tokio::time::advance(DWELL + Duration::from_millis(100)).await;
    settle().await;

    assert_eq!(
        events.try_recv().expect("survivor expiry"),
        UiEvent::NotificationRemoved(survivor)
    );
    assert!(events.try_recv().is_err(), "late timer must not emit a second removal");
}

#[tokio::test(start_paused = true)]
async fn render_prunes_timers_for_cleared_entries() {
    let (ui, surface) = surface();
    ui.add_notification(NotificationKind::Info, "a");
    ui.add_notification(NotificationKind::Info, "b");
    surface.render();
    assert_eq!(surface.armed_count(), 2);

    ui.clear_notifications();
    assert!(surface.render().is_empty());
    assert_eq!(surface.armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_pending_timers() {
    let (ui, surface) = surface();
    let id = ui.add_notification(NotificationKind::Info, "pending");
    surface.render();
    surface.shutdown();
    assert_eq!(surface.armed_count(), 0);

    tokio::time::advance(DWELL * 2).await;
    settle().await;
    assert!(ui.contains_notification(id));
}
