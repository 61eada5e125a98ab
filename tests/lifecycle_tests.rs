//! # Lifecycle Tests
//!
//! The shutdown line must be logged exactly once however the bot loop ends.

use std::fmt;
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use course_links_bot::lifecycle::{
    supervise, supervise_until, ShutdownGuard, ShutdownReason, CRASHED_MESSAGE, SHUTDOWN_MESSAGE,
    STOPPED_MESSAGE,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Collects the message of every event
#[derive(Clone, Default)]
struct MessageRecorder {
    messages: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor<'a>(&'a mut Option<String>);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for MessageRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = None;
        event.record(&mut MessageVisitor(&mut message));
        if let Some(message) = message {
            self.messages.lock().unwrap().push(message);
        }
    }
}

impl MessageRecorder {
    fn count(&self, text: &str) -> usize {
        self.messages.lock().unwrap().iter().filter(|m| m.as_str() == text).count()
    }
}

fn record_shutdown(reason: ShutdownReason) -> MessageRecorder {
    let recorder = MessageRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());

    tracing::subscriber::with_default(subscriber, || {
        let guard = ShutdownGuard::new();
        guard.finish(&reason);
    });

    recorder
}

#[test]
fn test_clean_stop_logs_shutdown_once() {
    let recorder = record_shutdown(ShutdownReason::Stopped);

    assert_eq!(recorder.count(STOPPED_MESSAGE), 1);
    assert_eq!(recorder.count(SHUTDOWN_MESSAGE), 1);
    assert_eq!(recorder.count(CRASHED_MESSAGE), 0);
}

#[test]
fn test_crash_logs_shutdown_once() {
    let recorder = record_shutdown(ShutdownReason::Crashed("network down".to_string()));

    assert_eq!(recorder.count(CRASHED_MESSAGE), 1);
    assert_eq!(recorder.count(SHUTDOWN_MESSAGE), 1);
    assert_eq!(recorder.count(STOPPED_MESSAGE), 0);
}

#[test]
fn test_dropped_guard_still_logs_shutdown() {
    let recorder = MessageRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());

    tracing::subscriber::with_default(subscriber, || {
        let _guard = ShutdownGuard::new();
    });

    assert_eq!(recorder.count(SHUTDOWN_MESSAGE), 1);
}

#[tokio::test]
async fn test_supervise_clean_exit_is_stopped() {
    let reason = supervise(async { Ok(()) }).await;
    assert_eq!(reason, ShutdownReason::Stopped);
}

#[tokio::test]
async fn test_supervise_error_is_crash() {
    let reason = supervise(async { Err(anyhow::anyhow!("database unreachable")) }).await;
    match reason {
        ShutdownReason::Crashed(cause) => assert!(cause.contains("database unreachable")),
        other => panic!("expected crash, got {other:?}"),
    }
}

#[tokio::test]
async fn test_supervise_panic_is_crash() {
    let reason = supervise(async {
        if std::hint::black_box(true) {
            panic!("dispatcher exploded");
        }
        Ok(())
    })
    .await;

    match reason {
        ShutdownReason::Crashed(cause) => assert!(cause.contains("dispatcher exploded"), "{cause}"),
        other => panic!("expected crash, got {other:?}"),
    }
}

#[tokio::test]
async fn test_interrupt_during_startup_is_clean_stop() {
    let recorder = MessageRecorder::default();
    let _default = tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    // A loop stuck before the dispatcher starts, e.g. on an unresponsive database
    let guard = ShutdownGuard::new();
    let reason = supervise_until(pending::<anyhow::Result<()>>(), async {}, Duration::from_millis(20)).await;
    guard.finish(&reason);

    assert_eq!(reason, ShutdownReason::Stopped);
    assert_eq!(recorder.count(STOPPED_MESSAGE), 1);
    assert_eq!(recorder.count(CRASHED_MESSAGE), 0);
    assert_eq!(recorder.count(SHUTDOWN_MESSAGE), 1);
}

#[tokio::test]
async fn test_interrupt_lets_loop_finish_within_grace() {
    let finished = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&finished);

    let reason = supervise_until(
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            *flag.lock().unwrap() = true;
            Ok(())
        },
        async {},
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(reason, ShutdownReason::Stopped);
    assert!(*finished.lock().unwrap());
}

#[tokio::test]
async fn test_error_without_interrupt_is_crash() {
    let reason = supervise_until(
        async { Err(anyhow::anyhow!("bootstrap failed")) },
        pending::<()>(),
        Duration::from_millis(20),
    )
    .await;

    assert!(matches!(reason, ShutdownReason::Crashed(cause) if cause.contains("bootstrap failed")));
}
