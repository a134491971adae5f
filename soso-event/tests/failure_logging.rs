use soso_event::{Event, EventConfig, EventOptions, Group};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<(Level, String)>>>);

impl Captured {
    fn levels_of(&self, prefix: &str) -> Vec<Level> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, msg)| msg.starts_with(prefix))
            .map(|(level, _)| *level)
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let subscriber = Registry::default().with(captured.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

#[tokio::test]
async fn first_consecutive_failure_gets_full_trace() {
    let (logs, _guard) = capture();
    let event = Event::<bool>::new("Flaky").unwrap();
    let _t = event.connect_fn(
        |ok: &bool| {
            if *ok {
                Ok(())
            } else {
                Err(anyhow::anyhow!("refused"))
            }
        },
        Group::Store,
    );

    event.emit(false).unwrap();
    event.emit(false).unwrap();
    event.emit(false).unwrap();

    assert_eq!(logs.levels_of("error calling handler"), vec![Level::ERROR; 3]);
    assert_eq!(
        logs.levels_of("handler failure detail"),
        vec![Level::ERROR, Level::DEBUG, Level::DEBUG]
    );

    // 成功一次后计数清零，下一次失败重新输出完整信息
    event.emit(true).unwrap();
    event.emit(false).unwrap();
    assert_eq!(
        logs.levels_of("handler failure detail"),
        vec![Level::ERROR, Level::DEBUG, Level::DEBUG, Level::ERROR]
    );
}

#[tokio::test]
async fn full_trace_threshold_is_configurable() {
    let (logs, _guard) = capture();
    let event = EventOptions::<()>::builder()
        .name("Noisy")
        .config(EventConfig {
            full_trace_failures: 2,
            ..EventConfig::default()
        })
        .build()
        .create()
        .unwrap();
    let _t = event.connect_fn(|_: &()| Err::<(), _>("always"), Group::Process);

    for _ in 0..3 {
        event.emit(()).unwrap();
    }

    assert_eq!(
        logs.levels_of("handler failure detail"),
        vec![Level::ERROR, Level::ERROR, Level::DEBUG]
    );
}

#[tokio::test]
async fn reentrant_emission_is_logged_at_debug() {
    let (logs, _guard) = capture();
    let event = Event::<()>::new("Loop").unwrap();
    let weak = Arc::downgrade(&event);
    let _t = event.connect_fn(
        move |_: &()| {
            if let Some(event) = weak.upgrade() {
                let _ = event.emit(());
            }
        },
        Group::Store,
    );

    event.emit(()).unwrap();
    assert_eq!(
        logs.levels_of("reentrant emission suppressed"),
        vec![Level::DEBUG]
    );
}
