use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Installs the global subscriber: human readable logs on stderr filtered by
/// `RUST_LOG` (default `info`), plus `collector`.
pub fn init(collector: WarningCollector) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(collector)
        .init();
}

/// Keeps the message of every warning and error so they can go into a report.
#[derive(Debug, Clone, Default)]
pub struct WarningCollector {
    messages: Arc<Mutex<Vec<String>>>,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages collected since the last drain, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }
}

impl<S: Subscriber> Layer<S> for WarningCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let Some(message) = visitor.message else {
            return;
        };
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{error, info, warn};

    #[test]
    fn collects_warnings_and_errors_only() {
        let collector = WarningCollector::new();
        let subscriber = tracing_subscriber::registry().with(collector.clone());
        tracing::subscriber::with_default(subscriber, || {
            info!("fetched 3 pages");
            warn!(issue = 4, "Issue #{} is not associated with a milestone", 4);
            error!("schema changed");
        });
        assert_eq!(
            collector.drain(),
            vec![
                "Issue #4 is not associated with a milestone".to_string(),
                "schema changed".to_string()
            ]
        );
        assert!(collector.drain().is_empty());
    }
}
