use crate::error::SourceError;
use crate::model::Issue;
use std::sync::Arc;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::task::{spawn_blocking, JoinHandle};

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub type SharedIssue = Result<Arc<Issue>, Arc<SourceError>>;

/// One consumer's end of a [`fan_out`]. `None` means the stream is over.
pub struct Subscriber {
    receiver: Receiver<SharedIssue>,
}

impl Subscriber {
    pub async fn recv(&mut self) -> Option<SharedIssue> {
        self.receiver.recv().await
    }
}

/// Feeds every item of `issues` to two subscribers through bounded queues.
///
/// The source is pulled on a blocking worker, since it may page through an
/// HTTP API. A source error is delivered to both subscribers and ends the
/// stream. A subscriber that goes away does not stop the other one.
pub fn fan_out<I>(issues: I, capacity: usize) -> (Subscriber, Subscriber, JoinHandle<()>)
where
    I: Iterator<Item = Result<Issue, SourceError>> + Send + 'static,
{
    let (first_tx, first_rx) = channel(capacity.max(1));
    let (second_tx, second_rx) = channel(capacity.max(1));
    let producer = spawn_blocking(move || produce(issues, [first_tx, second_tx]));
    (
        Subscriber { receiver: first_rx },
        Subscriber {
            receiver: second_rx,
        },
        producer,
    )
}

fn produce<I>(issues: I, senders: [Sender<SharedIssue>; 2])
where
    I: Iterator<Item = Result<Issue, SourceError>>,
{
    for item in issues {
        let (item, last) = match item {
            Ok(issue) => (Ok(Arc::new(issue)), false),
            Err(err) => (Err(Arc::new(err)), true),
        };
        let mut delivered = false;
        for sender in &senders {
            // a closed queue only means that consumer stopped listening
            delivered |= sender.blocking_send(item.clone()).is_ok();
        }
        if last || !delivered {
            break;
        }
    }
}
