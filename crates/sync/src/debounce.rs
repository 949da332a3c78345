use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use onboard_core::{Draft, Section, SessionToken};

use crate::store::LocalDraftStore;

/// Quiet period used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

enum Command {
    Write(Box<Draft>),
    Flush(oneshot::Sender<()>),
}

/// Persists drafts off the edit path.
///
/// Every edit hands the whole draft over; only the latest draft of each
/// section is written, once no edit arrived for the configured delay.
/// Dropping the writer persists whatever is still pending.
#[derive(Debug)]
pub struct DebouncedWriter {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl DebouncedWriter {
    /// Spawn the background writer on the current tokio runtime.
    pub fn new(store: LocalDraftStore, token: SessionToken, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store, token, delay, rx));
        Self { tx, task }
    }

    /// Queue a draft for persistence. Never blocks.
    pub fn write(&self, draft: &Draft) {
        // The task only stops after the sender is gone, so this cannot fail
        // while `self` is alive.
        let _ = self.tx.send(Command::Write(Box::new(draft.without_pending())));
    }

    /// Persist everything pending now and wait for it to land.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Flush and stop the background task.
    pub async fn shutdown(self) {
        let Self { tx, task } = self;
        drop(tx);
        let _ = task.await;
    }
}

async fn run(
    store: LocalDraftStore,
    token: SessionToken,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: BTreeMap<Section, Draft> = BTreeMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => tokio::select! {
                command = rx.recv() => command,
                () = tokio::time::sleep_until(at) => {
                    persist(&store, &token, &mut pending).await;
                    deadline = None;
                    continue;
                }
            },
            None => rx.recv().await,
        };

        match command {
            Some(Command::Write(draft)) => {
                pending.insert(draft.section, *draft);
                deadline = Some(Instant::now() + delay);
            }
            Some(Command::Flush(done)) => {
                persist(&store, &token, &mut pending).await;
                deadline = None;
                let _ = done.send(());
            }
            None => {
                persist(&store, &token, &mut pending).await;
                return;
            }
        }
    }
}

async fn persist(
    store: &LocalDraftStore,
    token: &SessionToken,
    pending: &mut BTreeMap<Section, Draft>,
) {
    for (section, draft) in std::mem::take(pending) {
        store.write(token, &draft).await;
        debug!(section = %section, "draft persisted");
    }
}
