//! Run tasks against a deadline and take whichever outcome arrives first.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum GroupError<E> {
    #[error("{0}")]
    Task(E),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("cancelled")]
    Cancelled,
}

/// Single-use group of tasks sharing one result slot.
///
/// A watcher task races the deadline and the parent token; every spawned
/// task reports its own outcome. [`TimeoutGroup::wait`] returns the first
/// outcome delivered by anyone and aborts the rest.
pub struct TimeoutGroup<T, E> {
    tx: mpsc::Sender<Result<T, GroupError<E>>>,
    rx: mpsc::Receiver<Result<T, GroupError<E>>>,
    tasks: JoinSet<()>,
}

impl<T, E> TimeoutGroup<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a group bound to a child of `parent` that also expires after `deadline`.
    pub fn new(parent: &CancellationToken, deadline: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let mut tasks = JoinSet::new();

        let token = parent.child_token();
        let watcher_tx = tx.clone();
        tasks.spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => GroupError::Cancelled,
                _ = tokio::time::sleep(deadline) => GroupError::DeadlineExceeded(deadline),
            };
            let _ = watcher_tx.send(Err(outcome)).await;
        });

        Self { tx, rx, tasks }
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            let outcome = task.await.map_err(GroupError::Task);
            // The slot is gone once someone else won.
            let _ = tx.send(outcome).await;
        });
    }

    /// Wait for the first outcome. Tasks still running afterwards are aborted.
    pub async fn wait(mut self) -> Result<T, GroupError<E>> {
        let outcome = self.rx.recv().await;
        self.rx.close();
        self.tasks.abort_all();
        // The watcher holds a sender until it fires, so the channel cannot drain empty.
        outcome.unwrap_or(Err(GroupError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn task_success_wins_before_deadline() {
        let token = CancellationToken::new();
        let mut group = TimeoutGroup::<u32, String>::new(&token, Duration::from_secs(5));
        group.spawn(async { Ok(7) });
        assert_eq!(group.wait().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn task_error_is_returned() {
        let token = CancellationToken::new();
        let mut group = TimeoutGroup::<(), String>::new(&token, Duration::from_secs(5));
        group.spawn(async { Err("boom".to_string()) });
        match group.wait().await {
            Err(GroupError::Task(e)) => assert_eq!(e, "boom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_beats_a_stuck_task() {
        let token = CancellationToken::new();
        let mut group = TimeoutGroup::<(), String>::new(&token, Duration::from_millis(200));
        group.spawn(std::future::pending());

        let started = tokio::time::Instant::now();
        let outcome = group.wait().await;
        assert!(matches!(outcome, Err(GroupError::DeadlineExceeded(d)) if d == Duration::from_millis(200)));
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn parent_cancellation_is_reported() {
        let token = CancellationToken::new();
        let mut group = TimeoutGroup::<(), String>::new(&token, Duration::from_secs(30));
        group.spawn(std::future::pending());
        token.cancel();
        assert!(matches!(group.wait().await, Err(GroupError::Cancelled)));
    }

    #[tokio::test]
    async fn first_of_several_tasks_wins() {
        let token = CancellationToken::new();
        let mut group = TimeoutGroup::<&'static str, String>::new(&token, Duration::from_secs(5));
        group.spawn(std::future::pending());
        group.spawn(async { Ok("fast") });
        assert_eq!(group.wait().await.unwrap(), "fast");
    }

    #[tokio::test(start_paused = true)]
    async fn losing_tasks_are_aborted() {
        let finished = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();
        let mut group = TimeoutGroup::<(), String>::new(&token, Duration::from_millis(50));

        let flag = finished.clone();
        group.spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        assert!(matches!(group.wait().await, Err(GroupError::DeadlineExceeded(_))));
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
