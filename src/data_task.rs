//! Handles for calls running in the background.

use crate::error::TransportFailure;
use crate::resolve::RawResponse;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Lifecycle state of a [`DataTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The call is in flight.
    Running,
    /// The call is paused; its network future is not being polled.
    Suspended,
    /// The call was cancelled and resolves with [`TransportFailure::Cancelled`].
    Cancelled,
    /// The network work finished.
    Completed,
}

impl TaskState {
    /// Returns `true` once the task can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Cancelled | TaskState::Completed)
    }
}

/// A handle to a call started with [`Client::spawn`](crate::Client::spawn).
///
/// The call runs on the tokio runtime whether or not the handle is kept.
/// Dropping the handle detaches the call; it still runs to completion.
///
/// # Examples
///
/// ```no_run
/// use flowline::{Client, HttpMethod, Json, Raw, TaskState, Target};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder().build()?;
/// let target = Target::new("https://api.example.com", HttpMethod::Get, "/reports/big");
///
/// let task = client.spawn::<Json<serde_json::Value>, Raw>(&target)?;
/// task.suspend();
/// assert_eq!(task.state(), TaskState::Suspended);
/// task.resume();
///
/// let response = task.wait().await?;
/// println!("{}", response.data.kind());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DataTask<T> {
    control: Arc<watch::Sender<TaskState>>,
    handle: JoinHandle<T>,
}

impl<T> DataTask<T>
where
    T: Send + 'static,
{
    /// Runs `work` in the background and passes its result to `finish`.
    ///
    /// When the task is cancelled before `work` completes, `work` is dropped
    /// and `finish` receives a [`TransportFailure::Cancelled`] response.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub(crate) fn spawn<W, F>(work: W, finish: F) -> Self
    where
        W: Future<Output = RawResponse> + Send + 'static,
        F: FnOnce(RawResponse) -> T + Send + 'static,
    {
        let (sender, receiver) = watch::channel(TaskState::Running);
        let control = Arc::new(sender);
        let task_control = Arc::clone(&control);

        let handle = tokio::spawn(async move {
            let raw = match gated(work, receiver).await {
                Some(raw) if mark_completed(&task_control) => raw,
                _ => {
                    tracing::debug!("Data task cancelled before completion");
                    RawResponse::failed(TransportFailure::Cancelled)
                }
            };
            finish(raw)
        });

        Self { control, handle }
    }
}

impl<T> DataTask<T> {
    /// The current lifecycle state.
    pub fn state(&self) -> TaskState {
        *self.control.borrow()
    }

    /// Cancels the call. Has no effect once the task is cancelled or completed.
    pub fn cancel(&self) {
        self.transition(|state| !state.is_terminal(), TaskState::Cancelled);
    }

    /// Pauses a running call.
    pub fn suspend(&self) {
        self.transition(|state| state == TaskState::Running, TaskState::Suspended);
    }

    /// Resumes a suspended call.
    pub fn resume(&self) {
        self.transition(|state| state == TaskState::Suspended, TaskState::Running);
    }

    /// Returns `true` if the background work has finished, including `finish`.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the call to resolve.
    ///
    /// # Errors
    ///
    /// Returns the [`JoinError`] if the background task panicked or the
    /// runtime shut down before it finished.
    pub async fn wait(self) -> Result<T, JoinError> {
        self.handle.await
    }

    fn transition(&self, allowed: impl Fn(TaskState) -> bool, next: TaskState) {
        self.control.send_if_modified(|state| {
            if allowed(*state) {
                *state = next;
                true
            } else {
                false
            }
        });
    }
}

/// Moves the task to `Completed` unless it was cancelled first.
///
/// Returns `false` if a cancellation won the race, in which case the call
/// resolves as cancelled.
fn mark_completed(control: &watch::Sender<TaskState>) -> bool {
    let mut completed = false;
    control.send_if_modified(|state| {
        if *state == TaskState::Cancelled {
            return false;
        }
        *state = TaskState::Completed;
        completed = true;
        true
    });
    completed
}

/// Polls `work` only while the task is running.
///
/// Returns `None` if the task was cancelled first.
async fn gated<W>(work: W, mut state: watch::Receiver<TaskState>) -> Option<W::Output>
where
    W: Future,
{
    tokio::pin!(work);

    loop {
        let current = *state.borrow_and_update();
        match current {
            TaskState::Cancelled => return None,
            TaskState::Suspended => {
                if state.changed().await.is_err() {
                    return None;
                }
            }
            TaskState::Running | TaskState::Completed => {
                tokio::select! {
                    output = &mut work => return Some(output),
                    changed = state.changed() => {
                        if changed.is_err() {
                            return Some(work.await);
                        }
                    }
                }
            }
        }
    }
}
