use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use mentor_core::Clock;
use mentor_core::model::{Checkpoint, CourseId, UserId};
use storage::repository::{ProgressRepository, StorageError};

/// Default quiescence window before a recorded checkpoint is written.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Debounced checkpoint writer for one `(user, course)` pair.
///
/// Rapid successive `record` calls collapse into a single upsert carrying the
/// last state, issued after the window passes without another call. Write
/// failures are logged and dropped; a checkpoint is never worth halting the
/// session for.
#[derive(Clone)]
pub struct CheckpointDebouncer {
    progress: Arc<dyn ProgressRepository>,
    user_id: UserId,
    course_id: CourseId,
    clock: Clock,
    window: Duration,
    state: Arc<Mutex<DebounceState>>,
}

#[derive(Default)]
struct DebounceState {
    seq: u64,
    pending: Option<Checkpoint>,
}

impl CheckpointDebouncer {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        user_id: UserId,
        course_id: CourseId,
        clock: Clock,
    ) -> Self {
        Self {
            progress,
            user_id,
            course_id,
            clock,
            window: DEBOUNCE_WINDOW,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Records a checkpoint, superseding any pending one, and (re)starts the
    /// quiescence timer.
    pub fn record(&self, checkpoint: Checkpoint) {
        let seq = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.seq += 1;
            state.pending = Some(checkpoint);
            state.seq
        };

        let debouncer = self.clone();
        tokio::spawn(async move {
            sleep(debouncer.window).await;
            let checkpoint = {
                let mut state = match debouncer.state.lock() {
                    Ok(state) => state,
                    Err(poisoned) => poisoned.into_inner(),
                };
                // A later record restarted the window; let its timer write.
                if state.seq != seq {
                    return;
                }
                state.pending.take()
            };
            if let Some(checkpoint) = checkpoint {
                debouncer.write(checkpoint).await;
            }
        });
    }

    /// Writes any pending checkpoint immediately, cancelling the timer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the immediate write fails; unlike the
    /// timer path the caller asked for this write and should know.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let checkpoint = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.seq += 1;
            state.pending.take()
        };
        if let Some(checkpoint) = checkpoint {
            self.progress
                .upsert_checkpoint(self.user_id, self.course_id, checkpoint, self.clock.now())
                .await?;
        }
        Ok(())
    }

    async fn write(&self, checkpoint: Checkpoint) {
        if let Err(error) = self
            .progress
            .upsert_checkpoint(self.user_id, self.course_id, checkpoint, self.clock.now())
            .await
        {
            warn!(
                user_id = %self.user_id,
                course_id = %self.course_id,
                %error,
                "dropped checkpoint write"
            );
        }
    }
}
