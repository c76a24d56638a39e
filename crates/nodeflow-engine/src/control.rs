//! Pause, resume and stop for a bound run.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionError;

/// Control signals shared between an executor and the run it is driving.
///
/// Pausing flips a watch channel that the run waits on at its checkpoints;
/// stopping cancels a token, which also wakes a paused run.
#[derive(Debug)]
pub struct RunControl {
  paused: watch::Sender<bool>,
  cancel: CancellationToken,
}

impl RunControl {
  pub fn new() -> Self {
    let (paused, _) = watch::channel(false);
    Self {
      paused,
      cancel: CancellationToken::new(),
    }
  }

  pub fn pause(&self) {
    self.paused.send_replace(true);
  }

  pub fn resume(&self) {
    self.paused.send_replace(false);
  }

  pub fn stop(&self) {
    self.cancel.cancel();
  }

  /// Wait until the run may proceed.
  ///
  /// Returns immediately when neither paused nor stopped, blocks while
  /// paused, and returns [`ExecutionError::Cancelled`] once stopped.
  pub async fn checkpoint(&self) -> Result<(), ExecutionError> {
    let mut paused = self.paused.subscribe();
    loop {
      if self.cancel.is_cancelled() {
        return Err(ExecutionError::Cancelled);
      }
      if !*paused.borrow_and_update() {
        return Ok(());
      }

      tokio::select! {
        _ = self.cancel.cancelled() => return Err(ExecutionError::Cancelled),
        changed = paused.changed() => {
          if changed.is_err() {
            return Ok(());
          }
        }
      }
    }
  }
}

impl Default for RunControl {
  fn default() -> Self {
    Self::new()
  }
}
