//! Progress indicators for oracle escalation
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars.
//! The bar is shared between rayon workers, so every draw goes through a mutex.

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe single bar counting finished oracle calls
#[derive(Clone)]
pub struct OracleProgress {
  progress: Arc<Mutex<Progress>>,
  bar: Arc<Bar>,
}

impl OracleProgress {
  /// Create a new bar for `total` calls
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      progress: Arc::new(Mutex::new(progress)),
      bar: Arc::new(bar),
    }
  }

  /// Increment by 1 (callable from any worker)
  pub fn inc(&self) {
    self.lock().inc_and_draw(&self.bar, 1);
  }

  // A worker that panicked mid-draw leaves nothing worth protecting
  fn lock(&self) -> MutexGuard<'_, Progress> {
    self.progress.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
