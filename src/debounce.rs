use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Pending {
  token: CancellationToken,
  // Set by whichever side gets there first: the task once its delay is over,
  // or `cancel`. Only the winner decides whether the action runs.
  claimed: Arc<AtomicBool>,
}

impl Pending {
  fn claim(&self) -> bool {
    !self.claimed.swap(true, Ordering::SeqCst)
  }
}

/// Delayed actions keyed by `K`. Scheduling a key cancels the action still waiting
/// under that key; an action whose delay has already elapsed runs to completion.
pub struct Debouncer<K> {
  pending: HashMap<K, Pending>,
}

impl<K> Default for Debouncer<K> {
  fn default() -> Self {
    Self {
      pending: HashMap::new(),
    }
  }
}

impl<K: Eq + Hash> Debouncer<K> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Must be called from within a tokio runtime.
  pub fn schedule<F>(&mut self, key: K, delay: Duration, action: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    self.cancel(&key);

    let token = CancellationToken::new();
    let claimed = Arc::new(AtomicBool::new(false));
    let waiter = token.clone();
    let started = claimed.clone();
    tokio::spawn(async move {
      tokio::select! {
        _ = waiter.cancelled() => return,
        _ = tokio::time::sleep(delay) => {}
      }
      if started.swap(true, Ordering::SeqCst) {
        return;
      }
      action.await;
    });

    self.pending.insert(key, Pending { token, claimed });
  }

  /// Returns true when an action was still waiting and will now never run. An
  /// action already past its delay is left alone and reported as false.
  pub fn cancel(&mut self, key: &K) -> bool {
    match self.pending.remove(key) {
      Some(pending) => {
        pending.token.cancel();
        pending.claim()
      }
      None => false,
    }
  }

  pub fn is_pending(&self, key: &K) -> bool {
    self
      .pending
      .get(key)
      .map(|pending| !pending.claimed.load(Ordering::SeqCst))
      .unwrap_or(false)
  }
}

impl<K> Drop for Debouncer<K> {
  fn drop(&mut self) {
    for pending in self.pending.values() {
      pending.claim();
      pending.token.cancel();
    }
  }
}
