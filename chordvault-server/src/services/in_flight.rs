//! In-flight request de-duplication
//!
//! Concurrent callers asking for the same key attach to one shared future
//! instead of starting their own fetch. The entry removes itself when the
//! future settles, whatever the outcome.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

type Pending<T> = HashMap<String, Shared<BoxFuture<'static, T>>>;

pub struct InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pending: Arc<Mutex<Pending<T>>>,
}

impl<T> Default for InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(pending: &Mutex<Pending<T>>) -> MutexGuard<'_, Pending<T>> {
        pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `make()` for `key`, or join the operation already running for it
    ///
    /// `make` is only called when no operation for `key` is pending.
    ///
    /// The operation only makes progress while some caller polls it. If every
    /// caller drops out, the entry stays pending until a later caller for
    /// `key` joins and drives it to completion.
    pub async fn run<F, Fut>(&self, key: String, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut pending = Self::lock(&self.pending);
            match pending.get(&key) {
                Some(existing) => {
                    debug!(key = %key, "Joining in-flight request");
                    existing.clone()
                }
                None => {
                    let map = Arc::clone(&self.pending);
                    let entry_key = key.clone();
                    let operation = make();
                    let shared = async move {
                        let output = operation.await;
                        Self::lock(&map).remove(&entry_key);
                        output
                    }
                    .boxed()
                    .shared();
                    pending.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }

    /// Number of operations currently pending
    pub fn len(&self) -> usize {
        Self::lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
