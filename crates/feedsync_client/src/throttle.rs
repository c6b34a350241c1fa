//! Generic leading/trailing throttle and the batched own-fields queue.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Maximum number of feed ids per batched own-fields request.
pub const MAX_OWN_FIELDS_BATCH: usize = 100;

/// Source of monotonic time, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually advanced clock for tests.
pub struct MockClock {
    now: Mutex<Instant>,
}

impl MockClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Leading/trailing behavior of a [`Throttle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    /// Fire immediately on the first call in a cooldown-free window.
    pub leading: bool,
    /// Fire once at the end of a busy window with the latest arguments.
    pub trailing: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: false,
        }
    }
}

/// A rate limiter that coalesces bursts of calls.
///
/// The core is synchronous, so trailing invocations fire from
/// [`Throttle::tick`], driven by the owner (timers, subsequent calls,
/// or an explicit flush) rather than a background thread.
///
/// With both flags off the throttle never invokes.
pub struct Throttle<A> {
    window: Duration,
    options: ThrottleOptions,
    clock: Arc<dyn Clock>,
    window_start: Option<Instant>,
    pending: Option<A>,
    f: Box<dyn FnMut(A) + Send>,
}

impl<A> Throttle<A> {
    /// Creates a throttle around `f`.
    pub fn new(
        window: Duration,
        options: ThrottleOptions,
        clock: Arc<dyn Clock>,
        f: impl FnMut(A) + Send + 'static,
    ) -> Self {
        Self {
            window,
            options,
            clock,
            window_start: None,
            pending: None,
            f: Box::new(f),
        }
    }

    /// Submits a call.
    ///
    /// Fires immediately when `leading` is on and the window is clear;
    /// otherwise, with `trailing` on, remembers the latest arguments for
    /// the end-of-window invocation.
    pub fn call(&mut self, args: A) {
        if !self.options.leading && !self.options.trailing {
            return;
        }

        let now = self.clock.now();
        if self.in_window(now) {
            if self.options.trailing {
                self.pending = Some(args);
            }
            return;
        }

        // Window fully elapsed: a stale trailing invocation must never
        // fire alongside a fresh leading one for the same boundary.
        self.pending = None;
        self.window_start = Some(now);
        if self.options.leading {
            (self.f)(args);
        } else {
            self.pending = Some(args);
        }
    }

    /// Fires the pending trailing invocation once the window elapsed.
    ///
    /// Returns true when an invocation fired. Firing opens a new
    /// cooldown window.
    pub fn tick(&mut self) -> bool {
        if self.pending.is_none() {
            return false;
        }
        let now = self.clock.now();
        if self.in_window(now) {
            return false;
        }
        if let Some(args) = self.pending.take() {
            self.window_start = Some(now);
            (self.f)(args);
            return true;
        }
        false
    }

    /// Queues a trailing invocation without counting as a new call.
    ///
    /// No-op unless `trailing` is on.
    pub fn schedule(&mut self, args: A) {
        if !self.options.trailing {
            return;
        }
        if self.window_start.is_none() {
            self.window_start = Some(self.clock.now());
        }
        self.pending = Some(args);
    }

    /// Fires any pending invocation immediately, ignoring the window.
    pub fn force_fire(&mut self) -> bool {
        if let Some(args) = self.pending.take() {
            self.window_start = Some(self.clock.now());
            (self.f)(args);
            return true;
        }
        false
    }

    /// True when a trailing invocation is waiting for the window to end.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn in_window(&self, now: Instant) -> bool {
        match self.window_start {
            Some(start) => now.duration_since(start) < self.window,
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct BatchQueue {
    order: Vec<String>,
    queued: HashSet<String>,
}

impl BatchQueue {
    fn add(&mut self, fid: String) {
        if self.queued.insert(fid.clone()) {
            self.order.push(fid);
        }
    }

    /// Returns the first `limit` ids without removing them.
    fn batch(&self, limit: usize) -> Vec<String> {
        self.order.iter().take(limit).cloned().collect()
    }

    /// Removes only the ids the server confirmed.
    fn remove_confirmed(&mut self, confirmed: &[String]) {
        for fid in confirmed {
            self.queued.remove(fid);
        }
        let queued = &self.queued;
        self.order.retain(|fid| queued.contains(fid));
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Coalesces per-feed metadata fetches into batched requests.
///
/// Near-simultaneous enqueues accumulate into one shared pending set;
/// each throttle firing fetches up to [`MAX_OWN_FIELDS_BATCH`] ids and
/// removes only the ids the server confirmed, leaving overflow and
/// newly added ids queued for the next window. Owned per client
/// session.
pub struct OwnFieldsBatcher {
    queue: Arc<Mutex<BatchQueue>>,
    throttle: Throttle<()>,
}

impl OwnFieldsBatcher {
    /// Creates a batcher around `fetch`.
    ///
    /// `fetch` receives one batch of fids and returns the fids the
    /// server confirmed.
    pub fn new(
        window: Duration,
        clock: Arc<dyn Clock>,
        mut fetch: impl FnMut(Vec<String>) -> Vec<String> + Send + 'static,
    ) -> Self {
        let queue = Arc::new(Mutex::new(BatchQueue::default()));
        let fetch_queue = Arc::clone(&queue);
        let throttle = Throttle::new(
            window,
            ThrottleOptions {
                leading: true,
                trailing: true,
            },
            clock,
            move |()| {
                let batch = fetch_queue.lock().batch(MAX_OWN_FIELDS_BATCH);
                if batch.is_empty() {
                    return;
                }
                let confirmed = fetch(batch);
                fetch_queue.lock().remove_confirmed(&confirmed);
            },
        );
        Self { queue, throttle }
    }

    /// Adds fids to the pending set and drives the throttle.
    pub fn enqueue(&mut self, fids: impl IntoIterator<Item = String>) {
        {
            let mut queue = self.queue.lock();
            for fid in fids {
                queue.add(fid);
            }
        }
        self.throttle.call(());
        // Overflow past the batch cap (or unconfirmed ids) waits for a
        // trailing fire rather than getting lost.
        if self.queue.lock().len() > 0 && !self.throttle.has_pending() {
            self.throttle.schedule(());
        }
    }

    /// Fires a due trailing batch, if any. Returns true when one fired.
    pub fn tick(&mut self) -> bool {
        self.throttle.tick()
    }

    /// Fires any pending batch immediately, ignoring the window.
    pub fn flush(&mut self) -> bool {
        self.throttle.force_fire()
    }

    /// Number of fids still awaiting confirmation.
    pub fn pending_len(&self) -> usize {
        self.queue.lock().len()
    }
}
