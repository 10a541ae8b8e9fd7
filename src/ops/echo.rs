use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sent by a timer thread when its grace window elapses.
#[derive(Debug)]
struct Expired {
    task_id: String,
    generation: u64,
}

/// A running timer. Dropping `cancel` wakes the thread and stops it.
struct EchoTimer {
    generation: u64,
    expires_at: Instant,
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// Keeps just-completed "today" tasks visible for a short grace window.
///
/// Each echoed task id owns exactly one timer thread. Expirations are
/// delivered over a channel and only take effect when the owner calls
/// [`EchoScheduler::poll`], so the echo set is only ever mutated by the
/// thread that owns the scheduler.
pub struct EchoScheduler {
    grace: Duration,
    timers: HashMap<String, EchoTimer>,
    next_generation: u64,
    tx: Sender<Expired>,
    rx: Receiver<Expired>,
}

impl EchoScheduler {
    pub fn new(grace: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        EchoScheduler {
            grace,
            timers: HashMap::new(),
            next_generation: 0,
            tx,
            rx,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Start the echo timer for `task_id`. No-op if one is already running.
    /// Returns whether a new timer was started.
    pub fn mark(&mut self, task_id: &str) -> bool {
        if self.timers.contains_key(task_id) {
            return false;
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let tx = self.tx.clone();
        let id = task_id.to_string();
        let grace = self.grace;

        let handle = thread::spawn(move || {
            // Anything other than a timeout means we were cancelled.
            if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(grace) {
                let _ = tx.send(Expired {
                    task_id: id,
                    generation,
                });
            }
        });

        tracing::debug!(task_id, generation, "echo timer started");
        self.timers.insert(
            task_id.to_string(),
            EchoTimer {
                generation,
                expires_at: Instant::now() + grace,
                cancel: cancel_tx,
                handle,
            },
        );
        true
    }

    /// Cancel the timer for `task_id` and drop it from the echo set
    /// immediately. Returns whether a timer was running.
    pub fn cancel(&mut self, task_id: &str) -> bool {
        match self.timers.remove(task_id) {
            Some(timer) => {
                stop(timer);
                tracing::debug!(task_id, "echo timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether `task_id` has a timer that has not been reaped by
    /// [`poll`](Self::poll) or cancelled yet.
    pub fn contains(&self, task_id: &str) -> bool {
        self.timers.contains_key(task_id)
    }

    /// Whether `task_id` is still inside its grace window. Unlike
    /// [`contains`](Self::contains) this turns false as soon as the window
    /// ends, without waiting for the owner to poll.
    pub fn is_echoing(&self, task_id: &str) -> bool {
        self.timers
            .get(task_id)
            .is_some_and(|t| Instant::now() < t.expires_at)
    }

    /// Number of pending timers (equal to the size of the echo set).
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.timers.keys().map(String::as_str)
    }

    /// Apply any expirations that have arrived. Returns the ids that left the
    /// echo set. Expirations from cancelled or superseded timers are ignored.
    pub fn poll(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            self.apply(msg, &mut expired);
        }
        expired
    }

    /// Like [`poll`](Self::poll), but waits up to `timeout` for the first
    /// expiration when none is queued yet.
    pub fn poll_timeout(&mut self, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let mut expired = self.poll();
        while expired.is_empty() && !self.timers.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(msg) => self.apply(msg, &mut expired),
                Err(_) => break,
            }
        }
        expired.extend(self.poll());
        expired
    }

    /// Cancel every timer and wait for the timer threads to exit.
    pub fn shutdown(&mut self) {
        let count = self.timers.len();
        for (_, timer) in self.timers.drain() {
            stop(timer);
        }
        while self.rx.try_recv().is_ok() {}
        if count > 0 {
            tracing::debug!(count, "echo scheduler shut down");
        }
    }

    fn apply(&mut self, msg: Expired, expired: &mut Vec<String>) {
        let current = self
            .timers
            .get(&msg.task_id)
            .is_some_and(|t| t.generation == msg.generation);
        if !current {
            return;
        }
        if let Some(timer) = self.timers.remove(&msg.task_id) {
            let _ = timer.handle.join();
        }
        tracing::debug!(task_id = %msg.task_id, "echo expired");
        expired.push(msg.task_id);
    }
}

impl Drop for EchoScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EchoScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoScheduler")
            .field("grace", &self.grace)
            .field("pending", &self.timers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn stop(timer: EchoTimer) {
    drop(timer.cancel);
    let _ = timer.handle.join();
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(30);
    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn mark_is_idempotent() {
        let mut echo = EchoScheduler::new(Duration::from_secs(60));
        assert!(echo.mark("t-1"));
        assert!(!echo.mark("t-1"));
        assert_eq!(echo.pending(), 1);
        assert!(echo.contains("t-1"));
        assert!(echo.is_echoing("t-1"));
    }

    #[test]
    fn expires_after_grace() {
        let mut echo = EchoScheduler::new(SHORT);
        echo.mark("t-1");
        let expired = echo.poll_timeout(WAIT);
        assert_eq!(expired, vec!["t-1".to_string()]);
        assert!(!echo.contains("t-1"));
        assert_eq!(echo.pending(), 0);
    }

    #[test]
    fn nothing_expires_before_poll() {
        let mut echo = EchoScheduler::new(SHORT);
        echo.mark("t-1");
        thread::sleep(SHORT * 4);
        // The timer is only reaped when the owner polls, but the window is over
        assert!(echo.contains("t-1"));
        assert!(!echo.is_echoing("t-1"));
        assert_eq!(echo.poll(), vec!["t-1".to_string()]);
    }

    #[test]
    fn cancel_removes_immediately_and_suppresses_late_expiry() {
        let mut echo = EchoScheduler::new(SHORT);
        echo.mark("t-1");
        assert!(echo.cancel("t-1"));
        assert!(!echo.contains("t-1"));
        thread::sleep(SHORT * 4);
        assert!(echo.poll().is_empty());
        assert!(!echo.contains("t-1"));
    }

    #[test]
    fn cancel_unknown_is_noop() {
        let mut echo = EchoScheduler::new(SHORT);
        assert!(!echo.cancel("missing"));
    }

    #[test]
    fn stale_expiry_does_not_end_a_newer_echo() {
        let mut echo = EchoScheduler::new(Duration::from_secs(60));
        echo.mark("t-1");
        let stale_generation = echo.timers["t-1"].generation;
        echo.cancel("t-1");
        echo.mark("t-1");

        // Simulate an expiry that raced with the cancel
        echo.tx
            .send(Expired {
                task_id: "t-1".into(),
                generation: stale_generation,
            })
            .unwrap();
        assert!(echo.poll().is_empty());
        assert!(echo.contains("t-1"));
    }

    #[test]
    fn shutdown_clears_everything() {
        let mut echo = EchoScheduler::new(Duration::from_secs(60));
        echo.mark("a");
        echo.mark("b");
        let started = Instant::now();
        echo.shutdown();
        assert_eq!(echo.pending(), 0);
        // Threads are woken by cancellation, not by the 60s grace
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
