//! Refresh cycle: fetch a payload, apply it to the store, repeat on an
//! interval. Runs entirely on the caller's thread.

use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::source::PayloadSource;
use crate::store::SnapshotStore;

/// Shortest refresh interval; anything lower would hammer the backend.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Poller {
    source: Box<dyn PayloadSource>,
    interval: Duration,
    last_poll: Option<Instant>,
}

impl Poller {
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(source: Box<dyn PayloadSource>, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "poll interval too short; using {}s",
                MIN_POLL_INTERVAL.as_secs()
            );
        }
        Self {
            source,
            interval: interval.max(MIN_POLL_INTERVAL),
            last_poll: None,
        }
    }

    pub fn source(&self) -> &dyn PayloadSource {
        self.source.as_ref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch once and apply the result. Returns whether the snapshot was
    /// replaced; on failure the previous snapshot is kept.
    pub fn refresh(&mut self, store: &mut SnapshotStore) -> bool {
        let ticket = store.begin_fetch();
        let result = self.source.fetch_dashboard();
        self.last_poll = Some(Instant::now());
        store.complete(ticket, result, Utc::now())
    }

    /// True before the first poll and once the interval has elapsed.
    pub fn is_due(&self) -> bool {
        self.time_until_due().is_zero()
    }

    pub fn time_until_due(&self) -> Duration {
        match self.last_poll {
            Some(at) => self.interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Refresh if due. Returns `None` when nothing was fetched.
    pub fn tick(&mut self, store: &mut SnapshotStore) -> Option<bool> {
        self.is_due().then(|| self.refresh(store))
    }

    /// Poll forever, calling `render` after every fetch attempt.
    pub fn run(&mut self, store: &mut SnapshotStore, mut render: impl FnMut(&SnapshotStore)) -> ! {
        loop {
            if self.tick(store).is_some() {
                render(store);
            }
            thread::sleep(self.time_until_due());
        }
    }
}
