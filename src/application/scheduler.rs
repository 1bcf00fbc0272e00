use crate::domain::timer_period;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("No async runtime available to arm timer {0}")]
    NoRuntime(String),
}

/// Work run on every timer firing.
#[async_trait]
pub trait Tick: Send + Sync + 'static {
    async fn tick(&self);
}

struct ArmedTimer {
    handle: JoinHandle<()>,
    period: Duration,
}

/// A single named periodic timer. Arming always replaces the previous timer.
pub struct Scheduler {
    name: String,
    armed: Mutex<Option<ArmedTimer>>,
}

impl Scheduler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            armed: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arms the timer for `interval_minutes`; 0 only disarms.
    /// The first firing happens one full period after arming.
    pub fn arm<T>(
        &self,
        interval_minutes: u32,
        tick: Arc<T>,
    ) -> Result<Option<Duration>, SchedulerError>
    where
        T: Tick,
    {
        self.disarm();

        let Some(period) = timer_period(interval_minutes) else {
            info!(timer = %self.name, "Periodic checks disabled");
            return Ok(None);
        };

        let runtime =
            Handle::try_current().map_err(|_| SchedulerError::NoRuntime(self.name.clone()))?;
        let name = self.name.clone();
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!(timer = %name, "Timer fired");
                tick.tick().await;
            }
        });

        *self.lock() = Some(ArmedTimer { handle, period });
        info!(timer = %self.name, minutes = interval_minutes, "Periodic checks armed");
        Ok(Some(period))
    }

    /// Removes the timer; returns whether one was armed.
    pub fn disarm(&self) -> bool {
        match self.lock().take() {
            Some(timer) => {
                timer.handle.abort();
                debug!(timer = %self.name, "Timer cleared");
                true
            }
            None => false,
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.lock().as_ref().map(|t| t.period)
    }

    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ArmedTimer>> {
        self.armed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.lock().take() {
            timer.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl Tick for Counter {
        async fn tick(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn arming_outside_a_runtime_fails() {
        let scheduler = Scheduler::new("quota-check");
        let result = scheduler.arm(45, Arc::new(Counter::default()));
        assert!(matches!(result, Err(SchedulerError::NoRuntime(_))));
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn zero_interval_disarms_without_a_runtime() {
        let scheduler = Scheduler::new("quota-check");
        assert_eq!(scheduler.arm(0, Arc::new(Counter::default())).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period_after_arming() {
        let scheduler = Scheduler::new("quota-check");
        let counter = Arc::new(Counter::default());

        let period = scheduler.arm(45, counter.clone()).unwrap();
        assert_eq!(period, Some(Duration::from_secs(45 * 60)));

        tokio::time::sleep(Duration::from_secs(44 * 60)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2 * 60)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(45 * 60)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_previous_timer() {
        let scheduler = Scheduler::new("quota-check");
        let counter = Arc::new(Counter::default());

        scheduler.arm(10, counter.clone()).unwrap();
        scheduler.arm(30, counter.clone()).unwrap();
        assert_eq!(scheduler.period(), Some(Duration::from_secs(30 * 60)));

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        assert!(scheduler.disarm());
        tokio::time::sleep(Duration::from_secs(120 * 60)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed());
    }
}
