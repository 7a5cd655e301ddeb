//! Periodic Tick Driver
//!
//! Runs a [`PeriodicTask`] on its own named thread at a fixed cadence. The
//! coordinator is handed to the timer rather than being the timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use tracing::{debug, info};

use crate::coordinator::AnalyzerCoordinator;
use crate::error::{EngineError, EngineResult};

/// Work done once per timer tick
pub trait PeriodicTask: Send {
    fn on_tick(&mut self);
}

impl PeriodicTask for AnalyzerCoordinator {
    fn on_tick(&mut self) {
        self.tick();
    }
}

/// Owns the timer thread. Dropping it stops and joins the thread.
pub struct AnalyzerTimer<T: PeriodicTask + 'static> {
    shutdown: Sender<()>,
    thread: Option<JoinHandle<T>>,
    ticks: Arc<AtomicU64>,
    interval: Duration,
}

impl<T: PeriodicTask + 'static> AnalyzerTimer<T> {
    /// Move `task` onto a new thread and tick it every `interval`
    pub fn start(mut task: T, interval: Duration) -> EngineResult<Self> {
        let (shutdown, shutdown_rx) = bounded::<()>(1);
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_clone = Arc::clone(&ticks);

        let thread = thread::Builder::new()
            .name("contour-analyzer".into())
            .spawn(move || {
                info!("Analyzer timer started ({:?} interval)", interval);
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            task.on_tick();
                            ticks_clone.fetch_add(1, Ordering::Relaxed);
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                info!("Analyzer timer stopped");
                task
            })
            .map_err(EngineError::TimerSpawn)?;

        Ok(Self {
            shutdown,
            thread: Some(thread),
            ticks,
            interval,
        })
    }

    /// Ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the thread and hand the task back
    pub fn stop(mut self) -> EngineResult<T> {
        self.shutdown_and_join().ok_or(EngineError::TimerStopped)
    }

    fn shutdown_and_join(&mut self) -> Option<T> {
        let handle = self.thread.take()?;
        // Full or disconnected both mean the thread is already on its way out
        let _ = self.shutdown.try_send(());
        match handle.join() {
            Ok(task) => Some(task),
            Err(_) => {
                debug!("Analyzer timer thread panicked");
                None
            }
        }
    }
}

impl<T: PeriodicTask + 'static> Drop for AnalyzerTimer<T> {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct CountingTask {
        count: Arc<AtomicU64>,
    }

    impl PeriodicTask for CountingTask {
        fn on_tick(&mut self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for(timer_ticks: impl Fn() -> u64, target: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while timer_ticks() < target && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_timer_ticks_task() {
        let count = Arc::new(AtomicU64::new(0));
        let timer = AnalyzerTimer::start(
            CountingTask {
                count: Arc::clone(&count),
            },
            Duration::from_millis(2),
        )
        .unwrap();

        wait_for(|| timer.ticks(), 3);
        let task = timer.stop().unwrap();
        assert!(task.count.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_drop_stops_thread() {
        let count = Arc::new(AtomicU64::new(0));
        {
            let timer = AnalyzerTimer::start(
                CountingTask {
                    count: Arc::clone(&count),
                },
                Duration::from_millis(1),
            )
            .unwrap();
            wait_for(|| timer.ticks(), 1);
        }

        let after_drop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_interval_accessor() {
        let timer = AnalyzerTimer::start(
            CountingTask {
                count: Arc::new(AtomicU64::new(0)),
            },
            Duration::from_millis(16),
        )
        .unwrap();
        assert_eq!(timer.interval(), Duration::from_millis(16));
    }
}
