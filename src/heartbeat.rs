use crate::{Result, VisionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single boolean output signal (e.g. a fieldbus heartbeat bit).
pub trait DigitalOutput: Send {
    fn set(&mut self, value: bool) -> Result<()>;
}

impl<F> DigitalOutput for F
where
    F: FnMut(bool) -> Result<()> + Send,
{
    fn set(&mut self, value: bool) -> Result<()> {
        self(value)
    }
}

/// Background toggling of a "robot alive" signal for the cell PLC.
///
/// The signal flips every `interval` until [`stop`](Self::stop) (or drop),
/// after which it is driven low. Write errors are logged and the loop keeps
/// running.
pub struct Heartbeat {
    name: String,
    stop_flag: Arc<AtomicBool>,
    level: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Heartbeat {
    pub fn start(
        name: impl Into<String>,
        output: impl DigitalOutput + 'static,
        interval: Duration,
    ) -> Result<Heartbeat> {
        if interval.is_zero() {
            return Err(VisionError::Config("heartbeat interval must be non-zero".into()));
        }
        let name = name.into();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let level = Arc::new(AtomicBool::new(false));

        let thread = {
            let stop_flag = stop_flag.clone();
            let level = level.clone();
            let thread_name = name.clone();
            std::thread::Builder::new()
                .name(format!("heartbeat-{}", name))
                .spawn(move || heartbeat_loop(&thread_name, output, interval, &stop_flag, &level))
                .map_err(|e| VisionError::ThreadSpawn(format!("heartbeat {}: {}", name, e)))?
        };

        log::info!("Heartbeat started for signal {} (interval {:?})", name, interval);

        Ok(Heartbeat {
            name,
            stop_flag,
            level,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Last level written to the output.
    pub fn current_state(&self) -> bool {
        self.level.load(Ordering::Relaxed)
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            log::info!("Heartbeat stopped for signal {}", self.name);
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn heartbeat_loop(
    name: &str,
    mut output: impl DigitalOutput,
    interval: Duration,
    stop_flag: &AtomicBool,
    level: &AtomicBool,
) {
    while !stop_flag.load(Ordering::Relaxed) {
        let next = !level.load(Ordering::Relaxed);
        level.store(next, Ordering::Relaxed);
        if let Err(e) = output.set(next) {
            log::error!("Heartbeat {} write failed: {}", name, e);
        }

        let deadline = Instant::now() + interval;
        while !stop_flag.load(Ordering::Relaxed) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(remaining.min(Duration::from_millis(10)));
        }
    }

    level.store(false, Ordering::Relaxed);
    if let Err(e) = output.set(false) {
        log::error!("Failed to reset heartbeat {}: {}", name, e);
    }
}
