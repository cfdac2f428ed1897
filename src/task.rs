use crate::client::{ClientStats, CycleOutcome, VisionClient};
use crate::types::{VisionInputs, VisionOutputs};
use crate::{Result, VisionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity at which a sleeping task notices a stop request.
const STOP_POLL: Duration = Duration::from_millis(10);

/// Digital I/O of the robot controller as seen by the vision task.
///
/// Any `FnMut() -> bool` closure works as a trigger-only source: `true`
/// means [`VisionInputs::DATA_REQUEST`], outputs are ignored.
pub trait VisionIo: Send {
    /// Read the input group once per cycle.
    fn read_inputs(&mut self) -> VisionInputs;

    /// Drive the output group. Only called when the values change.
    fn write_outputs(&mut self, _outputs: VisionOutputs) {}
}

impl<F> VisionIo for F
where
    F: FnMut() -> bool + Send,
{
    fn read_inputs(&mut self) -> VisionInputs {
        if self() {
            VisionInputs::DATA_REQUEST
        } else {
            VisionInputs::empty()
        }
    }
}

/// Handle to a running cyclic vision task.
///
/// A dedicated thread invokes [`VisionClient::tick`] every `cycle_period`
/// (best effort: an overrunning cycle is followed immediately by the next).
/// The thread owns the client and its socket; control logic talks to it only
/// through the shared bridge and gateway.
pub struct CyclicTask {
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<ClientStats>>,
}

impl CyclicTask {
    /// Start driving `client` from a new thread.
    pub fn spawn(client: VisionClient, io: impl VisionIo + 'static) -> Result<CyclicTask> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("smartpick-vision".into())
            .spawn(move || cyclic_loop(client, io, stop_clone))
            .map_err(|e| VisionError::ThreadSpawn(format!("vision task: {}", e)))?;

        Ok(CyclicTask {
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Check if the task is still running.
    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop between cycles, close the socket and return the final counters.
    ///
    /// Returns within one stop-poll slice plus any in-flight I/O timeout.
    pub fn stop(mut self) -> Option<ClientStats> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<ClientStats> {
        self.stop_flag.store(true, Ordering::Relaxed);
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                log::error!("Vision task thread panicked");
                None
            }
        }
    }
}

impl Drop for CyclicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn cyclic_loop(mut client: VisionClient, mut io: impl VisionIo, stop_flag: Arc<AtomicBool>) -> ClientStats {
    let period = client.config().cycle_period;
    let mut outputs = VisionOutputs::empty();

    log::info!("Vision task started (cycle {:?})", period);

    while !stop_flag.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        let inputs = io.read_inputs();
        let outcome = client.tick(inputs.trigger_requested());

        let next = next_outputs(outputs, inputs, &outcome);
        if next != outputs {
            io.write_outputs(next);
            outputs = next;
        }

        sleep_until(cycle_start + period, &stop_flag);
    }

    client.shutdown();
    if !outputs.is_empty() {
        io.write_outputs(VisionOutputs::empty());
    }
    log::info!("Vision task stopped");
    client.stats()
}

/// Output handshake: acknowledge a served request, flag a ready pose, and
/// drop both once the request input falls or the link breaks.
fn next_outputs(current: VisionOutputs, inputs: VisionInputs, outcome: &CycleOutcome) -> VisionOutputs {
    match outcome {
        CycleOutcome::Exchanged(exchange) => {
            let mut out = VisionOutputs::DATA_REQUEST_SENT;
            if exchange.pose.is_some() {
                out |= VisionOutputs::PICK_POSITION_READY;
            }
            out
        }
        CycleOutcome::ConnectionLost | CycleOutcome::ExchangeFailed(_) => VisionOutputs::empty(),
        _ if !inputs.trigger_requested() => VisionOutputs::empty(),
        _ => current,
    }
}

/// Sleep until `deadline` in short slices, returning early on stop.
fn sleep_until(deadline: Instant, stop_flag: &AtomicBool) {
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(STOP_POLL));
    }
}
