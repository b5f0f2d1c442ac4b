//! Periodic poll scheduling.

use crate::connection::spawn_named;
use crate::engine::EngineEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Drives periodic delta requests while a connection is open.
///
/// Each `on_open` arms one ticker thread tagged with the connection
/// generation; the ticker watches the shared live-generation counter and
/// exits as soon as its generation is superseded, so a stale timer never
/// ticks against a replaced connection. The tick events themselves are also
/// generation-tagged and filtered by the engine, which closes the window
/// between a generation bump and the ticker noticing it.
pub(crate) struct PollScheduler {
    interval: Duration,
    gate_in_flight: bool,
    live_generation: Arc<AtomicU64>,
    in_flight: bool,
}

impl PollScheduler {
    pub(crate) fn new(
        interval: Duration,
        gate_in_flight: bool,
        live_generation: Arc<AtomicU64>,
    ) -> Self {
        Self {
            interval,
            gate_in_flight,
            live_generation,
            in_flight: false,
        }
    }

    /// Arms the periodic ticker for a freshly opened connection.
    pub(crate) fn on_open(&mut self, generation: u64, events: &Sender<EngineEvent>) {
        self.in_flight = false;

        let events = events.clone();
        let interval = self.interval;
        let live = Arc::clone(&self.live_generation);
        spawn_named("livetable-ticker", move || loop {
            thread::sleep(interval);
            if live.load(Ordering::SeqCst) != generation {
                break;
            }
            if events.send(EngineEvent::PollTick { generation }).is_err() {
                break;
            }
        });
    }

    /// Resets per-connection polling state after a close.
    ///
    /// The ticker itself dies off the generation bump performed by the
    /// connection manager.
    pub(crate) fn on_close(&mut self) {
        self.in_flight = false;
    }

    /// Returns true if a poll request may be sent now.
    ///
    /// With gating disabled this is always true; with gating enabled it is
    /// false while a previously sent request's response has not arrived.
    pub(crate) fn should_send(&self) -> bool {
        !(self.gate_in_flight && self.in_flight)
    }

    /// Records that a poll request went out.
    pub(crate) fn mark_sent(&mut self) {
        self.in_flight = true;
    }

    /// Records that an inbound frame arrived, well-formed or not.
    pub(crate) fn mark_received(&mut self) {
        self.in_flight = false;
    }
}
