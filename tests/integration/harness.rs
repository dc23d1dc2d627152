//! Shared setup for the integration tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use esp32_coproc::adapters::sim::SimCoprocessor;
use esp32_coproc::app::ports::RecordingSink;
use esp32_coproc::proto::RawEvent;
use esp32_coproc::{Coprocessor, CoprocConfig};

/// Upper bound for anything that crosses the pump and a lane.
pub const WAIT: Duration = Duration::from_secs(3);

pub struct Rig {
    pub coproc: Coprocessor,
    pub sim: Arc<SimCoprocessor>,
    pub sink: Arc<RecordingSink>,
}

/// Start a coprocessor with `config`. Events the test raises on `sim`
/// before calling this are already queued when the pump starts.
pub fn start_with(config: CoprocConfig, sim: Arc<SimCoprocessor>) -> Rig {
    let sink = Arc::new(RecordingSink::new());
    let coproc = Coprocessor::start(config, sim.clone(), sink.clone()).expect("coprocessor start");
    Rig { coproc, sim, sink }
}

pub fn start() -> Rig {
    start_with(CoprocConfig::default(), SimCoprocessor::new())
}

/// Poll `done` until it holds or [`WAIT`] expires.
pub fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while !done() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    true
}

/// Handler that stores every event it is given.
#[derive(Clone, Default)]
pub struct Collected(Arc<Mutex<Vec<RawEvent>>>);

impl Collected {
    pub fn handler(&self) -> impl FnMut(&RawEvent) + Send + 'static {
        let store = self.0.clone();
        move |e: &RawEvent| store.lock().unwrap().push(e.clone())
    }

    pub fn events(&self) -> Vec<RawEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn functions(&self) -> Vec<u32> {
        self.events().iter().map(|e| e.function).collect()
    }
}
