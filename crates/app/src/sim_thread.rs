//! The simulation runs on its own thread. The driver thread asks for a batch
//! of ticks and blocks until the thread reports back, so no train state is
//! ever read while a tick is in progress.

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use save::{LoadSessionEvent, SaveOutcomeEvent, SavePlugin, SaveSessionEvent};
use simulation::brake_settings::BrakeSimSettings;
use simulation::config::FIXED_TICK_HZ;
use simulation::events::{BrakeSoundEvent, DerailmentWarning};
use simulation::train::{BrakeCommand, Train, TrainId, TrainRoster};
use simulation::{SimulationPlugin, TickCounter};

use crate::display::{DisplayPlugin, DisplayPreferences};

/// What the simulation thread starts with.
pub struct SimSetup {
    pub trains: Vec<Train>,
    pub settings: BrakeSimSettings,
    pub display: DisplayPreferences,
    /// Install `LogPlugin` inside the thread.
    pub logging: bool,
}

pub enum SimRequest {
    /// Queue `commands`, then run `ticks` fixed ticks.
    Step {
        ticks: u32,
        commands: Vec<BrakeCommand>,
    },
    SaveSession(PathBuf),
    LoadSession(PathBuf),
    Shutdown,
}

/// Sent back once a request has been fully processed.
#[derive(Debug, Default)]
pub struct SimReport {
    pub tick: u64,
    pub train_ids: Vec<TrainId>,
    pub status: Vec<String>,
    pub sounds: Vec<BrakeSoundEvent>,
    pub warnings: Vec<DerailmentWarning>,
    pub save_outcomes: Vec<SaveOutcomeEvent>,
}

#[derive(Debug)]
pub enum SimThreadError {
    Spawn(std::io::Error),
    /// The thread hung up before answering; it has panicked.
    Disconnected,
    Panicked(String),
}

impl fmt::Display for SimThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimThreadError::Spawn(e) => write!(f, "failed to start simulation thread: {e}"),
            SimThreadError::Disconnected => write!(f, "simulation thread stopped unexpectedly"),
            SimThreadError::Panicked(msg) => write!(f, "simulation thread panicked: {msg}"),
        }
    }
}

impl std::error::Error for SimThreadError {}

pub struct SimThread {
    requests: Sender<SimRequest>,
    reports: Receiver<SimReport>,
    handle: Option<JoinHandle<()>>,
}

impl SimThread {
    /// Start the thread and wait for it to register the trains. The returned
    /// report carries their ids in setup order.
    pub fn spawn(setup: SimSetup) -> Result<(Self, SimReport), SimThreadError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("brake-sim".to_string())
            .spawn(move || run(setup, request_rx, report_tx))
            .map_err(SimThreadError::Spawn)?;

        let mut thread = Self {
            requests: request_tx,
            reports: report_rx,
            handle: Some(handle),
        };
        let ready = thread.wait()?;
        Ok((thread, ready))
    }

    fn wait(&mut self) -> Result<SimReport, SimThreadError> {
        match self.reports.recv() {
            Ok(report) => Ok(report),
            Err(_) => Err(self.join_error()),
        }
    }

    fn request(&mut self, request: SimRequest) -> Result<SimReport, SimThreadError> {
        if self.requests.send(request).is_err() {
            return Err(self.join_error());
        }
        self.wait()
    }

    /// Run `ticks` ticks, applying `commands` at the start of the first.
    pub fn step(&mut self, ticks: u32, commands: Vec<BrakeCommand>) -> Result<SimReport, SimThreadError> {
        self.request(SimRequest::Step { ticks, commands })
    }

    pub fn save_session(&mut self, path: PathBuf) -> Result<SimReport, SimThreadError> {
        self.request(SimRequest::SaveSession(path))
    }

    pub fn load_session(&mut self, path: PathBuf) -> Result<SimReport, SimThreadError> {
        self.request(SimRequest::LoadSession(path))
    }

    pub fn shutdown(mut self) -> Result<(), SimThreadError> {
        let _ = self.requests.send(SimRequest::Shutdown);
        match self.handle.take().map(JoinHandle::join) {
            Some(Err(panic)) => Err(SimThreadError::Panicked(panic_message(&*panic))),
            _ => Ok(()),
        }
    }

    fn join_error(&mut self) -> SimThreadError {
        match self.handle.take().map(JoinHandle::join) {
            Some(Err(panic)) => SimThreadError::Panicked(panic_message(&*panic)),
            _ => SimThreadError::Disconnected,
        }
    }
}

impl Drop for SimThread {
    fn drop(&mut self) {
        let _ = self.requests.send(SimRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Thread body
// ---------------------------------------------------------------------------

fn build_app(setup: &SimSetup) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    if setup.logging {
        app.add_plugins(LogPlugin::default());
    }
    app.add_plugins((
        SimulationPlugin,
        SavePlugin,
        DisplayPlugin {
            initial: setup.display,
        },
    ));
    app.insert_resource(setup.settings.clone());
    // Each update advances exactly one fixed tick, independent of wall time.
    app.insert_resource(TimeUpdateStrategy::ManualDuration(
        std::time::Duration::from_secs_f64(1.0 / FIXED_TICK_HZ),
    ));
    app
}

fn run(setup: SimSetup, requests: Receiver<SimRequest>, reports: Sender<SimReport>) {
    let mut app = build_app(&setup);
    // Startup runs here with a zero delta, so no tick is taken.
    app.update();

    {
        let mut roster = app.world_mut().resource_mut::<TrainRoster>();
        for train in setup.trains {
            roster.add(train);
        }
    }
    info!("Simulation thread ready");
    if reports.send(report(&mut app, SimReport::default())).is_err() {
        return;
    }

    while let Ok(request) = requests.recv() {
        let mut collected = SimReport::default();
        match request {
            SimRequest::Step { ticks, commands } => {
                for command in commands {
                    app.world_mut().send_event(command);
                }
                for _ in 0..ticks {
                    app.update();
                    collect_events(&mut app, &mut collected);
                }
            }
            SimRequest::SaveSession(path) => {
                app.world_mut().send_event(SaveSessionEvent { path });
                update_without_ticking(&mut app, &mut collected);
            }
            SimRequest::LoadSession(path) => {
                app.world_mut().send_event(LoadSessionEvent { path });
                update_without_ticking(&mut app, &mut collected);
            }
            SimRequest::Shutdown => break,
        }
        if reports.send(report(&mut app, collected)).is_err() {
            break;
        }
    }
    info!("Simulation thread shutting down");
}

/// Run the schedule once with a zero time step so event-driven systems fire
/// but the trains do not advance.
fn update_without_ticking(app: &mut App, collected: &mut SimReport) {
    app.insert_resource(TimeUpdateStrategy::ManualDuration(std::time::Duration::ZERO));
    app.update();
    collect_save_outcomes(app, collected);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(
        std::time::Duration::from_secs_f64(1.0 / FIXED_TICK_HZ),
    ));
}

fn collect_events(app: &mut App, collected: &mut SimReport) {
    let world = app.world();
    collected.sounds.extend(
        world
            .resource::<Events<BrakeSoundEvent>>()
            .iter_current_update_events()
            .copied(),
    );
    collected.warnings.extend(
        world
            .resource::<Events<DerailmentWarning>>()
            .iter_current_update_events()
            .copied(),
    );
}

/// Only read after a save or load request; a zero-length update does not
/// rotate the event buffers, so reading these after a tick could repeat them.
fn collect_save_outcomes(app: &mut App, collected: &mut SimReport) {
    collected.save_outcomes.extend(
        app.world()
            .resource::<Events<SaveOutcomeEvent>>()
            .iter_current_update_events()
            .cloned(),
    );
}

fn report(app: &mut App, mut collected: SimReport) -> SimReport {
    let world = app.world();
    let tick = world.resource::<TickCounter>().0;
    let display = *world.resource::<DisplayPreferences>();
    collected.tick = tick;
    collected.train_ids = world
        .resource::<TrainRoster>()
        .trains
        .iter()
        .map(|t| t.id)
        .collect();
    collected.status = world
        .resource::<TrainRoster>()
        .trains
        .iter()
        .flat_map(|train| display.status_lines(tick, train))
        .collect();
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation::events::BrakeSignal;
    use simulation::test_harness::freight_consist;
    use simulation::train::{BrakeCommandKind, ControllerPosition};

    fn setup(wagons: usize) -> SimSetup {
        SimSetup {
            trains: vec![freight_consist("freight", wagons)],
            settings: BrakeSimSettings::default(),
            display: DisplayPreferences::default(),
            logging: false,
        }
    }

    #[test]
    fn test_handshake_reports_tick_per_step() {
        let (mut sim, ready) = SimThread::spawn(setup(3)).unwrap();
        assert_eq!(ready.tick, 0);
        assert_eq!(ready.train_ids.len(), 1);
        assert_eq!(ready.status.len(), 1);

        let report = sim.step(30, Vec::new()).unwrap();
        assert_eq!(report.tick, 30);
        let report = sim.step(15, Vec::new()).unwrap();
        assert_eq!(report.tick, 45);
        sim.shutdown().unwrap();
    }

    #[test]
    fn test_commands_reach_the_train() {
        let (mut sim, ready) = SimThread::spawn(setup(2)).unwrap();
        let train = ready.train_ids[0];
        let report = sim
            .step(
                300,
                vec![BrakeCommand {
                    train,
                    kind: BrakeCommandKind::SetController {
                        position: ControllerPosition::Emergency,
                        equalizing_reservoir_psi: 0.0,
                    },
                }],
            )
            .unwrap();
        assert!(report
            .sounds
            .iter()
            .any(|s| s.signal == BrakeSignal::BrakePipePressureDecrease));
        sim.shutdown().unwrap();
    }

    #[test]
    fn test_save_and_load_do_not_advance_time() {
        let path = std::env::temp_dir().join(format!(
            "railbrake_sim_thread_{}.rbrk",
            std::process::id()
        ));
        let (mut sim, ready) = SimThread::spawn(setup(2)).unwrap();
        let train = ready.train_ids[0];
        sim.step(10, Vec::new()).unwrap();

        let saved = sim.save_session(path.clone()).unwrap();
        assert_eq!(saved.tick, 10);
        assert_eq!(saved.save_outcomes.len(), 1);
        assert!(saved.save_outcomes[0].succeeded());

        sim.step(
            60,
            vec![BrakeCommand {
                train,
                kind: BrakeCommandKind::SetController {
                    position: ControllerPosition::Emergency,
                    equalizing_reservoir_psi: 0.0,
                },
            }],
        )
        .unwrap();

        let loaded = sim.load_session(path.clone()).unwrap();
        assert!(loaded.save_outcomes[0].succeeded());
        assert_eq!(loaded.tick, 10);
        assert_eq!(loaded.status, saved.status);
        sim.shutdown().unwrap();

        let _ = std::fs::remove_file(&path);
    }
}
