//! # TestTrain: headless integration test harness
//!
//! Wraps a `bevy::app::App` with `SimulationPlugin` so integration tests and
//! benchmarks can drive trains through the real `FixedUpdate` schedule
//! without a window.

use std::time::Duration;

use bevy::app::App;
use bevy::ecs::event::Events;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::brake_settings::BrakeSimSettings;
use crate::brakes::CarBrakeParams;
use crate::config::FIXED_TICK_HZ;
use crate::events::{BrakeSoundEvent, DerailmentWarning};
use crate::train::{
    BrakeCommand, BrakeCommandKind, CarKind, CarPhysics, LocomotiveAirParams, RailCar, Train,
    TrainId, TrainRoster,
};
use crate::{SimulationPlugin, TickCounter};

/// Length of one fixed tick.
pub fn fixed_tick() -> Duration {
    Duration::from_secs_f64(1.0 / FIXED_TICK_HZ)
}

/// A locomotive with default air parameters.
pub fn locomotive(name: &str) -> RailCar {
    let physics = CarPhysics {
        mass_kg: 120_000.0,
        length_m: 20.0,
        axles: 6,
        ..Default::default()
    };
    RailCar::locomotive(
        name,
        physics,
        CarBrakeParams::single_pipe(),
        LocomotiveAirParams::default(),
    )
}

/// A loaded freight wagon with a single-pipe brake.
pub fn freight_wagon(name: &str) -> RailCar {
    RailCar::wagon(
        name,
        CarKind::Freight,
        CarPhysics::default(),
        CarBrakeParams::single_pipe(),
    )
}

/// One locomotive followed by `wagons` freight wagons, brakes charged.
pub fn freight_consist(name: &str, wagons: usize) -> Train {
    let mut cars = vec![locomotive("loco")];
    cars.extend((0..wagons).map(|i| freight_wagon(&format!("wagon{}", i + 1))));
    Train::new(name, cars)
}

/// A headless Bevy App wrapping `SimulationPlugin` for integration testing.
///
/// Every `app.update()` advances time by exactly one fixed tick, so `tick(n)`
/// runs `FixedUpdate` exactly `n` times.
pub struct TestTrain {
    app: App,
}

impl Default for TestTrain {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTrain {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// An app with no trains.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SimulationPlugin);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(fixed_tick()));

        // First update runs Startup and primes the clocks with a zero delta.
        app.update();
        Self { app }
    }

    /// An app with one freight consist of `wagons` wagons behind a locomotive.
    pub fn with_freight(wagons: usize) -> (Self, TrainId) {
        let mut sim = Self::new();
        let id = sim.add_train(freight_consist("freight", wagons));
        (sim, id)
    }

    // -----------------------------------------------------------------------
    // World setup
    // -----------------------------------------------------------------------

    pub fn with_settings(mut self, settings: BrakeSimSettings) -> Self {
        self.app.insert_resource(settings);
        self
    }

    /// Access to the wrapped app, for crates layering their own plugins on top.
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    pub fn add_train(&mut self, train: Train) -> TrainId {
        self.app.world_mut().resource_mut::<TrainRoster>().add(train)
    }

    /// Queue a command; it is applied in `PreSim` of the next tick.
    pub fn send(&mut self, train: TrainId, kind: BrakeCommandKind) {
        self.app
            .world_mut()
            .send_event(BrakeCommand { train, kind });
    }

    /// Mutate a train in place between ticks.
    pub fn with_train_mut(&mut self, id: TrainId, f: impl FnOnce(&mut Train)) {
        if let Some(train) = self
            .app
            .world_mut()
            .resource_mut::<TrainRoster>()
            .get_mut(id)
        {
            f(train);
        }
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run `n` fixed-update ticks.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
        }
    }

    /// Run `n` ticks and collect every sound event they send.
    pub fn tick_collecting_sounds(&mut self, n: u32) -> Vec<BrakeSoundEvent> {
        let mut collected = Vec::new();
        for _ in 0..n {
            self.app.update();
            collected.extend(self.sound_events());
        }
        collected
    }

    /// Run `n` ticks and collect every derailment warning they raise.
    pub fn tick_collecting_warnings(&mut self, n: u32) -> Vec<DerailmentWarning> {
        let mut collected = Vec::new();
        for _ in 0..n {
            self.app.update();
            collected.extend(self.derailment_warnings());
        }
        collected
    }

    /// Run whole seconds of simulated time.
    pub fn run_seconds(&mut self, seconds: f32) {
        let ticks = (seconds as f64 * FIXED_TICK_HZ).round() as u32;
        self.tick(ticks);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn roster(&self) -> &TrainRoster {
        self.resource::<TrainRoster>()
    }

    /// Panics if `id` is not in the roster.
    pub fn train(&self, id: TrainId) -> &Train {
        match self.roster().get(id) {
            Some(train) => train,
            None => panic!("train {id} is not in the roster"),
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.resource::<TickCounter>().0
    }

    /// Sound events sent during the most recent tick.
    pub fn sound_events(&self) -> Vec<BrakeSoundEvent> {
        self.app
            .world()
            .resource::<Events<BrakeSoundEvent>>()
            .iter_current_update_events()
            .copied()
            .collect()
    }

    /// Derailment warnings raised during the most recent tick.
    pub fn derailment_warnings(&self) -> Vec<DerailmentWarning> {
        self.app
            .world()
            .resource::<Events<DerailmentWarning>>()
            .iter_current_update_events()
            .copied()
            .collect()
    }
}
