//! Consist scenarios: which trains exist, and which brake commands are given
//! at which moment.
//!
//! Scenarios are JSON. Every field has a default, so a file only needs the
//! parts that differ from the built-in demo settings:
//!
//! ```json
//! {
//!   "name": "hump yard cut",
//!   "duration_s": 60,
//!   "trains": [{ "name": "cut", "cars": [
//!     { "name": "switcher", "locomotive": {} },
//!     { "name": "hopper", "count": 12 }
//!   ]}],
//!   "commands": [
//!     { "at_s": 5, "command": { "SetController": { "position": "Apply", "equalizing_reservoir_psi": 75 } } }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use simulation::brake_settings::BrakeSimSettings;
use simulation::brakes::CarBrakeParams;
use simulation::config::FIXED_TICK_HZ;
use simulation::train::{
    BrakeCommandKind, CarKind, CarPhysics, ControllerPosition, LocomotiveAirParams, RailCar,
    Train,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub duration_s: f32,
    pub status_interval_s: f32,
    pub settings: BrakeSimSettings,
    pub trains: Vec<TrainSpec>,
    pub commands: Vec<TimedCommand>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            duration_s: 60.0,
            status_interval_s: 5.0,
            settings: BrakeSimSettings::default(),
            trains: Vec::new(),
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainSpec {
    pub name: String,
    pub cars: Vec<CarSpec>,
}

/// One car definition, repeated `count` times. A car with a `locomotive`
/// block is a locomotive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarSpec {
    pub name: String,
    pub count: usize,
    pub kind: CarKind,
    pub physics: CarPhysics,
    pub brake: CarBrakeParams,
    pub locomotive: Option<LocomotiveAirParams>,
}

impl Default for CarSpec {
    fn default() -> Self {
        Self {
            name: "car".to_string(),
            count: 1,
            kind: CarKind::Freight,
            physics: CarPhysics::default(),
            brake: CarBrakeParams::default(),
            locomotive: None,
        }
    }
}

/// A command for the train at index `train` of [`Scenario::trains`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedCommand {
    pub at_s: f32,
    #[serde(default)]
    pub train: usize,
    pub command: BrakeCommandKind,
}

#[derive(Debug)]
pub enum ScenarioError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    NoTrains,
    EmptyTrain(String),
    UnknownTrain { command: usize, train: usize },
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Io(e) => write!(f, "cannot read scenario: {e}"),
            ScenarioError::Parse(e) => write!(f, "invalid scenario JSON: {e}"),
            ScenarioError::NoTrains => write!(f, "scenario defines no trains"),
            ScenarioError::EmptyTrain(name) => write!(f, "train '{name}' has no cars"),
            ScenarioError::UnknownTrain { command, train } => write!(
                f,
                "command {command} refers to train {train}, which the scenario does not define"
            ),
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Io(e) => Some(e),
            ScenarioError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_json::from_str(text).map_err(ScenarioError::Parse)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(ScenarioError::Io)?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.trains.is_empty() {
            return Err(ScenarioError::NoTrains);
        }
        for spec in &self.trains {
            if spec.cars.iter().all(|c| c.count == 0) {
                return Err(ScenarioError::EmptyTrain(spec.name.clone()));
            }
        }
        for (index, timed) in self.commands.iter().enumerate() {
            if timed.train >= self.trains.len() {
                return Err(ScenarioError::UnknownTrain {
                    command: index,
                    train: timed.train,
                });
            }
        }
        Ok(())
    }

    /// A locomotive hauling twenty loaded wagons through a service
    /// application, a release, an emergency stop and a recharge.
    pub fn demo() -> Self {
        let apply = |at_s, psi| TimedCommand {
            at_s,
            train: 0,
            command: BrakeCommandKind::SetController {
                position: ControllerPosition::Apply,
                equalizing_reservoir_psi: psi,
            },
        };
        let position = |at_s, position| TimedCommand {
            at_s,
            train: 0,
            command: BrakeCommandKind::SetController {
                position,
                equalizing_reservoir_psi: 0.0,
            },
        };

        Self {
            name: "demo freight".to_string(),
            duration_s: 150.0,
            status_interval_s: 5.0,
            settings: BrakeSimSettings::default(),
            trains: vec![TrainSpec {
                name: "freight".to_string(),
                cars: vec![
                    CarSpec {
                        name: "loco".to_string(),
                        kind: CarKind::Locomotive,
                        physics: CarPhysics {
                            mass_kg: 120_000.0,
                            length_m: 20.0,
                            axles: 6,
                            ..Default::default()
                        },
                        locomotive: Some(LocomotiveAirParams::default()),
                        ..Default::default()
                    },
                    CarSpec {
                        name: "wagon".to_string(),
                        count: 20,
                        ..Default::default()
                    },
                ],
            }],
            commands: vec![
                apply(5.0, 75.0),
                position(40.0, ControllerPosition::Release),
                position(80.0, ControllerPosition::Emergency),
                position(110.0, ControllerPosition::FullQuickRelease),
            ],
        }
    }

    /// Build the trains, charged and ready, in scenario order.
    pub fn build_trains(&self) -> Vec<Train> {
        self.trains
            .iter()
            .map(|spec| {
                let mut cars = Vec::new();
                for car in &spec.cars {
                    for n in 0..car.count {
                        let name = if car.count > 1 {
                            format!("{}{}", car.name, n + 1)
                        } else {
                            car.name.clone()
                        };
                        cars.push(match &car.locomotive {
                            Some(air) => RailCar::locomotive(
                                name,
                                car.physics.clone(),
                                car.brake.clone(),
                                *air,
                            ),
                            None => RailCar::wagon(
                                name,
                                car.kind,
                                car.physics.clone(),
                                car.brake.clone(),
                            ),
                        });
                    }
                }
                Train::new(spec.name.clone(), cars)
            })
            .collect()
    }

    pub fn total_ticks(&self) -> u64 {
        seconds_to_ticks(self.duration_s)
    }

    pub fn status_interval_ticks(&self) -> u64 {
        seconds_to_ticks(self.status_interval_s).max(1)
    }

    /// Commands as `(tick, train index, command)`, in the order they fire.
    /// Commands sharing a tick keep their file order.
    pub fn schedule(&self) -> Vec<(u64, usize, BrakeCommandKind)> {
        let mut schedule: Vec<_> = self
            .commands
            .iter()
            .map(|c| (seconds_to_ticks(c.at_s), c.train, c.command))
            .collect();
        schedule.sort_by_key(|(tick, _, _)| *tick);
        schedule
    }
}

pub fn seconds_to_ticks(seconds: f32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (f64::from(seconds) * FIXED_TICK_HZ).round() as u64
}
