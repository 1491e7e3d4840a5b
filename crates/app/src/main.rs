//! Headless brake simulation runner.
//!
//! ```text
//! railbrake [--scenario FILE] [--seconds N] [--units psi|inhg|bar|kpa|kgf]
//!           [--metric] [--cars] [--load FILE] [--save FILE] [--quiet]
//! ```
//!
//! Without `--scenario` the built-in demo freight is run.

mod display;
mod scenario;
mod sim_thread;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;

use simulation::train::BrakeCommand;
use simulation::units::BrakeDisplayUnits;

use display::{parse_unit, DisplayPreferences};
use scenario::{Scenario, ScenarioError};
use sim_thread::{SimReport, SimSetup, SimThread, SimThreadError};

#[derive(Debug, Clone, Default, PartialEq)]
struct RunnerOptions {
    scenario: Option<PathBuf>,
    seconds: Option<f32>,
    display: DisplayPreferences,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
    quiet: bool,
}

impl RunnerOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| format!("{flag} needs a value"))
            };
            match arg.as_str() {
                "--scenario" => options.scenario = Some(PathBuf::from(value("--scenario")?)),
                "--seconds" => {
                    let raw = value("--seconds")?;
                    let seconds: f32 = raw
                        .parse()
                        .map_err(|_| format!("--seconds: '{raw}' is not a number"))?;
                    options.seconds = Some(seconds);
                }
                "--units" => {
                    let raw = value("--units")?;
                    let unit = parse_unit(&raw).ok_or_else(|| format!("unknown unit '{raw}'"))?;
                    options.display.units = BrakeDisplayUnits::uniform(unit);
                }
                "--metric" => {
                    options.display = DisplayPreferences::metric(options.display.car_table)
                }
                "--cars" => options.display.car_table = true,
                "--load" => options.load = Some(PathBuf::from(value("--load")?)),
                "--save" => options.save = Some(PathBuf::from(value("--save")?)),
                "--quiet" => options.quiet = true,
                other => return Err(format!("unknown argument '{other}'")),
            }
        }
        Ok(options)
    }
}

#[derive(Debug)]
enum RunnerError {
    Scenario(ScenarioError),
    Sim(SimThreadError),
    Save(String),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Scenario(e) => write!(f, "{e}"),
            RunnerError::Sim(e) => write!(f, "{e}"),
            RunnerError::Save(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<ScenarioError> for RunnerError {
    fn from(e: ScenarioError) -> Self {
        RunnerError::Scenario(e)
    }
}

impl From<SimThreadError> for RunnerError {
    fn from(e: SimThreadError) -> Self {
        RunnerError::Sim(e)
    }
}

fn print_report(report: &SimReport, quiet: bool) {
    for warning in &report.warnings {
        println!(
            "         DERAILMENT train {} car {}: L/V {:.2} over limit {:.2}",
            warning.train, warning.car_index, warning.force_ratio, warning.limit
        );
    }
    if !quiet {
        for sound in &report.sounds {
            println!(
                "         train {} car {}: {:?}",
                sound.train, sound.car_index, sound.signal
            );
        }
        for line in &report.status {
            println!("{line}");
        }
    }
}

fn check_saves(report: &SimReport) -> Result<(), RunnerError> {
    match report.save_outcomes.iter().find_map(|o| o.error.clone()) {
        Some(error) => Err(RunnerError::Save(error)),
        None => Ok(()),
    }
}

fn run(options: RunnerOptions) -> Result<(), RunnerError> {
    let mut scenario = match &options.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo(),
    };
    if let Some(seconds) = options.seconds {
        scenario.duration_s = seconds;
    }
    println!("Scenario '{}': {:.0} s", scenario.name, scenario.duration_s);

    let (mut sim, ready) = SimThread::spawn(SimSetup {
        trains: scenario.build_trains(),
        settings: scenario.settings.clone(),
        display: options.display,
        logging: true,
    })?;
    let mut train_ids = ready.train_ids.clone();
    print_report(&ready, options.quiet);

    let mut tick = 0;
    if let Some(path) = &options.load {
        let loaded = sim.load_session(path.clone())?;
        check_saves(&loaded)?;
        tick = loaded.tick;
        train_ids = loaded.train_ids.clone();
        print_report(&loaded, options.quiet);
    }

    let end = tick + scenario.total_ticks();
    let interval = scenario.status_interval_ticks();
    let schedule = scenario.schedule();
    let start = tick;
    let mut next_command = 0;

    while tick < end {
        let mut commands = Vec::new();
        while let Some((at, train, kind)) = schedule.get(next_command) {
            if start + at > tick {
                break;
            }
            if let Some(&id) = train_ids.get(*train) {
                commands.push(BrakeCommand { train: id, kind: *kind });
            }
            next_command += 1;
        }

        let next_status = (tick / interval + 1) * interval;
        let next_event = schedule
            .get(next_command)
            .map_or(end, |(at, _, _)| start + at);
        let stop = next_status.min(next_event).min(end).max(tick + 1);
        let ticks = u32::try_from(stop - tick).unwrap_or(u32::MAX);

        let report = sim.step(ticks, commands)?;
        tick = report.tick;
        print_report(&report, options.quiet || (tick % interval != 0 && tick != end));
    }

    if let Some(path) = &options.save {
        let saved = sim.save_session(path.clone())?;
        check_saves(&saved)?;
        println!("Saved session at tick {} to {}", saved.tick, path.display());
    }

    sim.shutdown()?;
    Ok(())
}

fn main() -> ExitCode {
    let options = match RunnerOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("railbrake: {message}");
            return ExitCode::from(2);
        }
    };
    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("railbrake: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::seconds_to_ticks;
    use simulation::units::PressureUnit;

    fn parse(args: &[&str]) -> Result<RunnerOptions, String> {
        RunnerOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_no_arguments_runs_the_demo() {
        assert_eq!(parse(&[]).unwrap(), RunnerOptions::default());
    }

    #[test]
    fn test_all_flags_parse() {
        let options = parse(&[
            "--scenario", "yard.json", "--seconds", "12.5", "--units", "bar", "--cars",
            "--save", "out.rbrk", "--quiet",
        ])
        .unwrap();
        assert_eq!(options.scenario, Some(PathBuf::from("yard.json")));
        assert_eq!(options.seconds, Some(12.5));
        assert_eq!(
            options.display.units,
            BrakeDisplayUnits::uniform(PressureUnit::Bar)
        );
        assert!(options.display.car_table);
        assert_eq!(options.save, Some(PathBuf::from("out.rbrk")));
        assert!(options.quiet);
    }

    #[test]
    fn test_bad_arguments_are_reported() {
        assert!(parse(&["--seconds"]).unwrap_err().contains("needs a value"));
        assert!(parse(&["--seconds", "soon"]).unwrap_err().contains("not a number"));
        assert!(parse(&["--units", "atm"]).unwrap_err().contains("unknown unit"));
        assert!(parse(&["--fast"]).unwrap_err().contains("unknown argument"));
    }

    #[test]
    fn test_schedule_ticks_match_demo_timeline() {
        let demo = Scenario::demo();
        let schedule = demo.schedule();
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule[0].0, seconds_to_ticks(5.0));
        assert!(schedule.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
