pub mod models;
pub mod replay;
pub mod settings;
pub mod store;
pub mod tracking;
pub mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use models::{BarCalibration, Goal, Point, WorkoutSummary};
use replay::{read_frames, replay, ReplayOptions};
use settings::{SettingsStore, StorageKind};
use store::{HistoryRepository, JsonFileBackend, KeyValueBackend, SessionStore, SqliteBackend};
use tracking::{TrackingSession, WorkoutController};

/// Process-wide state: settings plus the one shared workout history.
pub struct AppState {
    pub settings: SettingsStore,
    pub store: Arc<SessionStore>,
    data_dir: PathBuf,
}

impl AppState {
    /// Opens settings and history under `data_dir`, creating it if needed.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let current = settings.get();
        let history_path = current.history_path(data_dir);

        let backend: Box<dyn KeyValueBackend> = match current.storage {
            StorageKind::Json => Box::new(JsonFileBackend::new(history_path)?),
            StorageKind::Sqlite => Box::new(SqliteBackend::open(&history_path)?),
        };
        let store = Arc::new(SessionStore::new(HistoryRepository::new(backend)));

        Ok(Self {
            settings,
            store,
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Starts a live workout with `goal`, or the stored default goal.
    /// Must be called inside a tokio runtime.
    pub fn start_workout(
        &self,
        goal: Option<Goal>,
        bar: BarCalibration,
    ) -> Result<WorkoutController> {
        let settings = self.settings.get();
        let goal = goal.unwrap_or_else(|| settings.default_goal());
        let session = TrackingSession::new(goal, bar, settings.tracking.clone());
        WorkoutController::start(session, Arc::clone(&self.store), settings.tick_interval())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Replay {
        frames: PathBuf,
        goal: Option<Goal>,
        bar: BarCalibration,
        speed: f64,
    },
    Stats,
    SetGoal(Goal),
}

const USAGE: &str = "\
Usage:
  repcount replay <frames.jsonl> --bar x1,y1,x2,y2 [--goal N] [--speed S]
  repcount stats
  repcount set-goal <N>";

fn parse_bar(input: &str) -> Result<BarCalibration> {
    let values: Vec<f64> = input
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid bar '{input}'"))?;
    match values.as_slice() {
        [x1, y1, x2, y2] => Ok(BarCalibration::new(
            Point::new(*x1, *y1),
            Point::new(*x2, *y2),
        )),
        _ => bail!("bar needs four comma-separated numbers, got '{input}'"),
    }
}

fn parse_command(args: &[String]) -> Result<Command> {
    match args.first().map(|s| s.as_str()) {
        Some("replay") => {
            let mut frames = None;
            let mut goal = None;
            let mut bar = None;
            let mut speed = 1.0;

            let mut rest = args[1..].iter();
            while let Some(arg) = rest.next() {
                let mut value = |flag: &str| {
                    rest.next()
                        .ok_or_else(|| anyhow!("{flag} needs a value"))
                        .map(|v| v.as_str())
                };
                match arg.as_str() {
                    "--goal" => goal = Some(Goal::parse(value("--goal")?)?),
                    "--bar" => bar = Some(parse_bar(value("--bar")?)?),
                    "--speed" => {
                        let raw = value("--speed")?;
                        speed = raw
                            .parse()
                            .with_context(|| format!("invalid speed '{raw}'"))?;
                    }
                    flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                    path => frames = Some(PathBuf::from(path)),
                }
            }

            Ok(Command::Replay {
                frames: frames.ok_or_else(|| anyhow!("missing frames file\n{USAGE}"))?,
                goal,
                bar: bar.ok_or_else(|| anyhow!("missing --bar\n{USAGE}"))?,
                speed,
            })
        }
        Some("stats") => Ok(Command::Stats),
        Some("set-goal") => {
            let raw = args
                .get(1)
                .ok_or_else(|| anyhow!("missing goal\n{USAGE}"))?;
            Ok(Command::SetGoal(Goal::parse(raw)?))
        }
        _ => bail!("{USAGE}"),
    }
}

fn print_stats(state: &AppState) {
    let store = &state.store;
    println!("Sessions:     {}", store.len());
    println!("Goals met:    {}", store.goal_met_count());
    println!("Total reps:   {}", store.total_reps());
    println!("Streak:       {} day(s)", store.calculate_streak());

    let recent = store.recent(store::RECENT_CHART_SESSIONS);
    if !recent.is_empty() {
        println!();
        println!("Recent:");
        for session in recent {
            println!(
                "  {}  {:>3}/{:<3} reps  {:>4}s",
                session.date.format("%Y-%m-%d %H:%M"),
                session.reps_completed,
                session.goal,
                session.time_taken
            );
        }
    }
}

pub fn run() -> Result<()> {
    utils::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;

    let data_dir = settings::data_dir();
    info!("RepCount starting with data dir {}", data_dir.display());
    let state = AppState::open(&data_dir)?;

    match command {
        Command::Replay {
            frames,
            goal,
            bar,
            speed,
        } => {
            let recorded = read_frames(&frames)?;
            let settings = state.settings.get();
            let options = ReplayOptions {
                goal: goal.unwrap_or_else(|| settings.default_goal()),
                bar,
                speed,
            };

            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            let report = runtime.block_on(replay(
                recorded,
                &options,
                &settings,
                Arc::clone(&state.store),
            ))?;

            match &report.record {
                Some(record) => {
                    let summary = WorkoutSummary::from(record);
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                None => println!("Nothing recorded"),
            }
            println!(
                "Frames: {} offered, {} dropped while busy",
                report.frames_offered, report.frames_skipped_busy
            );
            println!("Streak: {} day(s)", report.streak);
        }
        Command::Stats => print_stats(&state),
        Command::SetGoal(goal) => {
            state.settings.set_default_goal(goal)?;
            println!("Default goal set to {}", goal.get());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_replay_arguments() {
        let command = parse_command(&args(&[
            "replay",
            "run.jsonl",
            "--goal",
            "8",
            "--bar",
            "20,400,370,410",
            "--speed",
            "4",
        ]))
        .unwrap();

        assert_eq!(
            command,
            Command::Replay {
                frames: PathBuf::from("run.jsonl"),
                goal: Some(Goal::new(8).unwrap()),
                bar: BarCalibration::new(Point::new(20.0, 400.0), Point::new(370.0, 410.0)),
                speed: 4.0,
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_command(&args(&[])).is_err());
        assert!(parse_command(&args(&["replay", "run.jsonl"])).is_err());
        assert!(parse_command(&args(&["replay", "run.jsonl", "--bar", "1,2,3"])).is_err());
        assert!(parse_command(&args(&["replay", "--bar", "1,2,3,4"])).is_err());
        assert!(parse_command(&args(&["replay", "a", "--bar", "1,2,3,4", "--goal", "0"])).is_err());
        assert!(parse_command(&args(&["replay", "a", "--bar", "1,2,3,4", "--fps"])).is_err());
        assert_eq!(parse_command(&args(&["stats"])).unwrap(), Command::Stats);
        assert_eq!(
            parse_command(&args(&["set-goal", "12"])).unwrap(),
            Command::SetGoal(Goal::new(12).unwrap())
        );
    }

    #[test]
    fn open_uses_configured_backend() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(dir.path()).unwrap();
        assert!(state.store.is_empty());

        let mut settings = state.settings.get();
        settings.storage = StorageKind::Sqlite;
        state.settings.update(settings).unwrap();
        drop(state);

        let state = AppState::open(dir.path()).unwrap();
        assert_eq!(state.data_dir(), dir.path());
        assert!(dir.path().join("repcount.sqlite3").exists());
    }
}
