//! Headless Mini-Game Runner
//!
//! Loads mini-game definitions, replays a scripted sequence of input frames
//! against one of them and prints the resulting event stream.

use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use minigame_engine::station::{ManipulablePart, SnapPoint};
use minigame_engine::{
    BasicStation, CancelReason, DefinitionTable, MiniGameError, MiniGameEvent, MiniGameOrchestrator,
    MiniGameOutcome, OrchestratorConfig, Result, Station, Tag,
};

/// Headless Mini-Game Runner - replay scripted input against a mini-game
#[derive(Parser, Debug)]
#[command(name = "minigame_sim")]
#[command(about = "Drive one mini-game frame by frame from a TOML script")]
struct Args {
    /// Script describing the mini-game to start and the frames to feed it
    script: PathBuf,

    /// Directory of mini-game definition files
    #[arg(long, default_value = "data/minigames")]
    definitions: PathBuf,

    /// Orchestrator config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Debug, Deserialize)]
struct Script {
    mini_game: Tag,
    /// Frame length used when a frame gives none
    #[serde(default = "default_dt")]
    dt: f32,
    #[serde(default)]
    station: Option<StationScript>,
    #[serde(default, rename = "frame")]
    frames: Vec<Frame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StationScript {
    code: Vec<Tag>,
    difficulty: Option<f32>,
    snap_points: Vec<SnapPoint>,
    parts: Vec<ManipulablePart>,
}

/// One scripted frame; input is routed before the tick
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    dt: Option<f32>,
    #[serde(default)]
    axis: Option<[f32; 2]>,
    /// Actions pressed and released within the frame
    #[serde(default)]
    press: Vec<Tag>,
    /// Actions pressed and left held
    #[serde(default)]
    hold: Vec<Tag>,
    #[serde(default)]
    release: Vec<Tag>,
    #[serde(default)]
    point: Option<[f32; 3]>,
    #[serde(default)]
    cancel: Option<String>,
    #[serde(default = "default_repeat")]
    repeat: u32,
}

fn default_dt() -> f32 {
    1.0 / 60.0
}

fn default_repeat() -> u32 {
    1
}

#[derive(Serialize)]
struct EventLine<'a> {
    frame: u64,
    event: &'a MiniGameEvent,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("minigame_engine=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let json = match args.format.as_str() {
        "json" => true,
        "text" => false,
        other => {
            return Err(MiniGameError::ParseError(format!(
                "unknown output format '{}' (expected json or text)",
                other
            )))
        }
    };

    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => OrchestratorConfig::default(),
    };
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }

    let mut table = DefinitionTable::new();
    table.load_directory(&args.definitions)?;
    let script: Script = toml::from_str(&std::fs::read_to_string(&args.script)?)?;

    let station: Option<Rc<dyn Station>> = script.station.as_ref().map(|s| {
        let mut station = BasicStation::new(script.mini_game)
            .with_code(s.code.clone())
            .with_snap_points(s.snap_points.clone())
            .with_parts(s.parts.clone());
        if let Some(difficulty) = s.difficulty {
            station = station.with_difficulty(difficulty);
        }
        Rc::new(station) as Rc<dyn Station>
    });

    let mut orchestrator = MiniGameOrchestrator::with_table(config, table)?;
    orchestrator.start(script.mini_game, station.as_ref())?;

    let mut frame_number = 0u64;
    emit(&mut orchestrator, frame_number, json)?;

    'frames: for frame in &script.frames {
        for _ in 0..frame.repeat.max(1) {
            if !orchestrator.is_active() {
                break 'frames;
            }
            frame_number += 1;
            let dt = frame.dt.unwrap_or(script.dt);

            if let Some([x, y]) = frame.axis {
                orchestrator.route_axis_input(Vec2::new(x, y), dt);
            }
            for action in &frame.press {
                orchestrator.route_action_input(action, true);
                orchestrator.route_action_input(action, false);
            }
            for action in &frame.hold {
                orchestrator.route_action_input(action, true);
            }
            for action in &frame.release {
                orchestrator.route_action_input(action, false);
            }
            if let Some([x, y, z]) = frame.point {
                orchestrator.route_positional_input(Vec3::new(x, y, z), Vec3::Z);
            }
            if let Some(reason) = &frame.cancel {
                orchestrator.cancel(CancelReason::Requested(reason.clone()));
            }

            orchestrator.tick(dt);
            emit(&mut orchestrator, frame_number, json)?;
        }
    }

    if orchestrator.is_active() {
        tracing::warn!(frames = frame_number, "Script ended with the mini-game still running");
        orchestrator.shutdown();
        emit(&mut orchestrator, frame_number, json)?;
    }

    if let Some(outcome) = orchestrator.last_outcome() {
        if json {
            let line = serde_json::to_string(outcome).map_err(|e| MiniGameError::ParseError(e.to_string()))?;
            println!("{}", line);
        } else {
            print_outcome(outcome);
        }
    }
    Ok(())
}

fn emit(orchestrator: &mut MiniGameOrchestrator, frame: u64, json: bool) -> Result<()> {
    for event in orchestrator.drain_events() {
        if json {
            let line = serde_json::to_string(&EventLine { frame, event: &event })
                .map_err(|e| MiniGameError::ParseError(e.to_string()))?;
            println!("{}", line);
        } else {
            println!("[{:>5}] {}", frame, describe(&event));
        }
    }
    Ok(())
}

fn describe(event: &MiniGameEvent) -> String {
    match event {
        MiniGameEvent::Started { id, handler_class, .. } => format!("started {} ({})", id, handler_class),
        MiniGameEvent::Ended { outcome } => format!(
            "ended {} success={} bonus={}",
            outcome.id, outcome.success, outcome.bonus
        ),
        MiniGameEvent::Cancelled { id, reason } => format!("cancelled {}: {}", id, reason),
        MiniGameEvent::ObjectiveProgress { objective, value, .. } => {
            format!("objective {} = {:.3}", objective, value)
        }
        MiniGameEvent::ObjectiveMet { objective, timestamp, .. } => {
            format!("objective {} met at {:.2}s", objective, timestamp)
        }
        MiniGameEvent::ObjectivesComplete { bonus, .. } => format!("objectives complete (bonus={})", bonus),
        MiniGameEvent::Mechanic { event, .. } => format!("{:?}", event),
    }
}

fn print_outcome(outcome: &MiniGameOutcome) {
    println!();
    println!("=== {} ===", outcome.id);
    println!("Success:    {}", outcome.success);
    println!("Bonus:      {}", outcome.bonus);
    println!("Cancelled:  {}", outcome.cancelled);
    println!("Progress:   {:.0}%", outcome.progress * 100.0);
    println!("Elapsed:    {:.2}s", outcome.elapsed);
    if let Some(reason) = &outcome.failure_reason {
        println!("Reason:     {}", reason);
    }
}
