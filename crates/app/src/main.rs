use std::path::PathBuf;

use avatar_motion_core::{
    AppConfig, AvatarController, ChatOutcome, ChatReply, FrameComposer, HeadlessRenderer,
    MemoryRig,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Rough speaking time per word at rate 1.0, used to end simulated speech.
const SECONDS_PER_WORD: f64 = 0.4;

fn main() -> avatar_motion_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            seconds,
            fps,
            actions,
            says,
        } => run_simulate(config, seconds, fps, actions, says),
        Commands::Reply { raw } => run_reply(&config, &raw),
    }
}

fn run_simulate(
    config: AppConfig,
    seconds: f64,
    fps: u32,
    actions: Vec<Timed>,
    says: Vec<Timed>,
) -> avatar_motion_core::Result<()> {
    tracing::info!(seconds, fps, "starting headless simulation");

    let mut controller = AvatarController::new(config);
    controller.attach_rig(MemoryRig::humanoid())?;
    let mut composer = FrameComposer::new(HeadlessRenderer::new());

    let mut events: Vec<Event> = actions
        .into_iter()
        .map(|timed| Event::new(timed.at, EventKind::Action(timed.value)))
        .chain(
            says.into_iter()
                .map(|timed| Event::new(timed.at, EventKind::Say(timed.value))),
        )
        .collect();

    let delta = 1.0 / f64::from(fps.max(1));
    let frames = (seconds / delta).ceil() as u64;

    for _ in 0..frames {
        let now = controller.now();
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        let due = events.iter().take_while(|event| event.at <= now).count();
        let fired: Vec<Event> = events.drain(..due).collect();
        for event in fired {
            if let Some(follow_up) = fire(&mut controller, event)? {
                events.push(follow_up);
            }
        }
        composer.tick(&mut controller, delta)?;
    }

    let renderer = composer.renderer();
    tracing::info!(
        frames = renderer.frames(),
        state = ?controller.state(),
        emotion = %controller.emotion(),
        last = ?renderer.last(),
        "simulation finished"
    );

    if let Some(rig) = controller.rig() {
        println!("{}", serde_json::to_string_pretty(rig)?);
    }
    Ok(())
}

fn fire(
    controller: &mut AvatarController<MemoryRig>,
    event: Event,
) -> avatar_motion_core::Result<Option<Event>> {
    match event.kind {
        EventKind::Action(label) => {
            controller.handle_action(&label)?;
            Ok(None)
        }
        EventKind::Say(raw) => {
            let ticket = controller.begin_chat();
            match controller.complete_chat(ticket, ChatReply::from_model_output(&raw)) {
                ChatOutcome::Applied { utterance, .. } => {
                    controller.talking_started();
                    let words = utterance.text.split_whitespace().count().max(1) as f64;
                    let length = words * SECONDS_PER_WORD / f64::from(utterance.rate);
                    tracing::info!(text = %utterance.text, length, "speaking");
                    Ok(Some(Event::new(event.at + length, EventKind::SpeechEnded)))
                }
                ChatOutcome::Stale | ChatOutcome::NoRig => Ok(None),
                ChatOutcome::Failed { status } => {
                    tracing::warn!(%status, "chat reply not applied");
                    Ok(None)
                }
            }
        }
        EventKind::SpeechEnded => {
            controller.talking_ended();
            Ok(None)
        }
    }
}

fn run_reply(config: &AppConfig, raw: &str) -> avatar_motion_core::Result<()> {
    let reply = ChatReply::from_model_output(raw)?;
    tracing::info!(emotion = %reply.emotion, "parsed chat reply");
    println!("{}", serde_json::to_string_pretty(&reply.utterance(&config.speech))?);
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug)]
struct Event {
    at: f64,
    kind: EventKind,
}

impl Event {
    fn new(at: f64, kind: EventKind) -> Self {
        Self { at, kind }
    }
}

#[derive(Debug)]
enum EventKind {
    Action(String),
    Say(String),
    SpeechEnded,
}

/// `<seconds>:<value>` argument.
#[derive(Debug, Clone)]
struct Timed {
    at: f64,
    value: String,
}

fn parse_timed(arg: &str) -> Result<Timed, String> {
    let (at, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected <seconds>:<value>, got `{arg}`"))?;
    let at: f64 = at
        .trim()
        .parse()
        .map_err(|e| format!("invalid time `{at}`: {e}"))?;
    if !at.is_finite() || at < 0.0 {
        return Err(format!("time must be a non-negative number, got `{at}`"));
    }
    Ok(Timed {
        at,
        value: value.to_string(),
    })
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Procedural avatar animation runtime", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the animation headlessly against an in-memory rig and print the
    /// final pose as JSON.
    Simulate {
        /// Simulated duration in seconds.
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f64,
        /// Frames per second of the simulated display.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// UI action at a given time, e.g. `1.5:jump` or `0:happy`.
        #[arg(short, long = "action", value_parser = parse_timed)]
        actions: Vec<Timed>,
        /// Raw model output delivered at a given time, e.g.
        /// `2:{"text":"hello","emotion":"happy"}`.
        #[arg(long = "say", value_parser = parse_timed)]
        says: Vec<Timed>,
    },
    /// Parse raw model output into a chat reply and print the utterance.
    Reply {
        /// Model output containing a JSON object.
        raw: String,
    },
}
