use anyhow::{bail, Context, Result};
use crossbeam_channel::Receiver;
use persona_roulette::{
    Direction, FileDirectory, LoopbackEngine, MessageId, Persona, PersonaCatalog,
    PersonaDirectory, PersonaDraft, RouletteConfig, SessionEvent, SessionId,
    SessionOrchestrator, TransitionOutcome,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Orchestrator = SessionOrchestrator<LoopbackEngine>;

const HELP: &str = "\
Commands:
  /next            switch to the next persona
  /prev            switch to the previous persona
  /jump N          switch to persona N (1-based)
  /mic             toggle the microphone
  /reconnect       reconnect the current persona
  /list            list personas
  /create NAME     add a persona to the directory (used on next start)
  /help            show this help
  /quit            exit
Anything else is sent to the current persona.";

struct Args {
    config: Option<PathBuf>,
    personas: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        personas: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config = Some(iter.next().context("--config needs a path")?.into());
            }
            "--personas" => {
                args.personas = Some(iter.next().context("--personas needs a path")?.into());
            }
            "-h" | "--help" => {
                println!("Usage: persona-roulette [--config PATH] [--personas PATH]");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(args)
}

fn default_personas_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("persona-roulette")
        .join("personas.toml")
}

fn demo_personas() -> Vec<Persona> {
    vec![
        Persona::new("demo-ada", "Ada").with_description("Curious engineer who asks too many questions"),
        Persona::new("demo-bo", "Bo").with_description("Laid-back surfer with strong opinions on tides"),
        Persona::new("demo-cy", "Cy").with_description("Retired sea captain, tells long stories"),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persona_roulette=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args()?;

    let config = match args.config.or_else(RouletteConfig::default_path) {
        Some(path) => RouletteConfig::load_or_default(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RouletteConfig::default(),
    };

    let directory = FileDirectory::new(args.personas.unwrap_or_else(default_personas_path));
    let mut personas = directory.list_personas().await?;
    if personas.is_empty() {
        info!(
            "No personas in {}, using the built-in demo cast",
            directory.path().display()
        );
        personas = demo_personas();
    }
    let catalog = PersonaCatalog::new(personas)?;

    info!("Starting persona roulette with {} personas", catalog.len());

    let engine = Arc::new(LoopbackEngine::new());
    let (orchestrator, events) = SessionOrchestrator::new(engine, catalog, config)?;

    println!("{}", HELP);
    if let Err(e) = orchestrator.start().await {
        println!("! {}", e.user_message());
    }

    let mut view = TranscriptView::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        drain_events(&events);
        view.render(&orchestrator);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&orchestrator, &directory, line.trim()).await {
                    break;
                }
            }
            changed = orchestrator.next_inbound() => {
                if changed {
                    for outcome in orchestrator.process_inbound().await {
                        if let Err(e) = outcome {
                            warn!("Tool call navigation failed: {}", e);
                        }
                    }
                }
            }
        }
    }

    orchestrator.shutdown().await;
    drain_events(&events);
    info!("Goodbye");
    Ok(())
}

/// Handle one input line; returns false to quit
async fn handle_line(orchestrator: &Orchestrator, directory: &FileDirectory, line: &str) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

    let result = match command {
        "/quit" | "/exit" => return false,
        "/help" => {
            println!("{}", HELP);
            Ok(())
        }
        "/list" => {
            let current = orchestrator.navigation_state().current_index;
            for (i, persona) in orchestrator.catalog().iter().enumerate() {
                let marker = if i == current { "*" } else { " " };
                println!("{} {}. {} - {}", marker, i + 1, persona.name, persona.description);
            }
            Ok(())
        }
        "/next" => orchestrator.advance(Direction::Next).await.map(report),
        "/prev" => orchestrator.advance(Direction::Previous).await.map(report),
        "/jump" => match rest.trim().parse::<usize>() {
            Ok(n) if n > 0 => orchestrator.jump_to(n - 1).await.map(report),
            _ => {
                println!("! usage: /jump N");
                Ok(())
            }
        },
        "/reconnect" => orchestrator.reconnect().await.map(report),
        "/mic" => orchestrator.toggle_microphone().await.map(|outcome| {
            println!("~ microphone {:?} ({})", outcome, orchestrator.microphone_phase());
        }),
        "/create" => {
            let draft = PersonaDraft {
                name: rest.trim().to_string(),
                ..Default::default()
            };
            directory.create_persona(draft).await.map(|persona| {
                println!("~ saved {} to {}", persona.name, directory.path().display());
            })
        }
        _ if command.starts_with('/') => {
            println!("! unknown command {}, try /help", command);
            Ok(())
        }
        _ => orchestrator.send_text(line).await,
    };

    if let Err(e) = result {
        println!("! {}", e.user_message());
    }
    true
}

fn report(outcome: TransitionOutcome) {
    if let TransitionOutcome::Rejected(reason) = outcome {
        println!("~ {}", reason);
    }
}

fn drain_events(events: &Receiver<SessionEvent>) {
    for event in events.try_iter() {
        match event {
            SessionEvent::TransitionStarted { from, to } => {
                println!("~ switching persona {} -> {}", from + 1, to + 1);
            }
            SessionEvent::TransitionFailed { error, .. } => {
                println!("! {} (use /reconnect)", error.user_message());
            }
            SessionEvent::Error(error) if error.is_user_visible() => {
                println!("! {}", error.user_message());
            }
            other => tracing::debug!("Event: {:?}", other),
        }
    }
}

/// Prints each rendered message once per session
#[derive(Default)]
struct TranscriptView {
    session: Option<SessionId>,
    printed: HashSet<MessageId>,
}

impl TranscriptView {
    fn render(&mut self, orchestrator: &Orchestrator) {
        let session = orchestrator.session_id();
        if session != self.session {
            self.printed.clear();
            if session.is_some() {
                let persona = orchestrator.current_persona();
                println!("== now talking to {} ==", persona.name);
            }
            self.session = session;
        }

        for message in orchestrator.rendered_messages() {
            if self.printed.insert(message.id.clone()) {
                let speaker = if message.is_agent {
                    orchestrator.current_persona().name.as_str()
                } else {
                    "you"
                };
                println!("{}: {}", speaker, message.text);
            }
        }
    }
}
