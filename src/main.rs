// Terminal front end for the chat core
//
// Lines typed at the prompt are sent as chat messages; lines starting with a
// slash drive the canvas and the conversation list. Everything the core
// reports comes back through the event bus.

use anyhow::Context;
use chatcanvas::render::RenderResult;
use chatcanvas::version::full_version_info;
use chatcanvas::{
    AppBuilder, ChatApp, ChatConfig, EventKind, Message, Role, SendOutcome, Topic,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
Commands:
  /retry          resend the last failed message
  /new            start a new conversation
  /history        list saved conversations
  /load <id>      open a saved conversation
  /list           list artifacts of this conversation
  /open <n|id>    show an artifact in the canvas
  /back           return from an artifact to the list
  /canvas         toggle the canvas
  /cycle          cycle the canvas size
  /close          close the canvas
  /quit           exit
Anything else is sent to the assistant.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ChatConfig::load().context("Failed to read configuration")?;
    tracing::info!("{} talking to {}", full_version_info(), config.api_url);

    let app = AppBuilder::new()
        .with_config(config)
        .with_production_deps()
        .context("Failed to set up the HTTP transport")?
        .build()
        .context("Failed to assemble the chat core")?;

    let _canvas_events = app.bus.subscribe(Topic::CanvasStateChanged, |event| {
        if let EventKind::CanvasStateChanged { is_open } = &event.kind {
            println!("[canvas {}]", if *is_open { "opened" } else { "closed" });
        }
    });
    let _message_events = app.bus.subscribe(Topic::MessageReceived, |event| {
        if let EventKind::MessageReceived { message } = &event.kind {
            print_message(message);
        }
    });

    match app.pipeline.restore_session().await {
        Ok(Some(id)) => println!("Resumed conversation {}", id),
        Ok(None) => {}
        Err(e) => tracing::warn!("Could not resume the last conversation: {}", e),
    }
    println!("{}\n{}", full_version_info(), HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if line.starts_with('/') {
            run_command(&app, line).await;
        } else {
            report(&app, app.pipeline.send(line).await);
        }
    }

    app.shutdown();
    Ok(())
}

async fn run_command(app: &ChatApp, line: &str) {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match command {
        "/retry" => report(app, app.pipeline.retry().await),
        "/new" => {
            app.new_conversation();
            println!("Started a new conversation");
        }
        "/history" => match app.pipeline.list_conversations().await {
            Ok(conversations) if conversations.is_empty() => println!("No saved conversations"),
            Ok(conversations) => {
                for conversation in conversations {
                    println!(
                        "  {:>6}  {}",
                        conversation.id,
                        conversation.title.as_deref().unwrap_or("(untitled)")
                    );
                }
            }
            Err(e) => println!("Failed to list conversations: {}", e),
        },
        "/load" => match arg.parse::<i64>() {
            Ok(id) => match app.pipeline.load_conversation(id).await {
                Ok(()) => {
                    for message in app.pipeline.messages() {
                        print_message(&message);
                    }
                }
                Err(e) => println!("Failed to load conversation {}: {}", id, e),
            },
            Err(_) => println!("Usage: /load <conversation id>"),
        },
        "/list" => {
            let artifacts = app.store.list();
            if artifacts.is_empty() {
                println!("No artifacts yet");
            }
            for (idx, artifact) in artifacts.iter().enumerate() {
                println!(
                    "  {}. [{}] {} ({})",
                    idx + 1,
                    artifact.artifact_type,
                    artifact.title,
                    artifact.id
                );
            }
        }
        "/open" => {
            // Accept a 1-based list position as well as an id
            let id = match arg.parse::<usize>() {
                Ok(n) if n >= 1 => app.store.list().get(n - 1).map(|a| a.id.clone()),
                _ => Some(arg.to_string()),
            };
            match id.and_then(|id| app.canvas.open_artifact(&id)) {
                Some(_) => show_active(app),
                None => println!("No artifact {}", arg),
            }
        }
        "/back" => {
            app.canvas.close_artifact();
            println!("Canvas {}", app.canvas.mode());
        }
        "/canvas" => {
            app.toggle_canvas();
            println!("Canvas {}", app.canvas.mode());
        }
        "/cycle" => {
            app.canvas.cycle();
            println!("Canvas {}", app.canvas.mode());
        }
        "/close" => app.canvas.close(),
        _ => println!("{}", HELP),
    }
}

fn report(app: &ChatApp, outcome: SendOutcome) {
    match outcome {
        SendOutcome::Failed(_) => {
            if let Some(banner) = app.pipeline.banner() {
                println!("! {} (type /retry)", banner.text);
            }
        }
        SendOutcome::Ignored => tracing::debug!("Nothing sent"),
        SendOutcome::Discarded => tracing::debug!("Reply discarded"),
        SendOutcome::Delivered => {}
    }
}

fn print_message(message: &Message) {
    let who = match message.role() {
        Role::User => "you",
        Role::Agent => "assistant",
        Role::System => "system",
    };
    println!("{}> {}", who, message.content());
    if !message.artifact_refs().is_empty() {
        println!("  artifacts: {}", message.artifact_refs().join(", "));
    }
}

fn show_active(app: &ChatApp) {
    let Some(artifact) = app.canvas.active_artifact() else {
        return;
    };
    println!("== {} ==", artifact.title);
    if let Some(description) = &artifact.description {
        println!("{}", description);
    }
    match app.dispatcher.render(&artifact) {
        RenderResult::Chart(chart) => println!("{}", chart.visual),
        RenderResult::Table(table) => println!("{}", table.to_text()),
        RenderResult::Placeholder(placeholder) => println!("({})", placeholder.message),
    }
}
