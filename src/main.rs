use anyhow::{Context, Result};
use clap::Parser;
use loqa_live::session::{ResourceState, SessionEvent};
use loqa_live::transcript::Role;
use loqa_live::{
    create_router, spawn_session, AppState, Config, FileConfigSource, HeadlessDevices,
    LiveSession, NatsTransport, SessionHandle, ToolRegistry,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};

#[derive(Parser)]
#[command(name = "loqa-live")]
#[command(about = "Real-time conversation with a multimodal model backend")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/loqa-live")]
    config: String,

    /// Session ID (overrides session.id from the config file)
    #[arg(short, long)]
    session_id: Option<String>,

    /// Do not start the HTTP control API
    #[arg(long)]
    no_http: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();

    let cfg = Config::load(&args.config)?;

    info!("Loqa Live v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Backend: {} ({})", cfg.backend.endpoint, cfg.backend.model);
    info!("Assistant mode: {:?}", cfg.assistant.mode);

    let transport = Arc::new(NatsTransport::new(cfg.backend.subject_prefix.clone()));

    // Settings are re-read on every connect
    let mut session = LiveSession::new(
        Arc::new(FileConfigSource::new(args.config.clone())),
        transport,
        Arc::new(HeadlessDevices),
    )
    .with_tools(ToolRegistry::new());

    if let Some(id) = args.session_id.or(cfg.session.id.clone()) {
        session = session.with_session_id(id);
    }

    info!("Session ID: {}", session.session_id());

    let (handle, session_task) = spawn_session(session);

    if cfg.service.http.enabled && !args.no_http {
        let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

        info!("HTTP server listening on {}", addr);

        let app = create_router(AppState::new(handle.clone()));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("HTTP server failed: {}", e);
            }
        });
    }

    tokio::spawn(print_events(handle.clone(), handle.subscribe()));

    start(&handle).await;

    info!("Type a message and press Enter. Commands: /mic /camera /screen /clear /status /connect /disconnect /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" => break,
            command if command.starts_with('/') => {
                if let Err(e) = run_command(&handle, command).await {
                    warn!("{}", e);
                }
            }
            text => {
                if let Err(e) = handle.send_text(text).await {
                    warn!("Failed to send message: {}", e);
                }
            }
        }
    }

    info!("Shutting down...");
    handle.shutdown().await?;
    session_task.await?;

    Ok(())
}

/// Connect and prepare local audio. Failures are logged so the user can fix
/// the settings and retry with /connect.
async fn start(handle: &SessionHandle) {
    if let Err(e) = handle.connect().await {
        error!("Failed to connect: {}", e);
        return;
    }
    if let Err(e) = handle.initialize().await {
        error!("Failed to initialize audio: {}", e);
    }
}

async fn run_command(handle: &SessionHandle, command: &str) -> Result<()> {
    match command {
        "/connect" => start(handle).await,
        "/disconnect" => handle.disconnect().await?,
        "/mic" => {
            let state = handle.toggle_mic().await?;
            info!("Microphone {:?}", state);
        }
        "/camera" => {
            if handle.status().await?.camera == ResourceState::Active {
                handle.stop_camera_capture().await?;
            } else {
                handle.start_camera_capture().await?;
            }
        }
        "/screen" => {
            if handle.status().await?.screen == ResourceState::Active {
                handle.stop_screen_share().await?;
            } else {
                handle.start_screen_share().await?;
            }
        }
        "/clear" => {
            handle.clear_transcript().await?;
            info!("Transcript cleared");
        }
        "/status" => {
            let status = handle.status().await?;
            info!("{}", serde_json::to_string_pretty(&status)?);
        }
        other => warn!("Unknown command: {}", other),
    }

    Ok(())
}

/// Print each finished agent turn
async fn print_events(handle: SessionHandle, mut events: broadcast::Receiver<SessionEvent>) {
    let mut printed = 0;

    loop {
        match events.recv().await {
            Ok(SessionEvent::TurnComplete) | Ok(SessionEvent::Interrupted) => {
                let Ok(snapshot) = handle.transcript().await else {
                    break;
                };
                // History shrinks when cleared
                printed = printed.min(snapshot.history.len());

                for entry in &snapshot.history[printed..] {
                    if entry.role == Role::Agent {
                        println!("\n{}\n", entry.text);
                    }
                }
                printed = snapshot.history.len();
            }
            Ok(SessionEvent::ScreenshareStopped) => info!("Screen sharing stopped"),
            Ok(SessionEvent::Disconnected) => info!("Disconnected"),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
