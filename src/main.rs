use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use voice_relay::{
    create_router, AppState, CommandRouter, Config, ControlListener, FfmpegTranscoder, NatsClient,
    NatsDirectory, NatsVoiceTransport, StreamError, StreamSupervisor, SupervisorDeps,
};

#[derive(Debug, Parser)]
#[command(name = "voice-relay", version, about = "Keeps a media stream playing into a voice channel")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/voice-relay")]
    config: String,

    /// Do not serve the read-only HTTP API
    #[arg(long)]
    no_http: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;

    info!("Voice Relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let client = match NatsClient::connect(&cfg.nats.url, cfg.nats.token.as_deref()).await {
        Ok(client) => client,
        Err(StreamError::AuthenticationFailure(reason)) => {
            error!("NATS rejected our credentials: {}", reason);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let deps = SupervisorDeps {
        directory: Arc::new(NatsDirectory::new(client.clone(), cfg.nats.voice_prefix.clone())),
        transport: Arc::new(NatsVoiceTransport::new(
            client.clone(),
            cfg.nats.voice_prefix.clone(),
        )),
        transcoder: Arc::new(FfmpegTranscoder::new(cfg.transcoder_settings())),
    };

    let supervisor = StreamSupervisor::new(
        cfg.supervisor_settings(),
        deps,
        cfg.media_source(),
        cfg.target_channel(),
    );
    let (handle, supervisor_task) = supervisor.spawn();

    let router = CommandRouter::new(handle.clone(), cfg.control.operator_id.clone());
    let listener = ControlListener::new(client.clone(), cfg.control.subject.clone(), router);
    let control_task = tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            error!("Control listener failed: {}", e);
        }
    });

    let http_task = if args.no_http {
        None
    } else {
        let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
        let app = create_router(AppState::new(handle.clone()));
        let tcp = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind HTTP API on {}", addr))?;
        info!("HTTP API listening on {}", addr);
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(tcp, app).await {
                error!("HTTP server failed: {}", e);
            }
        }))
    };

    if cfg.stream.autostart {
        if let Err(e) = handle.start().await {
            warn!("Autostart failed: {}", e);
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    control_task.abort();
    if let Some(task) = http_task {
        task.abort();
    }

    handle.stop().await?;
    handle.shutdown().await?;
    if let Err(e) = supervisor_task.await {
        warn!("Supervisor task ended abnormally: {}", e);
    }

    info!("Stopped");
    Ok(())
}
