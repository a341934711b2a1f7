#![warn(missing_docs)]
//! # qr-token binary
//!
//! Terminal entry point: shows a refreshing QR code, or validates a token.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use qr_token_app::config::{AppConfig, Cli, Command, ValidateArgs, ValidateTarget, non_blank};
use qr_token_app::input::InputCommand;
use qr_token_app::location::{IpGeolocationProvider, LOOKUP_TIMEOUT, LocationProvider};
use qr_token_app::session::{SessionEvent, TokenSession, spawn_request};
use qr_token_app::{
    AppError, DEFAULT_LOG_FILTER, app_version, auto_refresh_enabled_from_env, now_unix_ms,
    redact_sensitive,
};
use qr_token_client::{HttpTokenTransport, TokenClient, ValidationClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// CLI entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Some(Command::Validate(args)) => run_validate(&cli, args).await,
        None => match AppConfig::from_cli(&cli) {
            Ok(config) => run_display(config).await,
            Err(error) => Err(error),
        },
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let message = redact_sensitive(&error.to_string());
            tracing::error!(error = %message, "qr-token stopped");
            eprintln!("qr-token: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run_validate(cli: &Cli, args: &ValidateArgs) -> Result<(), AppError> {
    let api_key = non_blank(cli.api_key.clone());
    let target = ValidateTarget::from_cli(cli, args)?;
    let client = ValidationClient::new(
        &target.base_url,
        &target.stage,
        &target.resource,
        api_key.clone(),
        std::time::Duration::from_secs(cli.request_timeout_secs.max(1)),
    )?;
    tracing::info!(
        endpoint = %client.endpoint(),
        api_key_configured = api_key.is_some(),
        "validating token"
    );

    let verdict = client.validate(&args.token).await?;
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

async fn run_display(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        version = app_version(),
        api_key_configured = config.api_key.is_some(),
        geolocation = config.geolocation_url.is_some(),
        "starting qr-token"
    );

    let transport = HttpTokenTransport::new(config.request_timeout)?;
    let client = TokenClient::new(&config.base_url, config.api_key.clone(), Arc::new(transport))?;

    let (countdown_tx, mut countdown_rx) = mpsc::unbounded_channel();
    let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();
    let (location_tx, mut location_rx) = mpsc::unbounded_channel();

    let mut session = TokenSession::new(config.form.clone(), countdown_tx);
    session.set_auto_refresh(auto_refresh_enabled_from_env());

    if session.form().coordinates().is_none()
        && let Some(provider) = config
            .geolocation_url
            .clone()
            .and_then(|url| IpGeolocationProvider::new(url, LOOKUP_TIMEOUT))
    {
        tokio::spawn(async move {
            let _ = location_tx.send(provider.current_position().await);
        });
    } else {
        drop(location_tx);
    }

    if !session.form().identifier_is_blank()
        && let Some(submission) = session.submit()
    {
        spawn_request(client.clone(), submission, settled_tx.clone());
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    draw(&session)?;

    loop {
        let event = tokio::select! {
            Some(settled) = settled_rx.recv() => SessionEvent::Settled(settled),
            Some(event) = countdown_rx.recv() => SessionEvent::Countdown(event),
            Some(position) = location_rx.recv() => SessionEvent::Location(position),
            line = stdin.next_line(), if stdin_open => match line? {
                Some(line) => SessionEvent::Command(InputCommand::parse(&line)),
                None => {
                    stdin_open = false;
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        let reaction = session.handle(event, now_unix_ms());
        if let Some(submission) = reaction.submission {
            spawn_request(client.clone(), submission, settled_tx.clone());
        }
        if reaction.quit {
            break;
        }
        if reaction.token_displayed {
            export_svg(&session, &config).await;
        }
        if reaction.redraw {
            draw(&session)?;
        }
    }

    tracing::info!("qr-token exiting");
    println!();
    Ok(())
}

async fn export_svg(session: &TokenSession, config: &AppConfig) {
    let (Some(path), Some(display)) = (&config.svg_out, session.display()) else {
        return;
    };
    if let Err(error) = tokio::fs::write(path, display.qr().to_svg()).await {
        tracing::warn!(path = %path.display(), %error, "failed to write svg");
    }
}

fn draw(session: &TokenSession) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{CLEAR_SCREEN}{}", session.render(app_version()))?;
    stdout.flush()?;
    Ok(())
}
