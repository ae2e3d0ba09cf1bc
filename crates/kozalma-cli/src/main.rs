//! KozAlma CLI - drive the scan-and-describe assistant from a terminal.
//!
//! Spoken feedback is printed with its locale tag, the camera is an image
//! file and backend audio can be saved to disk.

mod console;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kozalma_core::auth::validate_code;
use kozalma_core::gesture::EdgeZone;
use kozalma_core::messages::code_sent;
use kozalma_core::{
    ApiClient, Assistant, AuthAttempt, AuthError, AuthSessionManager, Channel, Config,
    CredentialStore, EdgeZoneVolumeController, Language, Phrase, SettingsStore, SpeechEngine,
};

use console::{ConsoleSpeech, FileCamera, FilePlayer, NoFlashlight};

// ============================================================================
// Constants
// ============================================================================

/// Directory for a daily rolling log file, in addition to stderr
const LOG_DIR_ENV: &str = "KOZALMA_LOG_DIR";

const LOG_FILE_PREFIX: &str = "kozalma.log";

const ASSIST_HELP: &str = "\
Commands:
  t / tt   tap / double tap the scan button
  l / ll   tap / double tap the left edge (volume down)
  r / rr   tap / double tap the right edge (volume up)
  f        toggle flashlight
  k        switch language
  q        quit";

#[derive(Parser)]
#[command(name = "kozalma", version, about = "Scan-and-describe assistant")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "KOZALMA_API_URL")]
    api_url: Option<String>,

    /// Interface language: ru or kz
    #[arg(long, value_parser = parse_language)]
    lang: Option<Language>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with a one-time code
    Login {
        #[arg(long, conflicts_with = "phone", required_unless_present = "phone")]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show the logged-in profile
    Me,
    /// Forget the stored tokens
    Logout,
    /// Describe one image
    Scan {
        image: PathBuf,
        /// Save the spoken description (MP3) here instead of printing it
        #[arg(long)]
        save_audio: Option<PathBuf>,
    },
    /// Interactive session with the tap gestures
    Assist {
        image: PathBuf,
        #[arg(long)]
        save_audio: Option<PathBuf>,
    },
    /// Check that the backend is up
    Health,
}

fn parse_language(raw: &str) -> Result<Language, String> {
    Language::from_code(raw).ok_or_else(|| format!("unsupported language '{}'", raw))
}

/// Initialize the tracing subscriber for logging.
/// The returned guard must be held until exit so the log file is flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Everything the subcommands share
struct App {
    config: Config,
    settings: SettingsStore,
    speech: Arc<dyn SpeechEngine>,
    api: ApiClient,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load().context("Failed to load config")?;
        if let Some(ref url) = cli.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(language) = cli.lang {
            config.language = language;
        }

        let auth = AuthSessionManager::new(&config.api_base_url, CredentialStore::keychain())
            .context("Failed to create HTTP client")?;
        let settings = SettingsStore::new(config.settings());

        Ok(Self {
            config,
            settings,
            speech: Arc::new(ConsoleSpeech),
            api: ApiClient::new(auth),
        })
    }

    fn auth(&self) -> &AuthSessionManager {
        self.api.auth()
    }

    fn say(&self, phrase: Phrase) {
        self.speech.say(phrase, self.settings.language());
    }

    fn assistant(&self, image: PathBuf, save_audio: Option<PathBuf>) -> Assistant {
        Assistant::new(
            self.api.clone(),
            self.settings.clone(),
            Arc::clone(&self.speech),
            Arc::new(FileCamera::new(image)),
            Arc::new(FilePlayer::new(save_audio)),
        )
        .with_flashlight(Arc::new(NoFlashlight))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();
    info!("KozAlma CLI starting");

    let app = App::new(&cli)?;
    match cli.command {
        Command::Login { email, phone } => {
            let (channel, identifier) = match (email, phone) {
                (Some(email), _) => (Channel::Email, email),
                (None, Some(phone)) => (Channel::Phone, phone),
                (None, None) => bail!("Either --email or --phone is required"),
            };
            login(&app, channel, &identifier).await
        }
        Command::Me => me(&app).await,
        Command::Logout => {
            app.auth().logout();
            app.say(Phrase::LoggedOut);
            Ok(())
        }
        Command::Scan { image, save_audio } => scan(&app, image, save_audio).await,
        Command::Assist { image, save_audio } => assist(app, image, save_audio).await,
        Command::Health => {
            if app.api.health().await {
                println!("{} is up", app.config.api_base_url);
                Ok(())
            } else {
                app.say(Phrase::ServiceUnavailable);
                bail!("{} is not healthy", app.config.api_base_url)
            }
        }
    }
}

/// Read one line from stdin without blocking the runtime. `None` on EOF.
async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|n| (n > 0).then_some(line))
    })
    .await??;
    Ok(line.map(|l| l.trim().to_string()))
}

async fn prompt(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    read_line().await
}

async fn login(app: &App, channel: Channel, identifier: &str) -> Result<()> {
    let mut attempt = match AuthAttempt::new(channel, identifier) {
        Ok(attempt) => attempt,
        Err(e) => {
            app.say(e.phrase());
            bail!(e);
        }
    };

    'request: loop {
        let cooldown = match app
            .auth()
            .request_code(attempt.channel(), attempt.identifier())
            .await
        {
            Ok(cooldown) => cooldown,
            Err(e) => {
                app.say(e.phrase());
                return Err(e).context("Failed to request code");
            }
        };
        attempt.start_cooldown(cooldown);
        app.speech
            .speak(&code_sent(app.settings.language(), cooldown), app.settings.language(), true);

        let announcer = attempt.cooldown_updates().map(|mut updates| {
            let speech = Arc::clone(&app.speech);
            let language = app.settings.language();
            tokio::spawn(async move {
                if updates.wait_for(|remaining| *remaining == 0).await.is_ok() {
                    speech.say(Phrase::ResendAvailable, language);
                }
            })
        });

        loop {
            let Some(input) = prompt("Code (r to resend): ").await? else {
                bail!("Login cancelled");
            };

            if input.eq_ignore_ascii_case("r") {
                if attempt.can_resend() {
                    if let Some(task) = announcer.as_ref() {
                        task.abort();
                    }
                    continue 'request;
                }
                println!(
                    "Resend available in {} s",
                    attempt.cooldown_remaining_seconds()
                );
                continue;
            }

            if let Err(e) = validate_code(&input) {
                app.say(e.phrase());
                continue;
            }

            match app
                .auth()
                .verify_code(attempt.channel(), attempt.identifier(), &input)
                .await
            {
                Ok(()) => {
                    if let Some(task) = announcer.as_ref() {
                        task.abort();
                    }
                    app.say(Phrase::LoggedIn);
                    return Ok(());
                }
                Err(AuthError::InvalidOrExpiredCode) => {
                    app.say(Phrase::InvalidCode);
                }
                Err(e) => {
                    app.say(e.phrase());
                    return Err(e).context("Failed to verify code");
                }
            }
        }
    }
}

async fn me(app: &App) -> Result<()> {
    match app.auth().restore_session().await {
        Some(profile) => {
            println!("id:         {}", profile.id);
            println!("channel:    {}", profile.channel);
            println!("identifier: {}", profile.identifier);
            if profile.is_admin() {
                println!("role:       admin");
            }
            Ok(())
        }
        None => {
            app.say(Phrase::SessionExpired);
            bail!("Not logged in")
        }
    }
}

async fn scan(app: &App, image: PathBuf, save_audio: Option<PathBuf>) -> Result<()> {
    let assistant = app.assistant(image, save_audio);
    let Some(result) = assistant.scan_once().await else {
        bail!("Scan failed");
    };

    for detection in &result.detections {
        match detection.distance_m {
            Some(distance) => println!(
                "  {:<20} {:>5.1}%  {:?}  {:.1} m",
                detection.display_name(),
                detection.confidence * 100.0,
                detection.position,
                distance
            ),
            None => println!(
                "  {:<20} {:>5.1}%  {:?}",
                detection.display_name(),
                detection.confidence * 100.0,
                detection.position
            ),
        }
    }
    Ok(())
}

async fn assist(app: App, image: PathBuf, save_audio: Option<PathBuf>) -> Result<()> {
    let assistant = Arc::new(app.assistant(image, save_audio));
    let window = app.config.double_tap_window();

    let (tap_tx, tap_rx) = mpsc::unbounded_channel();
    let scan_button = assistant.scan_button(tap_tx, window);
    let volume =
        EdgeZoneVolumeController::new(Arc::clone(&app.speech), app.settings.clone()).with_window(window);

    let control = {
        let assistant = Arc::clone(&assistant);
        tokio::spawn(async move { assistant.run_control(tap_rx).await })
    };

    println!("{}", ASSIST_HELP);
    while let Some(line) = read_line().await? {
        match line.as_str() {
            "t" => scan_button.tap(),
            "tt" => {
                scan_button.tap();
                scan_button.tap();
            }
            "l" => {
                volume.tap(EdgeZone::Left);
            }
            "ll" => {
                volume.tap(EdgeZone::Left);
                volume.tap(EdgeZone::Left);
            }
            "r" => {
                volume.tap(EdgeZone::Right);
            }
            "rr" => {
                volume.tap(EdgeZone::Right);
                volume.tap(EdgeZone::Right);
            }
            "f" => {
                assistant.toggle_flashlight().await;
            }
            "k" => app.settings.update(|s| {
                s.language = match s.language {
                    Language::Ru => Language::Kz,
                    Language::Kz => Language::Ru,
                }
            }),
            "q" | "quit" => break,
            "" => {}
            other => println!("Unknown command '{}'\n{}", other, ASSIST_HELP),
        }
    }

    scan_button.teardown();
    assistant.shutdown();
    drop(scan_button);
    let _ = control.await;

    let mut config = app.config;
    config.apply_settings(&app.settings.get());
    config.save().context("Failed to save config")?;
    info!("Assist session ended");
    Ok(())
}
