//! Carelink binary - composition root.
//!
//! Ties the crates together into a terminal client:
//! 1. Parse CLI arguments and initialize tracing
//! 2. Load configuration from TOML
//! 3. Build the HTTP chat client, transcription service, and microphone
//! 4. Begin a session (greeting + background follow-up polling)
//! 5. Run a line-oriented loop: plain text sends a message, `/record` and
//!    `/stop` drive voice capture, `/send` submits the staged transcription

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncBufReadExt;

use carelink_audio::{MicConfig, SystemMicrophone};
use carelink_chat::HttpAssistantClient;
use carelink_core::config::CareConfig;
use carelink_core::types::Sender;
use carelink_session::{SessionController, SessionSnapshot};
use carelink_transcribe::HttpTranscriptionService;
use carelink_voice::VoiceCapture;

mod cli;
use cli::CliArgs;

type Controller =
    SessionController<HttpAssistantClient, SystemMicrophone, HttpTranscriptionService>;

/// Print any messages appended since the last render.
fn render_new_messages(snapshot: &SessionSnapshot, printed: &mut usize) {
    for message in snapshot.messages.iter().skip(*printed) {
        let who = match message.sender {
            Sender::User => "You",
            Sender::Agent => "Agent",
        };
        println!("{}: {}", who, message.text);
    }
    *printed = snapshot.messages.len();
}

async fn run(controller: Controller) -> Result<(), Box<dyn std::error::Error>> {
    let mut printed = 0usize;
    render_new_messages(&controller.snapshot(), &mut printed);

    println!("Commands: /record, /stop, /send, /quit. Anything else is sent as a message.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => {}
            "/quit" => break,
            "/record" => match controller.start_recording().await {
                Ok(()) => println!("Recording... use /stop to finish."),
                Err(e) => println!("! {}", e),
            },
            "/stop" => match controller.stop_recording().await {
                Ok(()) => {
                    let staged = controller.snapshot().pending_input;
                    println!("Heard: \"{}\". Use /send to submit it.", staged);
                }
                Err(e) => println!("! {}", e),
            },
            "/send" => {
                let staged = controller.snapshot().pending_input;
                if staged.is_empty() {
                    println!("Nothing staged to send.");
                } else if let Err(e) = controller.send_message(&staged).await {
                    println!("! {}", e);
                }
            }
            text => {
                if let Err(e) = controller.send_message(text).await {
                    println!("! {}", e);
                }
            }
        }

        render_new_messages(&controller.snapshot(), &mut printed);
    }

    controller.end().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config before tracing so the file's log level can apply; anything the
    // loader would log is dropped, which only loses one info line.
    let config_file = args.resolve_config_path();
    let config = CareConfig::load_or_default(&config_file);

    // Log level priority: --log-level flag > RUST_LOG env > config file.
    let filter = match args.log_level.as_deref() {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Carelink v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    let base_url = args.resolve_server(&config.server.base_url);
    let timeout = Duration::from_secs(config.server.request_timeout_secs);

    let client = Arc::new(HttpAssistantClient::new(base_url.clone(), timeout)?);
    let transcriber = HttpTranscriptionService::new(base_url.clone(), timeout)?;
    let microphone = SystemMicrophone::new(MicConfig {
        device_name: config.voice.device_name.clone(),
        sample_rate: config.voice.sample_rate,
        max_buffer_secs: config.voice.max_recording_secs,
    });
    let voice = VoiceCapture::new(microphone, transcriber);

    tracing::info!(server = %base_url, user_id = %args.user, "Opening session");
    let controller = SessionController::begin(
        client,
        voice,
        args.user.clone(),
        Duration::from_secs(config.polling.interval_secs),
    )
    .await?;

    run(controller).await
}
