use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use kitchen_assistant::assistant::{AVAILABLE_ITEMS, GROCERY_LISTS};
use kitchen_assistant::voice::{
    AudioCapture, AudioPlayback, SAMPLE_RATE, SPEECH_THRESHOLD, UtteranceSegmenter, rms,
};
use kitchen_assistant::{
    ChannelRecognizer, CloudSynthesis, Collaborators, Config, ConsoleSynthesis, Dispatcher,
    DisplayState, HttpWeatherSource, MicrophoneRecognizer, OpenRouterClient, RecognitionEngine,
    RecognitionEvent, Record, SessionControl, SpeechOutput, SqliteDocumentStore, SynthesisEngine,
    VoiceSession,
};

/// Kitchen - hands-free voice assistant for the kitchen
#[derive(Parser)]
#[command(name = "kitchen", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for commands and answer out loud (default)
    Listen {
        /// Read utterances from stdin instead of the microphone
        #[arg(long)]
        text: bool,
        /// Print responses instead of speaking them
        #[arg(long)]
        mute: bool,
    },
    /// Manage the pantry used for recipe suggestions
    Pantry {
        #[command(subcommand)]
        action: PantryAction,
    },
    /// Show the grocery list
    Groceries {
        /// Empty the list afterwards
        #[arg(long)]
        clear: bool,
    },
    /// Show microphone levels and detected utterances
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Play a chime through the speaker
    TestSpeaker,
    /// Speak a phrase through the configured TTS provider
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the kitchen assistant's voice.")]
        text: String,
    },
}

#[derive(Subcommand)]
enum PantryAction {
    /// Add an ingredient
    Add {
        /// Ingredient name
        name: String,
    },
    /// List ingredients
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,kitchen_assistant=info",
        1 => "info,kitchen_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.unwrap_or(Command::Listen {
        text: false,
        mute: false,
    });

    match command {
        Command::Listen { text, mute } => listen(text, mute).await,
        Command::Pantry { action } => pantry(action),
        Command::Groceries { clear } => groceries(clear),
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&text).await,
    }
}

/// Run the assistant until ctrl-c, `/quit` or end of input
#[allow(clippy::future_not_send)]
async fn listen(text: bool, mute: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let store = Arc::new(SqliteDocumentStore::open(&config.db_path)?);
    let collaborators = Collaborators {
        llm: Arc::new(OpenRouterClient::new(
            &config.llm,
            config.api_keys.openrouter.clone(),
        )),
        weather: Arc::new(HttpWeatherSource::new(config.weather_url.clone())),
        store,
    };

    let synthesis: Arc<dyn SynthesisEngine> = if mute {
        Arc::new(ConsoleSynthesis)
    } else {
        Arc::new(CloudSynthesis::new(&config)?)
    };
    let speech = SpeechOutput::spawn(synthesis)?;

    let dispatcher = Dispatcher::new(
        collaborators,
        config.llm.persona.clone(),
        speech.clone(),
        config.dispatch.collaborator_timeout,
    );

    let (controls_tx, controls) = mpsc::channel(8);
    spawn_ctrl_c(controls_tx.clone());

    let max_pending = config.dispatch.max_pending_utterances;
    let session_result = if text {
        let (events, recognizer) = ChannelRecognizer::new(max_pending);
        tokio::spawn(read_stdin(controls_tx, Some(events)));
        tracing::info!("kitchen assistant ready - type a command");
        run_session(recognizer, dispatcher, max_pending, controls).await
    } else {
        let recognizer = MicrophoneRecognizer::new(&config, speech.speaking_flag())?;
        tokio::spawn(read_stdin(controls_tx, None));
        tracing::info!("kitchen assistant ready - start talking");
        run_session(recognizer, dispatcher, max_pending, controls).await
    };

    speech.flush().await;
    session_result
}

#[allow(clippy::future_not_send)]
async fn run_session<E: RecognitionEngine>(
    engine: E,
    dispatcher: Dispatcher,
    max_pending: usize,
    controls: mpsc::Receiver<SessionControl>,
) -> anyhow::Result<()> {
    let session = VoiceSession::new(engine, dispatcher, max_pending);
    let printer = tokio::spawn(print_display(session.display()));

    let dispatcher = session.run(controls).await?;
    tracing::info!(task = ?dispatcher.context().active_task(), "session ended");

    drop(dispatcher);
    printer.await?;
    Ok(())
}

/// Print each transcript and response as the display changes
async fn print_display(mut display: watch::Receiver<DisplayState>) {
    let mut shown = DisplayState::default();

    while display.changed().await.is_ok() {
        let state = display.borrow_and_update().clone();
        if state.transcript != shown.transcript {
            println!("you:       {}", state.transcript);
        }
        if state.response != shown.response {
            println!("assistant: {}", state.response);
        }
        shown = state;
    }
}

/// Interrupt and quit on ctrl-c
fn spawn_ctrl_c(controls: mpsc::Sender<SessionControl>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = controls.send(SessionControl::Interrupt).await;
            let _ = controls.send(SessionControl::Quit).await;
        }
    });
}

/// Forward stdin lines as controls, and as utterances when `events` is set
async fn read_stdin(
    controls: mpsc::Sender<SessionControl>,
    events: Option<mpsc::Sender<RecognitionEvent>>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };

        if let Some(control) = SessionControl::parse(&line) {
            if controls.send(control).await.is_err() {
                break;
            }
            continue;
        }

        if let Some(events) = &events {
            let event = RecognitionEvent::Result {
                alternatives: vec![line],
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
    }

    tracing::debug!("stdin closed");
}

fn pantry(action: PantryAction) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = SqliteDocumentStore::open(&config.db_path)?;

    match action {
        PantryAction::Add { name } => {
            let name = name.trim().to_lowercase();
            anyhow::ensure!(!name.is_empty(), "ingredient name is empty");

            let mut record = Record::new();
            record.insert("name".to_string(), Value::from(name.as_str()));
            store.insert(AVAILABLE_ITEMS, &record)?;
            println!("Added {name} to the pantry");
        }
        PantryAction::List => {
            let items = store.list(AVAILABLE_ITEMS)?;
            if items.is_empty() {
                println!("The pantry is empty");
            }
            for item in &items {
                if let Some(name) = item.get("name").and_then(Value::as_str) {
                    println!("  {name}");
                }
            }
        }
    }

    Ok(())
}

fn groceries(clear: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = SqliteDocumentStore::open(&config.db_path)?;

    let items = store.list(GROCERY_LISTS)?;
    if items.is_empty() {
        println!("The grocery list is empty");
    }
    for item in &items {
        if let Some(item) = item.get("item").and_then(Value::as_str) {
            println!("  {item}");
        }
    }

    if clear {
        let removed = store.clear(GROCERY_LISTS)?;
        println!("Cleared {removed} item(s)");
    }

    Ok(())
}

/// Show microphone levels and the utterances that would be transcribed
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    const TICK: Duration = Duration::from_millis(250);
    const METER_WIDTH: usize = 40;

    println!("Listening for {duration} seconds. Say something like \"make a grocery list\".");
    println!("Speech threshold is marked with |\n");

    let mut capture = AudioCapture::new()?;
    let mut segmenter = UtteranceSegmenter::new();
    let mut utterances = 0_usize;
    capture.start()?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration);
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(TICK).await;

        let samples = capture.take_buffer();
        let energy = rms(&samples);

        // Threshold sits at a quarter of the meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let filled = ((energy / SPEECH_THRESHOLD) * (METER_WIDTH / 4) as f32)
            .min(METER_WIDTH as f32) as usize;
        let mut meter: Vec<char> = (0..METER_WIDTH)
            .map(|i| if i < filled { '#' } else { '.' })
            .collect();
        meter[METER_WIDTH / 4] = '|';
        let label = if energy > SPEECH_THRESHOLD { "speech" } else { "quiet" };

        println!("{:.4} [{}] {label}", energy, meter.iter().collect::<String>());

        if let Some(utterance) = segmenter.process(&samples) {
            utterances += 1;
            #[allow(clippy::cast_precision_loss)]
            let secs = utterance.len() as f32 / SAMPLE_RATE as f32;
            println!("  -> utterance {utterances} ({secs:.1}s) would be transcribed");
        }
    }

    capture.stop();

    println!();
    if utterances == 0 {
        println!("No utterance detected. Speak closer to the microphone or check the input device.");
    } else {
        println!("Detected {utterances} utterance(s); the microphone is ready for `kitchen listen`.");
    }

    Ok(())
}

/// Play a short two-note chime through the default output device
async fn test_speaker() -> anyhow::Result<()> {
    const RATE: u32 = 24000;
    const NOTES: [f32; 2] = [660.0, 880.0];

    let playback = AudioPlayback::new()?;

    let note_len = RATE / 3;
    #[allow(clippy::cast_precision_loss)]
    let chime: Vec<f32> = NOTES
        .iter()
        .flat_map(|&frequency| {
            (0..note_len).map(move |i| {
                let t = i as f32 / RATE as f32;
                let fade = 1.0 - i as f32 / note_len as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 * fade
            })
        })
        .collect();

    println!("Playing the kitchen assistant chime...");

    tokio::task::spawn_blocking(move || {
        playback.play_samples_blocking(chime, &AtomicBool::new(false))
    })
    .await??;

    println!("If you heard two rising notes, replies will be audible.");
    println!("Otherwise run `kitchen listen --mute` to read replies instead.");

    Ok(())
}

/// Test TTS output through the configured provider
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let synthesis = CloudSynthesis::new(&config)?;

    println!("Synthesizing and playing...");
    synthesis.render(text).await?;

    println!("Done!");
    Ok(())
}
