//! Shared test utilities
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use kitchen_assistant::collaborators::{Completion, CompletionRequest, WeatherReport};
use kitchen_assistant::{
    Collaborators, Dispatcher, DocumentStore, Error, LanguageModel, Record, Result, SpeechOutput,
    SqliteDocumentStore, SynthesisEngine, WeatherSource,
};

/// Language model that answers every prompt with a fixed reply
pub struct CannedModel {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.prompts.lock().unwrap().push(request.user_text.clone());
        self.reply
            .clone()
            .map(|text| Completion { text })
            .ok_or_else(|| Error::Collaborator("language model error 500".to_string()))
    }
}

/// Weather source with a fixed outcome
pub struct CannedWeather(pub Option<&'static str>);

#[async_trait]
impl WeatherSource for CannedWeather {
    async fn current(&self) -> Result<WeatherReport> {
        self.0
            .map(|weather| WeatherReport {
                weather: weather.to_string(),
            })
            .ok_or_else(|| Error::Collaborator("weather source error 502".to_string()))
    }
}

/// Synthesis engine that records what it was asked to say
#[derive(Default)]
pub struct RecordingSynthesis {
    pub spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SynthesisEngine for RecordingSynthesis {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn render(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Test harness around a dispatcher with in-memory collaborators
pub struct Harness {
    pub llm: Arc<CannedModel>,
    pub store: Arc<SqliteDocumentStore>,
    pub synthesis: Arc<RecordingSynthesis>,
    pub speech: SpeechOutput,
}

impl Harness {
    pub fn new(llm: Arc<CannedModel>, weather: CannedWeather) -> (Self, Dispatcher) {
        let store = Arc::new(SqliteDocumentStore::open_in_memory().expect("failed to open store"));
        let synthesis = Arc::new(RecordingSynthesis::default());
        let speech = SpeechOutput::spawn(synthesis.clone()).expect("failed to spawn speech");

        let collaborators = Collaborators {
            llm: llm.clone(),
            weather: Arc::new(weather),
            store: store.clone(),
        };
        let dispatcher = Dispatcher::new(
            collaborators,
            "You are a smart kitchen assistant.",
            speech.clone(),
            Duration::from_secs(5),
        );

        (
            Self {
                llm,
                store,
                synthesis,
                speech,
            },
            dispatcher,
        )
    }

    /// Everything spoken so far, after the speech queue drains
    pub async fn spoken(&self) -> Vec<String> {
        self.speech.flush().await;
        self.synthesis.spoken.lock().unwrap().clone()
    }

    pub fn add_pantry_item(&self, name: &str) {
        let mut record = Record::new();
        record.insert("name".to_string(), Value::from(name));
        self.store
            .insert("availableItems", &record)
            .expect("failed to add pantry item");
    }

    pub async fn grocery_items(&self) -> Vec<String> {
        self.store
            .list_items("groceryLists")
            .await
            .expect("failed to list groceries")
            .iter()
            .filter_map(|r| r.get("item").and_then(Value::as_str).map(ToString::to_string))
            .collect()
    }
}

/// Recognition result with a single alternative
pub fn said(text: &str) -> kitchen_assistant::RecognitionEvent {
    kitchen_assistant::RecognitionEvent::Result {
        alternatives: vec![text.to_string()],
    }
}

/// Control channel whose sender stays open for the test's duration
pub fn controls() -> (
    mpsc::Sender<kitchen_assistant::SessionControl>,
    mpsc::Receiver<kitchen_assistant::SessionControl>,
) {
    mpsc::channel(4)
}
