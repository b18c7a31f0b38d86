//! Utterance dispatch
//!
//! Runs one utterance at a time: classify it against the conversation
//! context, perform the intent's action through the collaborators, then
//! publish and speak the response. Collaborator failures end in a fixed
//! fallback sentence and never leave the handler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use super::context::{ConversationContext, Task};
use super::intent::{Intent, classify};
use crate::collaborators::{CompletionRequest, DocumentStore, LanguageModel, Record, WeatherSource};
use crate::session::Utterance;
use crate::speech::SpeechOutput;
use crate::{Error, Result};

pub const RECIPE_FALLBACK: &str = "Sorry, I couldn't find a recipe.";
pub const GROCERY_PROMPT: &str = "Sure, start telling me the items.";
pub const GROCERY_ADD_FALLBACK: &str = "Sorry, I couldn't add the item to the list.";
pub const WEATHER_FALLBACK: &str = "Sorry, I couldn't get the weather information.";
pub const GENERAL_FALLBACK: &str = "Sorry, I couldn't process your request.";

/// Pantry collection read by recipe suggestions
pub const AVAILABLE_ITEMS: &str = "availableItems";

/// Collection grocery items are appended to
pub const GROCERY_LISTS: &str = "groceryLists";

/// What the view layer shows after each turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    /// Last recognized utterance, lowercased
    pub transcript: String,
    /// Last spoken response
    pub response: String,
}

/// External services used by the handlers
#[derive(Clone)]
pub struct Collaborators {
    pub llm: Arc<dyn LanguageModel>,
    pub weather: Arc<dyn WeatherSource>,
    pub store: Arc<dyn DocumentStore>,
}

/// Turns utterances into responses
pub struct Dispatcher {
    collaborators: Collaborators,
    persona: String,
    speech: SpeechOutput,
    context: ConversationContext,
    display: watch::Sender<DisplayState>,
    timeout: Duration,
}

impl Dispatcher {
    /// `timeout` bounds every individual collaborator call
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        persona: impl Into<String>,
        speech: SpeechOutput,
        timeout: Duration,
    ) -> Self {
        let (display, _) = watch::channel(DisplayState::default());
        Self {
            collaborators,
            persona: persona.into(),
            speech,
            context: ConversationContext::new(),
            display,
            timeout,
        }
    }

    /// Observe display updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    /// Current display state
    #[must_use]
    pub fn display(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    #[must_use]
    pub const fn context(&self) -> &ConversationContext {
        &self.context
    }

    #[must_use]
    pub const fn speech(&self) -> &SpeechOutput {
        &self.speech
    }

    /// Handle one utterance to completion, returning the response spoken
    pub async fn handle(&mut self, utterance: Utterance) -> String {
        let transcript = utterance.text.trim().to_lowercase();
        self.display.send_modify(|state| state.transcript.clone_from(&transcript));

        let intent = classify(&transcript, &self.context);
        tracing::info!(
            intent = intent.name(),
            transcript = %transcript,
            task = ?self.context.active_task(),
            "dispatching"
        );

        if intent.is_trigger() && intent != Intent::StartGroceryList {
            self.context.clear();
        }

        let response = match intent {
            Intent::SuggestRecipe => self.suggest_recipe().await,
            Intent::StartGroceryList => {
                self.context.begin(Task::CollectingGroceryItems);
                GROCERY_PROMPT.to_string()
            }
            Intent::AppendGroceryItem { item } => self.append_grocery_item(&item).await,
            Intent::CheckWeather => self.check_weather().await,
            // No playback backend yet; the response stands in for it
            Intent::PlaySong { song_name } => format!("Playing {song_name}."),
            Intent::General { text } => self.general(text).await,
        };

        self.respond(&response);
        response
    }

    async fn suggest_recipe(&self) -> String {
        let listed = self.collaborators.store.list_items(AVAILABLE_ITEMS);
        let items = match self.call(listed).await {
            Ok(records) => item_names(&records),
            Err(e) => {
                tracing::error!(error = %e, "failed to read available items");
                return RECIPE_FALLBACK.to_string();
            }
        };

        let request = CompletionRequest {
            system_persona: self.persona.clone(),
            user_text: format!("Based on the available ingredients: {items}, suggest a recipe."),
        };

        match self.call(self.collaborators.llm.complete(&request)).await {
            Ok(completion) => completion.text,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch recipe");
                RECIPE_FALLBACK.to_string()
            }
        }
    }

    async fn append_grocery_item(&self, item: &str) -> String {
        let mut record = Record::new();
        record.insert("item".to_string(), Value::from(item));

        match self
            .call(self.collaborators.store.add_item(GROCERY_LISTS, record))
            .await
        {
            Ok(id) => {
                tracing::debug!(item, id = %id, "grocery item saved");
                format!("Added {item} to your grocery list.")
            }
            Err(e) => {
                tracing::error!(error = %e, item, "failed to add grocery item");
                GROCERY_ADD_FALLBACK.to_string()
            }
        }
    }

    async fn check_weather(&self) -> String {
        match self.call(self.collaborators.weather.current()).await {
            Ok(report) => format!("The current weather is: {}.", report.weather),
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch weather");
                WEATHER_FALLBACK.to_string()
            }
        }
    }

    async fn general(&self, text: String) -> String {
        let request = CompletionRequest {
            system_persona: self.persona.clone(),
            user_text: text,
        };

        match self.call(self.collaborators.llm.complete(&request)).await {
            Ok(completion) => completion.text,
            Err(e) => {
                tracing::error!(error = %e, "failed to process command");
                GENERAL_FALLBACK.to_string()
            }
        }
    }

    fn respond(&self, response: &str) {
        self.display
            .send_modify(|state| state.response = response.to_string());
        self.speech.speak(response);
    }

    async fn call<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }
}

/// Names of pantry records joined for the recipe prompt
fn item_names(records: &[Record]) -> String {
    records
        .iter()
        .filter_map(|record| record.get("name").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(", ")
}
