//! External collaborators
//!
//! Narrow request/response interfaces to the services the assistant
//! depends on, with one production adapter each.

mod openrouter;
mod store;
mod weather;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openrouter::OpenRouterClient;
pub use store::{SCHEMA_VERSION, SqliteDocumentStore, StorePool};
pub use weather::HttpWeatherSource;

use crate::Result;

/// A document in the store: a flat JSON object
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Chat request to the language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub system_persona: String,
    pub user_text: String,
}

/// Language-model reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Completion {
    pub text: String,
}

/// Current weather as reported by the weather source
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeatherReport {
    pub weather: String,
}

/// Language-model completion service
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// # Errors
    ///
    /// Returns `Collaborator` on a non-success response or transport failure
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

/// Weather data source
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `Collaborator` on a non-success response or transport failure
    async fn current(&self) -> Result<WeatherReport>;
}

/// Document store holding the pantry and grocery collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append `record` to `collection`, returning its id
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    async fn add_item(&self, collection: &str, record: Record) -> Result<String>;

    /// All records in `collection`, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the read fails
    async fn list_items(&self, collection: &str) -> Result<Vec<Record>>;
}
