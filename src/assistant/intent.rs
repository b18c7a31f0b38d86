//! Intent classification
//!
//! Trigger phrases are checked in a fixed order and the first contained
//! phrase wins. Only when none matches does the active task get a say, so
//! a trigger phrase always escapes a grocery list in progress.

use super::context::{ConversationContext, Task};

/// Classified meaning of an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SuggestRecipe,
    StartGroceryList,
    AppendGroceryItem { item: String },
    CheckWeather,
    PlaySong { song_name: String },
    General { text: String },
}

impl Intent {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SuggestRecipe => "suggest_recipe",
            Self::StartGroceryList => "start_grocery_list",
            Self::AppendGroceryItem { .. } => "append_grocery_item",
            Self::CheckWeather => "check_weather",
            Self::PlaySong { .. } => "play_song",
            Self::General { .. } => "general",
        }
    }

    /// Whether this intent came from a trigger phrase
    #[must_use]
    pub const fn is_trigger(&self) -> bool {
        matches!(
            self,
            Self::SuggestRecipe | Self::StartGroceryList | Self::CheckWeather | Self::PlaySong { .. }
        )
    }
}

#[derive(Clone, Copy)]
enum Trigger {
    SuggestRecipe,
    StartGroceryList,
    CheckWeather,
    PlaySong,
}

/// Trigger phrases in priority order
const TRIGGERS: &[(&str, Trigger)] = &[
    ("suggest a recipe", Trigger::SuggestRecipe),
    ("make a grocery list", Trigger::StartGroceryList),
    ("weather", Trigger::CheckWeather),
    ("play a song", Trigger::PlaySong),
];

/// Map an utterance to an intent
///
/// Matching is case-insensitive; carried text is lowercased and trimmed.
#[must_use]
pub fn classify(text: &str, context: &ConversationContext) -> Intent {
    let lowered = text.trim().to_lowercase();

    let trigger = TRIGGERS
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase));

    match trigger {
        Some((_, Trigger::SuggestRecipe)) => Intent::SuggestRecipe,
        Some((_, Trigger::StartGroceryList)) => Intent::StartGroceryList,
        Some((_, Trigger::CheckWeather)) => Intent::CheckWeather,
        Some((phrase, Trigger::PlaySong)) => Intent::PlaySong {
            song_name: lowered.replacen(phrase, "", 1).trim().to_string(),
        },
        None => match context.active_task() {
            Some(Task::CollectingGroceryItems) => Intent::AppendGroceryItem { item: lowered },
            None => Intent::General { text: lowered },
        },
    }
}
