//! The assistant proper: intent classification, conversation context,
//! dispatch and the session that ties capture to speech output.

mod context;
mod controller;
mod dispatcher;
mod intent;

pub use context::{ConversationContext, Task};
pub use controller::{SessionControl, VoiceSession};
pub use dispatcher::{
    AVAILABLE_ITEMS, Collaborators, Dispatcher, DisplayState, GENERAL_FALLBACK,
    GROCERY_ADD_FALLBACK, GROCERY_LISTS, GROCERY_PROMPT, RECIPE_FALLBACK, WEATHER_FALLBACK,
};
pub use intent::{Intent, classify};
