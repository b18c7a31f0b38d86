//! End-to-end session tests
//!
//! Drive the assistant through a channel-fed recognizer with in-memory
//! collaborators and a recording synthesis engine.

use kitchen_assistant::assistant::{GROCERY_PROMPT, RECIPE_FALLBACK, WEATHER_FALLBACK};
use kitchen_assistant::{
    CaptureSession, CaptureState, ChannelRecognizer, RecognitionEvent, Task, Utterance,
    VoiceSession,
};

mod common;

use common::{CannedModel, CannedWeather, Harness, controls, said};

#[tokio::test]
async fn test_grocery_list_conversation() {
    let (harness, dispatcher) = Harness::new(CannedModel::replying("ok"), CannedWeather(None));
    let (events, recognizer) = ChannelRecognizer::new(8);
    let (_controls_tx, controls_rx) = controls();
    let session = VoiceSession::new(recognizer, dispatcher, 8);

    events.send(said("Make a grocery list")).await.unwrap();
    events.send(said("eggs")).await.unwrap();
    events.send(said("Flour")).await.unwrap();
    drop(events);

    let dispatcher = session.run(controls_rx).await.unwrap();

    assert_eq!(
        dispatcher.context().active_task(),
        Some(Task::CollectingGroceryItems)
    );
    assert_eq!(harness.grocery_items().await, vec!["eggs", "flour"]);
    assert_eq!(
        harness.spoken().await,
        vec![
            GROCERY_PROMPT,
            "Added eggs to your grocery list.",
            "Added flour to your grocery list.",
        ]
    );
}

#[tokio::test]
async fn test_recipe_preempts_grocery_list() {
    let (harness, mut dispatcher) =
        Harness::new(CannedModel::replying("Spinach omelette."), CannedWeather(None));
    harness.add_pantry_item("eggs");
    harness.add_pantry_item("spinach");

    dispatcher.handle(Utterance::new("make a grocery list")).await;
    dispatcher
        .handle(Utterance::new("can you suggest a recipe"))
        .await;

    assert_eq!(dispatcher.context().active_task(), None);
    assert_eq!(dispatcher.display().response, "Spinach omelette.");
    assert_eq!(
        *harness.llm.prompts.lock().unwrap(),
        vec!["Based on the available ingredients: eggs, spinach, suggest a recipe."]
    );
    assert!(harness.grocery_items().await.is_empty());
}

#[tokio::test]
async fn test_make_grocery_list_response() {
    let (_harness, mut dispatcher) = Harness::new(CannedModel::replying("ok"), CannedWeather(None));

    dispatcher.handle(Utterance::new("make a grocery list")).await;

    assert_eq!(
        dispatcher.context().active_task(),
        Some(Task::CollectingGroceryItems)
    );
    assert_eq!(dispatcher.display().response, "Sure, start telling me the items.");
}

#[tokio::test]
async fn test_weather_failure_is_spoken_not_raised() {
    let (harness, mut dispatcher) = Harness::new(CannedModel::replying("ok"), CannedWeather(None));

    let response = dispatcher.handle(Utterance::new("How's the weather?")).await;

    assert_eq!(response, WEATHER_FALLBACK);
    assert_eq!(
        dispatcher.display().response,
        "Sorry, I couldn't get the weather information."
    );
    assert_eq!(harness.spoken().await, vec![WEATHER_FALLBACK]);
}

#[tokio::test]
async fn test_weather_success() {
    let (_harness, mut dispatcher) =
        Harness::new(CannedModel::replying("ok"), CannedWeather(Some("light rain")));

    let response = dispatcher.handle(Utterance::new("weather")).await;
    assert_eq!(response, "The current weather is: light rain.");
}

#[tokio::test]
async fn test_recipe_failure_falls_back() {
    let (harness, mut dispatcher) = Harness::new(CannedModel::failing(), CannedWeather(None));
    harness.add_pantry_item("rice");

    dispatcher.handle(Utterance::new("suggest a recipe")).await;
    assert_eq!(dispatcher.display().response, RECIPE_FALLBACK);
}

#[tokio::test]
async fn test_display_tracks_lowercased_transcript() {
    let (_harness, dispatcher) =
        Harness::new(CannedModel::replying("Boil for 7 minutes."), CannedWeather(None));
    let (events, recognizer) = ChannelRecognizer::new(4);
    let (_controls_tx, controls_rx) = controls();
    let session = VoiceSession::new(recognizer, dispatcher, 4);
    let mut display = session.display();

    events.send(said("How Long For A Soft Egg")).await.unwrap();
    drop(events);

    session.run(controls_rx).await.unwrap();

    let state = display.borrow_and_update().clone();
    assert_eq!(state.transcript, "how long for a soft egg");
    assert_eq!(state.response, "Boil for 7 minutes.");
}

#[tokio::test]
async fn test_capture_restarts_after_natural_end() {
    let (events, recognizer) = ChannelRecognizer::new(8);
    let mut capture = CaptureSession::new(recognizer);
    capture.start().unwrap();

    events.send(said("weather")).await.unwrap();
    events.send(RecognitionEvent::End).await.unwrap();
    events.send(said("play a song")).await.unwrap();

    assert_eq!(capture.next_utterance().await.unwrap().text, "weather");
    assert_eq!(capture.next_utterance().await.unwrap().text, "play a song");
    assert_eq!(capture.cycles(), 2);
    assert_eq!(capture.state(), CaptureState::Listening);

    drop(events);
    assert!(capture.next_utterance().await.is_none());
    assert_eq!(capture.state(), CaptureState::Stopped);
}
