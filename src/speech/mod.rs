//! Speech output controller
//!
//! A single worker task owns the synthesis engine and renders one utterance
//! at a time in submission order. `interrupt()` advances a generation
//! counter: the utterance being rendered is aborted and everything queued
//! under an older generation is discarded unheard.

mod engines;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};

pub use engines::{CloudSynthesis, ConsoleSynthesis};

use crate::{Error, Result};

/// Renders text as audible speech
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Whether the host can run this engine at all
    fn is_available(&self) -> bool {
        true
    }

    /// Speak `text`, resolving once it has been fully rendered
    ///
    /// Dropping the future must silence the utterance.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn render(&self, text: &str) -> Result<()>;
}

enum Job {
    Speak { text: String, generation: u64 },
    Flush(oneshot::Sender<()>),
}

/// Handle to the speech output worker
///
/// Cheap to clone; every clone drives the same queue.
#[derive(Clone)]
pub struct SpeechOutput {
    jobs: mpsc::UnboundedSender<Job>,
    generation: Arc<watch::Sender<u64>>,
    speaking: Arc<AtomicBool>,
}

impl SpeechOutput {
    /// Spawn the worker that owns `engine`
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if the engine cannot run on this host
    pub fn spawn(engine: Arc<dyn SynthesisEngine>) -> Result<Self> {
        if !engine.is_available() {
            return Err(Error::CapabilityUnavailable(format!(
                "{} speech synthesis is not supported here",
                engine.name()
            )));
        }

        let (jobs, rx) = mpsc::unbounded_channel();
        let (generation, generation_rx) = watch::channel(0);
        let speaking = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_worker(engine, rx, generation_rx, Arc::clone(&speaking)));

        Ok(Self {
            jobs,
            generation: Arc::new(generation),
            speaking,
        })
    }

    /// Queue `text` behind anything already waiting
    pub fn speak(&self, text: impl Into<String>) {
        let job = Job::Speak {
            text: text.into(),
            generation: *self.generation.borrow(),
        };
        if self.jobs.send(job).is_err() {
            tracing::warn!("speech worker is gone, dropping utterance");
        }
    }

    /// Silence the current utterance and discard the queue
    ///
    /// Safe to call at any time; with nothing queued it does nothing.
    pub fn interrupt(&self) {
        self.generation.send_modify(|generation| *generation += 1);
        tracing::info!("speech interrupted");
    }

    /// Wait until everything queued before this call has been spoken or discarded
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.jobs.send(Job::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Whether an utterance is being rendered right now
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }

    /// Shared flag that is set while an utterance is being rendered
    ///
    /// Lets capture ignore the assistant's own voice.
    #[must_use]
    pub fn speaking_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.speaking)
    }
}

async fn run_worker(
    engine: Arc<dyn SynthesisEngine>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    mut generation: watch::Receiver<u64>,
    speaking: Arc<AtomicBool>,
) {
    while let Some(job) = jobs.recv().await {
        let (text, stamped) = match job {
            Job::Speak { text, generation } => (text, generation),
            Job::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        if stamped != *generation.borrow_and_update() {
            tracing::debug!(text = %text, "discarding interrupted utterance");
            continue;
        }

        speaking.store(true, Ordering::Release);
        tokio::select! {
            result = engine.render(&text) => {
                if let Err(e) = result {
                    tracing::error!(error = %e, engine = engine.name(), "speech synthesis failed");
                }
            }
            Ok(()) = generation.changed() => {
                tracing::debug!(text = %text, "utterance cut off");
            }
        }
        speaking.store(false, Ordering::Release);
    }

    tracing::debug!("speech worker finished");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records every render; renders containing "hold" never finish
    struct Recorder {
        started: mpsc::UnboundedSender<String>,
        finished: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl SynthesisEngine for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn render(&self, text: &str) -> Result<()> {
            let _ = self.started.send(text.to_string());
            if text.contains("hold") {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(Error::Synthesis("device busy".to_string()));
            }
            self.finished.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn recorder(fail: bool) -> (Arc<Recorder>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Recorder {
            started: tx,
            finished: Mutex::new(Vec::new()),
            fail,
        });
        (engine, rx)
    }

    #[tokio::test]
    async fn test_speaks_in_order() {
        let (engine, _started) = recorder(false);
        let output = SpeechOutput::spawn(engine.clone()).unwrap();

        output.speak("one");
        output.speak("two");
        output.flush().await;

        assert_eq!(*engine.finished.lock().unwrap(), vec!["one", "two"]);
        assert!(!output.is_speaking());
    }

    #[tokio::test]
    async fn test_interrupt_discards_active_and_queued() {
        let (engine, mut started) = recorder(false);
        let output = SpeechOutput::spawn(engine.clone()).unwrap();

        output.speak("hold this thought");
        output.speak("queued one");
        output.speak("queued two");
        assert_eq!(started.recv().await.unwrap(), "hold this thought");
        assert!(output.is_speaking());
        assert!(output.speaking_flag().load(Ordering::Acquire));

        output.interrupt();
        output.speak("after");
        output.flush().await;

        assert_eq!(started.recv().await.unwrap(), "after");
        assert!(started.try_recv().is_err());
        assert_eq!(*engine.finished.lock().unwrap(), vec!["after"]);
    }

    #[tokio::test]
    async fn test_interrupt_when_idle_is_noop() {
        let (engine, _started) = recorder(false);
        let output = SpeechOutput::spawn(engine.clone()).unwrap();

        output.interrupt();
        output.interrupt();
        output.speak("still works");
        output.flush().await;

        assert_eq!(*engine.finished.lock().unwrap(), vec!["still works"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_queue() {
        let (engine, mut started) = recorder(true);
        let output = SpeechOutput::spawn(engine).unwrap();

        output.speak("first");
        output.speak("second");
        output.flush().await;

        assert_eq!(started.recv().await.unwrap(), "first");
        assert_eq!(started.recv().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_unavailable_engine_is_reported() {
        struct Mute;

        #[async_trait]
        impl SynthesisEngine for Mute {
            fn name(&self) -> &'static str {
                "mute"
            }

            fn is_available(&self) -> bool {
                false
            }

            async fn render(&self, _text: &str) -> Result<()> {
                Ok(())
            }
        }

        let err = SpeechOutput::spawn(Arc::new(Mute)).err().unwrap();
        assert!(matches!(err, Error::CapabilityUnavailable(_)));
    }
}
