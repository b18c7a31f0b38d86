//! Conversation context carried across turns

/// A multi-turn task in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Every unrecognized utterance is a grocery item
    CollectingGroceryItems,
}

/// Cross-turn state owned by the dispatcher
///
/// Holds at most one active task; entering a task replaces whatever was
/// active before.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    active_task: Option<Task>,
}

impl ConversationContext {
    #[must_use]
    pub const fn new() -> Self {
        Self { active_task: None }
    }

    #[must_use]
    pub const fn active_task(&self) -> Option<Task> {
        self.active_task
    }

    /// Enter `task`, returning the task it replaced
    pub fn begin(&mut self, task: Task) -> Option<Task> {
        let previous = self.active_task.replace(task);
        if let Some(previous) = previous {
            tracing::debug!(?previous, ?task, "replacing active task");
        }
        previous
    }

    /// Abandon the active task, if any
    pub fn clear(&mut self) -> Option<Task> {
        let previous = self.active_task.take();
        if let Some(previous) = previous {
            tracing::debug!(?previous, "active task abandoned");
        }
        previous
    }
}
