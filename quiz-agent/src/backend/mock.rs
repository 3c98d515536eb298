//! Mock generator backend for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::traits::*;

/// One scripted reply.
#[derive(Debug, Clone)]
struct MockStep {
    delay: Duration,
    reply: Result<String, BackendError>,
}

/// Mock backend for testing.
///
/// Replies are taken from a script in order; once the script is empty the
/// default reply is repeated. Tracks call counts and peak concurrency.
pub struct MockBackend {
    model_id: String,
    script: Mutex<VecDeque<MockStep>>,
    default_step: MockStep,
    call_count: AtomicU32,
    active: AtomicU32,
    peak_active: AtomicU32,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            script: Mutex::new(VecDeque::new()),
            default_step: MockStep {
                delay: Duration::ZERO,
                reply: Ok("Mock response".to_string()),
            },
            call_count: AtomicU32::new(0),
            active: AtomicU32::new(0),
            peak_active: AtomicU32::new(0),
        }
    }

    /// Set the reply used once the script runs out.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.default_step.reply = Ok(content.into());
        self
    }

    /// Make the default reply an error.
    pub fn with_error(mut self, error: BackendError) -> Self {
        self.default_step.reply = Err(error);
        self
    }

    /// Delay applied to the default reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_step.delay = delay;
        self
    }

    /// Append a scripted reply.
    pub fn then_respond(self, content: impl Into<String>) -> Self {
        self.push_response(content);
        self
    }

    /// Append a scripted reply that arrives after `delay`.
    pub fn then_respond_after(self, delay: Duration, content: impl Into<String>) -> Self {
        self.push_step(MockStep {
            delay,
            reply: Ok(content.into()),
        });
        self
    }

    /// Append a scripted failure.
    pub fn then_fail(self, error: BackendError) -> Self {
        self.push_step(MockStep {
            delay: Duration::ZERO,
            reply: Err(error),
        });
        self
    }

    /// Append a scripted reply to a shared backend.
    pub fn push_response(&self, content: impl Into<String>) {
        self.push_step(MockStep {
            delay: Duration::ZERO,
            reply: Ok(content.into()),
        });
    }

    fn push_step(&self, step: MockStep) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(step);
        }
    }

    fn next_step(&self) -> MockStep {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.default_step.clone())
    }

    /// Get the number of times complete was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping complete calls seen.
    pub fn peak_concurrency(&self) -> u32 {
        self.peak_active.load(Ordering::SeqCst)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

/// A well-formed generator reply for `question`, for scripting mocks.
pub fn sample_item(question: &str) -> String {
    serde_json::json!({
        "question": question,
        "question_type": "MCQ",
        "explanation": "The first option is correct.",
        "topic": "Sample",
        "options": [
            {
                "option": "Correct answer",
                "is_correct": true,
                "explanation": "This is the right answer.",
                "reason": "It matches the definition.",
                "study_topic": "Core concept"
            },
            {
                "option": "Distractor one",
                "is_correct": false,
                "explanation": "A plausible but wrong answer.",
                "reason": "It confuses cause and effect.",
                "study_topic": "Common misconceptions"
            },
            {
                "option": "Distractor two",
                "is_correct": false,
                "explanation": "Another wrong answer.",
                "reason": "It applies to a different system.",
                "study_topic": "Related systems"
            },
            {
                "option": "Distractor three",
                "is_correct": false,
                "explanation": "A third wrong answer.",
                "reason": "It is outdated.",
                "study_topic": "History of the field"
            }
        ]
    })
    .to_string()
}

/// Decrements the active counter even when the call is cancelled.
struct ActiveCall<'a>(&'a AtomicU32);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GeneratorBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, BackendError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now_active, Ordering::SeqCst);
        let _active = ActiveCall(&self.active);

        let step = self.next_step();
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        let content = step.reply?;

        // Estimate token counts
        let prompt_tokens: u32 = request
            .messages
            .iter()
            .map(|m| m.content.len() as u32 / 4)
            .sum();
        let completion_tokens = content.len() as u32 / 4;

        Ok(CompletionResponse {
            content,
            finish_reason: FinishReason::Stop,
            usage: Usage {
                prompt_tokens,
                completion_tokens,
            },
        })
    }
}
