use std::error::Error as StdError;
use std::fmt::{self, Display};

use async_trait::async_trait;
use lookout_core::Agent;
use serde::{Deserialize, Serialize};

/// The assistant turn every transcript starts with.
pub const GREETING: &str = "How can I help you?";

/// Error type returned by an [`AgentRunner`].
pub type RunnerError = Box<dyn StdError + Send + Sync>;

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing questions.
    User,
    /// The agent answering them.
    #[serde(alias = "ai")]
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the transcript.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Creates a new turn.
    #[inline]
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Returns who produced this turn.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text of this turn.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Anything that can turn a question into an answer.
///
/// The session only sees this boundary: which tools the runner uses, and
/// how, is up to the runner.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Answers `prompt`.
    async fn run(&self, prompt: &str) -> Result<String, RunnerError>;
}

#[async_trait]
impl AgentRunner for Agent {
    async fn run(&self, prompt: &str) -> Result<String, RunnerError> {
        Agent::run(self, prompt).await.map_err(Into::into)
    }
}

/// The outcome of [`TranscriptSession::submit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Submission {
    /// The prompt was empty, nothing was recorded.
    Ignored,
    /// The runner answered, the answer was recorded.
    Answered,
    /// The runner failed, an apology was recorded instead.
    Failed,
}

/// A chat session, like a window that displays messages and has an input
/// box.
///
/// The session owns an append-only transcript and forwards every submitted
/// prompt to its [`AgentRunner`]. Turns are never edited or removed.
pub struct TranscriptSession {
    transcript: Vec<Turn>,
    runner: Box<dyn AgentRunner>,
}

impl TranscriptSession {
    /// Creates a session with an empty transcript.
    pub fn new<R: AgentRunner + 'static>(runner: R) -> Self {
        Self {
            transcript: Vec::new(),
            runner: Box::new(runner),
        }
    }

    /// Seeds the transcript with the greeting if it has no turns yet.
    pub fn initialize(&mut self) {
        if self.transcript.is_empty() {
            self.record(Role::Assistant, GREETING);
        }
    }

    /// Appends a turn.
    #[inline]
    pub fn record<S: Into<String>>(&mut self, role: Role, content: S) {
        self.transcript.push(Turn::new(role, content));
    }

    /// Records `prompt`, waits for the runner and records its answer.
    ///
    /// Empty or absent prompts are ignored. When the runner fails, the
    /// failure is recorded as an assistant turn so the transcript still
    /// alternates, and the session stays usable.
    pub async fn submit<'a>(
        &mut self,
        prompt: impl Into<Option<&'a str>>,
    ) -> Submission {
        let Some(prompt) = prompt.into().filter(|p| !p.is_empty()) else {
            return Submission::Ignored;
        };

        self.record(Role::User, prompt);
        match self.runner.run(prompt).await {
            Ok(answer) => {
                self.record(Role::Assistant, answer);
                Submission::Answered
            }
            Err(err) => {
                error!("agent run failed: {err}");
                self.record(
                    Role::Assistant,
                    format!("Sorry, I couldn't answer that: {err}"),
                );
                Submission::Failed
            }
        }
    }

    /// Returns every turn, oldest first.
    #[inline]
    pub fn render(&self) -> &[Turn] {
        &self.transcript
    }
}
