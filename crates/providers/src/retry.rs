//! Retry policy for the inference endpoint, as an explicit state machine.
//!
//! The endpoint fails in three distinct ways and each gets its own recovery:
//! - cold start (`503` + `estimated_time`) → wait, repeat the same request
//! - output cut at the token budget (`finish_reason == "length"`) → double
//!   the budget up to the cap, repeat
//! - transient failure (other non-2xx, network error) → linear backoff,
//!   next attempt
//!
//! `404`/`410` are terminal. Transitions are pure; the model client owns
//! the I/O and the sleeping.

use std::time::Duration;

use codeweaver_config::ModelConfig;
use codeweaver_core::error::ProviderError;
use codeweaver_core::provider::EndpointReply;
use serde::Deserialize;

/// Tunables for the retry state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Outer attempt budget.
    pub retries: u32,
    /// Budget at the start of every attempt.
    pub initial_max_tokens: u32,
    /// The budget never grows past this.
    pub max_cap_tokens: u32,
    /// Wait used when a 503 carries no usable `estimated_time`.
    pub default_load_wait: Duration,
    /// Pause before re-requesting with a doubled budget.
    pub length_retry_pause: Duration,
    /// Backoff after a failed attempt is `attempt * backoff_unit`.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_max_tokens: 800,
            max_cap_tokens: 8000,
            default_load_wait: Duration::from_secs(10),
            length_retry_pause: Duration::from_millis(500),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Where the machine goes once a [`RetryState::WaitingForBackoff`] pause ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Re-request within the same attempt using this budget.
    Request { max_tokens: u32 },
    /// Leave the inner loop; the attempt's closing pause follows.
    EndAttempt,
    /// Start the next outer attempt (or finish if none remain).
    NextAttempt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Requesting {
        attempt: u32,
        max_tokens: u32,
    },
    WaitingForLoad {
        attempt: u32,
        max_tokens: u32,
        wait: Duration,
    },
    WaitingForBackoff {
        attempt: u32,
        wait: Duration,
        resume: Resume,
    },
    Done(String),
}

impl RetryState {
    /// The pause this state asks for, if it is a waiting state.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            RetryState::WaitingForLoad { wait, .. } | RetryState::WaitingForBackoff { wait, .. } => {
                Some(*wait)
            }
            _ => None,
        }
    }
}

/// What one request produced, reduced to what the policy cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// 503: the model is loading.
    Loading { estimated_wait: Option<Duration> },
    /// Any other non-2xx status.
    Failed { status: u16 },
    /// 2xx. `content` is already trimmed.
    Completed {
        content: String,
        finish_reason: Option<String>,
    },
    /// The exchange could not complete.
    NetworkError,
}

impl Disposition {
    /// Classify the outcome of one endpoint call.
    pub fn classify(outcome: &Result<EndpointReply, ProviderError>) -> Self {
        let reply = match outcome {
            Ok(reply) => reply,
            Err(_) => return Disposition::NetworkError,
        };

        if reply.status == 503 {
            return Disposition::Loading {
                estimated_wait: parse_estimated_wait(&reply.body),
            };
        }

        if !reply.is_success() {
            return Disposition::Failed {
                status: reply.status,
            };
        }

        // An unparseable success body counts as an empty completion.
        let parsed: ChatCompletion = serde_json::from_str(&reply.body).unwrap_or_default();
        let choice = parsed.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
        let content = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        Disposition::Completed {
            content,
            finish_reason,
        }
    }
}

fn parse_estimated_wait(body: &str) -> Option<Duration> {
    let parsed: LoadingBody = serde_json::from_str(body).ok()?;
    Duration::try_from_secs_f64(parsed.estimated_time?).ok()
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoadingBody {
    #[serde(default)]
    estimated_time: Option<f64>,
}

impl RetryPolicy {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            retries: config.retries,
            initial_max_tokens: config.initial_max_tokens,
            max_cap_tokens: config.max_cap_tokens,
            default_load_wait: Duration::try_from_secs_f64(config.default_load_wait_secs)
                .unwrap_or(Duration::from_secs(10)),
            length_retry_pause: Duration::from_millis(config.length_retry_pause_ms),
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }

    /// The initial state.
    pub fn start(&self) -> RetryState {
        self.begin_attempt(1)
    }

    /// Linear backoff for `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    fn begin_attempt(&self, attempt: u32) -> RetryState {
        if attempt > self.retries {
            return RetryState::Done(String::new());
        }
        self.enter_inner(attempt, self.initial_max_tokens)
    }

    fn enter_inner(&self, attempt: u32, max_tokens: u32) -> RetryState {
        if max_tokens <= self.max_cap_tokens {
            RetryState::Requesting {
                attempt,
                max_tokens,
            }
        } else {
            self.end_attempt(attempt)
        }
    }

    fn end_attempt(&self, attempt: u32) -> RetryState {
        RetryState::WaitingForBackoff {
            attempt,
            wait: self.backoff(attempt),
            resume: Resume::NextAttempt,
        }
    }

    /// Transition out of `Requesting { attempt, max_tokens }`.
    pub fn on_disposition(&self, attempt: u32, max_tokens: u32, disposition: Disposition) -> RetryState {
        match disposition {
            Disposition::Loading { estimated_wait } => RetryState::WaitingForLoad {
                attempt,
                max_tokens,
                wait: estimated_wait.unwrap_or(self.default_load_wait),
            },
            Disposition::Failed { status: 404 | 410 } => RetryState::Done(String::new()),
            Disposition::Failed { .. } => self.end_attempt(attempt),
            Disposition::Completed {
                content,
                finish_reason,
            } => {
                if finish_reason.as_deref() == Some("length") && max_tokens < self.max_cap_tokens {
                    RetryState::WaitingForBackoff {
                        attempt,
                        wait: self.length_retry_pause,
                        resume: Resume::Request {
                            max_tokens: max_tokens.saturating_mul(2).min(self.max_cap_tokens),
                        },
                    }
                } else {
                    RetryState::Done(content)
                }
            }
            Disposition::NetworkError => RetryState::WaitingForBackoff {
                attempt,
                wait: self.backoff(attempt),
                resume: Resume::EndAttempt,
            },
        }
    }

    /// Transition out of a waiting state once its pause has elapsed.
    /// Non-waiting states are returned unchanged.
    pub fn on_wait_elapsed(&self, state: RetryState) -> RetryState {
        match state {
            RetryState::WaitingForLoad {
                attempt,
                max_tokens,
                ..
            } => self.enter_inner(attempt, max_tokens),
            RetryState::WaitingForBackoff {
                attempt, resume, ..
            } => match resume {
                Resume::Request { max_tokens } => self.enter_inner(attempt, max_tokens),
                Resume::EndAttempt => self.end_attempt(attempt),
                Resume::NextAttempt => self.begin_attempt(attempt + 1),
            },
            other => other,
        }
    }
}
