use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    cards::CardStore,
    provider::ModelProvider,
    scheduler::{Clock, Scheduler},
    templating::ReplyRenderer,
};

/// Simulated latency for a single send.
pub const SIMULATED_LATENCY: Duration = Duration::from_millis(2000);
/// Gap between consecutive pending-response creations in a batch.
pub const BATCH_CREATE_STAGGER: Duration = Duration::from_millis(200);
/// Base completion latency of a batch-sent response, measured from its own
/// creation.
pub const BATCH_BASE_LATENCY: Duration = Duration::from_millis(1500);
/// Extra completion latency per batch position.
pub const BATCH_LATENCY_STEP: Duration = Duration::from_millis(500);
/// How much of the prompt snapshot the simulated reply quotes back.
pub const PROMPT_SNIPPET_CHARS: usize = 50;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_REPLY_TEMPLATE: &str = "This is a simulated response from {{model}} for \
     the prompt: \"{{snippet}}...\"\n\nTo enable real responses, configure your API tokens \
     in Settings.";

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Recoverable reasons a send can be refused. No partial state is created
/// when a send fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The referenced card does not exist.
    UnknownCard(Uuid),
    /// The card exists but is toggled off.
    CardDisabled(Uuid),
    /// The card's text is blank or whitespace-only.
    EmptyPrompt(Uuid),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownCard(id) => write!(f, "Unknown card: {id}"),
            DispatchError::CardDisabled(id) => write!(f, "Card {id} is disabled"),
            DispatchError::EmptyPrompt(id) => {
                write!(f, "Card {id} has an empty prompt")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Pending,
    Success,
    Error,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Pending => "pending",
            ResponseStatus::Success => "success",
            ResponseStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ResponseStatus::Pending)
    }
}

/// The record of one dispatch attempt.
///
/// `model` and `prompt` are snapshots taken at send time; edits to the card
/// after sending never reach an in-flight or completed response.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub id: Uuid,
    pub model: String,
    pub prompt: String,
    pub reply: String,
    pub status: ResponseStatus,
    pub created_at_ms: u64,
}

/// Knobs for a dispatcher; the defaults match the classic workbench.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Model used by batch sends, which never consult per-card selectors.
    pub default_model: String,
    /// Handlebars template for fabricated replies (`model`, `snippet`).
    pub reply_template: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            reply_template: DEFAULT_REPLY_TEMPLATE.to_string(),
        }
    }
}

/// Owns the response list and turns card snapshots into responses.
///
/// The list is newest-first by construction: a pending response is prepended
/// at creation and completion mutates it in place, so display order never
/// depends on which completion fires first.
#[derive(Clone)]
pub struct Dispatcher {
    responses: Arc<Mutex<Vec<Response>>>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    renderer: Arc<dyn ReplyRenderer>,
    provider: Option<Arc<dyn ModelProvider>>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        renderer: Arc<dyn ReplyRenderer>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            scheduler,
            clock,
            renderer,
            provider: None,
            options,
        }
    }

    /// Routes single sends through a real backend instead of the simulation.
    /// Provider failures surface as responses in the `error` state.
    pub fn with_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn default_model(&self) -> &str {
        &self.options.default_model
    }

    /// Dispatches one card to `model`.
    ///
    /// Validates eligibility, snapshots the card's text, records a pending
    /// response and returns its id immediately; completion happens later on
    /// the scheduler (or the provider task) without blocking the caller.
    pub fn send(
        &self,
        cards: &CardStore,
        card_id: Uuid,
        model: &str,
    ) -> DispatchResult<Uuid> {
        let card = cards
            .get(card_id)
            .ok_or(DispatchError::UnknownCard(card_id))?;
        if !card.enabled {
            return Err(DispatchError::CardDisabled(card_id));
        }
        if card.text.trim().is_empty() {
            return Err(DispatchError::EmptyPrompt(card_id));
        }

        let model = model.to_string();
        let prompt = card.text.clone();
        let id = push_pending(
            &self.responses,
            self.clock.as_ref(),
            model.clone(),
            prompt.clone(),
        );
        tracing::info!(response = %id, card = %card_id, model, "send dispatched");

        if let Some(provider) = self.provider.clone() {
            let responses = self.responses.clone();
            tokio::spawn(async move {
                match provider.invoke(&model, &prompt).await {
                    Ok(reply) => {
                        complete(&responses, id, ResponseStatus::Success, reply);
                    }
                    Err(err) => {
                        tracing::warn!(response = %id, error = %err, "provider call failed");
                        complete(&responses, id, ResponseStatus::Error, err.to_string());
                    }
                }
            });
        } else {
            let reply = self.simulated_reply(&model, &prompt);
            let responses = self.responses.clone();
            self.scheduler.schedule(
                SIMULATED_LATENCY,
                Box::new(move || {
                    complete(&responses, id, ResponseStatus::Success, reply);
                }),
            );
        }

        Ok(id)
    }

    /// Dispatches every enabled card with non-blank text, in store order,
    /// against the default model. Returns how many sends were scheduled.
    ///
    /// Creations are staggered by [`BATCH_CREATE_STAGGER`] per card;
    /// each completion runs [`BATCH_BASE_LATENCY`] plus its position times
    /// [`BATCH_LATENCY_STEP`] after its own creation. Texts are snapshotted
    /// here, so edits made while the batch is unrolling do not leak in.
    pub fn send_all(&self, cards: &CardStore) -> usize {
        let eligible: Vec<String> = cards
            .cards()
            .iter()
            .filter(|card| card.enabled && !card.text.trim().is_empty())
            .map(|card| card.text.clone())
            .collect();
        if eligible.is_empty() {
            tracing::debug!("send_all found no eligible cards");
            return 0;
        }

        let count = eligible.len();
        tracing::info!(count, model = %self.options.default_model, "batch send scheduled");
        for (position, prompt) in eligible.into_iter().enumerate() {
            let model = self.options.default_model.clone();
            let reply = self.simulated_reply(&model, &prompt);
            let responses = self.responses.clone();
            let clock = self.clock.clone();
            let scheduler = self.scheduler.clone();
            let completion_delay = BATCH_BASE_LATENCY + BATCH_LATENCY_STEP * position as u32;

            self.scheduler.schedule(
                BATCH_CREATE_STAGGER * position as u32,
                Box::new(move || {
                    let id = push_pending(&responses, clock.as_ref(), model, prompt);
                    let responses = responses.clone();
                    scheduler.schedule(
                        completion_delay,
                        Box::new(move || {
                            complete(&responses, id, ResponseStatus::Success, reply);
                        }),
                    );
                }),
            );
        }
        count
    }

    /// Snapshot of the response list, newest first.
    pub fn responses(&self) -> Vec<Response> {
        guard(&self.responses).clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Response> {
        guard(&self.responses)
            .iter()
            .find(|response| response.id == id)
            .cloned()
    }

    fn simulated_reply(&self, model: &str, prompt: &str) -> String {
        let snippet: String = prompt.chars().take(PROMPT_SNIPPET_CHARS).collect();
        let data = json!({ "model": model, "snippet": snippet });
        match self.renderer.render(&self.options.reply_template, &data) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "reply template failed, using fallback");
                format!(
                    "This is a simulated response from {model} for the prompt: \"{snippet}...\""
                )
            }
        }
    }
}

fn push_pending(
    responses: &Mutex<Vec<Response>>,
    clock: &dyn Clock,
    model: String,
    prompt: String,
) -> Uuid {
    let response = Response {
        id: Uuid::new_v4(),
        model,
        prompt,
        reply: String::new(),
        status: ResponseStatus::Pending,
        created_at_ms: clock.now_ms(),
    };
    let id = response.id;
    guard(responses).insert(0, response);
    id
}

fn complete(
    responses: &Mutex<Vec<Response>>,
    id: Uuid,
    status: ResponseStatus,
    reply: String,
) {
    let mut list = guard(responses);
    match list.iter_mut().find(|response| response.id == id) {
        Some(response) if response.status == ResponseStatus::Pending => {
            response.status = status;
            response.reply = reply;
            tracing::debug!(response = %id, status = status.as_str(), "response completed");
        }
        Some(response) => {
            tracing::warn!(
                response = %id,
                status = response.status.as_str(),
                "completion fired for a response already in a terminal state"
            );
        }
        None => {
            tracing::warn!(response = %id, "completion fired for an unknown response");
        }
    }
}

fn guard(responses: &Mutex<Vec<Response>>) -> MutexGuard<'_, Vec<Response>> {
    responses.lock().unwrap_or_else(PoisonError::into_inner)
}
