use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{Context as AnyhowContext, Result};
use axum::response::sse::{Event, KeepAlive};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Sse},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::info;
use uuid::Uuid;

use crate::{
    cards::{CardStore, PromptCard},
    config::ModelConfig,
    dispatch::{DispatchError, Dispatcher, Response},
    patterns::PatternKey,
};

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub default_limit: usize,
    pub poll_interval: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            default_limit: 25,
            poll_interval: Duration::from_secs(1),
        }
    }
}

pub async fn run(
    addr: SocketAddr,
    state: DeckState,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind deck service listener")?;
    run_with_listener(listener, state).await
}

pub async fn run_with_listener(listener: TcpListener, state: DeckState) -> Result<()> {
    let router = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "promptdeck serve listening");
    } else {
        info!("promptdeck serve listening");
    }
    axum::serve(listener, router.into_make_service())
        .await
        .context("serve endpoint failed")
}

/// Shared handler state: one card store and one dispatcher per process.
#[derive(Clone)]
pub struct DeckState {
    cards: Arc<Mutex<CardStore>>,
    dispatcher: Dispatcher,
    models: Vec<ModelConfig>,
    default_limit: usize,
    poll_interval: Duration,
}

impl DeckState {
    pub fn new(dispatcher: Dispatcher, models: Vec<ModelConfig>, options: ServeOptions) -> Self {
        Self {
            cards: Arc::new(Mutex::new(CardStore::new())),
            dispatcher,
            models,
            default_limit: options.default_limit.max(1),
            poll_interval: options.poll_interval.max(Duration::from_millis(200)),
        }
    }

    fn cards(&self) -> MutexGuard<'_, CardStore> {
        self.cards.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn limit_or_default(&self, value: Option<usize>) -> usize {
        value.filter(|v| *v > 0).unwrap_or(self.default_limit)
    }

    fn response_snapshot(&self, limit: usize) -> ResponseListExport {
        let mut responses = self.dispatcher.responses();
        responses.truncate(limit);
        ResponseListExport { responses }
    }
}

pub fn build_router(state: DeckState) -> Router {
    Router::new()
        .route("/patterns", get(list_patterns_handler))
        .route("/models", get(list_models_handler))
        .route("/cards", get(list_cards_handler).post(add_card_handler))
        .route(
            "/cards/{id}",
            patch(update_card_handler).delete(delete_card_handler),
        )
        .route("/cards/{id}/send", post(send_card_handler))
        .route("/send-all", post(send_all_handler))
        .route("/responses", get(list_responses_handler))
        .route("/responses/stream", get(stream_responses_handler))
        .with_state(state)
}

#[derive(Serialize)]
struct PatternExport {
    key: PatternKey,
    name: &'static str,
    category: &'static str,
    template: &'static str,
}

#[derive(Serialize)]
struct PatternListExport {
    patterns: Vec<PatternExport>,
}

#[derive(Serialize)]
struct ModelListExport {
    models: Vec<ModelExport>,
}

#[derive(Serialize)]
struct ModelExport {
    id: String,
    label: String,
}

#[derive(Serialize)]
struct CardListExport {
    cards: Vec<PromptCard>,
}

#[derive(Serialize)]
pub struct ResponseListExport {
    pub responses: Vec<Response>,
}

async fn list_patterns_handler() -> Json<PatternListExport> {
    let patterns = PatternKey::ALL
        .into_iter()
        .map(|key| PatternExport {
            key,
            name: key.display_name(),
            category: key.category().label(),
            template: key.template(),
        })
        .collect();
    Json(PatternListExport { patterns })
}

async fn list_models_handler(State(state): State<DeckState>) -> Json<ModelListExport> {
    let models = state
        .models
        .iter()
        .map(|model| ModelExport {
            id: model.id.clone(),
            label: model.label.clone(),
        })
        .collect();
    Json(ModelListExport { models })
}

async fn list_cards_handler(State(state): State<DeckState>) -> Json<CardListExport> {
    let cards = state.cards().cards().to_vec();
    Json(CardListExport { cards })
}

#[derive(Deserialize, Default)]
struct AddCardBody {
    #[serde(default)]
    pattern: Option<PatternKey>,
}

async fn add_card_handler(
    State(state): State<DeckState>,
    Json(body): Json<AddCardBody>,
) -> impl IntoResponse {
    let id = state.cards().add_card(body.pattern);
    let card = state.cards().get(id).cloned();
    (StatusCode::CREATED, Json(card))
}

#[derive(Deserialize)]
struct UpdateCardBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
}

async fn update_card_handler(
    Path(card_id): Path<Uuid>,
    State(state): State<DeckState>,
    Json(body): Json<UpdateCardBody>,
) -> StatusCode {
    // Store mutations are best-effort: an unknown id is not an error.
    let mut cards = state.cards();
    if let Some(text) = body.text {
        cards.set_text(card_id, text);
    }
    if let Some(enabled) = body.enabled {
        cards.set_enabled(card_id, enabled);
    }
    StatusCode::NO_CONTENT
}

async fn delete_card_handler(
    Path(card_id): Path<Uuid>,
    State(state): State<DeckState>,
) -> StatusCode {
    state.cards().delete_card(card_id);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize, Default)]
struct SendBody {
    #[serde(default)]
    model: Option<String>,
}

#[derive(Serialize)]
struct SendAccepted {
    response_id: Uuid,
}

async fn send_card_handler(
    Path(card_id): Path<Uuid>,
    State(state): State<DeckState>,
    Json(body): Json<SendBody>,
) -> Result<(StatusCode, Json<SendAccepted>), (StatusCode, String)> {
    let model = body
        .model
        .unwrap_or_else(|| state.dispatcher.default_model().to_string());
    let sent = {
        let cards = state.cards();
        state.dispatcher.send(&cards, card_id, &model)
    };
    match sent {
        Ok(response_id) => Ok((StatusCode::ACCEPTED, Json(SendAccepted { response_id }))),
        Err(err @ DispatchError::UnknownCard(_)) => {
            Err((StatusCode::NOT_FOUND, err.to_string()))
        }
        Err(err @ DispatchError::CardDisabled(_)) => {
            Err((StatusCode::CONFLICT, err.to_string()))
        }
        Err(err @ DispatchError::EmptyPrompt(_)) => {
            Err((StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))
        }
    }
}

#[derive(Serialize)]
struct BatchAccepted {
    scheduled: usize,
}

async fn send_all_handler(State(state): State<DeckState>) -> (StatusCode, Json<BatchAccepted>) {
    let scheduled = {
        let cards = state.cards();
        state.dispatcher.send_all(&cards)
    };
    (StatusCode::ACCEPTED, Json(BatchAccepted { scheduled }))
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

async fn list_responses_handler(
    State(state): State<DeckState>,
    Query(query): Query<ListQuery>,
) -> Json<ResponseListExport> {
    let limit = state.limit_or_default(query.limit);
    Json(state.response_snapshot(limit))
}

async fn stream_responses_handler(State(state): State<DeckState>) -> impl IntoResponse {
    let poll = state.poll_interval;
    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let stream_state = state.clone();
    let stream = IntervalStream::new(interval).map(move |_| {
        let export = stream_state.response_snapshot(stream_state.default_limit);
        let event = match serde_json::to_string(&export) {
            Ok(json) => Event::default().data(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response export");
                Event::default().comment("serialization_error")
            }
        };
        Result::<Event, Infallible>::Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(poll).text("keep-alive"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::{DispatchOptions, ResponseStatus},
        scheduler::VirtualScheduler,
        templating::HandlebarsRenderer,
    };
    use axum::body::{Body, to_bytes};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state() -> (DeckState, Arc<VirtualScheduler>) {
        let sched = VirtualScheduler::new();
        let dispatcher = Dispatcher::new(
            sched.clone(),
            sched.clone(),
            Arc::new(HandlebarsRenderer::new()),
            DispatchOptions::default(),
        );
        let models = vec![ModelConfig {
            id: "gpt-4".into(),
            label: "GPT-4".into(),
        }];
        let state = DeckState::new(dispatcher, models, ServeOptions::default());
        (state, sched)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn patterns_endpoint_lists_full_library() {
        let (state, _sched) = test_state();
        let app = build_router(state);
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/patterns")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["patterns"].as_array().unwrap().len(), 20);
        assert_eq!(json["patterns"][0]["key"], "cot");
        assert_eq!(json["patterns"][0]["name"], "Chain of Thought");
    }

    #[tokio::test]
    async fn add_card_seeds_from_pattern() {
        let (state, _sched) = test_state();
        let app = build_router(state.clone());
        let response = app
            .oneshot(json_request(
                "POST",
                "/cards",
                serde_json::json!({ "pattern": "cot" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["text"], PatternKey::Cot.template());
        assert_eq!(json["enabled"], true);
        assert_eq!(state.cards().len(), 1);
    }

    #[tokio::test]
    async fn send_maps_errors_to_status_codes() {
        let (state, _sched) = test_state();
        let app = build_router(state.clone());

        // Unknown card.
        let ghost = Uuid::new_v4();
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/cards/{ghost}/send"),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Blank card.
        let blank = state.cards().add_card(None);
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/cards/{blank}/send"),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Disabled card.
        let disabled = state.cards().add_card(Some(PatternKey::Meta));
        state.cards().set_enabled(disabled, false);
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/cards/{disabled}/send"),
                serde_json::json!({ "model": "gpt-4" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn send_and_list_responses_newest_first() {
        let (state, _sched) = test_state();
        let app = build_router(state.clone());
        let card = state.cards().add_card(Some(PatternKey::Cot));

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/cards/{card}/send"),
                serde_json::json!({ "model": "gpt-4" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let accepted = body_json(response).await;
        let response_id = accepted["response_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/responses?limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let responses = json["responses"].as_array().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], response_id.as_str());
        assert_eq!(responses[0]["status"], "pending");
        assert_eq!(responses[0]["model"], "gpt-4");
    }

    #[tokio::test]
    async fn send_all_reports_scheduled_count() {
        let (state, sched) = test_state();
        let app = build_router(state.clone());
        for _ in 0..2 {
            let id = state.cards().add_card(Some(PatternKey::Refinement));
            state.cards().set_text(id, "compare this");
        }
        let skipped = state.cards().add_card(None); // blank, not eligible
        assert!(state.cards().get(skipped).is_some());

        let response = app
            .oneshot(json_request("POST", "/send-all", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["scheduled"], 2);

        sched.advance(Duration::from_secs(10));
        let all = state.dispatcher.responses();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.status == ResponseStatus::Success));
    }

    #[tokio::test]
    async fn update_and_delete_are_best_effort() {
        let (state, _sched) = test_state();
        let app = build_router(state.clone());
        let card = state.cards().add_card(None);

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/cards/{card}"),
                serde_json::json!({ "text": "edited", "enabled": false }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.cards().get(card).unwrap().text, "edited");
        assert!(!state.cards().get(card).unwrap().enabled);

        // Unknown ids are silently accepted.
        let ghost = Uuid::new_v4();
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("DELETE")
                    .uri(format!("/cards/{ghost}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.cards().len(), 1);
    }
}
