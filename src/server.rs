//! HTTP surface wiring (§6): one `axum::Router` serving both the downstream protocol endpoints
//! coding assistants talk to and a minimal control-plane subset for workspace/provider/mux-rule
//! management.
//!
//! Grounded in the teacher's `mcp_http_adapter::AxumHttpAdapter`: shared state behind one `Arc`,
//! cloned per-route rather than per-request, handlers kept thin and delegating immediately to the
//! owning module (pipeline, router, registry). Each downstream handler runs the full §4.J pipeline
//! end to end: input pipeline over the last user message, mux routing, a body rewrite into the
//! winning provider's wire format, dispatch through that provider's [`ProviderAdapter`], and the
//! output pipeline over the response before it's re-wrapped into the client's own protocol.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::{stream, StreamExt};
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::alerts::AlertSink;
use crate::codec;
use crate::db::{PersistenceStore, ProviderType, Workspace};
use crate::error::GatewayError;
use crate::fim::is_fim_request;
use crate::mappers;
use crate::matchers::{MatchInput, SimilarityOracle};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::input::{InputPipelineInstance, InputPipelineResult};
use crate::pipeline::output::OutputPipelineInstance;
use crate::providers::ProviderAdapter;
use crate::registry::RuleRegistry;
use crate::router::{ModelRoute, MuxingRouter};
use crate::sensitive_data::SensitiveDataManager;
use crate::session_store::SessionStore;
use crate::types::anthropic::{ContentDelta, MessagesRequest, StreamEvent as AnthropicStreamEvent};
use crate::types::common::{RequestEnvelope, Role};
use crate::types::openai::ChatCompletionRequest;

/// Everything a handler needs, held behind one `Arc` and cloned cheaply per request.
pub struct GatewayState {
    pub store: Arc<dyn PersistenceStore>,
    pub registry: Arc<RuleRegistry>,
    pub alerts: Arc<AlertSink>,
    pub router: Arc<MuxingRouter>,
    pub oracle: Arc<dyn SimilarityOracle>,
    pub session_store: SessionStore,
    pub input_pipeline: Arc<InputPipelineInstance>,
    pub output_pipeline: Arc<OutputPipelineInstance>,
    /// One adapter per upstream wire protocol; `vllm`/`llamacpp`/`openrouter` share the same
    /// OpenAI-compatible adapter instance as `openai` (§4.K).
    pub providers: HashMap<ProviderType, Arc<dyn ProviderAdapter>>,
}

impl GatewayState {
    fn provider_adapter(&self, provider_type: ProviderType) -> Arc<dyn ProviderAdapter> {
        self.providers.get(&provider_type).cloned().unwrap_or_else(|| {
            log::warn!("no adapter registered for provider type {provider_type:?}; falling back to the OpenAI-compatible one");
            self.providers
                .get(&ProviderType::Openai)
                .cloned()
                .expect("an OpenAI-compatible adapter is always registered")
        })
    }
}

/// Which wire protocol an upstream provider (or a downstream client) speaks, independent of the
/// specific [`ProviderType`] — `vllm`/`llamacpp`/`openrouter` all collapse to `OpenAi` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    OpenAi,
    Anthropic,
    Ollama,
}

fn protocol_for(provider_type: ProviderType) -> Protocol {
    match provider_type {
        ProviderType::Anthropic => Protocol::Anthropic,
        ProviderType::Ollama => Protocol::Ollama,
        ProviderType::Openai | ProviderType::Vllm | ProviderType::Llamacpp | ProviderType::Openrouter => Protocol::OpenAi,
    }
}

pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(openai_chat_completions))
        .route("/v1/messages", post(anthropic_messages))
        .route("/v1/mux/chat/completions", post(mux_chat_completions))
        .route("/api/v1/workspaces", get(list_workspaces).post(create_workspace))
        .route("/api/v1/workspaces/{name}/activate", post(activate_workspace))
        .route("/api/v1/alerts_notification", get(alerts_sse))
        .with_state(state)
}

async fn openai_chat_completions(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, GatewayError> {
    dispatch_openai_origin(state, request, false).await
}

/// `/v1/mux/chat/completions` — same as the plain OpenAI route, but explicitly FIM-aware: the
/// caller's path tells the FIM analyzer which endpoint family this is.
async fn mux_chat_completions(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, GatewayError> {
    let last_message = request.last_user_message().unwrap_or_default();
    let fim = is_fim_request("/v1/mux/chat/completions", "", &last_message);
    dispatch_openai_origin(state, request, fim).await
}

/// Shared §4.J pipeline for both OpenAI-origin endpoints: run input steps over the last user
/// message, route, rewrite the body into the winning provider's wire format, dispatch, run output
/// steps over the response, and re-wrap it as an OpenAI chat completion.
async fn dispatch_openai_origin(
    state: Arc<GatewayState>,
    request: ChatCompletionRequest,
    fim: bool,
) -> Result<Response, GatewayError> {
    let session = state.store.get_session().await?;
    let workspace_id =
        session.active_workspace_id.ok_or_else(|| GatewayError::Conflict("no active workspace".to_string()))?;

    let prompt_id = Uuid::new_v4().to_string();
    let sensitive = SensitiveDataManager::new(state.session_store.clone()).await;
    let context = PipelineContext::new(prompt_id.clone(), sensitive, state.alerts.clone());

    let last_message = request.last_user_message().unwrap_or_default();
    let rewritten = match state.input_pipeline.process_request(&context, &last_message).await? {
        InputPipelineResult::ShortCircuit(answer) => {
            context.finish().await?;
            let body = openai_completion_response(&prompt_id, &request.model, &answer);
            return Ok(Json(body).into_response());
        }
        InputPipelineResult::Forward(text) => with_rewritten_last_openai_message(request, &text),
    };

    let input = MatchInput {
        filename: None,
        is_fim_request: fim,
        user_messages: rewritten.user_messages(),
        system_messages: rewritten.system_messages(),
    };
    let route = state.router.route(state.store.as_ref(), &workspace_id, &input).await?;
    log::info!(
        "routed chat completion for model {} to provider {} via rule {}",
        rewritten.model,
        route.provider.name,
        route.matched_rule_id
    );

    let stream = rewritten.stream;
    let (body, path, protocol) = build_upstream_request(&route, rewritten, fim);
    let auth = state.store.get_auth_material(&route.provider.id).await?;
    let adapter = state.provider_adapter(route.provider.provider_type);

    if stream {
        let bytes = adapter.stream(&route.provider.endpoint, &path, auth.as_ref(), body).await?;
        let deltas = text_delta_stream(protocol, bytes);
        let processed = state.output_pipeline.clone().process_stream(context, deltas);
        let id = format!("chatcmpl-{}", Uuid::new_v4());
        Ok(Sse::new(openai_sse_stream(id, route.model_name.clone(), processed)).into_response())
    } else {
        let value = adapter.send(&route.provider.endpoint, &path, auth.as_ref(), body).await?;
        let text = extract_response_text(protocol, &value);
        let processed = state.output_pipeline.process_once(&context, &text).await?;
        context.finish().await?;
        Ok(Json(openai_completion_response(&prompt_id, &route.model_name, &processed)).into_response())
    }
}

async fn anthropic_messages(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<MessagesRequest>,
) -> Result<Response, GatewayError> {
    let session = state.store.get_session().await?;
    let workspace_id =
        session.active_workspace_id.ok_or_else(|| GatewayError::Conflict("no active workspace".to_string()))?;

    let prompt_id = Uuid::new_v4().to_string();
    let sensitive = SensitiveDataManager::new(state.session_store.clone()).await;
    let context = PipelineContext::new(prompt_id.clone(), sensitive, state.alerts.clone());

    let last_message = request.last_user_message().unwrap_or_default();
    let rewritten = match state.input_pipeline.process_request(&context, &last_message).await? {
        InputPipelineResult::ShortCircuit(answer) => {
            context.finish().await?;
            let body = anthropic_completion_response(&prompt_id, &request.model, &answer);
            return Ok(Json(body).into_response());
        }
        InputPipelineResult::Forward(text) => with_rewritten_last_anthropic_message(request, &text),
    };

    let input = MatchInput {
        filename: None,
        is_fim_request: false,
        user_messages: rewritten.user_messages(),
        system_messages: rewritten.system_messages(),
    };
    let route = state.router.route(state.store.as_ref(), &workspace_id, &input).await?;

    // Anthropic clients only mux to Anthropic-speaking providers for now: the crate carries
    // OpenAI<->Anthropic and OpenAI<->Ollama mappers (§4.B), but no Anthropic-origin equivalent,
    // so a rule that routes an Anthropic client elsewhere can't be served yet (see DESIGN.md).
    if route.provider.provider_type != ProviderType::Anthropic {
        context.finish().await?;
        return Err(GatewayError::BadRequest(format!(
            "mux rule {} routes this Anthropic request to a {:?} provider, which isn't supported yet",
            route.matched_rule_id, route.provider.provider_type
        )));
    }

    let mut body_request = rewritten.clone();
    body_request.model = route.model_name.clone();
    let body = serde_json::to_value(&body_request).expect("MessagesRequest always serializes");
    let path = format!("{}/v1/messages", route.provider.provider_type.base_url_suffix());
    let auth = state.store.get_auth_material(&route.provider.id).await?;
    let adapter = state.provider_adapter(route.provider.provider_type);

    if rewritten.stream {
        let bytes = adapter.stream(&route.provider.endpoint, &path, auth.as_ref(), body).await?;
        let deltas = text_delta_stream(Protocol::Anthropic, bytes);
        let processed = state.output_pipeline.clone().process_stream(context, deltas);
        let id = format!("msg_{}", Uuid::new_v4());
        Ok(Sse::new(anthropic_sse_stream(id, route.model_name.clone(), processed)).into_response())
    } else {
        let value = adapter.send(&route.provider.endpoint, &path, auth.as_ref(), body).await?;
        let text = extract_response_text(Protocol::Anthropic, &value);
        let processed = state.output_pipeline.process_once(&context, &text).await?;
        context.finish().await?;
        Ok(Json(anthropic_completion_response(&prompt_id, &route.model_name, &processed)).into_response())
    }
}

fn with_rewritten_last_openai_message(mut request: ChatCompletionRequest, new_text: &str) -> ChatCompletionRequest {
    if let Some(message) = request.messages.iter_mut().rev().find(|m| matches!(m.role, Role::User | Role::Tool)) {
        message.content = Value::String(new_text.to_string());
    }
    request
}

fn with_rewritten_last_anthropic_message(mut request: MessagesRequest, new_text: &str) -> MessagesRequest {
    if let Some(message) = request.messages.iter_mut().rev().find(|m| matches!(m.role, Role::User | Role::Tool)) {
        message.content = Value::String(new_text.to_string());
    }
    request
}

/// Rewrite an OpenAI-origin request into the winning provider's wire format (§4.J step 5), along
/// with the request path (`base_url_suffix()` plus the protocol-appropriate route) and the
/// protocol tag callers need to interpret the response with.
fn build_upstream_request(route: &ModelRoute, mut request: ChatCompletionRequest, fim: bool) -> (Value, String, Protocol) {
    request.model = route.model_name.clone();
    let suffix = route.provider.provider_type.base_url_suffix();
    match protocol_for(route.provider.provider_type) {
        Protocol::OpenAi => {
            (serde_json::to_value(&request).expect("ChatCompletionRequest always serializes"), format!("{suffix}/chat/completions"), Protocol::OpenAi)
        }
        Protocol::Anthropic => {
            let mapped = mappers::openai_anthropic::anthropic_from_openai(&request);
            (serde_json::to_value(&mapped).expect("MessagesRequest always serializes"), format!("{suffix}/v1/messages"), Protocol::Anthropic)
        }
        Protocol::Ollama if fim => {
            let mapped = mappers::openai_ollama::ollama_generate_from_openai(&request);
            (serde_json::to_value(&mapped).expect("GenerateRequest always serializes"), format!("{suffix}/api/generate"), Protocol::Ollama)
        }
        Protocol::Ollama => {
            let mapped = mappers::openai_ollama::ollama_chat_from_openai(&request);
            (serde_json::to_value(&mapped).expect("ChatRequest always serializes"), format!("{suffix}/api/chat"), Protocol::Ollama)
        }
    }
}

/// Turn a provider's raw upstream byte stream into a stream of plain text deltas, decoding it
/// with whichever [`crate::codec`] parser matches `protocol` and discarding every event that
/// doesn't carry user-visible text (role-only deltas, block-start/stop markers, pings).
fn text_delta_stream(
    protocol: Protocol,
    bytes: Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send + Unpin>,
) -> std::pin::Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>> {
    match protocol {
        Protocol::OpenAi => Box::pin(codec::openai_chunk_stream(bytes).filter_map(|event| async move {
            match event {
                Ok(chunk) => chunk.choices.into_iter().next().and_then(|choice| choice.delta.content).map(Ok),
                Err(err) => Some(Err(err)),
            }
        })),
        Protocol::Anthropic => Box::pin(codec::anthropic_event_stream(bytes).filter_map(|event| async move {
            match event {
                Ok(AnthropicStreamEvent::ContentBlockDelta { delta: ContentDelta::TextDelta { text }, .. }) => Some(Ok(text)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        })),
        Protocol::Ollama => Box::pin(codec::ollama_chat_stream(bytes).filter_map(|event| async move {
            match event {
                Ok(chunk) if !chunk.message.content.is_empty() => Some(Ok(chunk.message.content)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        })),
    }
}

/// Wrap processed text deltas as an OpenAI-shaped SSE stream, terminated by the `[DONE]` sentinel.
fn openai_sse_stream(
    id: String,
    model: String,
    deltas: impl Stream<Item = Result<String, GatewayError>> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let body = deltas.map(move |result| {
        let event = match result {
            Ok(text) => {
                let chunk = json!({
                    "id": id,
                    "model": model,
                    "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": Value::Null}],
                });
                Event::default().data(chunk.to_string())
            }
            Err(err) => Event::default().event("error").data(json!({"error": err.to_string()}).to_string()),
        };
        Ok(event)
    });
    body.chain(stream::once(async { Ok(Event::default().data("[DONE]")) }))
}

/// Wrap processed text deltas as an Anthropic-shaped SSE stream: a synthetic `message_start`
/// and `content_block_start` up front, one `content_block_delta` per chunk, and the closing
/// `content_block_stop`/`message_delta`/`message_stop` trio at the end (§4.A).
fn anthropic_sse_stream(
    id: String,
    model: String,
    deltas: impl Stream<Item = Result<String, GatewayError>> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let start = stream::iter(vec![
        Event::default().event("message_start").data(
            json!({
                "type": "message_start",
                "message": {"id": id, "model": model, "role": "assistant", "content": [], "stop_reason": Value::Null},
            })
            .to_string(),
        ),
        Event::default().event("content_block_start").data(
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}).to_string(),
        ),
    ])
    .map(Ok);

    let body = deltas.map(|result| {
        let event = match result {
            Ok(text) => Event::default().event("content_block_delta").data(
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": text}}).to_string(),
            ),
            Err(err) => Event::default()
                .event("error")
                .data(json!({"type": "error", "error": {"type": "api_error", "message": err.to_string()}}).to_string()),
        };
        Ok(event)
    });

    let end = stream::iter(vec![
        Event::default().event("content_block_stop").data(json!({"type": "content_block_stop", "index": 0}).to_string()),
        Event::default()
            .event("message_delta")
            .data(json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}}).to_string()),
        Event::default().event("message_stop").data(json!({"type": "message_stop"}).to_string()),
    ])
    .map(Ok);

    start.chain(body).chain(end)
}

/// Pull the assistant's full text out of a non-streamed upstream response, whichever protocol it
/// arrived in.
fn extract_response_text(protocol: Protocol, value: &Value) -> String {
    match protocol {
        Protocol::OpenAi => value["choices"][0]["message"]["content"].as_str().unwrap_or_default().to_string(),
        Protocol::Anthropic => value["content"]
            .as_array()
            .map(|blocks| blocks.iter().filter_map(|block| block["text"].as_str()).collect::<Vec<_>>().join(""))
            .unwrap_or_default(),
        Protocol::Ollama => value["message"]["content"].as_str().unwrap_or_default().to_string(),
    }
}

fn openai_completion_response(id: &str, model: &str, text: &str) -> Value {
    json!({
        "id": id,
        "model": model,
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
    })
}

fn anthropic_completion_response(id: &str, model: &str, text: &str) -> Value {
    json!({
        "id": id,
        "model": model,
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
    })
}

async fn list_workspaces(State(state): State<Arc<GatewayState>>) -> Result<Json<Vec<Workspace>>, GatewayError> {
    Ok(Json(state.store.list_workspaces(false).await?))
}

async fn create_workspace(
    State(state): State<Arc<GatewayState>>,
    Json(workspace): Json<Workspace>,
) -> Result<impl IntoResponse, GatewayError> {
    if state.store.get_workspace_by_name(&workspace.name).await?.is_some() {
        return Err(GatewayError::Conflict(format!("workspace {} already exists", workspace.name)));
    }
    state.store.upsert_workspace(workspace.clone()).await?;
    state.registry.repopulate(state.store.as_ref(), &workspace.id).await?;
    Ok(Json(workspace))
}

async fn activate_workspace(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let workspace = state
        .store
        .get_workspace_by_name(&name)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("workspace {name} not found")))?;
    state.store.set_active_workspace(Some(workspace.id.clone())).await?;
    state.registry.set_active(Some(workspace.id.clone())).await;
    Ok(Json(workspace))
}

async fn alerts_sse(
    State(state): State<Arc<GatewayState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.alerts.subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(|alert| match alert {
        Ok(alert) => serde_json::to_string(&alert).ok().map(|body| Ok(Event::default().data(body))),
        Err(_) => None,
    });
    Sse::new(stream)
}
