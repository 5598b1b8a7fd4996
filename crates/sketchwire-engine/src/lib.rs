use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};
use sketchwire_contracts::chat::{ChatMessage, Transcript};
use sketchwire_contracts::contract::{
    parse_generated_markup, GeneratedResult, CONTRACT_VERSION, EXPLANATION_END,
    EXPLANATION_START, HTML_END, HTML_START, REACT_END, REACT_START,
};
use sketchwire_contracts::events::{EventPayload, EventWriter};
use sketchwire_contracts::models::{ModelSelection, ModelSelector};
use sketchwire_contracts::session::{SessionState, SketchImage};

pub const MISSING_KEY_MESSAGE: &str = "API Key is missing. Please select a key first.";

pub const CHAT_TRANSPORT_APOLOGY: &str = "Connection interrupted. Please try again.";
pub const CHAT_EMPTY_REPLY_FALLBACK: &str =
    "I'm having trouble connecting to the design database. Please try again.";

/// Both markup call shapes run cool; sketches reward faithful interpretation
/// over invention.
const MARKUP_TEMPERATURE: f64 = 0.4;

const REQUEST_TIMEOUT_SECONDS: u64 = 120;

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Clean base64, any data-URL prefix already stripped.
    pub data: String,
}

/// One generation or refinement call, fully assembled: the prompt text, the
/// inline sketch, and for initial generation an optional trailing user brief
/// that the model is told to prioritize over the literal sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupRequest {
    pub prompt: String,
    pub image: InlineImage,
    pub trailing_instructions: Option<String>,
    pub model: String,
    pub temperature: f64,
}

/// One assistant turn: persona, full replayed history, and the newest
/// message as the active turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub model: String,
}

/// Estimated context consumption of the unbounded assistant history.
#[derive(Debug, Clone)]
pub struct ContextUsage {
    pub used_tokens: u64,
    pub max_tokens: u64,
    pub pct: f64,
    pub alert_level: String,
}

// ---------------------------------------------------------------------------
// Prompt construction
// ---------------------------------------------------------------------------

/// The response-contract system block. Built from the shared delimiter
/// constants so the instruction and the parser cannot drift apart.
pub fn markup_system_instruction() -> String {
    format!(
        "You are an expert senior frontend engineer and UI/UX designer specializing in React and \
Tailwind CSS. Analyze the provided image of a UI sketch, wireframe, or mockup and convert it \
into clean, production-ready code.

You must output your response in a structured format with specific delimiters so it can be \
parsed programmatically.

Structure your response exactly as follows:

{HTML_START}
[The complete, standalone HTML file. Include the Tailwind CSS CDN script in the head. The body \
should contain the implementation of the UI seen in the image. Make it look modern and \
beautiful, interpreting the sketch's intent. Use distinct colors and good spacing.]
{HTML_END}

{REACT_START}
[The React component code. Use functional components with hooks. Assume 'lucide-react' icons \
are available. Use Tailwind CSS classes for styling. Do not include imports for React itself, \
just the component definition and any sub-components.]
{REACT_END}

{EXPLANATION_START}
[A brief summary of the design decisions you made, how you interpreted the sketch, and any \
assumptions made about functionality.]
{EXPLANATION_END}

Rules:
1. The code must be responsive.
2. Use modern Tailwind utility classes.
3. Interpret scribbles or rough shapes as their most likely UI component counterparts."
    )
}

pub fn assistant_system_instruction() -> String {
    "You are the Sketchwire design assistant, a highly creative and technical UI/UX design \
consultant embedded in a prototyping application.

Your goal: help the user refine their app ideas, choose color palettes, suggest UX patterns, \
and clarify technical concepts (React/Tailwind).

Personality: professional, concise, slightly technical tone, helpful, and encouraging.

Context: the user is using an app that converts hand-drawn sketches to code. They might ask \
how to draw better sketches for the model, or how to improve the generated design."
        .to_string()
}

pub fn build_generation_request(
    sketch: &SketchImage,
    brief: Option<&str>,
    model: &str,
) -> MarkupRequest {
    let trailing_instructions = brief
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            format!(
                "Additional User Instructions: {value}. IMPORTANT: Prioritize these \
instructions over the sketch if they conflict."
            )
        });
    MarkupRequest {
        prompt: markup_system_instruction(),
        image: inline_image_from_sketch(sketch),
        trailing_instructions,
        model: model.to_string(),
        temperature: MARKUP_TEMPERATURE,
    }
}

/// The refinement prompt embeds the current HTML as ground truth of what the
/// user is looking at, then asks for a full regeneration of both artifacts.
pub fn build_refinement_request(
    sketch: &SketchImage,
    current_html: &str,
    instruction: &str,
    model: &str,
) -> MarkupRequest {
    let prompt = format!(
        "{system}

CONTEXT:
The user wants to modify the previously generated code based on new instructions.

CURRENT HTML CODE:
{current_html}

USER REFINEMENT INSTRUCTION:
\"{instruction}\"

TASK:
Regenerate the code (HTML and React) implementing the user's changes while maintaining the \
structure of the sketch provided in the image.",
        system = markup_system_instruction(),
        instruction = instruction.trim(),
    );
    MarkupRequest {
        prompt,
        image: inline_image_from_sketch(sketch),
        trailing_instructions: None,
        model: model.to_string(),
        temperature: MARKUP_TEMPERATURE,
    }
}

pub fn build_chat_request(history: &[ChatMessage], message: &str, model: &str) -> ChatRequest {
    ChatRequest {
        system_instruction: assistant_system_instruction(),
        history: history.to_vec(),
        message: message.to_string(),
        model: model.to_string(),
    }
}

fn inline_image_from_sketch(sketch: &SketchImage) -> InlineImage {
    InlineImage {
        mime_type: sketch.mime_type.clone(),
        data: strip_data_url_prefix(&sketch.payload).to_string(),
    }
}

/// Strip a recognized `data:image/...;base64,` prefix. Payloads coming from
/// browser-style intake carry one; file intake does not. Unrecognized
/// prefixes are left alone for the transport to reject.
pub fn strip_data_url_prefix(payload: &str) -> &str {
    const PREFIXES: &[&str] = &[
        "data:image/png;base64,",
        "data:image/jpeg;base64,",
        "data:image/jpg;base64,",
        "data:image/webp;base64,",
    ];
    for prefix in PREFIXES {
        if let Some(rest) = payload.strip_prefix(prefix) {
            return rest;
        }
    }
    payload
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

pub trait CodeProvider: Send + Sync {
    fn name(&self) -> &str;
    /// Whether a call may be attempted at all. A `false` here is surfaced as
    /// a missing-key precondition failure without dispatching anything.
    fn credential_ready(&self) -> bool;
    /// Raw model text for a markup call; parsing happens in the engine.
    fn generate_markup(&self, request: &MarkupRequest) -> Result<String>;
    /// Plain-text assistant reply; no delimiter contract.
    fn chat(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Default)]
pub struct CodeProviderRegistry {
    providers: BTreeMap<String, Box<dyn CodeProvider>>,
}

impl CodeProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: CodeProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn CodeProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

fn default_provider_registry() -> CodeProviderRegistry {
    let mut registry = CodeProviderRegistry::new();
    registry.register(DryrunProvider);
    registry.register(GeminiProvider::new());
    registry
}

/// Offline provider for tests and `dryrun-*` models. Emits well-formed
/// contract text derived deterministically from the request.
struct DryrunProvider;

impl CodeProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn credential_ready(&self) -> bool {
        true
    }

    fn generate_markup(&self, request: &MarkupRequest) -> Result<String> {
        let brief_note = request
            .trailing_instructions
            .as_deref()
            .map(|_| " honoring the user brief")
            .unwrap_or("");
        Ok(format!(
            "{HTML_START}
<!DOCTYPE html>
<html>
<head><script src=\"https://cdn.tailwindcss.com\"></script></head>
<body class=\"bg-slate-50\"><main class=\"p-8\"><h1 class=\"text-2xl font-bold\">Dryrun layout</h1></main></body>
</html>
{HTML_END}
{REACT_START}
const DryrunLayout = () => (
  <main className=\"p-8\">
    <h1 className=\"text-2xl font-bold\">Dryrun layout</h1>
  </main>
);
{REACT_END}
{EXPLANATION_START}
Deterministic dryrun render of a {mime} sketch{brief_note} ({prompt_chars} prompt chars).
{EXPLANATION_END}",
            mime = request.image.mime_type,
            prompt_chars = request.prompt.chars().count(),
        ))
    }

    fn chat(&self, request: &ChatRequest) -> Result<String> {
        Ok(format!(
            "Dryrun assistant reply ({} prior messages): {}",
            request.history.len(),
            request.message
        ))
    }
}

pub struct GeminiProvider {
    api_base: String,
    http: HttpClient,
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiProvider {
    pub fn new() -> Self {
        Self {
            api_base: env::var("GEMINI_API_BASE")
                .ok()
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            http: HttpClient::new(),
        }
    }

    fn api_key() -> Option<String> {
        non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn markup_payload(request: &MarkupRequest) -> Value {
        let mut parts = vec![
            json!({ "text": request.prompt }),
            json!({
                "inlineData": {
                    "mimeType": request.image.mime_type,
                    "data": request.image.data,
                }
            }),
        ];
        if let Some(trailing) = request.trailing_instructions.as_deref() {
            parts.push(json!({ "text": trailing }));
        }
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": request.temperature },
        })
    }

    fn chat_payload(request: &ChatRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "parts": [{ "text": msg.text }],
                })
            })
            .collect();
        contents.push(json!({
            "role": "user",
            "parts": [{ "text": request.message }],
        }));
        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": contents,
        })
    }

    /// Single dispatch point for all calls. Single-attempt semantics: no
    /// retry, no backoff; failures surface to the caller unchanged. Any
    /// future retry policy belongs here, not in parsing or state logic.
    fn post_generate_content(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: &Value,
    ) -> Result<HttpResponse> {
        self.http
            .post(endpoint)
            .query(&[("key", api_key)])
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .json(payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))
    }

    fn dispatch(&self, model: &str, payload: &Value) -> Result<String> {
        let Some(api_key) = Self::api_key() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = self.endpoint_for_model(model);
        let response = self.post_generate_content(&endpoint, &api_key, payload)?;
        let response_payload = response_json_or_error("Gemini", response)?;
        Ok(Self::extract_text(&response_payload))
    }

    fn extract_text(response_payload: &Value) -> String {
        let candidates = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut out = String::new();
        for candidate in candidates {
            let parts = candidate
                .get("content")
                .and_then(Value::as_object)
                .and_then(|content| content.get("parts"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
        }
        out
    }
}

impl CodeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn credential_ready(&self) -> bool {
        Self::api_key().is_some()
    }

    fn generate_markup(&self, request: &MarkupRequest) -> Result<String> {
        self.dispatch(&request.model, &Self::markup_payload(request))
    }

    fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.dispatch(&request.model, &Self::chat_payload(request))
    }
}

// ---------------------------------------------------------------------------
// Session engine
// ---------------------------------------------------------------------------

/// Owns the session state and drives every transition around the external
/// calls. All mutation happens here, after a call resolves; callers observe
/// state only through accessors.
pub struct SketchEngine {
    events: EventWriter,
    state: SessionState,
    transcript: Transcript,
    model_selector: ModelSelector,
    markup_model: Option<String>,
    chat_model: Option<String>,
    providers: CodeProviderRegistry,
}

impl SketchEngine {
    pub fn new(
        events_path: impl Into<PathBuf>,
        markup_model: Option<String>,
        chat_model: Option<String>,
    ) -> Result<Self> {
        let state = SessionState::new();
        let events = EventWriter::new(events_path.into(), state.session_id().to_string());

        events.emit(
            "session_started",
            map_object(json!({
                "events_path": events.path().to_string_lossy().to_string(),
                "contract_version": CONTRACT_VERSION,
            })),
        )?;

        Ok(Self {
            events,
            state,
            transcript: Transcript::seeded(),
            model_selector: ModelSelector::new(None),
            markup_model,
            chat_model,
            providers: default_provider_registry(),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn event_writer(&self) -> EventWriter {
        self.events.clone()
    }

    pub fn emit_event(&self, event_type: &str, payload: EventPayload) -> Result<Value> {
        self.events.emit(event_type, payload)
    }

    pub fn markup_model(&self) -> Option<&str> {
        self.markup_model.as_deref()
    }

    pub fn set_markup_model(&mut self, model: Option<String>) {
        self.markup_model = model;
    }

    pub fn chat_model(&self) -> Option<&str> {
        self.chat_model.as_deref()
    }

    pub fn set_chat_model(&mut self, model: Option<String>) {
        self.chat_model = model;
    }

    pub fn known_models(&self) -> Vec<String> {
        self.model_selector
            .registry
            .list()
            .map(|model| format!("{} ({})", model.name, model.capabilities.join("+")))
            .collect()
    }

    /// Replace the provider under its own name. Tests use this to stand in
    /// failing or misbehaving transports.
    pub fn register_provider<P: CodeProvider + 'static>(&mut self, provider: P) {
        self.providers.register(provider);
    }

    pub fn store_sketch(&mut self, sketch: SketchImage) -> Result<bool> {
        let payload = map_object(json!({
            "source": sketch.source.clone(),
            "mime_type": sketch.mime_type.clone(),
            "width": sketch.width,
            "height": sketch.height,
        }));
        if !self.state.store_sketch(sketch) {
            return Ok(false);
        }
        self.events.emit("sketch_loaded", payload)?;
        Ok(true)
    }

    pub fn set_brief(&mut self, brief: &str) -> bool {
        self.state.set_brief(brief)
    }

    /// Run one generation round. Returns `false` when a precondition no-op
    /// kept the session untouched (no sketch, or a call already in flight);
    /// `true` means the round ran to resolution and the outcome is in the
    /// session state.
    pub fn generate(&mut self, brief: Option<&str>) -> Result<bool> {
        if self.state.phase().is_busy() {
            return Ok(false);
        }
        if let Some(brief) = brief {
            self.state.set_brief(brief);
        }
        let Some(sketch) = self.state.sketch().cloned() else {
            return Ok(false);
        };
        if !self.state.begin_generation() {
            return Ok(false);
        }

        let selection = match self.select_markup_model() {
            Ok(selection) => selection,
            Err(message) => return self.record_failure("generation_failed", "selection", message),
        };
        self.events.emit(
            "generation_started",
            map_object(json!({
                "model": selection.model.name.clone(),
                "provider": selection.model.provider.clone(),
                "fallback_reason": selection.fallback_reason.clone(),
                "brief_present": !self.state.brief().is_empty(),
            })),
        )?;

        let brief_text = self.state.brief().to_string();
        let brief_arg = (!brief_text.is_empty()).then_some(brief_text.as_str());
        let request = build_generation_request(&sketch, brief_arg, &selection.model.name);
        let raw = match self.dispatch_markup(&selection, &request) {
            Ok(raw) => raw,
            Err((reason, message)) => {
                return self.record_failure("generation_failed", reason, message)
            }
        };

        match parse_generated_markup(&raw) {
            Ok(result) => {
                let summary = result_summary(&result);
                self.state.complete_generation(result);
                self.events.emit("generation_completed", summary)?;
            }
            Err(message) => {
                return self.record_failure("generation_failed", "malformed_output", message)
            }
        }
        Ok(true)
    }

    /// Run one refinement round against the retained result. Same no-op
    /// contract as [`Self::generate`]; an empty instruction or missing prior
    /// result never dispatches.
    pub fn refine(&mut self, instruction: &str) -> Result<bool> {
        if self.state.phase().is_busy() || instruction.trim().is_empty() {
            return Ok(false);
        }
        if !self.state.set_refine_instruction(instruction) {
            return Ok(false);
        }
        let Some(sketch) = self.state.sketch().cloned() else {
            return Ok(false);
        };
        let Some(previous) = self.state.result().cloned() else {
            return Ok(false);
        };
        if !self.state.begin_refinement() {
            return Ok(false);
        }

        let selection = match self.select_markup_model() {
            Ok(selection) => selection,
            Err(message) => return self.record_failure("refinement_failed", "selection", message),
        };
        let instruction = self.state.refine_instruction().to_string();
        self.events.emit(
            "refinement_started",
            map_object(json!({
                "model": selection.model.name.clone(),
                "provider": selection.model.provider.clone(),
                "instruction_chars": instruction.chars().count(),
            })),
        )?;

        let request =
            build_refinement_request(&sketch, &previous.html, &instruction, &selection.model.name);
        let raw = match self.dispatch_markup(&selection, &request) {
            Ok(raw) => raw,
            Err((reason, message)) => {
                return self.record_failure("refinement_failed", reason, message)
            }
        };

        match parse_generated_markup(&raw) {
            Ok(result) => {
                let summary = result_summary(&result);
                self.state.complete_refinement(result);
                self.events.emit("refinement_completed", summary)?;
            }
            Err(message) => {
                return self.record_failure("refinement_failed", "malformed_output", message)
            }
        }
        Ok(true)
    }

    /// One assistant turn. Failures never touch the session phase: the reply
    /// degrades to a fixed apology which is appended to the transcript like
    /// any other model message.
    pub fn chat(&mut self, message: &str) -> Result<String> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }

        let outcome = self.chat_dispatch(trimmed);
        self.transcript.push_user(trimmed);

        let reply = match outcome {
            Ok(text) if !text.trim().is_empty() => {
                self.events.emit(
                    "chat_turn",
                    map_object(json!({
                        "message_chars": trimmed.chars().count(),
                        "reply_chars": text.chars().count(),
                        "history_len": self.transcript.len(),
                    })),
                )?;
                text
            }
            Ok(_) => {
                self.events.emit(
                    "chat_turn",
                    map_object(json!({
                        "message_chars": trimmed.chars().count(),
                        "empty_reply": true,
                    })),
                )?;
                CHAT_EMPTY_REPLY_FALLBACK.to_string()
            }
            Err(err) => {
                self.events.emit(
                    "chat_failed",
                    map_object(json!({
                        "error": error_chain_text(&err, 512),
                    })),
                )?;
                CHAT_TRANSPORT_APOLOGY.to_string()
            }
        };

        self.transcript.push_model(reply.clone());
        self.track_context()?;
        Ok(reply)
    }

    /// Estimate assistant-history context usage against the chat model's
    /// window. History is never truncated; this is the warn side of that
    /// trade.
    pub fn track_context(&self) -> Result<ContextUsage> {
        let used_tokens = estimate_tokens_from_chars(self.transcript.char_len());
        let model_name = self
            .chat_model
            .as_deref()
            .unwrap_or("gemini-2.5-flash")
            .to_string();
        let max_tokens = self
            .model_selector
            .registry
            .get(&model_name)
            .and_then(|spec| spec.context_window)
            .unwrap_or(8192);
        let pct = if max_tokens == 0 {
            0.0
        } else {
            used_tokens as f64 / max_tokens as f64
        }
        .clamp(0.0, 1.0);
        let alert_level = if pct >= 0.95 {
            "critical"
        } else if pct >= 0.9 {
            "high"
        } else if pct >= 0.75 {
            "medium"
        } else {
            "none"
        }
        .to_string();

        self.events.emit(
            "context_window_update",
            map_object(json!({
                "model": model_name,
                "used_tokens": used_tokens,
                "max_tokens": max_tokens,
                "pct": pct,
                "alert_level": alert_level,
            })),
        )?;

        Ok(ContextUsage {
            used_tokens,
            max_tokens,
            pct,
            alert_level,
        })
    }

    pub fn reset(&mut self) -> Result<()> {
        self.state.reset();
        self.events.emit("session_reset", EventPayload::new())?;
        Ok(())
    }

    pub fn finish(&self) -> Result<()> {
        self.events.emit(
            "session_finished",
            map_object(json!({
                "phase": self.state.phase().as_str(),
                "rounds": self.state.rounds().len(),
            })),
        )?;
        Ok(())
    }

    fn select_markup_model(&self) -> Result<ModelSelection, String> {
        self.model_selector
            .select(self.markup_model.as_deref(), "vision")
    }

    /// Credential gate plus the actual call. Errors come back tagged with
    /// the failure reason recorded in events.
    fn dispatch_markup(
        &self,
        selection: &ModelSelection,
        request: &MarkupRequest,
    ) -> Result<String, (&'static str, String)> {
        let provider = self
            .providers
            .get(&selection.model.provider)
            .ok_or_else(|| {
                (
                    "no_provider",
                    format!("No provider registered for '{}'.", selection.model.provider),
                )
            })?;
        if !provider.credential_ready() {
            return Err(("missing_key", MISSING_KEY_MESSAGE.to_string()));
        }
        provider
            .generate_markup(request)
            .map_err(|err| ("transport", error_chain_text(&err, 512)))
    }

    fn chat_dispatch(&self, message: &str) -> Result<String> {
        let selection = self
            .model_selector
            .select(self.chat_model.as_deref(), "text")
            .map_err(anyhow::Error::msg)?;
        let provider = self
            .providers
            .get(&selection.model.provider)
            .with_context(|| format!("No provider registered for '{}'.", selection.model.provider))?;
        if !provider.credential_ready() {
            bail!("{MISSING_KEY_MESSAGE}");
        }
        let request = build_chat_request(self.transcript.messages(), message, &selection.model.name);
        provider.chat(&request)
    }

    fn record_failure(
        &mut self,
        event_type: &str,
        reason: &'static str,
        message: String,
    ) -> Result<bool> {
        self.state.fail(message.clone());
        self.events.emit(
            event_type,
            map_object(json!({
                "reason": reason,
                "error": message,
            })),
        )?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn result_summary(result: &GeneratedResult) -> EventPayload {
    map_object(json!({
        "html_chars": result.html.chars().count(),
        "react_chars": result.react.chars().count(),
        "explanation_chars": result.explanation.chars().count(),
    }))
}

fn estimate_tokens_from_chars(chars: usize) -> u64 {
    ((chars as f64) / 4.0).ceil() as u64
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn map_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
