use uuid::Uuid;

use crate::contract::GeneratedResult;

use super::phase::SessionPhase;
use super::rounds::RoundRecord;

/// One user-selected sketch, ready for transmission. Replaced wholesale on a
/// new selection, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchImage {
    /// Where the sketch came from, for display (a file path in the CLI).
    pub source: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// Base64 payload. May still carry a `data:image/...;base64,` prefix;
    /// the request builder strips it before transmission.
    pub payload: String,
}

/// The single state holder for one interactive session.
///
/// All transition methods are no-ops (returning `false`) when their
/// preconditions do not hold, so a second invocation while a call is in
/// flight, or an invocation with missing inputs, never dispatches anything
/// and never changes phase. State is replaced, not merged: each transition
/// applies atomically from the caller's perspective once the external call
/// resolves.
#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: String,
    phase: SessionPhase,
    sketch: Option<SketchImage>,
    result: Option<GeneratedResult>,
    rounds: Vec<RoundRecord>,
    brief: String,
    refine_instruction: String,
    error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            phase: SessionPhase::Idle,
            sketch: None,
            result: None,
            rounds: Vec::new(),
            brief: String::new(),
            refine_instruction: String::new(),
            error: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn sketch(&self) -> Option<&SketchImage> {
        self.sketch.as_ref()
    }

    pub fn result(&self) -> Option<&GeneratedResult> {
        self.result.as_ref()
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn brief(&self) -> &str {
        &self.brief
    }

    pub fn refine_instruction(&self) -> &str {
        &self.refine_instruction
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Store or replace the sketch. Selecting a sketch never auto-starts
    /// generation; it clears any stale error so the surface reflects the new
    /// input.
    pub fn store_sketch(&mut self, sketch: SketchImage) -> bool {
        if self.phase.is_busy() {
            return false;
        }
        self.sketch = Some(sketch);
        self.error = None;
        true
    }

    pub fn set_brief(&mut self, brief: &str) -> bool {
        if self.phase.is_busy() {
            return false;
        }
        self.brief = brief.trim().to_string();
        true
    }

    pub fn set_refine_instruction(&mut self, instruction: &str) -> bool {
        if self.phase.is_busy() {
            return false;
        }
        self.refine_instruction = instruction.trim().to_string();
        true
    }

    /// Enter `Analyzing`. Requires a stored sketch and no in-flight call.
    /// Allowed from `Error` as well: a failed generation is re-invoked
    /// explicitly by the user, never retried automatically.
    pub fn begin_generation(&mut self) -> bool {
        if self.phase.is_busy() || self.sketch.is_none() {
            return false;
        }
        self.phase = SessionPhase::Analyzing;
        self.error = None;
        true
    }

    pub fn complete_generation(&mut self, result: GeneratedResult) -> bool {
        if self.phase != SessionPhase::Analyzing {
            return false;
        }
        let instruction = (!self.brief.is_empty()).then(|| self.brief.clone());
        self.record_round(instruction, result);
        self.phase = SessionPhase::Success;
        self.error = None;
        true
    }

    /// Enter `Refining`. Requires a prior successful result and a non-empty
    /// instruction; legal from both `Success` and `Error`, since `Error` is
    /// not terminal when earlier output exists.
    pub fn begin_refinement(&mut self) -> bool {
        if self.phase.is_busy()
            || self.result.is_none()
            || self.refine_instruction.trim().is_empty()
        {
            return false;
        }
        self.phase = SessionPhase::Refining;
        self.error = None;
        true
    }

    pub fn complete_refinement(&mut self, result: GeneratedResult) -> bool {
        if self.phase != SessionPhase::Refining {
            return false;
        }
        let instruction = Some(self.refine_instruction.clone());
        self.record_round(instruction, result);
        self.refine_instruction.clear();
        self.phase = SessionPhase::Success;
        self.error = None;
        true
    }

    /// Record a failed call. The prior result is retained so refinement can
    /// still be attempted from `Error`.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.phase.is_busy() {
            return false;
        }
        self.phase = SessionPhase::Error;
        self.error = Some(message.into());
        true
    }

    /// Reinitialize every field atomically. The session id survives; it names
    /// the running session, not one sketch's lifecycle.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.sketch = None;
        self.result = None;
        self.rounds.clear();
        self.brief.clear();
        self.refine_instruction.clear();
        self.error = None;
    }

    fn record_round(&mut self, instruction: Option<String>, result: GeneratedResult) {
        let index = self.rounds.len() as u64 + 1;
        let previous_html = self.result.as_ref().map(|prev| prev.html.as_str());
        let round = RoundRecord::new(index, instruction, result.clone(), previous_html);
        self.rounds.push(round);
        self.result = Some(result);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
