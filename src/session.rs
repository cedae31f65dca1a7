use crate::ai::DialogueBackend;
use crate::ai_response::{DialoguePrompt, DialogueReply, strip_html_tags, unescape_entities};
use crate::case::{Case, Solution};
use crate::descriptions;
use crate::error::{BackendError, GameError};
use crate::memory::{DialogueTurn, MEMORY_LINE_LIMIT, MemoryBank};
use crate::redactor::{redact_characters, redact_scene};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum_macros::Display;
use uuid::Uuid;

// Global question budget for one investigation.
pub const TOTAL_QUESTIONS: u32 = 10;

// How many prior turns are replayed verbatim in the prompt.
pub const RECENT_TURN_WINDOW: usize = 3;

// Where the investigation currently stands. Always derived from
// GameState, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    Asking,
    MustAccuse,
    Closed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub remaining_questions: u32,
    pub game_over: bool,
    pub accused: Option<String>,
    pub outcome: Option<Outcome>,
    failed: bool,
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            remaining_questions: TOTAL_QUESTIONS,
            game_over: false,
            accused: None,
            outcome: None,
            failed: false,
        }
    }

    // The read-only state entered when case generation fails. Only a
    // full restart leaves it.
    pub fn failed() -> Self {
        GameState {
            remaining_questions: 0,
            game_over: true,
            accused: None,
            outcome: None,
            failed: true,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.failed {
            Phase::Failed
        } else if self.game_over {
            Phase::Closed
        } else if self.remaining_questions == 0 {
            Phase::MustAccuse
        } else {
            Phase::Asking
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

// The verdict. Created exactly once per session, never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub won: bool,
    pub accused: String,
    pub guilty: String,
    pub epilogue: String,
}

// One investigation: the case, the ground truth, the per-suspect dialogue
// and memory, and the state machine gating questions and the accusation.
// Owned by a single control thread; a restart discards the whole value.
pub struct Session {
    case: Case,
    solution: Option<Solution>,
    scene: Value,
    characters: Value,
    histories: HashMap<String, Vec<DialogueTurn>>,
    memory: MemoryBank,
    state: GameState,
    shared_secrets: bool,
    epoch: Uuid,
}

impl Session {
    pub fn new(
        case: Case,
        solution: Option<Solution>,
        scene: Value,
        characters: Value,
        shared_secrets: bool,
    ) -> Self {
        let histories = case
            .suspects
            .iter()
            .map(|s| (s.name.clone(), Vec::new()))
            .collect();
        Session {
            case,
            solution,
            scene,
            characters,
            histories,
            memory: MemoryBank::new(),
            state: GameState::new(),
            shared_secrets,
            epoch: Uuid::new_v4(),
        }
    }

    // Placeholder session for a failed generation run; every play action
    // is rejected until a restart replaces it.
    pub fn failed() -> Self {
        Session {
            case: Case::default(),
            solution: None,
            scene: Value::Null,
            characters: Value::Null,
            histories: HashMap::new(),
            memory: MemoryBank::new(),
            state: GameState::failed(),
            shared_secrets: false,
            epoch: Uuid::new_v4(),
        }
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    // Identifies this session's lifetime. A backend result produced
    // against an older epoch belongs to a discarded session and must be
    // dropped, not applied.
    pub fn epoch(&self) -> Uuid {
        self.epoch
    }

    pub fn history(&self, suspect: &str) -> &[DialogueTurn] {
        self.histories
            .get(suspect)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn memory(&self) -> &MemoryBank {
        &self.memory
    }

    // Legality checks plus prompt assembly. Returns None for a blank
    // question: no budget spent, no backend call.
    pub fn begin_question(
        &self,
        suspect: &str,
        question: &str,
    ) -> Result<Option<DialoguePrompt>, GameError> {
        if question.trim().is_empty() {
            return Ok(None);
        }
        match self.phase() {
            Phase::Failed => return Err(GameError::CaseUnavailable),
            Phase::Closed => return Err(GameError::CaseClosed),
            Phase::MustAccuse => return Err(GameError::QuestionsExhausted),
            Phase::Asking => {}
        }
        if self.case.suspect(suspect).is_none() {
            return Err(GameError::SuspectNotFound(suspect.to_string()));
        }
        Ok(Some(self.build_prompt(suspect, question.trim())))
    }

    // Folds the backend result into the session. Every path consumes one
    // question and yields a displayable turn; raw backend errors stop
    // here, degraded to a scripted in-character answer.
    pub fn complete_question(
        &mut self,
        suspect: &str,
        question: &str,
        result: Result<String, BackendError>,
    ) -> DialogueTurn {
        let reply = match result {
            Ok(raw) => DialogueReply::from_raw(&raw),
            Err(error) if error.is_throttle() => {
                warn!("dialogue backend throttled: {error}");
                DialogueReply::throttled()
            }
            Err(error) => {
                warn!("dialogue backend failed: {error}");
                DialogueReply::glitched()
            }
        };

        self.state.remaining_questions = self.state.remaining_questions.saturating_sub(1);
        if self.state.remaining_questions == 0 {
            info!("question budget exhausted; an accusation is required");
        }

        let answer = strip_html_tags(&unescape_entities(&reply.spoken_text));
        let turn = DialogueTurn {
            question: question.trim().to_string(),
            answer,
            revealed_facts: reply.revealed_facts,
            implied_clues: reply.implied_clues,
        };
        self.memory
            .record_turn(suspect, &turn.revealed_facts, &turn.implied_clues);
        self.histories
            .entry(suspect.to_string())
            .or_default()
            .push(turn.clone());
        turn
    }

    // One full exchange against a backend: check, call, fold.
    pub async fn submit_question<B: DialogueBackend>(
        &mut self,
        backend: &B,
        suspect: &str,
        question: &str,
    ) -> Result<Option<DialogueTurn>, GameError> {
        let Some(prompt) = self.begin_question(suspect, question)? else {
            return Ok(None);
        };
        let result = backend.generate(&prompt).await;
        Ok(Some(self.complete_question(suspect, question, result)))
    }

    // Ends the game. Legal while asking or out of questions, always
    // closes the case regardless of correctness, and is rejected once
    // closed: the first Outcome stands.
    pub fn accuse(&mut self, accused: &str) -> Result<Outcome, GameError> {
        let phase = self.phase();
        match phase {
            Phase::Failed => return Err(GameError::CaseUnavailable),
            Phase::Closed => return Err(GameError::CaseClosed),
            Phase::Asking | Phase::MustAccuse => {}
        }
        let guilty = self.case.guilty_name.clone();
        let won = accused == guilty;
        let epilogue = build_epilogue(accused, &guilty, won, self.solution.as_ref());
        let outcome = Outcome {
            won,
            accused: accused.to_string(),
            guilty,
            epilogue,
        };
        self.state.accused = Some(outcome.accused.clone());
        self.state.outcome = Some(outcome.clone());
        self.state.game_over = true;
        info!(
            "case closed from phase {}: accused {}, won {}",
            phase, outcome.accused, outcome.won
        );
        Ok(outcome)
    }

    fn build_prompt(&self, suspect: &str, question: &str) -> DialoguePrompt {
        let roster = redact_characters(&self.characters, suspect, !self.shared_secrets);
        let scene = redact_scene(&self.scene, suspect);

        // Public facts only: the context summary and the hidden tension
        // stay out of the prompt.
        let instructions = format!(
            "{preamble}\n\n\
             CASE (public facts):\n\
             - Victim: {victim}\n\
             - Time: {time}\n\
             - Place: {place}\n\
             - Cause of death: {cause}\n\n\
             SUSPECTS (sanitized roster; your own secret is included for internal consistency):\n\
             {roster}\n\n\
             SCENE:\n\
             {scene}\n\n\
             ROLEPLAY RULES:\n\
             - You are now role-playing as ONE suspect, whose name is: {suspect}\n\
             {rules}",
            preamble = descriptions::ENGINE_PREAMBLE,
            victim = self.case.victim,
            time = self.case.time,
            place = self.case.place,
            cause = self.case.cause,
            roster = serde_json::to_string_pretty(&roster).unwrap_or_else(|_| "{}".to_string()),
            scene = serde_json::to_string_pretty(&scene).unwrap_or_else(|_| "{}".to_string()),
            suspect = suspect,
            rules = descriptions::ROLEPLAY_RULES,
        );

        let memory = self.memory.format_memory(suspect, MEMORY_LINE_LIMIT);
        let recent = format_recent_turns(self.history(suspect), RECENT_TURN_WINDOW);
        let player_action = format!(
            "INTERROGATION TARGET: {suspect}\n\n\
             WHAT {suspect} HAS ALREADY GIVEN UP:\n{memory}\n\n\
             RECENT DIALOGUE (detective and {suspect}):\n{recent}\n\n\
             LATEST QUESTION FROM THE DETECTIVE (ANSWER THIS ONE):\n{question}"
        );

        DialoguePrompt::new(instructions, player_action)
    }
}

// The last `max_turns` turns as alternating detective/suspect lines.
fn format_recent_turns(history: &[DialogueTurn], max_turns: usize) -> String {
    if history.is_empty() {
        return "No prior questions yet.".to_string();
    }
    let start = history.len().saturating_sub(max_turns);
    let mut lines = Vec::new();
    for turn in &history[start..] {
        if !turn.question.is_empty() {
            lines.push(format!("Detective: {}", turn.question));
        }
        if !turn.answer.is_empty() {
            lines.push(format!("Suspect: {}", turn.answer));
        }
    }
    if lines.is_empty() {
        "No prior questions yet.".to_string()
    } else {
        lines.join("\n")
    }
}

fn build_epilogue(accused: &str, guilty: &str, won: bool, solution: Option<&Solution>) -> String {
    let verdict = if won {
        format!(
            "You lay out the last contradiction, and the room goes quiet.\n\n\
             {guilty} stops arguing and starts calculating. The storm outside fades, \
             but the weight of the evidence doesn't. Logs, timelines, access patterns: \
             all of it lines up in a single, sharp line pointing at them.\n\n\
             Security walks them out. The office hums back to life, one monitor at a time."
        )
    } else {
        format!(
            "You point the finger at {accused}, and the room tenses. \
             For a moment it almost fits. Almost.\n\n\
             But the loose ends remain. Somewhere in the logs, in the access patterns, \
             in the off-by-one timestamp, {guilty} slips away clean.\n\n\
             The storm passes. The case closes on paper, but not in your head."
        )
    };

    match solution.map(reveal_block) {
        Some(reveal) if !reveal.is_empty() => format!("{verdict}\n\n{reveal}"),
        _ => verdict,
    }
}

// Up to five bullets per list; sections with nothing to say are skipped.
fn reveal_block(solution: &Solution) -> String {
    const REVEAL_BULLETS: usize = 5;
    let mut sections = Vec::new();
    if !solution.truth_summary.trim().is_empty() {
        sections.push(format!(
            "What really happened: {}",
            solution.truth_summary.trim()
        ));
    }
    for (label, field) in [
        ("Method", &solution.method),
        ("Cover-up", &solution.cover_up),
        ("Motive", &solution.motive),
    ] {
        if let Some(text) = field {
            if !text.trim().is_empty() {
                sections.push(format!("{label}: {}", text.trim()));
            }
        }
    }
    for (label, items) in [
        ("Key evidence", &solution.key_evidence),
        ("Timeline", &solution.timeline),
    ] {
        if !items.is_empty() {
            let bullets = items
                .iter()
                .take(REVEAL_BULLETS)
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("{label}:\n{bullets}"));
        }
    }
    sections.join("\n\n")
}
