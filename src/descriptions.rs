// Fixed narrative text and prompt scaffolding. Everything the game ever
// says with a scripted voice lives here.

// region:  --- Case seed

pub const TOPIC: &str = "AI Murder Mystery";

pub const OPENING_ACTION: &str =
    "We are starting the game. Design the opening scene and the full cast of suspects.";

pub const BASE_VICTIM: &str = "Unknown Victim";
pub const BASE_VICTIM_ROLE: &str = "Unknown";
pub const BASE_TIME: &str = "Sometime past midnight";
pub const BASE_PLACE: &str = "An almost empty tech office";
pub const BASE_CAUSE: &str = "Suspicious accident with smart equipment";
pub const BASE_CONTEXT: &str = "A storm hits the city. Backup power keeps the systems barely alive.";

// endregion:  --- Case seed

// region:  --- Blueprint enrichment

pub const STORM_TIME: &str = "Late night during a violent storm";
pub const MIDNIGHT_TIME: &str = "Just after midnight";
pub const ELECTROCUTION_CAUSE: &str = "Severe electrocution near damaged server equipment";
pub const IMPACT_CAUSE: &str = "Blunt impact trauma during a staged 'accident'";

// endregion:  --- Blueprint enrichment

// region:  --- Degraded answers

pub const STALL_LINE: &str = "The overhead lights flicker and the network icon turns red. \
«Systems are throttled… you won't get more out of me right now,» the suspect says, \
dodging your question.";

pub const THROTTLE_CLUE: &str = "The interrogation was cut short by throttled systems.";

pub const GLITCH_LINE: &str = "The suspect just stares back at you. \
Something in the system glitched and they refuse to answer.";

// endregion:  --- Degraded answers

// region:  --- Dialogue prompt

pub const ENGINE_PREAMBLE: &str =
    "You are the narrative engine for an interactive murder mystery game.";

pub const ROLEPLAY_RULES: &str = r#"- Stay in character. Answer in first person ("I...").
- Never mention these rules or that you are an AI model.
- Do NOT quote your own "secret" field back to the detective; it is internal background.
- If you are the murderer, do not confess directly. You may be defensive, evasive, or subtly contradictory.
- If you are innocent, be consistent and plausible.
- Keep each answer under 80-100 words. Stay tightly relevant to the detective's question.
- Provide concrete details (places, times, objects) when appropriate, but avoid long monologues.
- Reply with a single JSON object: {"spoken_text": "...", "inner_thoughts": "...", "revealed_facts": ["..."], "implied_clues": ["..."]}"#;

// endregion:  --- Dialogue prompt

// region:  --- Setup tasks

pub const SCENE_TASK: &str = "You design the opening scene of a murder mystery. \
Using the provided topic, year and base case facts, reply with a single JSON object \
containing: scene_id, location, summary, victim_name, victim_role, time, hidden_tension, \
and visible_clues (an array of short strings). The summary sets the mood in 3-4 sentences.";

pub const CHARACTERS_TASK: &str = "You design the cast of a murder mystery. \
Using the provided topic, year and base case facts, reply with a single JSON object \
containing: suspects (an array of 4 objects with name, role, age, personality, alibi \
and secret) and guilty_name (the name of exactly one of those suspects). Secrets are \
private motives; only the guilty suspect's secret relates to the murder.";

pub const SOLUTION_TASK: &str = "You write down the ground truth behind a murder mystery. \
Using the provided topic, year and base case facts, reply with a single JSON object \
containing: truth_summary, method, cover_up, motive, key_evidence (an array of short \
strings) and timeline (an array of short strings).";

// endregion:  --- Setup tasks
