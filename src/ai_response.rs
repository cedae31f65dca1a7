// src/ai_response.rs
//
// Defensive adapter for everything the text-generation collaborator sends
// back: JSON objects may arrive embedded in prose or fenced code blocks,
// and answer text may carry HTML baggage.

use crate::descriptions;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Candidate fields holding the spoken answer, tried in priority order.
const SPOKEN_FIELDS: [&str; 3] = ["spoken_text", "answer", "text"];

// Raw-text fallback answers are clipped to this many characters.
const RAW_ANSWER_LIMIT: usize = 400;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

// Payload for one dialogue exchange, in the shape the collaborator sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialoguePrompt {
    pub instructions: String,
    pub player_action: String,
}

impl DialoguePrompt {
    pub fn new(instructions: String, player_action: String) -> Self {
        DialoguePrompt {
            instructions,
            player_action,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// The structured reply of the dialogue collaborator. Everything but the
// spoken line is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueReply {
    pub spoken_text: String,
    #[serde(default)]
    pub inner_thoughts: Option<String>,
    #[serde(default)]
    pub revealed_facts: Vec<String>,
    #[serde(default)]
    pub implied_clues: Vec<String>,
}

impl DialogueReply {
    // Parses a raw backend reply. The first well-formed JSON object with a
    // spoken line wins; otherwise the prose itself becomes the answer.
    pub fn from_raw(raw: &str) -> Self {
        if let Some(object) = extract_json_object_with_key(raw, "spoken_text") {
            if let Some(spoken) = first_string(&object, &SPOKEN_FIELDS) {
                return DialogueReply {
                    spoken_text: spoken,
                    inner_thoughts: object
                        .get("inner_thoughts")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    revealed_facts: string_list(&object, "revealed_facts"),
                    implied_clues: string_list(&object, "implied_clues"),
                };
            }
        }

        let trimmed = raw.trim();
        let mut spoken: String = trimmed.chars().take(RAW_ANSWER_LIMIT).collect();
        if trimmed.chars().count() > RAW_ANSWER_LIMIT {
            spoken.push_str("...");
        }
        DialogueReply {
            spoken_text: spoken,
            ..Default::default()
        }
    }

    // Scripted stand-in when the collaborator is rate limited.
    pub fn throttled() -> Self {
        DialogueReply {
            spoken_text: descriptions::STALL_LINE.to_string(),
            implied_clues: vec![descriptions::THROTTLE_CLUE.to_string()],
            ..Default::default()
        }
    }

    // Scripted stand-in for any other backend failure.
    pub fn glitched() -> Self {
        DialogueReply {
            spoken_text: descriptions::GLITCH_LINE.to_string(),
            ..Default::default()
        }
    }
}

// Finds and parses the FIRST well-formed JSON object containing
// `required_key`, tolerating prose and fenced code blocks around it.
pub fn extract_json_object_with_key(text: &str, required_key: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    let cleaned = text.replace("```json", "").replace("```", "");
    for (start, _) in cleaned.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if value.is_object() && value.get(required_key).is_some() {
                return Some(value);
            }
        }
    }
    None
}

// First non-empty string among `candidates`, in order.
pub fn first_string(object: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|field| {
        object
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

pub fn string_list(object: &Value, field: &str) -> Vec<String> {
    object
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// Removes any HTML tags and collapses the leftover whitespace.
pub fn strip_html_tags(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped = HTML_TAG.replace_all(text, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Resolves the common named HTML entities plus decimal numeric forms.
// Anything unrecognized passes through untouched.
pub fn unescape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';') {
            Some(end) if end > 1 && end <= 8 => {
                match resolve_entity(&tail[1..end]) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => entity
            .strip_prefix('#')
            .and_then(|digits| digits.parse::<u32>().ok())
            .and_then(char::from_u32),
    }
}
