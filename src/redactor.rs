// Spoiler filtering for everything that crosses the backend boundary.
//
// The roster handed to the dialogue collaborator must never name the
// culprit or carry another suspect's secret. These functions deep-copy
// rather than mutate, and fail soft (empty object) on unexpected shapes:
// a redaction problem must never block a question from being answered.

use serde_json::{Map, Value};

// Top-level keys that could name the culprit or the truth outright.
const TOP_LEVEL_SPOILERS: [&str; 6] = [
    "guilty_name",
    "murderer",
    "solution",
    "case_solution",
    "truth",
    "truth_summary",
];

// Per-suspect guilt indicators.
const GUILT_FLAGS: [&str; 3] = ["guilty", "is_guilty", "culpable"];

// Per-suspect private background.
const SECRET_FIELDS: [&str; 2] = ["secret", "secret_motivation"];

// Produces the sanitized roster for one suspect's turn. The active
// suspect keeps their own secret so the backend can voice them
// consistently; with `redact_other_secrets` every other secret is
// stripped along with all guilt markers.
pub fn redact_characters(
    characters: &Value,
    active_suspect: &str,
    redact_other_secrets: bool,
) -> Value {
    let Some(object) = characters.as_object() else {
        return Value::Object(Map::new());
    };
    let mut safe = object.clone();
    for key in TOP_LEVEL_SPOILERS {
        safe.remove(key);
    }

    if let Some(Value::Array(suspects)) = safe.get_mut("suspects") {
        for entry in suspects.iter_mut() {
            let Some(record) = entry.as_object_mut() else {
                continue;
            };
            for key in GUILT_FLAGS {
                record.remove(key);
            }
            if redact_other_secrets {
                let name = record
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if name != active_suspect {
                    for key in SECRET_FIELDS {
                        record.remove(key);
                    }
                }
            }
        }
    }

    Value::Object(safe)
}

// Deep-copies the scene blueprint and makes sure the speaker is listed
// among the characters present. Additive only: authored scene data is
// never removed or rewritten.
pub fn redact_scene(scene: &Value, active_suspect: &str) -> Value {
    let Some(object) = scene.as_object() else {
        return Value::Object(Map::new());
    };
    let mut safe = object.clone();
    let present = safe
        .entry("present_characters")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(names) = present {
        let listed = names.iter().any(|n| n.as_str() == Some(active_suspect));
        if !listed {
            names.push(Value::String(active_suspect.to_string()));
        }
    }
    Value::Object(safe)
}
