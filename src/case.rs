use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// A non-victim character in the case. `guilty` is derived from the case's
// `guilty_name` during generation; `secret` is private background that the
// redactor strips whenever another suspect is being voiced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suspect {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub alibi: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub guilty: bool,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

impl Suspect {
    // Two-letter monogram for the roster when no portrait was generated.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .take(2)
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

// The murder case. Immutable after creation, apart from suspect portraits
// which may be filled in once the image collaborator delivers files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Case {
    pub victim: String,
    pub victim_role: String,
    pub time: String,
    pub place: String,
    pub cause: String,
    pub context: String,
    #[serde(default)]
    pub hidden_tension: Option<String>,
    pub suspects: Vec<Suspect>,
    pub guilty_name: String,
}

impl Case {
    pub fn suspect(&self, name: &str) -> Option<&Suspect> {
        self.suspects.iter().find(|s| s.name == name)
    }

    pub fn suspect_names(&self) -> Vec<&str> {
        self.suspects.iter().map(|s| s.name.as_str()).collect()
    }

    // Exactly one suspect carries the guilt flag, and it matches
    // `guilty_name`.
    pub fn validate(&self) -> Result<(), GameError> {
        let flagged: Vec<&Suspect> = self.suspects.iter().filter(|s| s.guilty).collect();
        match flagged.as_slice() {
            [culprit] if culprit.name == self.guilty_name => Ok(()),
            [] => Err(GameError::InvalidCase(
                "no suspect is marked guilty".to_string(),
            )),
            [culprit] => Err(GameError::InvalidCase(format!(
                "guilty flag on '{}' does not match guilty_name '{}'",
                culprit.name, self.guilty_name
            ))),
            _ => Err(GameError::InvalidCase(
                "more than one suspect is marked guilty".to_string(),
            )),
        }
    }
}

// Ground truth behind the case, used only for the post-accusation reveal.
// May be absent, in which case the reveal degrades to the plain verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Solution {
    pub truth_summary: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub cover_up: Option<String>,
    #[serde(default)]
    pub motive: Option<String>,
    #[serde(default)]
    pub key_evidence: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<String>,
}
