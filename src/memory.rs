use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// How many facts and clues of each kind make it into the next prompt.
pub const MEMORY_LINE_LIMIT: usize = 8;

// One detective question and the suspect's answer, plus whatever the
// backend said the answer surfaced. Turns are append-only per suspect;
// insertion order is chronological and drives the recency window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub revealed_facts: Vec<String>,
    #[serde(default)]
    pub implied_clues: Vec<String>,
}

// Everything one suspect has already given up across turns, deduplicated
// and in first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuspectMemory {
    pub revealed_facts: Vec<String>,
    pub implied_clues: Vec<String>,
}

impl SuspectMemory {
    fn merge(&mut self, revealed_facts: &[String], implied_clues: &[String]) {
        push_unique(&mut self.revealed_facts, revealed_facts);
        push_unique(&mut self.implied_clues, implied_clues);
    }
}

// Exact-equality dedup, blank items skipped, first-seen order preserved.
fn push_unique(into: &mut Vec<String>, items: &[String]) {
    for item in items {
        if item.trim().is_empty() || into.iter().any(|existing| existing == item) {
            continue;
        }
        into.push(item.clone());
    }
}

// Per-suspect memory map. Bounds prompt growth while keeping a suspect
// from contradicting facts it already admitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryBank {
    entries: HashMap<String, SuspectMemory>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_turn(
        &mut self,
        suspect: &str,
        revealed_facts: &[String],
        implied_clues: &[String],
    ) {
        self.entries
            .entry(suspect.to_string())
            .or_default()
            .merge(revealed_facts, implied_clues);
    }

    pub fn get(&self, suspect: &str) -> Option<&SuspectMemory> {
        self.entries.get(suspect)
    }

    // Renders the first `limit` facts and clues as bullet lists for the
    // next prompt. Insertion order, not recency order.
    pub fn format_memory(&self, suspect: &str, limit: usize) -> String {
        let empty = SuspectMemory::default();
        let memory = self.entries.get(suspect).unwrap_or(&empty);
        format!(
            "Facts already admitted:\n{}\nClues already implied:\n{}",
            bullet_list(&memory.revealed_facts, limit),
            bullet_list(&memory.implied_clues, limit)
        )
    }
}

fn bullet_list(items: &[String], limit: usize) -> String {
    if items.is_empty() {
        return "- (none yet)".to_string();
    }
    items
        .iter()
        .take(limit)
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
