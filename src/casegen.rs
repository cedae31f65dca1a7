// Turning the case-generation collaborator's output into a playable
// case. Artifacts arrive as loose text; each JSON object is located by a
// required key, and everything missing falls back to the base facts.

use crate::ai::CaseBackend;
use crate::ai_response::{extract_json_object_with_key, first_string, string_list};
use crate::case::{Case, Solution, Suspect};
use crate::descriptions;
use crate::error::GameError;
use crate::session::Session;
use crate::settings::Settings;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

// Inputs for one case-generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSeed {
    pub topic: String,
    pub current_year: String,
    pub game_state: String,
    pub player_action: String,
}

impl CaseSeed {
    // The fixed opening instruction plus the base case facts as JSON.
    pub fn opening(current_year: String) -> Result<Self, serde_json::Error> {
        Ok(CaseSeed {
            topic: descriptions::TOPIC.to_string(),
            current_year,
            game_state: serde_json::to_string(&base_case_facts())?,
            player_action: descriptions::OPENING_ACTION.to_string(),
        })
    }
}

pub fn base_case_facts() -> Value {
    json!({
        "victim": descriptions::BASE_VICTIM,
        "time": descriptions::BASE_TIME,
        "place": descriptions::BASE_PLACE,
        "cause": descriptions::BASE_CAUSE,
        "context": descriptions::BASE_CONTEXT,
    })
}

// The JSON objects recovered from a generation run, each located by its
// identifying key. Only the characters object is mandatory.
#[derive(Debug, Clone, Default)]
pub struct CaseArtifacts {
    pub scene: Option<Value>,
    pub characters: Option<Value>,
    pub images: Option<Value>,
    pub solution: Option<Value>,
}

pub fn collect_artifacts(raw_outputs: &[String]) -> CaseArtifacts {
    let mut artifacts = CaseArtifacts::default();
    for text in raw_outputs {
        if artifacts.scene.is_none() {
            artifacts.scene = extract_json_object_with_key(text, "scene_id");
        }
        if artifacts.characters.is_none() {
            artifacts.characters = extract_json_object_with_key(text, "suspects");
        }
        if artifacts.images.is_none() {
            artifacts.images = extract_json_object_with_key(text, "suspect_images");
        }
        if artifacts.solution.is_none() {
            artifacts.solution = extract_json_object_with_key(text, "truth_summary");
        }
    }
    artifacts
}

pub fn build_case(
    artifacts: &CaseArtifacts,
    catalog: &[PathBuf],
) -> Result<(Case, Option<Solution>), GameError> {
    let characters = artifacts
        .characters
        .as_ref()
        .ok_or_else(|| GameError::CaseGeneration("no suspects object in any artifact".into()))?;
    let suspects_raw = characters
        .get("suspects")
        .and_then(Value::as_array)
        .ok_or_else(|| GameError::CaseGeneration("suspects is not an array".into()))?;
    if suspects_raw.is_empty() {
        return Err(GameError::CaseGeneration("the suspect roster is empty".into()));
    }

    let mut case = Case {
        victim: descriptions::BASE_VICTIM.to_string(),
        victim_role: descriptions::BASE_VICTIM_ROLE.to_string(),
        time: descriptions::BASE_TIME.to_string(),
        place: descriptions::BASE_PLACE.to_string(),
        cause: descriptions::BASE_CAUSE.to_string(),
        context: descriptions::BASE_CONTEXT.to_string(),
        hidden_tension: None,
        suspects: Vec::new(),
        guilty_name: String::new(),
    };
    if let Some(scene) = &artifacts.scene {
        enrich_from_blueprint(&mut case, scene);
    }

    // Priority order for the guilt signal: the explicit top-level
    // guilty_name, then the first suspect flagged guilty in raw data.
    let guilty_name = first_string(characters, &["guilty_name"])
        .or_else(|| {
            suspects_raw.iter().find_map(|record| {
                record
                    .get("guilty")
                    .and_then(Value::as_bool)
                    .filter(|flag| *flag)
                    .and_then(|_| record.get("name").and_then(Value::as_str))
                    .map(str::to_string)
            })
        })
        .ok_or_else(|| GameError::CaseGeneration("no guilty suspect identified".into()))?;

    let mapping = artifacts
        .images
        .as_ref()
        .and_then(|value| value.get("suspect_images"))
        .and_then(Value::as_object);
    let mut assigned: HashSet<&Path> = HashSet::new();

    for record in suspects_raw {
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();
        let image_path = assign_image(&name, mapping, catalog, &mut assigned);
        case.suspects.push(Suspect {
            role: first_string(record, &["role"]).unwrap_or_default(),
            age: parse_age(record),
            personality: first_string(record, &["personality"]).unwrap_or_default(),
            alibi: first_string(record, &["alibi"]).unwrap_or_default(),
            secret: first_string(record, &["secret", "secret_motivation"]).unwrap_or_default(),
            guilty: name == guilty_name,
            image_path,
            name,
        });
    }
    case.guilty_name = guilty_name;
    case.validate()?;

    let solution = artifacts.solution.as_ref().map(parse_solution);
    Ok((case, solution))
}

fn enrich_from_blueprint(case: &mut Case, scene: &Value) {
    if let Some(location) = first_string(scene, &["location"]) {
        case.place = location;
    }
    if let Some(victim) = first_string(scene, &["victim_name"]) {
        case.victim = victim;
    }
    if let Some(role) = first_string(scene, &["victim_role"]) {
        case.victim_role = role;
    }
    if let Some(tension) = first_string(scene, &["hidden_tension"]) {
        case.hidden_tension = Some(tension);
    }

    let summary = first_string(scene, &["summary"]);
    if let Some(time) = first_string(scene, &["time"]) {
        case.time = time;
    } else if let Some(summary) = &summary {
        // The blueprint does not always carry a time; derive a nicer one
        // from the summary wording.
        let low = summary.to_lowercase();
        if low.contains("storm") {
            case.time = descriptions::STORM_TIME.to_string();
        } else if low.contains("midnight") {
            case.time = descriptions::MIDNIGHT_TIME.to_string();
        }
    }
    if let Some(summary) = summary {
        case.context = summary;
    }

    let clues = string_list(scene, "visible_clues").join(" ").to_lowercase();
    if clues.contains("electrocution") {
        case.cause = descriptions::ELECTROCUTION_CAUSE.to_string();
    } else if clues.contains("impact") || clues.contains("trauma") {
        case.cause = descriptions::IMPACT_CAUSE.to_string();
    }
}

fn parse_age(record: &Value) -> Option<u8> {
    match record.get("age") {
        Some(Value::Number(number)) => number.as_u64().and_then(|age| u8::try_from(age).ok()),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_solution(value: &Value) -> Solution {
    Solution {
        truth_summary: first_string(value, &["truth_summary"]).unwrap_or_default(),
        method: first_string(value, &["method"]),
        cover_up: first_string(value, &["cover_up"]),
        motive: first_string(value, &["motive"]),
        key_evidence: string_list(value, "key_evidence"),
        timeline: string_list(value, "timeline"),
    }
}

// Prefers the collaborator's explicit name -> file mapping, then falls
// back to a deterministic prefix scan. A file is never assigned twice.
fn assign_image<'a>(
    name: &str,
    mapping: Option<&serde_json::Map<String, Value>>,
    catalog: &'a [PathBuf],
    assigned: &mut HashSet<&'a Path>,
) -> Option<PathBuf> {
    if let Some(candidate) = mapping.and_then(|m| m.get(name)).and_then(Value::as_str) {
        if let Some(wanted) = Path::new(candidate).file_name() {
            if let Some(path) = catalog.iter().find(|path| {
                path.file_name() == Some(wanted) && !assigned.contains(path.as_path())
            }) {
                assigned.insert(path.as_path());
                return Some(path.clone());
            }
        }
        warn!("mapped portrait for {name} is not in the catalog: {candidate}");
    }

    let found = prefix_match(name, catalog, assigned)?;
    assigned.insert(found);
    Some(found.to_path_buf())
}

// First catalog entry whose file name starts with the suspect's name
// (spaces as underscores, case-insensitive) and ends in .png.
pub fn image_for<'a>(suspect_name: &str, catalog: &'a [PathBuf]) -> Option<&'a PathBuf> {
    catalog.iter().find(|path| matches_prefix(suspect_name, path))
}

fn matches_prefix(suspect_name: &str, path: &Path) -> bool {
    let prefix = suspect_name.replace(' ', "_").to_lowercase();
    let Some(file) = path.file_name().and_then(|f| f.to_str()) else {
        return false;
    };
    let lower = file.to_lowercase();
    lower.starts_with(&prefix) && lower.ends_with(".png")
}

fn prefix_match<'a>(
    name: &str,
    catalog: &'a [PathBuf],
    assigned: &HashSet<&'a Path>,
) -> Option<&'a Path> {
    catalog
        .iter()
        .map(PathBuf::as_path)
        .find(|path| !assigned.contains(path) && matches_prefix(name, path))
}

// Indexes the portrait directory. Sorted so prefix matching stays
// deterministic across runs.
pub fn scan_image_catalog(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = read_dir(dir) else {
        return Vec::new();
    };
    let mut catalog: Vec<PathBuf> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            path.is_file().then_some(path)
        })
        .collect();
    catalog.sort();
    catalog
}

// Runs the case collaborator and assembles a playable session.
pub async fn generate_session<B: CaseBackend>(
    backend: &B,
    settings: &Settings,
    catalog: &[PathBuf],
) -> Result<Session, GameError> {
    let current_year = chrono::Local::now().format("%Y").to_string();
    let seed =
        CaseSeed::opening(current_year).map_err(|e| GameError::CaseGeneration(e.to_string()))?;
    let raw_outputs = backend
        .generate_case(&seed)
        .await
        .map_err(|e| GameError::CaseGeneration(e.to_string()))?;
    let artifacts = collect_artifacts(&raw_outputs);
    let (case, solution) = build_case(&artifacts, catalog)?;
    info!(
        "case generated: victim {}, {} suspects",
        case.victim,
        case.suspects.len()
    );
    let scene = artifacts.scene.unwrap_or(Value::Null);
    let characters = artifacts.characters.unwrap_or(Value::Null);
    Ok(Session::new(
        case,
        solution,
        scene,
        characters,
        settings.shared_secrets,
    ))
}
