// ../tests/tests.rs
use gumshoe::ai_response::{extract_json_object_with_key, strip_html_tags, unescape_entities};
use gumshoe::casegen::{CaseArtifacts, build_case, collect_artifacts, image_for, scan_image_catalog};
use gumshoe::descriptions;
use gumshoe::redactor::{redact_characters, redact_scene};
use gumshoe::*;
use serde_json::json;
use std::fs::File;
use std::sync::atomic::{AtomicUsize, Ordering};

// A dialogue collaborator that always answers with the same raw text and
// counts how often it was called.
struct ScriptedBackend {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(reply: &str) -> Self {
        ScriptedBackend {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl DialogueBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &DialoguePrompt) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

// A dialogue collaborator that always fails with the given message.
struct FailingBackend(&'static str);

impl DialogueBackend for FailingBackend {
    async fn generate(&self, _prompt: &DialoguePrompt) -> Result<String, BackendError> {
        Err(BackendError::Call(self.0.to_string()))
    }
}

fn sample_artifacts() -> CaseArtifacts {
    // The cast arrives embedded in prose with a fenced code block, the way
    // a chatty collaborator tends to deliver it.
    let characters = format!(
        "Here is the final cast.\n```json\n{}\n```\nGood luck, detective.",
        json!({
            "suspects": [
                {
                    "name": "Ben",
                    "role": "Sysadmin",
                    "age": 34,
                    "personality": "nervous, precise",
                    "alibi": "Claims he was rebooting the storage cluster",
                    "secret": "stole the research files"
                },
                {
                    "name": "Maya",
                    "role": "CTO",
                    "age": "41",
                    "personality": "icy, controlled",
                    "alibi": "Says she never left the boardroom",
                    "secret_motivation": "gambling debts"
                }
            ],
            "guilty_name": "Maya"
        })
    );
    let scene = json!({
        "scene_id": "office-night",
        "location": "Meridian Labs HQ",
        "summary": "A violent storm rattles the windows while backup power keeps the lab barely alive.",
        "victim_name": "Dr. Elena Voss",
        "victim_role": "Head of Research",
        "hidden_tension": "The merger vote was scheduled for the morning.",
        "visible_clues": ["scorch marks suggest electrocution", "a toppled server rack"],
        "present_characters": ["Ben"]
    })
    .to_string();
    let solution = json!({
        "truth_summary": "Maya rigged the backup relay to overload.",
        "method": "Sabotaged the UPS failover",
        "cover_up": "Deleted the maintenance ticket",
        "motive": "Voss was about to expose the audit hole",
        "key_evidence": [
            "the scorched relay",
            "the badge log gap",
            "the deleted ticket",
            "the spoofed camera loop",
            "the forged signature",
            "the sixth exhibit",
            "the seventh exhibit"
        ],
        "timeline": ["23:40 Voss enters the lab", "23:55 the relay overloads"]
    })
    .to_string();
    collect_artifacts(&[characters, scene, solution])
}

fn sample_session() -> Session {
    let artifacts = sample_artifacts();
    let (case, solution) = build_case(&artifacts, &[]).expect("sample case builds");
    Session::new(
        case,
        solution,
        artifacts.scene.clone().unwrap(),
        artifacts.characters.clone().unwrap(),
        false,
    )
}

#[test]
fn case_has_exactly_one_guilty_suspect() {
    let artifacts = sample_artifacts();
    let (case, _) = build_case(&artifacts, &[]).expect("sample case builds");
    case.validate().expect("generated case is consistent");
    assert_eq!(case.suspects.iter().filter(|s| s.guilty).count(), 1);
    assert_eq!(case.guilty_name, "Maya");
    assert_eq!(case.suspect("Maya").map(|s| s.guilty), Some(true));

    let mut broken = case.clone();
    broken.suspects[0].guilty = true;
    assert!(broken.validate().is_err());
}

#[test]
fn blueprint_enriches_the_base_facts() {
    let artifacts = sample_artifacts();
    let (case, solution) = build_case(&artifacts, &[]).expect("sample case builds");
    assert_eq!(case.victim, "Dr. Elena Voss");
    assert_eq!(case.victim_role, "Head of Research");
    assert_eq!(case.place, "Meridian Labs HQ");
    assert_eq!(case.time, descriptions::STORM_TIME);
    assert_eq!(case.cause, descriptions::ELECTROCUTION_CAUSE);
    assert_eq!(
        case.hidden_tension.as_deref(),
        Some("The merger vote was scheduled for the morning.")
    );
    assert!(case.context.contains("violent storm"));

    // Secrets fall back to secret_motivation, ages parse from either shape.
    assert_eq!(case.suspects[0].secret, "stole the research files");
    assert_eq!(case.suspects[1].secret, "gambling debts");
    assert_eq!(case.suspects[0].age, Some(34));
    assert_eq!(case.suspects[1].age, Some(41));

    let solution = solution.expect("solution artifact was present");
    assert_eq!(solution.method.as_deref(), Some("Sabotaged the UPS failover"));
}

#[test]
fn guilty_name_takes_priority_over_flags() {
    let characters = json!({
        "suspects": [
            {"name": "Ben", "guilty": true},
            {"name": "Maya"}
        ],
        "guilty_name": "Maya"
    })
    .to_string();
    let artifacts = collect_artifacts(&[characters]);
    let (case, _) = build_case(&artifacts, &[]).expect("case builds");
    assert_eq!(case.guilty_name, "Maya");

    // Without the explicit name, the first flagged suspect wins.
    let characters = json!({
        "suspects": [
            {"name": "Ben"},
            {"name": "Maya", "guilty": true}
        ]
    })
    .to_string();
    let artifacts = collect_artifacts(&[characters]);
    let (case, _) = build_case(&artifacts, &[]).expect("case builds");
    assert_eq!(case.guilty_name, "Maya");
}

#[test]
fn missing_roster_fails_generation() {
    let artifacts = collect_artifacts(&["nothing useful in here".to_string()]);
    assert!(matches!(
        build_case(&artifacts, &[]),
        Err(GameError::CaseGeneration(_))
    ));

    let unflagged = collect_artifacts(&[json!({"suspects": [{"name": "Ben"}]}).to_string()]);
    assert!(matches!(
        build_case(&unflagged, &[]),
        Err(GameError::CaseGeneration(_))
    ));
}

#[test]
fn redaction_keeps_only_the_active_secret() {
    let characters = json!({
        "suspects": [
            {"name": "Ben", "secret": "stole files", "guilty": false},
            {"name": "Maya", "secret": "none", "is_guilty": true, "culpable": true}
        ],
        "guilty_name": "Maya",
        "truth_summary": "Maya did it",
        "murderer": "Maya",
        "solution": {"who": "Maya"}
    });

    let safe = redact_characters(&characters, "Ben", true);
    let serialized = safe.to_string();
    assert!(!serialized.contains("guilty"));
    assert!(!serialized.contains("culpable"));
    assert!(!serialized.contains("truth_summary"));
    assert!(!serialized.contains("murderer"));
    assert!(!serialized.contains("solution"));
    assert!(serialized.contains("stole files"));
    assert!(safe["suspects"][1].get("secret").is_none());

    // Shared-secrets mode keeps every secret but still strips guilt.
    let open = redact_characters(&characters, "Ben", false);
    assert_eq!(open["suspects"][1]["secret"], "none");
    assert!(!open.to_string().contains("guilty"));

    // Non-mapping input fails soft.
    assert_eq!(redact_characters(&json!([1, 2]), "Ben", true), json!({}));
}

#[test]
fn scene_redaction_adds_the_speaker() {
    let scene = json!({"scene_id": "x", "present_characters": ["Maya"]});
    let safe = redact_scene(&scene, "Ben");
    let present = safe["present_characters"].as_array().unwrap();
    assert_eq!(present.len(), 2);

    // Already listed: nothing is duplicated, nothing removed.
    let again = redact_scene(&safe, "Ben");
    assert_eq!(again["present_characters"].as_array().unwrap().len(), 2);

    assert_eq!(redact_scene(&json!("not an object"), "Ben"), json!({}));
}

#[test]
fn memory_dedupes_and_formats() {
    let mut memory = MemoryBank::new();
    memory.record_turn("Ben", &["He left at 23:40".to_string()], &[]);
    memory.record_turn(
        "Ben",
        &["He left at 23:40".to_string(), "  ".to_string()],
        &["badge log gap".to_string()],
    );

    let bank = memory.get("Ben").expect("Ben has memory");
    assert_eq!(bank.revealed_facts, vec!["He left at 23:40"]);
    assert_eq!(bank.implied_clues, vec!["badge log gap"]);

    let formatted = memory.format_memory("Ben", 8);
    assert_eq!(formatted.matches("He left at 23:40").count(), 1);
    assert!(memory.format_memory("Maya", 8).contains("(none yet)"));

    // Only the first `limit` entries are rendered.
    for index in 0..12 {
        memory.record_turn("Zoe", &[format!("fact {index}")], &[]);
    }
    let formatted = memory.format_memory("Zoe", 8);
    assert!(formatted.contains("fact 7"));
    assert!(!formatted.contains("fact 8"));
}

#[tokio::test]
async fn budget_runs_out_after_ten_questions() {
    let mut session = sample_session();
    let backend = ScriptedBackend::new(
        r#"{"spoken_text": "I never left the boardroom.", "revealed_facts": ["Maya stayed in the boardroom"], "implied_clues": []}"#,
    );

    for index in 0..TOTAL_QUESTIONS {
        let turn = session
            .submit_question(&backend, "Maya", &format!("Question {index}?"))
            .await
            .expect("asking is legal")
            .expect("question was not blank");
        assert!(!turn.answer.is_empty());
    }
    assert_eq!(session.state().remaining_questions, 0);
    assert_eq!(session.phase(), Phase::MustAccuse);

    // The 11th ask is rejected without touching the budget or the backend.
    let rejected = session.submit_question(&backend, "Maya", "One more?").await;
    assert!(matches!(rejected, Err(GameError::QuestionsExhausted)));
    assert_eq!(session.state().remaining_questions, 0);
    assert_eq!(backend.calls.load(Ordering::SeqCst), TOTAL_QUESTIONS as usize);

    // Accusing is still available once the budget is gone.
    let outcome = session.accuse("Maya").expect("accusation after exhaustion");
    assert!(outcome.won);
}

#[tokio::test]
async fn blank_questions_cost_nothing() {
    let mut session = sample_session();
    let backend = ScriptedBackend::new("{}");
    let result = session
        .submit_question(&backend, "Ben", "   ")
        .await
        .expect("a blank question is a no-op");
    assert!(result.is_none());
    assert_eq!(session.state().remaining_questions, TOTAL_QUESTIONS);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_suspects_are_rejected() {
    let session = sample_session();
    assert!(matches!(
        session.begin_question("Nobody", "Where were you?"),
        Err(GameError::SuspectNotFound(_))
    ));
}

#[tokio::test]
async fn throttled_backend_degrades_to_the_stall_line() {
    let mut session = sample_session();
    let backend = FailingBackend("HTTP 429 RESOURCE_EXHAUSTED: Quota exceeded for model");
    let turn = session
        .submit_question(&backend, "Ben", "Where were you at midnight?")
        .await
        .expect("asking is legal")
        .expect("question was not blank");

    assert_eq!(turn.answer, descriptions::STALL_LINE);
    assert_eq!(turn.implied_clues, vec![descriptions::THROTTLE_CLUE.to_string()]);
    assert_eq!(session.state().remaining_questions, TOTAL_QUESTIONS - 1);
}

#[tokio::test]
async fn other_backend_failures_degrade_to_the_glitch_line() {
    let mut session = sample_session();
    let backend = FailingBackend("connection reset by peer");
    let turn = session
        .submit_question(&backend, "Ben", "Who found the body?")
        .await
        .expect("asking is legal")
        .expect("question was not blank");

    assert_eq!(turn.answer, descriptions::GLITCH_LINE);
    assert!(turn.implied_clues.is_empty());
    assert_eq!(session.state().remaining_questions, TOTAL_QUESTIONS - 1);
}

#[test]
fn accusation_matches_ground_truth() {
    let mut session = sample_session();
    let outcome = session.accuse("Maya").expect("accusing is legal");
    assert!(outcome.won);
    assert!(outcome.epilogue.contains("Maya"));
    assert!(outcome.epilogue.contains("What really happened:"));
    assert!(outcome.epilogue.contains("Method: Sabotaged the UPS failover"));

    // Lists are capped at five bullets.
    assert!(outcome.epilogue.contains("the forged signature"));
    assert!(!outcome.epilogue.contains("the sixth exhibit"));

    let mut session = sample_session();
    let outcome = session.accuse("Ben").expect("accusing is legal");
    assert!(!outcome.won);
    assert_eq!(outcome.guilty, "Maya");
    assert!(outcome.epilogue.contains("Maya"));
}

#[test]
fn missing_solution_degrades_to_the_plain_verdict() {
    let artifacts = sample_artifacts();
    let (case, _) = build_case(&artifacts, &[]).expect("sample case builds");
    let mut session = Session::new(
        case,
        None,
        artifacts.scene.clone().unwrap(),
        artifacts.characters.clone().unwrap(),
        false,
    );
    let outcome = session.accuse("Ben").expect("accusing is legal");
    assert!(!outcome.epilogue.contains("What really happened:"));
    assert!(outcome.epilogue.contains("Maya"));
}

#[test]
fn the_case_closes_exactly_once() {
    let mut session = sample_session();
    session.accuse("Ben").expect("first accusation lands");
    assert_eq!(session.phase(), Phase::Closed);

    let second = session.accuse("Maya");
    assert!(matches!(second, Err(GameError::CaseClosed)));
    assert_eq!(session.state().accused.as_deref(), Some("Ben"));
    assert!(!session.state().outcome.as_ref().unwrap().won);

    // Asking after closure is rejected too.
    assert!(matches!(
        session.begin_question("Maya", "Anything to add?"),
        Err(GameError::CaseClosed)
    ));
}

#[test]
fn failed_generation_leaves_a_read_only_session() {
    let mut session = Session::failed();
    assert_eq!(session.phase(), Phase::Failed);
    assert!(matches!(
        session.begin_question("Ben", "Hello?"),
        Err(GameError::CaseUnavailable)
    ));
    assert!(matches!(
        session.accuse("Ben"),
        Err(GameError::CaseUnavailable)
    ));
}

#[tokio::test]
async fn prompts_never_leak_the_answer_key() {
    let mut session = sample_session();
    let prompt = session
        .begin_question("Ben", "Where were you?")
        .expect("asking is legal")
        .expect("question was not blank");

    assert!(!prompt.instructions.contains("guilty"));
    assert!(!prompt.instructions.contains("gambling debts"));
    assert!(prompt.instructions.contains("stole the research files"));
    assert!(prompt.instructions.contains("Dr. Elena Voss"));
    assert!(prompt.player_action.contains("(none yet)"));
    assert!(prompt.player_action.contains("Where were you?"));

    // Only the last three turns are replayed in the prompt.
    let backend = ScriptedBackend::new(r#"{"spoken_text": "Fine."}"#);
    for index in 1..=4 {
        session
            .submit_question(&backend, "Ben", &format!("Question {index}?"))
            .await
            .expect("asking is legal");
    }
    let prompt = session
        .begin_question("Ben", "Question 5?")
        .expect("asking is legal")
        .expect("question was not blank");
    assert!(prompt.player_action.contains("Question 2?"));
    assert!(!prompt.player_action.contains("Question 1?"));
}

#[tokio::test]
async fn answers_are_unescaped_and_stripped() {
    let mut session = sample_session();
    let backend = ScriptedBackend::new(
        r#"{"spoken_text": "I was &quot;calm&quot; <b>honest</b> that night."}"#,
    );
    let turn = session
        .submit_question(&backend, "Ben", "How did you feel?")
        .await
        .expect("asking is legal")
        .expect("question was not blank");
    assert_eq!(turn.answer, "I was \"calm\" honest that night.");
}

#[test]
fn extracts_embedded_json_from_prose() {
    let text = "Sure! Here you go:\n```json\n{\"suspects\": [{\"name\": \"Ben\"}]}\n```\nLet me know.";
    let object = extract_json_object_with_key(text, "suspects").expect("object is found");
    assert_eq!(object["suspects"][0]["name"], "Ben");

    // Objects without the required key are skipped, not returned.
    let two = "{\"scene_id\": 1} and then {\"suspects\": []}";
    let object = extract_json_object_with_key(two, "suspects").expect("second object is found");
    assert!(object.get("suspects").is_some());

    assert!(extract_json_object_with_key("no json here {", "suspects").is_none());
    assert!(extract_json_object_with_key("", "suspects").is_none());
}

#[test]
fn reply_parsing_tries_candidate_fields_then_raw_text() {
    let reply = DialogueReply::from_raw(r#"{"spoken_text": "", "answer": "From the archives."}"#);
    assert_eq!(reply.spoken_text, "From the archives.");

    let prose = "The suspect shrugs.";
    assert_eq!(DialogueReply::from_raw(prose).spoken_text, prose);

    let long = "a".repeat(450);
    let clipped = DialogueReply::from_raw(&long);
    assert_eq!(clipped.spoken_text.chars().count(), 403);
    assert!(clipped.spoken_text.ends_with("..."));
}

#[test]
fn html_helpers_clean_up_answer_text() {
    assert_eq!(strip_html_tags("<p>Hello  <b>there</b></p>"), "Hello there");
    assert_eq!(strip_html_tags(""), "");
    assert_eq!(unescape_entities("Fish &amp; chips &#33;"), "Fish & chips !");
    assert_eq!(unescape_entities("A &unknown; token"), "A &unknown; token");
    assert_eq!(unescape_entities("Dangling & ampersand"), "Dangling & ampersand");
}

#[test]
fn portraits_resolve_by_prefix_and_never_repeat() {
    let dir = tempfile::tempdir().expect("temp dir");
    for name in ["Maya_Chen_1.png", "Maya_Chen_2.png", "Ben_Cortez.png", "notes.txt"] {
        File::create(dir.path().join(name)).expect("fixture file");
    }
    let catalog = scan_image_catalog(dir.path());
    assert_eq!(catalog.len(), 4);

    let found = image_for("Maya Chen", &catalog).expect("prefix match");
    assert!(found.ends_with("Maya_Chen_1.png"));
    assert!(image_for("Zoe", &catalog).is_none());

    // The explicit mapping wins, and a file is never assigned twice: the
    // second suspect falls through to the next unclaimed portrait.
    let artifacts = collect_artifacts(&[
        json!({
            "suspects": [{"name": "Maya Chen"}, {"name": "Maya"}],
            "guilty_name": "Maya"
        })
        .to_string(),
        json!({"suspect_images": {"Maya Chen": "images/Maya_Chen_1.png"}}).to_string(),
    ]);
    let (case, _) = build_case(&artifacts, &catalog).expect("case builds");
    assert!(
        case.suspects[0]
            .image_path
            .as_ref()
            .expect("mapped portrait")
            .ends_with("Maya_Chen_1.png")
    );
    assert!(
        case.suspects[1]
            .image_path
            .as_ref()
            .expect("scanned portrait")
            .ends_with("Maya_Chen_2.png")
    );
}
