use gumshoe::ai::{DialogueBackend, GameAI};
use gumshoe::casegen::{generate_session, scan_image_catalog};
use gumshoe::error::{AppError, BackendError};
use gumshoe::logging;
use gumshoe::session::{Phase, Session, TOTAL_QUESTIONS};
use gumshoe::settings::{Settings, data_dir};
use log::info;
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

// A finished backend call, tagged with the session it belongs to. Replies
// carrying a stale epoch are discarded instead of applied.
struct DialogueResult {
    epoch: Uuid,
    suspect: String,
    question: String,
    result: Result<String, BackendError>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(_) => {
            let settings = Settings::new();
            let _ = settings.save();
            settings
        }
    };
    let _ = logging::init(settings.debug_mode);

    let api_key = settings
        .openai_api_key
        .clone()
        .or_else(|| env::var("OPENAI_API_KEY").ok())
        .ok_or(AppError::AIClientNotInitialized)?;
    let backend = GameAI::new(api_key, settings.model.clone());

    println!("AI MURDER MYSTERY - interrogate, observe, accuse.");
    println!("Type /help for commands.\n");

    let mut session = new_case(&backend, &settings).await;
    print_case(&session);
    let mut active_suspect = first_suspect(&session);

    let (reply_sender, mut reply_receiver) = mpsc::unbounded_channel::<DialogueResult>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let input = line.trim().to_string();
                if input.is_empty() {
                    continue;
                }

                if let Some(rest) = input.strip_prefix('/') {
                    let (command, argument) = rest.split_once(' ').unwrap_or((rest, ""));
                    let argument = argument.trim();
                    match command {
                        "help" => print_help(),
                        "case" => print_case(&session),
                        "suspects" => print_suspects(&session),
                        "talk" => {
                            if session.case().suspect(argument).is_some() {
                                println!("You turn to {argument}.");
                                active_suspect = Some(argument.to_string());
                            } else {
                                println!("No suspect called '{argument}'. /suspects lists them.");
                            }
                        }
                        "accuse" => {
                            if pending {
                                println!("A suspect is still answering; wait for the reply.");
                                continue;
                            }
                            if argument.is_empty() {
                                println!("Accuse who? /accuse <name>");
                                continue;
                            }
                            match session.accuse(argument) {
                                Ok(outcome) => {
                                    if outcome.won {
                                        println!("\nCorrect. {} is the murderer.", outcome.accused);
                                    } else {
                                        println!(
                                            "\nWrong. You accused {}; the real murderer was {}.",
                                            outcome.accused, outcome.guilty
                                        );
                                    }
                                    println!("\n{}", outcome.epilogue);
                                    println!("\nCase closed. /new to play again, /quit to leave.");
                                }
                                Err(notice) => println!("{notice}"),
                            }
                        }
                        "new" => {
                            session = new_case(&backend, &settings).await;
                            active_suspect = first_suspect(&session);
                            pending = false;
                            print_case(&session);
                        }
                        "quit" | "exit" => break,
                        _ => println!("Unknown command. /help lists the commands."),
                    }
                    continue;
                }

                if pending {
                    println!("A suspect is still answering; wait for the reply.");
                    continue;
                }
                let Some(suspect) = active_suspect.clone() else {
                    println!("Pick a suspect first with /talk <name>.");
                    continue;
                };
                match session.begin_question(&suspect, &input) {
                    Ok(None) => {}
                    Ok(Some(prompt)) => {
                        pending = true;
                        println!("({suspect} is thinking...)");
                        let backend = backend.clone();
                        let sender = reply_sender.clone();
                        let epoch = session.epoch();
                        tokio::spawn(async move {
                            let result = backend.generate(&prompt).await;
                            let _ = sender.send(DialogueResult {
                                epoch,
                                suspect,
                                question: input,
                                result,
                            });
                        });
                    }
                    Err(notice) => println!("{notice}"),
                }
            }
            Some(reply) = reply_receiver.recv() => {
                pending = false;
                if reply.epoch != session.epoch() {
                    info!("discarding a dialogue reply from a discarded session");
                    continue;
                }
                let turn = session.complete_question(&reply.suspect, &reply.question, reply.result);
                println!("\n{}: {}", reply.suspect, turn.answer);
                println!("({} questions left)", session.state().remaining_questions);
                if session.phase() == Phase::MustAccuse {
                    println!("You are out of questions. Accuse someone with /accuse <name>.");
                }
            }
        }
    }

    Ok(())
}

async fn new_case(backend: &GameAI, settings: &Settings) -> Session {
    println!("Generating a fresh case...");
    let catalog = scan_image_catalog(&data_dir().join("images"));
    match generate_session(backend, settings, &catalog).await {
        Ok(session) => session,
        Err(error) => {
            eprintln!("{error}");
            eprintln!("Use /new to retry.");
            Session::failed()
        }
    }
}

fn first_suspect(session: &Session) -> Option<String> {
    session.case().suspects.first().map(|s| s.name.clone())
}

fn print_case(session: &Session) {
    if session.phase() == Phase::Failed {
        return;
    }
    let case = session.case();
    println!("\nVictim: {} ({})", case.victim, case.victim_role);
    println!("Time:   {}", case.time);
    println!("Place:  {}", case.place);
    println!("Cause:  {}", case.cause);
    println!("\n{}", case.context);
    print_suspects(session);
    println!(
        "\nYou have {TOTAL_QUESTIONS} questions. /talk <name> picks a suspect; any other line is a question to them."
    );
}

fn print_suspects(session: &Session) {
    let case = session.case();
    println!("\nSuspects:");
    for suspect in &case.suspects {
        let portrait = match &suspect.image_path {
            Some(path) => format!(" [{}]", path.display()),
            None => String::new(),
        };
        println!(
            "  ({}) {} - {}{}",
            suspect.initials(),
            suspect.name,
            suspect.role,
            portrait
        );
        if !suspect.personality.is_empty() {
            println!("      {}", suspect.personality);
        }
    }
    println!("  Talk to: {}", case.suspect_names().join(", "));
}

fn print_help() {
    println!("Commands:");
    println!("  /case            show the case facts again");
    println!("  /suspects        list the suspects");
    println!("  /talk <name>     choose who to interrogate");
    println!("  /accuse <name>   end the game with an accusation");
    println!("  /new             discard everything and generate a new case");
    println!("  /quit            leave the game");
    println!("Anything else is a question for the current suspect.");
}
