pub mod ai;
pub mod ai_response;
pub mod case;
pub mod casegen;
pub mod descriptions;
pub mod error;
pub mod logging;
pub mod memory;
pub mod redactor;
pub mod session;
pub mod settings;

// Re-export commonly used items for easier access
pub use ai::{CaseBackend, DialogueBackend, GameAI};
pub use ai_response::{DialoguePrompt, DialogueReply};
pub use case::{Case, Solution, Suspect};
pub use error::{AppError, BackendError, GameError};
pub use memory::{DialogueTurn, MemoryBank, SuspectMemory};
pub use session::{GameState, Outcome, Phase, Session, TOTAL_QUESTIONS};
