use thiserror::Error;

// Enum for handling various application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Game error: {0}")]
    Game(#[from] GameError), // Errors specific to game logic or state.

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError), // Errors from the text-generation collaborator.

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("AI client not initialized: no API key in settings or OPENAI_API_KEY")]
    AIClientNotInitialized,
}

// Enum for game-specific errors. These surface as notices to the player,
// never as crashes.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("No questions left; you must accuse someone")]
    QuestionsExhausted,

    #[error("The case is closed; start a new game to continue")]
    CaseClosed,

    #[error("No case is available; restart to retry generation")]
    CaseUnavailable, // Case generation failed and only a restart recovers.

    #[error("Suspect not found: {0}")]
    SuspectNotFound(String),

    #[error("Failed to generate the case: {0}")]
    CaseGeneration(String),

    #[error("Invalid case data: {0}")]
    InvalidCase(String),
}

// Errors from calls to the text-generation collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("No reply text found")]
    NoReply,

    #[error("Malformed artifact: {0}")]
    MalformedArtifact(String),

    #[error("Backend call failed: {0}")]
    Call(String),
}

impl BackendError {
    // Quota and rate-limit failures degrade to the scripted stall line
    // instead of the generic glitch line.
    pub fn is_throttle(&self) -> bool {
        let text = self.to_string();
        text.contains("429")
            || text.contains("RESOURCE_EXHAUSTED")
            || text.contains("Quota exceeded")
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(error: serde_json::Error) -> Self {
        BackendError::MalformedArtifact(error.to_string())
    }
}
