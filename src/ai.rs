use crate::ai_response::DialoguePrompt;
use crate::casegen::CaseSeed;
use crate::descriptions;
use crate::error::BackendError;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use log::debug;

// Seam for the dialogue collaborator: takes the assembled prompt and
// returns raw reply text. Tests substitute scripted implementations.
#[allow(async_fn_in_trait)]
pub trait DialogueBackend {
    async fn generate(&self, prompt: &DialoguePrompt) -> Result<String, BackendError>;
}

// Seam for the case-generation collaborator: returns the raw artifact
// texts the case is assembled from.
#[allow(async_fn_in_trait)]
pub trait CaseBackend {
    async fn generate_case(&self, seed: &CaseSeed) -> Result<Vec<String>, BackendError>;
}

// OpenAI-backed implementation of both collaborators.
#[derive(Clone)]
pub struct GameAI {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GameAI {
    pub fn new(api_key: String, model: String) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        GameAI {
            client: Client::with_config(openai_config),
            model,
        }
    }

    async fn chat(&self, instructions: &str, input: &str) -> Result<String, BackendError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(instructions)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(input)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(BackendError::NoReply)
    }
}

impl DialogueBackend for GameAI {
    async fn generate(&self, prompt: &DialoguePrompt) -> Result<String, BackendError> {
        debug!(
            "dialogue payload: {}",
            prompt.to_json().unwrap_or_default()
        );
        self.chat(&prompt.instructions, &prompt.player_action).await
    }
}

impl CaseBackend for GameAI {
    // One request per setup artifact. The portrait mapping, when present,
    // comes from the image collaborator rather than from here.
    async fn generate_case(&self, seed: &CaseSeed) -> Result<Vec<String>, BackendError> {
        let input = serde_json::to_string(seed)?;
        let mut outputs = Vec::new();
        for task in [
            descriptions::SCENE_TASK,
            descriptions::CHARACTERS_TASK,
            descriptions::SOLUTION_TASK,
        ] {
            outputs.push(self.chat(task, &input).await?);
        }
        Ok(outputs)
    }
}
