//! Data models for the playground.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the LLM API is invoked. Decides the shape of every instance template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    #[default]
    Chat,
    TextCompletion,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Chat => write!(f, "chat"),
            OperationType::TextCompletion => write!(f, "text_completion"),
        }
    }
}

/// Where instance input comes from. Shared by all instances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    #[default]
    Manual,
    Dataset,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputMode::Manual => write!(f, "manual"),
            InputMode::Dataset => write!(f, "dataset"),
        }
    }
}

/// A chat message with a role and content,
/// e.g. `{ role: "user", content: "What is the meaning of life?" }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// The prompt definition of an instance.
///
/// Serialized with a `__type` discriminator (`"chat"` or `"text_completion"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "__type", rename_all = "snake_case")]
pub enum PlaygroundTemplate {
    /// A list of messages for multi-turn chat completion.
    Chat { messages: Vec<ChatMessage> },
    /// A single prompt for (legacy) text completion.
    TextCompletion { prompt: String },
}

impl PlaygroundTemplate {
    pub fn operation_type(&self) -> OperationType {
        match self {
            PlaygroundTemplate::Chat { .. } => OperationType::Chat,
            PlaygroundTemplate::TextCompletion { .. } => OperationType::TextCompletion,
        }
    }

    /// Chat messages, or `None` for a text completion template.
    pub fn messages(&self) -> Option<&[ChatMessage]> {
        match self {
            PlaygroundTemplate::Chat { messages } => Some(messages),
            PlaygroundTemplate::TextCompletion { .. } => None,
        }
    }
}

/// A single instance of the playground: a template, tools,
/// input (dataset or manual) and output (experiment or spans).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaygroundInstance {
    pub id: u64,
    pub template: PlaygroundTemplate,
    #[serde(default = "empty_object")]
    pub tools: Value,
    #[serde(default = "empty_object")]
    pub input: Value,
    #[serde(default = "empty_object")]
    pub output: Value,
}

impl PlaygroundInstance {
    pub fn new(id: u64, template: PlaygroundTemplate) -> Self {
        Self {
            id,
            template,
            tools: empty_object(),
            input: empty_object(),
            output: empty_object(),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Full snapshot of the playground.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundState {
    pub operation_type: OperationType,
    pub input_mode: InputMode,
    /// Display order. Starts with a single instance until a second is added.
    pub instances: Vec<PlaygroundInstance>,
}

impl PlaygroundState {
    pub fn instance(&self, id: u64) -> Option<&PlaygroundInstance> {
        self.instances.iter().find(|instance| instance.id == id)
    }
}

/// Partial overrides applied at store creation. Any field left as `None`
/// falls back to the built-in default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct InitialProps {
    pub operation_type: Option<OperationType>,
    pub input_mode: Option<InputMode>,
    pub instances: Option<Vec<PlaygroundInstance>>,
}

/// A mutation request, tagged by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaygroundAction {
    SetOperationType {
        #[serde(rename = "operationType")]
        operation_type: OperationType,
    },
    SetInputMode {
        #[serde(rename = "inputMode")]
        input_mode: InputMode,
    },
    AddInstance,
    DeleteInstance {
        #[serde(rename = "instanceId")]
        instance_id: u64,
    },
    AddMessage { index: usize },
}
