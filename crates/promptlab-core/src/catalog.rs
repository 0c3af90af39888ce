//! Default templates for each operation type.

use crate::models::{ChatMessage, OperationType, PlaygroundTemplate};

/// Supplies the template a fresh instance starts with.
pub trait TemplateCatalog: Send + Sync {
    fn default_template(&self, operation_type: OperationType) -> PlaygroundTemplate;
}

/// Built-in templates: a system prompt plus a `{{question}}` user turn for
/// chat, a bare `{{question}}` prompt for text completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplates;

impl TemplateCatalog for DefaultTemplates {
    fn default_template(&self, operation_type: OperationType) -> PlaygroundTemplate {
        match operation_type {
            OperationType::Chat => PlaygroundTemplate::Chat {
                messages: vec![
                    ChatMessage::new("system", "You are a chatbot"),
                    ChatMessage::new("user", "{{question}}"),
                ],
            },
            OperationType::TextCompletion => PlaygroundTemplate::TextCompletion {
                prompt: "{{question}}".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_templates_match_operation_type() {
        for op in [OperationType::Chat, OperationType::TextCompletion] {
            assert_eq!(DefaultTemplates.default_template(op).operation_type(), op);
        }
    }
}
