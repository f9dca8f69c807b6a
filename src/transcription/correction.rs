//! Optional clean-up pass over a finished transcript.

use crate::agent::{ChatMessage, ChatModel};
use crate::config::Prompts;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Asks a chat model to fix obvious speech-to-text mistakes.
pub struct TranscriptCorrector {
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl TranscriptCorrector {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { model, prompts }
    }

    /// Return the corrected text, or the input unchanged if the model fails.
    pub async fn correct(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let mut vars = HashMap::new();
        vars.insert("transcription".to_string(), text.to_string());
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.correction.system, &vars);

        match self.model.complete(&[ChatMessage::User(prompt)]).await {
            Ok(corrected) if !corrected.trim().is_empty() => {
                let corrected = corrected.trim().trim_matches('"').to_string();
                debug!("Corrected transcript: {:?} -> {:?}", text, corrected);
                corrected
            }
            Ok(_) => {
                warn!("Correction returned nothing; keeping original transcript");
                text.to_string()
            }
            Err(e) => {
                warn!("Correction failed, keeping original transcript: {}", e);
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ModelEvent;
    use crate::testing::ScriptedChatModel;

    #[tokio::test]
    async fn test_correction_uses_model_output() {
        let model = Arc::new(ScriptedChatModel::new(vec![vec![ModelEvent::Text(
            "\"What are the key highlights?\"".to_string(),
        )]]));
        let corrector = TranscriptCorrector::new(model.clone(), Prompts::default());

        let text = corrector.correct("what are the kee highlights").await;
        assert_eq!(text, "What are the key highlights?");

        let seen = model.seen_messages();
        assert!(matches!(
            &seen[0][0],
            ChatMessage::User(prompt) if prompt.contains("\"what are the kee highlights\"")
        ));
    }

    #[tokio::test]
    async fn test_model_failure_keeps_original() {
        let model = Arc::new(ScriptedChatModel::new(Vec::new()));
        let corrector = TranscriptCorrector::new(model, Prompts::default());
        assert_eq!(corrector.correct("keep me").await, "keep me");
    }
}
