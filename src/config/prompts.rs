//! Prompt templates for Herald.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    /// Prompts for fixing speech-to-text mistakes.
    pub correction: CorrectionPrompts,
    pub menu: MenuPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the answer agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a news research assistant answering questions about a set of news articles.

Use the 'retrieve_context' tool to look up relevant passages before answering.
You may call it more than once with different queries if the first results are not enough.
Answer only from the retrieved passages. If they do not contain the answer, say so.
Keep answers concise and mention the source URL of the passages you relied on."#
                .to_string(),
        }
    }
}

/// Prompts for transcript correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPrompts {
    pub system: String,
}

impl Default for CorrectionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are correcting speech-to-text errors.

Rules:
- Do NOT add new information
- Do NOT change the meaning
- Only fix obvious transcription mistakes
- Preserve the original intent
- Preserve question form if present

Original transcription:
"{{transcription}}"

Return ONLY the corrected sentence."#
                .to_string(),
        }
    }
}

/// Prompts for the restaurant/menu generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuPrompts {
    pub name: String,
    pub items: String,
}

impl Default for MenuPrompts {
    fn default() -> Self {
        Self {
            name: r#"I want to open a restaurant for {{cuisine}} food. Suggest a fancy name for it?

Only one name please.
Do not add '**' at the start and end of the restaurant name.
Do not add any description following the name, just the name.
Do not add citations like [1][2] after the name."#
                .to_string(),
            items: r#"Suggest some menu items for {{restaurant_name}}.

Do not add citations like [1][2][3].
Do not add explanations.
Do not add any description after the food names.

Return them as comma separated strings like 'fooditem1,fooditem2,fooditem3'"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let correction_path = custom_path.join("correction.toml");
            if correction_path.exists() {
                let content = std::fs::read_to_string(&correction_path)?;
                prompts.correction = toml::from_str(&content)?;
            }

            let menu_path = custom_path.join("menu.toml");
            if menu_path.exists() {
                let content = std::fs::read_to_string(&menu_path)?;
                prompts.menu = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
