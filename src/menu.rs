//! Restaurant name and menu generator.
//!
//! Two chained prompts: one for a restaurant name, one for its menu.

use crate::agent::{ChatMessage, ChatModel};
use crate::config::Prompts;
use crate::error::{HeraldError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// A generated restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub restaurant_name: String,
    pub items: Vec<String>,
}

pub struct MenuGenerator {
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
    citation_regex: Regex,
}

impl MenuGenerator {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        // Citation markers such as [1] or [12]
        let citation_regex = Regex::new(r"\[\d+\]").expect("Invalid regex");

        Self {
            model,
            prompts,
            citation_regex,
        }
    }

    #[instrument(skip(self))]
    pub async fn generate(&self, cuisine: &str) -> Result<Menu> {
        let cuisine = cuisine.trim();
        if cuisine.is_empty() {
            return Err(HeraldError::InvalidInput("Cuisine is empty".to_string()));
        }

        let mut vars = HashMap::new();
        vars.insert("cuisine".to_string(), cuisine.to_string());
        let name_prompt = self.prompts.render_with_custom(&self.prompts.menu.name, &vars);

        let raw_name = self.model.complete(&[ChatMessage::User(name_prompt)]).await?;
        let restaurant_name = clean_name(&self.citation_regex, &raw_name);
        if restaurant_name.is_empty() {
            return Err(HeraldError::Model("Model returned no restaurant name".to_string()));
        }
        info!("Restaurant name: {}", restaurant_name);

        vars.insert("restaurant_name".to_string(), restaurant_name.clone());
        let items_prompt = self.prompts.render_with_custom(&self.prompts.menu.items, &vars);
        let raw_items = self.model.complete(&[ChatMessage::User(items_prompt)]).await?;

        Ok(Menu {
            restaurant_name,
            items: split_items(&self.citation_regex, &raw_items),
        })
    }
}

fn strip_decoration(citations: &Regex, text: &str) -> String {
    let without_citations = citations.replace_all(text, "");
    without_citations
        .replace("**", "")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// First non-empty line of the model output, undecorated.
fn clean_name(citations: &Regex, raw: &str) -> String {
    raw.lines()
        .map(|line| strip_decoration(citations, line))
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

/// Comma-separated items, undecorated, empties dropped.
fn split_items(citations: &Regex, raw: &str) -> Vec<String> {
    strip_decoration(citations, raw)
        .split([',', '\n'])
        .map(|item| strip_decoration(citations, item))
        .map(|item| item.trim_start_matches(['-', '*', ' ']).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ModelEvent;
    use crate::testing::ScriptedChatModel;

    fn citations() -> Regex {
        Regex::new(r"\[\d+\]").unwrap()
    }

    #[test]
    fn test_clean_name() {
        let re = citations();
        assert_eq!(clean_name(&re, "**Maharaja's Table**[1]"), "Maharaja's Table");
        assert_eq!(clean_name(&re, "\"La Dolce Vita\"\n"), "La Dolce Vita");
        assert_eq!(clean_name(&re, "\n\nTaj Palace [2][3]"), "Taj Palace");
    }

    #[test]
    fn test_split_items() {
        let re = citations();
        assert_eq!(
            split_items(&re, "Paneer Tikka, Butter Chicken[1] ,, Garlic Naan,"),
            vec!["Paneer Tikka", "Butter Chicken", "Garlic Naan"]
        );
        assert_eq!(split_items(&re, "'Pho','Banh Mi'"), vec!["Pho", "Banh Mi"]);
        assert!(split_items(&re, "  ").is_empty());
    }

    #[tokio::test]
    async fn test_generate_chains_prompts() {
        let model = Arc::new(ScriptedChatModel::new(vec![
            vec![ModelEvent::Text("**Spice Route**".to_string())],
            vec![ModelEvent::Text("Samosa, Dal Makhani[1], Kulfi".to_string())],
        ]));
        let generator = MenuGenerator::new(model.clone(), Prompts::default());

        let menu = generator.generate("Indian").await.unwrap();
        assert_eq!(menu.restaurant_name, "Spice Route");
        assert_eq!(menu.items, vec!["Samosa", "Dal Makhani", "Kulfi"]);

        let seen = model.seen_messages();
        assert!(matches!(&seen[0][0], ChatMessage::User(p) if p.contains("Indian food")));
        assert!(matches!(&seen[1][0], ChatMessage::User(p) if p.contains("for Spice Route")));
    }

    #[tokio::test]
    async fn test_empty_cuisine_rejected() {
        let generator = MenuGenerator::new(Arc::new(ScriptedChatModel::new(Vec::new())), Prompts::default());
        assert!(generator.generate("  ").await.is_err());
    }
}
