use std::collections::HashMap;

use switchyard_types::models::{ModelPrice, PricingConfig};
use switchyard_types::NormalizedMessage;

/// Fixed per-message overhead (role markers, separators) in the token estimate.
const MESSAGE_OVERHEAD_TOKENS: u64 = 4;

/// Per-model price lookup with a default for unknown models.
#[derive(Debug, Clone)]
pub struct PriceTable {
    default: ModelPrice,
    models: HashMap<String, ModelPrice>,
}

impl PriceTable {
    pub fn new(default: ModelPrice, models: HashMap<String, ModelPrice>) -> Self {
        Self { default, models }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(config.default, config.models.clone())
    }

    /// Price for `model_id` and whether it is a configured model.
    pub fn lookup(&self, model_id: &str) -> (ModelPrice, bool) {
        match self.models.get(model_id) {
            Some(price) => (*price, true),
            None => (self.default, false),
        }
    }

    /// Cost estimate in USD, flagged `false` when the default rate was used.
    pub fn cost(&self, model_id: &str, prompt_tokens: u64, completion_tokens: u64) -> (f64, bool) {
        let (price, known) = self.lookup(model_id);
        (price.cost(prompt_tokens, completion_tokens), known)
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

pub fn estimate_prompt_tokens(messages: &[NormalizedMessage]) -> u64 {
    messages.iter().map(|m| estimate_tokens(&m.content) + MESSAGE_OVERHEAD_TOKENS).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_types::Role;

    #[test]
    fn test_known_and_unknown_models() {
        let table = PriceTable::default();

        let (cost, known) = table.cost("gpt-4", 1000, 1000);
        assert!(known);
        assert!((cost - 0.04).abs() < 1e-12);

        let (cost, known) = table.cost("mystery-model", 2000, 0);
        assert!(!known);
        assert!((cost - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_token_estimates() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);

        let messages = vec![
            NormalizedMessage { role: Role::System, content: "be brief".into() },
            NormalizedMessage { role: Role::User, content: "hi".into() },
        ];
        assert_eq!(estimate_prompt_tokens(&messages), (2 + 4) + (1 + 4));
    }
}
