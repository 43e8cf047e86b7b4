//! Model catalogue and selection scoring.

pub mod selector;

pub use selector::{analyze_task_profile, Complexity, TaskProfile, TaskType};

use serde::{Deserialize, Serialize};

/// Static configuration for one model in the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub provider: String,
    pub max_tokens: usize,
    pub cost_per_1k_tokens: f64,
    /// 1-10, higher = faster.
    pub speed_rating: u8,
    /// 1-10, higher = more capable.
    pub capability_rating: u8,
    pub context_window: usize,
    /// Tuned for ultra-large-context sessions.
    #[serde(default)]
    pub large_context_optimized: bool,
}

/// Read-only model catalogue with stable iteration order, so tied scores
/// resolve deterministically to the first entry.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelConfig>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelConfig>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn get(&self, name: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Built-in catalogue: four general models plus three large-context
    /// variants.
    pub fn builtin() -> Self {
        Self::new(vec![
            ModelConfig {
                name: "gpt-4o".to_string(),
                provider: "openai".to_string(),
                max_tokens: 4_096,
                cost_per_1k_tokens: 0.03,
                speed_rating: 8,
                capability_rating: 10,
                context_window: 128_000,
                large_context_optimized: false,
            },
            ModelConfig {
                name: "gpt-4o-mini".to_string(),
                provider: "openai".to_string(),
                max_tokens: 16_384,
                cost_per_1k_tokens: 0.00015,
                speed_rating: 9,
                capability_rating: 8,
                context_window: 128_000,
                large_context_optimized: false,
            },
            ModelConfig {
                name: "gpt-3.5-turbo".to_string(),
                provider: "openai".to_string(),
                max_tokens: 4_096,
                cost_per_1k_tokens: 0.002,
                speed_rating: 10,
                capability_rating: 7,
                context_window: 16_385,
                large_context_optimized: false,
            },
            ModelConfig {
                name: "claude-3-5-sonnet".to_string(),
                provider: "anthropic".to_string(),
                max_tokens: 4_096,
                cost_per_1k_tokens: 0.015,
                speed_rating: 7,
                capability_rating: 9,
                context_window: 200_000,
                large_context_optimized: false,
            },
            ModelConfig {
                name: "gpt-4o-max".to_string(),
                provider: "openai".to_string(),
                max_tokens: 1_000_000,
                cost_per_1k_tokens: 0.06,
                speed_rating: 6,
                capability_rating: 10,
                context_window: 1_000_000,
                large_context_optimized: true,
            },
            ModelConfig {
                name: "claude-3-5-sonnet-max".to_string(),
                provider: "anthropic".to_string(),
                max_tokens: 1_000_000,
                cost_per_1k_tokens: 0.03,
                speed_rating: 5,
                capability_rating: 10,
                context_window: 1_000_000,
                large_context_optimized: true,
            },
            ModelConfig {
                name: "gpt-4o-mini-max".to_string(),
                provider: "openai".to_string(),
                max_tokens: 500_000,
                cost_per_1k_tokens: 0.0003,
                speed_rating: 7,
                capability_rating: 8,
                context_window: 500_000,
                large_context_optimized: true,
            },
        ])
    }
}
