//! Model selection scoring
//!
//! Deterministic weighted scoring over the catalogue. Identical inputs
//! always select the same model: scores are compared with strict
//! greater-than against stable catalogue order, so exact ties resolve to
//! the earlier entry.

use serde::{Deserialize, Serialize};

use super::{ModelCatalog, ModelConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Coding,
    Analysis,
    Creative,
    Automation,
    #[default]
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

/// Task signals that drive model selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskProfile {
    pub task_type: TaskType,
    pub complexity: Complexity,
    pub speed_priority: bool,
    pub cost_priority: bool,
    /// Ultra-large-context mode requested.
    pub large_context: bool,
}

impl ModelCatalog {
    /// Pick the best model for the given task signals.
    pub fn select(&self, profile: &TaskProfile) -> &ModelConfig {
        let models = self.models();
        assert!(!models.is_empty(), "catalogue must not be empty");

        let mut best = &models[0];
        let mut best_score = score_model(best, profile);

        for model in &models[1..] {
            let score = score_model(model, profile);
            if score > best_score {
                best = model;
                best_score = score;
            }
        }

        tracing::info!(model = %best.name, score = best_score, "Selected model");
        best
    }
}

fn score_model(model: &ModelConfig, profile: &TaskProfile) -> f64 {
    let mut score = 0.0;

    // Large-context mode dominates: strongly prefer optimized models when
    // requested, keep them from winning by default otherwise.
    if profile.large_context {
        if model.large_context_optimized {
            score += 20.0;
        } else {
            score -= 10.0;
        }
    } else if model.large_context_optimized {
        score -= 5.0;
    }

    score += f64::from(model.capability_rating) * 0.3;

    if profile.speed_priority {
        score += f64::from(model.speed_rating) * 0.4;
    } else {
        score += f64::from(model.speed_rating) * 0.2;
    }

    if profile.cost_priority {
        let cost_score = (10.0 - model.cost_per_1k_tokens * 1000.0).max(0.0);
        score += cost_score * 0.3;
    } else {
        score += 5.0 * 0.1;
    }

    match profile.task_type {
        TaskType::Coding if model.name.contains("gpt") => score += 2.0,
        TaskType::Analysis if model.name.contains("claude") => score += 2.0,
        _ => {}
    }

    match profile.complexity {
        Complexity::Complex if model.capability_rating >= 9 => score += 3.0,
        Complexity::Simple if model.speed_rating >= 8 => score += 2.0,
        _ => {}
    }

    if profile.large_context && model.context_window >= 500_000 {
        score += 5.0;
    }

    score
}

/// Derive a task profile from a free-form message, keyword heuristics only.
pub fn analyze_task_profile(message: &str, large_context: bool) -> TaskProfile {
    let lower = message.to_lowercase();

    let task_type = if contains_any(&lower, &["code", "function", "class", "variable", "debug", "fix"]) {
        TaskType::Coding
    } else if contains_any(&lower, &["analyze", "explain", "understand", "review"]) {
        TaskType::Analysis
    } else if contains_any(&lower, &["create", "write", "generate", "design"]) {
        TaskType::Creative
    } else if contains_any(&lower, &["browser", "click", "navigate", "automate"]) {
        TaskType::Automation
    } else {
        TaskType::General
    };

    let complexity = if message.len() < 50 {
        Complexity::Simple
    } else if message.len() > 200 {
        Complexity::Complex
    } else {
        Complexity::Medium
    };

    TaskProfile {
        task_type,
        complexity,
        speed_priority: contains_any(&lower, &["quick", "fast", "urgent", "asap"]),
        cost_priority: contains_any(&lower, &["cheap", "low cost", "budget"]),
        large_context,
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
