//! Orchestration planning
//!
//! Turns a task description into candidate tool invocations and orders them
//! with dependency-aware topological scheduling. The scheduler always
//! terminates: an unsatisfiable (cyclic) dependency set degrades to
//! priority order with a logged warning instead of rejecting the plan.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::ToolRegistry;

/// One planned tool invocation.
///
/// `retry_count`/`max_retries` are carried for an outer retry policy; the
/// executor itself runs each step at most once per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationPlan {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Value,
    /// Tool names within the same plan that must run first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Higher = more urgent.
    pub priority: i32,
    /// Seconds, advisory.
    pub estimated_duration: f64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

impl ToolInvocationPlan {
    pub fn new(tool_name: impl Into<String>, priority: i32) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters: Value::Object(Default::default()),
            dependencies: Vec::new(),
            priority,
            estimated_duration: 5.0,
            retry_count: 0,
            max_retries: default_max_retries(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Derive candidate tool invocations from a task description.
///
/// Keyword heuristics over the registered catalogue; tools whose server is
/// not registered are never proposed.
pub fn analyze_task(task_description: &str, registry: &ToolRegistry) -> Vec<ToolInvocationPlan> {
    let task = task_description.to_lowercase();
    let mut candidates: Vec<(&str, i32)> = Vec::new();

    if contains_any(&task, &["browser", "web", "navigate", "click", "form"]) {
        candidates.push(("browser_navigate", 8));
        candidates.push(("browser_snapshot", 6));
        candidates.push(("browser_take_screenshot", 7));
    }

    if contains_any(&task, &["file", "read", "write", "create", "modify"]) {
        candidates.push(("read_file", 9));
        candidates.push(("write_file", 8));
    }

    if contains_any(&task, &["fetch", "api", "data", "content"]) {
        candidates.push(("fetch", 7));
    }

    if contains_any(&task, &["github", "repository", "commit", "pull request"]) {
        candidates.push(("github_search_repositories", 6));
        candidates.push(("github_get_file_contents", 8));
    }

    let plans: Vec<ToolInvocationPlan> = candidates
        .into_iter()
        .filter(|(name, _)| registry.tool(name).is_some())
        .map(|(name, priority)| ToolInvocationPlan::new(name, priority))
        .collect();

    tracing::info!(
        candidates = plans.len(),
        "Derived candidate tool invocations from task"
    );
    plans
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Order plans so every plan comes after its dependencies, breaking ties by
/// priority (first-seen wins on equal priority).
///
/// O(n²) in plan count; acceptable because plans are bounded by the
/// configured per-session invocation limit. Never fails: if no plan is
/// ready (a dependency cycle), the highest-priority remaining plan is
/// forced through so the scheduler always makes forward progress.
pub fn schedule(plans: Vec<ToolInvocationPlan>) -> Vec<ToolInvocationPlan> {
    let mut scheduled: Vec<ToolInvocationPlan> = Vec::with_capacity(plans.len());
    let mut remaining = plans;

    while !remaining.is_empty() {
        let ready_indices: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, plan)| {
                plan.dependencies
                    .iter()
                    .all(|dep| scheduled.iter().any(|s| &s.tool_name == dep))
            })
            .map(|(i, _)| i)
            .collect();

        let pick = if ready_indices.is_empty() {
            // Unsatisfiable dependency set; degrade to priority order
            // rather than blocking forever.
            let forced = highest_priority_index(&remaining);
            tracing::warn!(
                tool = %remaining[forced].tool_name,
                "Dependency cycle detected; forcing highest-priority plan"
            );
            forced
        } else {
            let mut best = ready_indices[0];
            for &i in &ready_indices[1..] {
                if remaining[i].priority > remaining[best].priority {
                    best = i;
                }
            }
            best
        };

        scheduled.push(remaining.remove(pick));
    }

    scheduled
}

fn highest_priority_index(plans: &[ToolInvocationPlan]) -> usize {
    let mut best = 0;
    for (i, plan) in plans.iter().enumerate().skip(1) {
        if plan.priority > plans[best].priority {
            best = i;
        }
    }
    best
}
