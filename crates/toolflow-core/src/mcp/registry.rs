//! Tool and server registry
//!
//! Static catalogue mapping tool names to their owning servers. Populated
//! once at startup and read-only afterwards, so it is shared as a plain
//! `Arc` with no locking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tool category used for catalogue filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Browser,
    Web,
    Github,
    File,
    Other,
}

/// Metadata for one registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    /// Name of the server that hosts this tool.
    pub server: String,
    pub description: String,
    /// Parameter name -> type hint, advisory only.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    pub category: ToolCategory,
}

/// Launch configuration for one tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub description: String,
    /// Names of the tools this server hosts.
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Read-after-init catalogue of servers and their tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    servers: HashMap<String, ServerDescriptor>,
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server and the tools it hosts.
    pub fn register_server(&mut self, server: ServerDescriptor, tools: Vec<ToolDescriptor>) {
        tracing::debug!(
            server = %server.name,
            tool_count = tools.len(),
            "Registering tool server"
        );
        for tool in tools {
            self.tools.insert(tool.name.clone(), tool);
        }
        self.servers.insert(server.name.clone(), server);
    }

    pub fn server(&self, name: &str) -> Option<&ServerDescriptor> {
        self.servers.get(name)
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// All tools, optionally filtered by category.
    pub fn tools(&self, category: Option<ToolCategory>) -> Vec<&ToolDescriptor> {
        let mut tools: Vec<_> = self
            .tools
            .values()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn server_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.servers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stock catalogue: playwright (browser automation), fetch (web content),
    /// github (repository operations).
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register_server(
            ServerDescriptor {
                name: "playwright".to_string(),
                command: "docker".to_string(),
                args: vec![
                    "run", "-i", "--rm", "--network", "host", "mcp/playwright",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
                env: HashMap::new(),
                description: "Browser automation with Playwright".to_string(),
                tools: vec![
                    "browser_navigate",
                    "browser_click",
                    "browser_type",
                    "browser_snapshot",
                    "browser_take_screenshot",
                    "browser_fill_form",
                    "browser_select_option",
                    "browser_hover",
                    "browser_press_key",
                    "browser_wait_for",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
            },
            vec![
                browser_tool("browser_navigate", "Navigate to a URL", &[("url", "string")]),
                browser_tool(
                    "browser_click",
                    "Click on an element",
                    &[("selector", "string"), ("button", "string (optional)")],
                ),
                browser_tool(
                    "browser_type",
                    "Type text into an input field",
                    &[("selector", "string"), ("text", "string")],
                ),
                browser_tool("browser_snapshot", "Take a snapshot of the current page", &[]),
                browser_tool(
                    "browser_take_screenshot",
                    "Take a screenshot of the page or element",
                    &[("selector", "string (optional)"), ("fullPage", "boolean (optional)")],
                ),
                browser_tool(
                    "browser_fill_form",
                    "Fill out a form with multiple fields",
                    &[("fields", "object")],
                ),
                browser_tool(
                    "browser_select_option",
                    "Select an option from a dropdown",
                    &[("selector", "string"), ("value", "string")],
                ),
                browser_tool("browser_hover", "Hover over an element", &[("selector", "string")]),
                browser_tool("browser_press_key", "Press a key on the keyboard", &[("key", "string")]),
                browser_tool(
                    "browser_wait_for",
                    "Wait for text to appear or disappear",
                    &[("text", "string (optional)"), ("timeout", "number (optional)")],
                ),
            ],
        );

        registry.register_server(
            ServerDescriptor {
                name: "fetch".to_string(),
                command: "docker".to_string(),
                args: vec!["run", "-i", "--rm", "mcp/fetch"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                env: HashMap::new(),
                description: "Web content fetching and markdown extraction".to_string(),
                tools: vec!["fetch".to_string()],
            },
            vec![ToolDescriptor {
                name: "fetch".to_string(),
                server: "fetch".to_string(),
                description: "Fetch web content and extract as markdown".to_string(),
                parameters: params(&[("url", "string"), ("max_length", "number (optional)")]),
                category: ToolCategory::Web,
            }],
        );

        registry.register_server(
            ServerDescriptor {
                name: "github".to_string(),
                command: "npx".to_string(),
                args: vec!["-y", "@modelcontextprotocol/server-github"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                env: std::env::var("GITHUB_PERSONAL_ACCESS_TOKEN")
                    .ok()
                    .map(|token| {
                        HashMap::from([("GITHUB_PERSONAL_ACCESS_TOKEN".to_string(), token)])
                    })
                    .unwrap_or_default(),
                description: "GitHub repository operations".to_string(),
                tools: vec![
                    "github_search_repositories".to_string(),
                    "github_get_file_contents".to_string(),
                ],
            },
            vec![
                ToolDescriptor {
                    name: "github_search_repositories".to_string(),
                    server: "github".to_string(),
                    description: "Search for GitHub repositories".to_string(),
                    parameters: params(&[("query", "string")]),
                    category: ToolCategory::Github,
                },
                ToolDescriptor {
                    name: "github_get_file_contents".to_string(),
                    server: "github".to_string(),
                    description: "Get contents of a file from GitHub".to_string(),
                    parameters: params(&[
                        ("owner", "string"),
                        ("repo", "string"),
                        ("path", "string"),
                    ]),
                    category: ToolCategory::Github,
                },
            ],
        );

        registry
    }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn browser_tool(name: &str, description: &str, parameters: &[(&str, &str)]) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        server: "playwright".to_string(),
        description: description.to_string(),
        parameters: params(parameters),
        category: ToolCategory::Browser,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogue_resolves_tools_to_servers() {
        let registry = ToolRegistry::builtin();

        let fetch = registry.tool("fetch").unwrap();
        assert_eq!(fetch.server, "fetch");

        let navigate = registry.tool("browser_navigate").unwrap();
        assert_eq!(navigate.server, "playwright");

        assert!(registry.tool("no_such_tool").is_none());
        assert!(registry.server("playwright").is_some());
    }

    #[test]
    fn category_filter_narrows_listing() {
        let registry = ToolRegistry::builtin();

        let browser = registry.tools(Some(ToolCategory::Browser));
        assert!(browser.iter().all(|t| t.category == ToolCategory::Browser));
        assert!(browser.len() >= 10);

        let all = registry.tools(None);
        assert!(all.len() > browser.len());
    }
}
