//! The system prompt every session starts from.

use patchloop_config::AgentConfig;
use std::path::Path;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a coding agent. Keep going until the user's request is completely resolved before ending your turn. \
Only stop when you are sure the problem is solved, or when you need more information from the user. \
If you are not sure about something in the project, use your tools to read files and gather information instead of guessing. \
Plan before each tool call and reflect on the outcome of the previous ones.";

/// Build the system prompt for `workspace_root`.
///
/// The base text (or `system_prompt_override`) is followed by the project
/// root and, when the rules file exists, its contents.
pub fn system_prompt(workspace_root: &Path, config: &AgentConfig) -> String {
    let mut prompt = config
        .system_prompt_override
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    prompt.push_str(&format!("  \n\n Project root folder: {}", workspace_root.display()));

    let rules_path = workspace_root.join(config.rules_file.trim());
    if !config.rules_file.trim().is_empty() && rules_path.is_file() {
        match std::fs::read_to_string(&rules_path) {
            Ok(rules) => {
                prompt.push_str("  \n\nAdditional rules from the user: \n");
                prompt.push_str(&rules);
            }
            Err(e) => {
                tracing::warn!(path = %rules_path.display(), error = %e, "Failed to read rules file");
            }
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_the_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let prompt = system_prompt(dir.path(), &AgentConfig::default());
        assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(prompt.contains(&format!("Project root folder: {}", dir.path().display())));
        assert!(!prompt.contains("Additional rules"));
    }

    #[test]
    fn appends_the_rules_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("patchloop-rules.md"), "Use tabs.").unwrap();
        let prompt = system_prompt(dir.path(), &AgentConfig::default());
        assert!(prompt.ends_with("Additional rules from the user: \nUse tabs."));
    }

    #[test]
    fn override_replaces_the_base_text() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            system_prompt_override: Some("Only answer in haiku.".into()),
            ..AgentConfig::default()
        };
        let prompt = system_prompt(dir.path(), &config);
        assert!(prompt.starts_with("Only answer in haiku."));
        assert!(!prompt.contains(DEFAULT_SYSTEM_PROMPT));
    }
}
