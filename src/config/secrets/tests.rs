use super::*;
use std::fs;
use tempfile::TempDir;

fn load_str(content: &str) -> Result<Secrets, ConfigError> {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("secrets.txt");
    fs::write(&path, content).expect("should write secrets file");
    Secrets::load(&path)
}

#[test]
fn load_key_value_lines() {
    let secrets = load_str("OPENAI_API_KEY=sk-test-123\n\n# staging key\nOTHER=abc\n")
        .expect("should load secrets");

    assert_eq!(secrets.len(), 2);
    assert_eq!(secrets.get("OPENAI_API_KEY"), Some("sk-test-123"));
    assert_eq!(secrets.get("OTHER"), Some("abc"));
    assert_eq!(secrets.get("MISSING"), None);
}

#[test]
fn quoted_values_are_unquoted() {
    let secrets = load_str("OPENAI_API_KEY=\"sk-quoted\"\n").expect("should load secrets");
    assert_eq!(secrets.get("OPENAI_API_KEY"), Some("sk-quoted"));
}

#[test]
fn empty_value_is_absent() {
    let secrets = load_str("OPENAI_API_KEY=\n").expect("should load secrets");
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets.get("OPENAI_API_KEY"), None);
}

#[test]
fn later_duplicate_wins() {
    let secrets = load_str("KEY=first\nKEY=second\n").expect("should load secrets");
    assert_eq!(secrets.get("KEY"), Some("second"));
}

#[test]
fn malformed_line_is_rejected() {
    let result = load_str("OPENAI_API_KEY=sk-test\nbroken line\n");
    assert!(matches!(result, Err(ConfigError::InvalidSecrets(_))));
}

#[test]
fn loading_leaves_process_environment_alone() {
    let secrets =
        load_str("NPC_LORE_SECRETS_ONLY_KEY=sk-private\n").expect("should load secrets");

    assert_eq!(secrets.get("NPC_LORE_SECRETS_ONLY_KEY"), Some("sk-private"));
    assert!(std::env::var("NPC_LORE_SECRETS_ONLY_KEY").is_err());
}

#[test]
fn missing_file_loads_empty() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let secrets =
        Secrets::load(temp_dir.path().join("secrets.txt")).expect("missing file is not an error");
    assert!(secrets.is_empty());
}

#[test]
fn load_crlf_file() {
    let secrets = load_str("OPENAI_API_KEY=sk-live\r\n").expect("should load secrets");
    assert_eq!(secrets.get("OPENAI_API_KEY"), Some("sk-live"));
}

#[test]
fn debug_hides_values() {
    let secrets: Secrets = [("OPENAI_API_KEY", "sk-very-secret")].into_iter().collect();
    let rendered = format!("{:?}", secrets);

    assert!(rendered.contains("OPENAI_API_KEY"));
    assert!(!rendered.contains("sk-very-secret"));
}
