use super::to_message;
use mentora_core::llm::{self, ModelInfo};
use mentora_core::Database;
use std::collections::HashMap;
use tauri::State;

const SETTING_KEYS: &[&str] = &[
    "openai_api_key",
    "openai_base_url",
    "claude_api_key",
    "claude_base_url",
    "ollama_host",
    "default_model",
    "chunk_size",
    "chunk_overlap",
    "context_chunks",
    "flashcard_count",
    "quiz_questions",
    "theme",
];

fn known_key(key: &str) -> Result<(), String> {
    if SETTING_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(format!("Unknown setting key: {}", key))
    }
}

/// Keep only the first and last four characters of a secret. Short
/// secrets are hidden entirely.
fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[tauri::command]
pub fn get_settings(db: State<'_, Database>) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for key in SETTING_KEYS {
        if let Some(value) = db.get_setting(key).map_err(to_message)? {
            let shown = if key.ends_with("_api_key") {
                mask_secret(&value)
            } else {
                value
            };
            map.insert(key.to_string(), shown);
        }
    }
    Ok(map)
}

#[tauri::command]
pub fn set_setting(db: State<'_, Database>, key: String, value: String) -> Result<(), String> {
    known_key(&key)?;
    db.set_setting(&key, &value).map_err(to_message)
}

#[tauri::command]
pub fn delete_setting(db: State<'_, Database>, key: String) -> Result<(), String> {
    known_key(&key)?;
    db.delete_setting(&key).map_err(to_message)
}

#[tauri::command]
pub fn get_available_models(db: State<'_, Database>) -> Result<Vec<ModelInfo>, String> {
    llm::available_models(&db).map_err(to_message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("12345678"), "****");
    }

    #[test]
    fn test_known_keys() {
        assert!(known_key("chunk_size").is_ok());
        assert!(known_key("password").is_err());
    }
}
