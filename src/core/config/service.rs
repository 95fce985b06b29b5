use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use crate::core::errors::ApiError;

/// Loads `config.yml` merged with `secrets.yml` (secrets win on conflict).
///
/// Secret values can always be overridden through the environment; see
/// [`ConfigService::secret`].
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("MAHARAJA_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.user_data_dir.join("secrets.yml")
    }

    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Resolve a secret: environment variable first, then the merged config
    /// at the given dotted path (e.g. `llm.google_api_key`).
    pub fn secret(&self, config: &Value, config_path: &str, env_var: &str) -> Option<String> {
        if let Ok(value) = env::var(env_var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }

        let mut current = config;
        for key in config_path.split('.') {
            current = current.get(key)?;
        }
        current
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let entry = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_prefers_overlay_leaves() {
        let base = json!({"llm": {"provider": "gemini", "temperature": 0.3}});
        let overlay = json!({"llm": {"provider": "groq"}});
        let merged = deep_merge(&base, &overlay);

        assert_eq!(merged["llm"]["provider"], "groq");
        assert_eq!(merged["llm"]["temperature"], 0.3);
    }

    #[test]
    fn yaml_files_load_as_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "llm:\n  provider: groq\n").unwrap();

        let value = load_yaml_file(&path);
        assert_eq!(value["llm"]["provider"], "groq");

        // missing and non-mapping files degrade to an empty object
        assert_eq!(load_yaml_file(&dir.path().join("missing.yml")), json!({}));
        let scalar = dir.path().join("scalar.yml");
        std::fs::write(&scalar, "just a string").unwrap();
        assert_eq!(load_yaml_file(&scalar), json!({}));
    }

    #[test]
    fn deep_merge_keeps_disjoint_sections() {
        let base = json!({"server": {"port": 8000}});
        let overlay = json!({"flights": {"use_real_api": false}});
        let merged = deep_merge(&base, &overlay);

        assert_eq!(merged["server"]["port"], 8000);
        assert_eq!(merged["flights"]["use_real_api"], false);
    }
}
