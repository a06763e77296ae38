use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;

/// Load configuration from an explicit path, falling back to
/// `config.json` in the working directory. A missing file yields the
/// defaults; [`Config::validate`] decides whether those are usable.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = Path::new("config.json");
    let path = config_path.unwrap_or(default_path);

    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;
        return Ok(config);
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_json_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "telegram": {{ "token": "t", "merchantChannel": "-100" }},
                 "delivery": {{ "fee": 25 }} }}"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.telegram.token, "t");
        assert_eq!(config.delivery.fee, 25);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/config.json"))).unwrap();
        assert!(config.telegram.token.is_empty());
        assert_eq!(config.delivery.fee, 39);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
