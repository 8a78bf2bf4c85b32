use figment::providers::{Format, Json, Toml, Yaml};
use std::path::Path;

/// Pick a figment provider for a config file from its extension.
/// Unknown extensions are sniffed from the content and fall back to YAML.
pub fn auto<P: AsRef<Path>>(path: P) -> impl figment::Provider {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "toml" => SmartProvider::Toml(Toml::file(path)),
        "json" => SmartProvider::Json(Json::file(path)),
        "yaml" | "yml" => SmartProvider::Yaml(Yaml::file(path)),
        _ => {
            let detected = std::fs::read_to_string(path)
                .ok()
                .and_then(|content| detect_format_from_content(&content));
            tracing::debug!(
                "config {} has no known extension, detected {:?}",
                path.display(),
                detected
            );
            match detected {
                Some(ConfigFormat::Json) => SmartProvider::Json(Json::file(path)),
                Some(ConfigFormat::Toml) => SmartProvider::Toml(Toml::file(path)),
                Some(ConfigFormat::Yaml) | None => SmartProvider::Yaml(Yaml::file(path)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

/// Wrapper enum to handle different provider types
enum SmartProvider {
    Toml(figment::providers::Data<Toml>),
    Json(figment::providers::Data<Json>),
    Yaml(figment::providers::Data<Yaml>),
}

impl figment::Provider for SmartProvider {
    fn metadata(&self) -> figment::Metadata {
        match self {
            SmartProvider::Toml(p) => p.metadata(),
            SmartProvider::Json(p) => p.metadata(),
            SmartProvider::Yaml(p) => p.metadata(),
        }
    }

    fn data(
        &self,
    ) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        match self {
            SmartProvider::Toml(p) => p.data(),
            SmartProvider::Json(p) => p.data(),
            SmartProvider::Yaml(p) => p.data(),
        }
    }
}

fn detect_format_from_content(content: &str) -> Option<ConfigFormat> {
    let trimmed = content.trim();

    if (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
    {
        return Some(ConfigFormat::Json);
    }

    // TOML table headers or `key = value` lines
    if trimmed.lines().any(|line| {
        let line = line.trim();
        (line.starts_with('[') && line.ends_with(']') && !line.contains(':'))
            || (line.contains(" = ") && !line.contains(':'))
    }) {
        return Some(ConfigFormat::Toml);
    }

    if trimmed.contains("---") || trimmed.lines().any(|line| line.contains(':')) {
        return Some(ConfigFormat::Yaml);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            detect_format_from_content(r#"{"allow_email": ["a.com"]}"#),
            Some(ConfigFormat::Json)
        );
        assert_eq!(
            detect_format_from_content("allow_email:\n  - a.com"),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            detect_format_from_content("[style_check.go]\nenable = true"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(detect_format_from_content("clear_cache = false"), Some(ConfigFormat::Toml));
        assert_eq!(detect_format_from_content(""), None);
    }

    #[test]
    fn test_unknown_extension_is_sniffed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pre-receive.conf");
        std::fs::write(&path, "{\"ignore_repos\": [\"sandbox\"]}").unwrap();

        let value: BTreeMap<String, Vec<String>> = Figment::new().merge(auto(&path)).extract().unwrap();
        assert_eq!(value["ignore_repos"], vec!["sandbox"]);
    }
}
