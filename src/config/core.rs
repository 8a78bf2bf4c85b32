use super::RuleConfig;
use super::smart_load;
use crate::error::HookError;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use std::path::{Path, PathBuf};

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.yaml");

/// File names searched in every config directory, lowest priority first
const CONFIG_FILE_NAMES: &[&str] = &["pre-receive.yaml", "pre-receive.yml", "pre-receive.json"];

const ENV_PREFIX: &str = "PUSHGATE_";

pub struct ConfigLoader {
    search_dirs: Vec<PathBuf>,
    custom_config: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader searching `/etc` and the directory holding the executable
    pub fn new(custom_config: Option<&str>) -> Self {
        let mut search_dirs = vec![PathBuf::from("/etc")];
        if let Some(dir) = Self::executable_dir() {
            search_dirs.push(dir);
        }
        Self {
            search_dirs,
            custom_config: custom_config.map(PathBuf::from),
        }
    }

    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Existing config files in merge order
    pub fn found_files(&self) -> Vec<PathBuf> {
        self.search_dirs
            .iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .filter(|path| path.is_file())
            .collect()
    }

    pub fn figment(&self) -> Result<Figment, HookError> {
        tracing::trace!("CONFIG LOAD: Starting");

        let found = self.found_files();
        if let Some(custom) = &self.custom_config {
            if !custom.is_file() {
                return Err(HookError::config(format!(
                    "config file not found: {}",
                    custom.display()
                )));
            }
        } else if found.is_empty() {
            return Err(HookError::config(format!(
                "no configuration file found, searched {}",
                self.search_dirs
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mut figment = Figment::new().merge(Yaml::string(DEFAULT_CONFIG));
        for path in &found {
            tracing::debug!("CONFIG LOAD: merging {}", path.display());
            figment = figment.merge(smart_load::auto(path));
        }
        if let Some(custom) = &self.custom_config {
            tracing::debug!("CONFIG LOAD: merging custom {}", custom.display());
            figment = figment.merge(smart_load::auto(custom));
        }

        // Environment variables always have highest priority
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn load(&self) -> Result<RuleConfig, HookError> {
        let config: RuleConfig = self
            .figment()?
            .extract()
            .map_err(|e| HookError::config(e.to_string()))?;
        tracing::trace!("CONFIG LOAD: {:?}", config);
        Ok(config)
    }

    fn executable_dir() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        exe.parent().map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn loader_in(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new(None).with_search_dirs(vec![dir.path().to_path_buf()])
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = loader_in(&dir).load().unwrap_err();
        assert!(matches!(err, HookError::Config(_)));
        assert!(err.to_string().contains("no configuration file found"));
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        let loader = ConfigLoader::new(missing.to_str()).with_search_dirs(vec![]);
        assert!(matches!(loader.load(), Err(HookError::Config(_))));
    }

    #[test]
    fn test_search_dir_yaml_is_merged_over_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pre-receive.yaml"),
            "allow_email: [example.com]\nprotect_branch: [main]\nclear_cache: false\n",
        )
        .unwrap();

        let config = loader_in(&dir).load().unwrap();
        assert_eq!(config.allow_email, vec!["example.com"]);
        assert_eq!(config.protect_branch, vec!["main"]);
        assert!(!config.clear_cache);
        // Untouched keys keep their embedded defaults
        assert_eq!(config.checker_timeout_secs, 300);
        assert_eq!(config.commit_log_hook.http.timeout_secs, 3);
        assert!(config.merge_keywords.contains(&"Merge".to_string()));
    }

    #[test]
    fn test_custom_json_config_overrides_search_dirs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pre-receive.yaml"), "allow_email: [a.com]\n").unwrap();
        let custom = dir.path().join("custom.json");
        fs::write(&custom, r#"{"allow_email": ["b.com"], "super_account": ["root@b.com"]}"#).unwrap();

        let config = ConfigLoader::new(custom.to_str())
            .with_search_dirs(vec![dir.path().to_path_buf()])
            .load()
            .unwrap();
        assert_eq!(config.allow_email, vec!["b.com"]);
        assert_eq!(config.super_account, vec!["root@b.com"]);
    }

    #[test]
    fn test_style_check_section_parses() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pre-receive.yml"),
            r#"
style_check:
  go:
    enable: true
    path: /usr/local/bin/golangci-lint
    args: ["run"]
    pass_root: false
commit_log_hook:
  http:
    enable: true
    receive_url: http://collector.local/commits
    header:
      X-Token: secret
"#,
        )
        .unwrap();

        let config = loader_in(&dir).load().unwrap();
        let go = &config.style_check["go"];
        assert!(go.enable);
        assert_eq!(go.args, vec!["run"]);
        assert!(!go.pass_root);
        // php comes from the embedded defaults and stays disabled
        assert!(!config.style_check["php"].enable);
        assert!(config.style_check["php"].pass_root);
        let http = &config.commit_log_hook.http;
        assert!(http.enable);
        assert_eq!(http.header["X-Token"], "secret");
    }
}
