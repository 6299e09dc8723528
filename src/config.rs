//! Typed settings loaded from YAML.
//!
//! Settings are read from a single YAML file (`config/settings.yml` by
//! default). String values may reference environment variables as `${VAR}`
//! or `${VAR:default}`; every placeholder is resolved eagerly at load time
//! so that a missing credential fails the run before any network call.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::RobofetchError;

/// Default location of the settings file.
pub const DEFAULT_CONFIG_PATH: &str = "config/settings.yml";

/// Legacy environment variable names still honored for a handful of
/// documented variables. The documented name always wins; aliases are
/// consulted in order only when it is unset.
const ENV_ALIASES: [(&str, &[&str]); 2] = [
    (
        "ROBOFLOW_API_KEY",
        &["PRIVATE_API_KEY", "PUBLISHABLE_API_KEY"],
    ),
    ("ROBOFLOW_PROJECT", &["ID_PROJECT"]),
];

/// Resolved project settings.
///
/// Read-only after construction; the downloader takes it by value.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub project: ProjectSettings,
    pub paths: PathSettings,
    pub roboflow: RoboflowSettings,
}

/// Top-level project metadata.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProjectSettings {
    #[serde(default)]
    pub name: String,
}

/// Filesystem locations used by the downloader.
#[derive(Clone, Debug, Deserialize)]
pub struct PathSettings {
    /// Destination directory the dataset is materialized into.
    pub processed_data_dir: PathBuf,
}

/// Roboflow API parameters for the dataset export.
#[derive(Clone, Debug, Deserialize)]
pub struct RoboflowSettings {
    pub api_key: String,
    pub workspace: String,
    pub project: String,
    /// Version identifiers are numeric on the Roboflow side, so accept
    /// both `version: 3` and `version: "3"`.
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    pub format: String,
}

impl Settings {
    /// Load settings from a YAML file, resolving `${VAR}` placeholders
    /// from the process environment.
    pub fn load(path: &Path) -> Result<Self, RobofetchError> {
        Self::load_with_env(path, &|var| env::var(var).ok())
    }

    /// Like [`Settings::load`] but with an explicit variable lookup,
    /// so tests do not have to mutate the process environment.
    pub fn load_with_env(
        path: &Path,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, RobofetchError> {
        if !path.is_file() {
            return Err(RobofetchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let raw = fs::read_to_string(path)?;
        let mut value: serde_yaml::Value =
            serde_yaml::from_str(&raw).map_err(|source| RobofetchError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        substitute_value(&mut value, lookup, &mut Vec::new())?;

        let settings: Settings =
            serde_yaml::from_value(value).map_err(|source| RobofetchError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        settings.check_required()?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Absolute destination directory, resolved against the current
    /// working directory when the configured path is relative.
    pub fn processed_data_dir(&self) -> PathBuf {
        let dir = &self.paths.processed_data_dir;
        if dir.is_absolute() {
            dir.clone()
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(dir))
                .unwrap_or_else(|_| dir.clone())
        }
    }

    fn check_required(&self) -> Result<(), RobofetchError> {
        let required = [
            ("roboflow.api_key", &self.roboflow.api_key),
            ("roboflow.workspace", &self.roboflow.workspace),
            ("roboflow.project", &self.roboflow.project),
            ("roboflow.version", &self.roboflow.version),
            ("roboflow.format", &self.roboflow.format),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RobofetchError::EmptyField {
                    field: field.to_string(),
                });
            }
        }

        if self.paths.processed_data_dir.as_os_str().is_empty() {
            return Err(RobofetchError::EmptyField {
                field: "paths.processed_data_dir".to_string(),
            });
        }

        Ok(())
    }
}

/// A `${VAR}` reference that could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedVar {
    pub var: String,
}

/// Resolve every `${VAR}` / `${VAR:default}` placeholder in `input`.
///
/// Lookup order for well-known variables follows [`ENV_ALIASES`]; any
/// other variable is looked up by its own name only. A placeholder with
/// neither a value nor a default is an error.
pub fn resolve_placeholders(
    input: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, UnresolvedVar> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated placeholder, keep the literal text.
            result.push_str(&rest[start..]);
            return Ok(result);
        };

        let token = &after[..end];
        let (var, default) = match token.split_once(':') {
            Some((var, default)) => (var, Some(default)),
            None => (token, None),
        };

        match lookup_with_aliases(var, lookup).or_else(|| default.map(str::to_string)) {
            Some(value) => result.push_str(&value),
            None => {
                return Err(UnresolvedVar {
                    var: var.to_string(),
                })
            }
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

fn lookup_with_aliases(var: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(value) = lookup(var) {
        return Some(value);
    }

    for (documented, aliases) in ENV_ALIASES {
        if documented != var {
            continue;
        }
        for &alias in aliases {
            if let Some(value) = lookup(alias) {
                debug!(var, alias, "resolved via legacy alias");
                return Some(value);
            }
        }
    }

    None
}

fn substitute_value(
    value: &mut serde_yaml::Value,
    lookup: &dyn Fn(&str) -> Option<String>,
    path: &mut Vec<String>,
) -> Result<(), RobofetchError> {
    match value {
        serde_yaml::Value::String(text) => {
            *text = resolve_placeholders(text, lookup).map_err(|unresolved| {
                RobofetchError::UnresolvedEnvVar {
                    var: unresolved.var,
                    field: path.join("."),
                }
            })?;
        }
        serde_yaml::Value::Mapping(mapping) => {
            for (key, child) in mapping.iter_mut() {
                let segment = key
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| "?".to_string());
                path.push(segment);
                substitute_value(child, lookup, path)?;
                path.pop();
            }
        }
        serde_yaml::Value::Sequence(sequence) => {
            for (index, child) in sequence.iter_mut().enumerate() {
                path.push(index.to_string());
                substitute_value(child, lookup, path)?;
                path.pop();
            }
        }
        _ => {}
    }

    Ok(())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(value) => value,
        StringOrNumber::Number(value) => value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lookup(env: &HashMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
        move |var| env.get(var).cloned()
    }

    #[test]
    fn plain_strings_pass_through() {
        let env = env_of(&[]);
        assert_eq!(
            resolve_placeholders("yolov8", &lookup(&env)).expect("resolve"),
            "yolov8"
        );
    }

    #[test]
    fn placeholder_is_substituted() {
        let env = env_of(&[("ROBOFLOW_WORKSPACE", "acme")]);
        assert_eq!(
            resolve_placeholders("${ROBOFLOW_WORKSPACE}", &lookup(&env)).expect("resolve"),
            "acme"
        );
    }

    #[test]
    fn default_is_used_when_unset() {
        let env = env_of(&[]);
        assert_eq!(
            resolve_placeholders("${ROBOFLOW_VERSION:1}", &lookup(&env)).expect("resolve"),
            "1"
        );
    }

    #[test]
    fn set_variable_beats_default() {
        let env = env_of(&[("ROBOFLOW_VERSION", "4")]);
        assert_eq!(
            resolve_placeholders("${ROBOFLOW_VERSION:1}", &lookup(&env)).expect("resolve"),
            "4"
        );
    }

    #[test]
    fn unresolved_placeholder_is_error() {
        let env = env_of(&[]);
        let err = resolve_placeholders("${ROBOFLOW_WORKSPACE}", &lookup(&env))
            .expect_err("should fail");
        assert_eq!(err.var, "ROBOFLOW_WORKSPACE");
    }

    #[test]
    fn multiple_placeholders_in_one_string() {
        let env = env_of(&[("A", "x"), ("B", "y")]);
        assert_eq!(
            resolve_placeholders("${A}/${B}/rest", &lookup(&env)).expect("resolve"),
            "x/y/rest"
        );
    }

    #[test]
    fn legacy_api_key_alias_is_consulted() {
        let env = env_of(&[("PRIVATE_API_KEY", "legacy-key")]);
        assert_eq!(
            resolve_placeholders("${ROBOFLOW_API_KEY}", &lookup(&env)).expect("resolve"),
            "legacy-key"
        );
    }

    #[test]
    fn documented_name_wins_over_alias() {
        let env = env_of(&[
            ("ROBOFLOW_API_KEY", "documented"),
            ("PRIVATE_API_KEY", "legacy"),
            ("PUBLISHABLE_API_KEY", "publishable"),
        ]);
        assert_eq!(
            resolve_placeholders("${ROBOFLOW_API_KEY}", &lookup(&env)).expect("resolve"),
            "documented"
        );
    }

    #[test]
    fn legacy_project_alias_is_consulted() {
        let env = env_of(&[("ID_PROJECT", "my-project")]);
        assert_eq!(
            resolve_placeholders("${ROBOFLOW_PROJECT}", &lookup(&env)).expect("resolve"),
            "my-project"
        );
    }

    #[test]
    fn unterminated_placeholder_is_kept_literally() {
        let env = env_of(&[]);
        assert_eq!(
            resolve_placeholders("${BROKEN", &lookup(&env)).expect("resolve"),
            "${BROKEN"
        );
    }

    fn write_settings(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(yaml.as_bytes()).expect("write settings");
        file
    }

    const VALID_YAML: &str = r#"
project:
  name: demo
paths:
  processed_data_dir: Dataset_roboflow/processed
roboflow:
  api_key: ${ROBOFLOW_API_KEY}
  workspace: acme
  project: widgets
  version: 3
  format: yolov8
"#;

    #[test]
    fn load_resolves_all_required_fields() {
        let file = write_settings(VALID_YAML);
        let env = env_of(&[("ROBOFLOW_API_KEY", "secret")]);

        let settings = Settings::load_with_env(file.path(), &lookup(&env)).expect("load");
        assert_eq!(settings.roboflow.api_key, "secret");
        assert_eq!(settings.roboflow.workspace, "acme");
        assert_eq!(settings.roboflow.project, "widgets");
        assert_eq!(settings.roboflow.version, "3");
        assert_eq!(settings.roboflow.format, "yolov8");
        assert!(settings.processed_data_dir().is_absolute());
    }

    #[test]
    fn load_fails_on_unresolved_api_key() {
        let file = write_settings(VALID_YAML);
        let env = env_of(&[]);

        let err = Settings::load_with_env(file.path(), &lookup(&env)).expect_err("should fail");
        match err {
            RobofetchError::UnresolvedEnvVar { var, field } => {
                assert_eq!(var, "ROBOFLOW_API_KEY");
                assert_eq!(field, "roboflow.api_key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_fails_on_missing_section() {
        let file = write_settings("project:\n  name: demo\n");
        let env = env_of(&[]);

        let err = Settings::load_with_env(file.path(), &lookup(&env)).expect_err("should fail");
        assert!(matches!(err, RobofetchError::ConfigParse { .. }));
    }

    #[test]
    fn load_fails_on_empty_required_field() {
        let yaml = VALID_YAML.replace("workspace: acme", "workspace: \"\"");
        let file = write_settings(&yaml);
        let env = env_of(&[("ROBOFLOW_API_KEY", "secret")]);

        let err = Settings::load_with_env(file.path(), &lookup(&env)).expect_err("should fail");
        match err {
            RobofetchError::EmptyField { field } => assert_eq!(field, "roboflow.workspace"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_fails_on_missing_file() {
        let env = env_of(&[]);
        let err = Settings::load_with_env(Path::new("no/such/settings.yml"), &lookup(&env))
            .expect_err("should fail");
        assert!(matches!(err, RobofetchError::ConfigNotFound { .. }));
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let yaml = format!("{VALID_YAML}training:\n  epochs: 100\n");
        let file = write_settings(&yaml);
        let env = env_of(&[("ROBOFLOW_API_KEY", "secret")]);

        Settings::load_with_env(file.path(), &lookup(&env)).expect("load");
    }
}
