//! Config file discovery, loading, and environment variable overlay.

use crate::{ChordwiseConfig, ConfigError, DuplicateNotePolicy};
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override, and
/// `./chordwise.toml` is never read in its place. A missing `cli_path` is
/// skipped.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    discover_with_local(cli_path, Path::new("chordwise.toml"))
}

fn discover_with_local(cli_path: Option<&Path>, local: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/chordwise/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("chordwise/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    match cli_path {
        Some(path) if path.exists() => files.push(path.to_path_buf()),
        Some(_) => {}
        None if local.exists() => files.push(local.to_path_buf()),
        None => {}
    }

    files
}

/// Read a TOML file into a raw table.
pub fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a single config file on top of compiled defaults.
pub fn load_from_file(path: &Path) -> Result<ChordwiseConfig, ConfigError> {
    let table = read_table(path)?;
    from_table(table, path)
}

/// Load and merge files in order, later files winning key by key.
pub fn load_files(files: &[PathBuf]) -> Result<(ChordwiseConfig, ConfigSources), ConfigError> {
    let mut sources = ConfigSources::default();
    let mut merged = toml::Table::new();

    for path in files {
        let table = read_table(path)?;
        merge_tables(&mut merged, table);
        sources.files.push(path.clone());
    }

    let origin = files.last().map(PathBuf::as_path).unwrap_or(Path::new("<defaults>"));
    let config = from_table(merged, origin)?;
    Ok((config, sources))
}

fn from_table(table: toml::Table, path: &Path) -> Result<ChordwiseConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Deep-merge `overlay` into `base`. Nested tables merge, everything else replaces.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
///
/// `lookup` is normally `std::env::var(..).ok()`; tests pass a map.
pub fn apply_env_overrides<F>(
    config: &mut ChordwiseConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CHORDWISE_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("CHORDWISE_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    if let Some(v) = lookup("CHORDWISE_ALLOW_EXTENSIONS") {
        config.performance.allow_additional_extensions = parse_bool("CHORDWISE_ALLOW_EXTENSIONS", &v)?;
        sources.env_overrides.push("CHORDWISE_ALLOW_EXTENSIONS".to_string());
    }
    if let Some(v) = lookup("CHORDWISE_EXTENSION_THRESHOLD") {
        config.performance.extension_threshold_semitones =
            v.trim().parse().map_err(|_| invalid("CHORDWISE_EXTENSION_THRESHOLD", &v))?;
        sources.env_overrides.push("CHORDWISE_EXTENSION_THRESHOLD".to_string());
    }

    if let Some(v) = lookup("CHORDWISE_DUPLICATE_NOTE_ON") {
        config.histogram.duplicate_note_on = DuplicateNotePolicy::parse(&v)
            .ok_or_else(|| invalid("CHORDWISE_DUPLICATE_NOTE_ON", &v))?;
        sources.env_overrides.push("CHORDWISE_DUPLICATE_NOTE_ON".to_string());
    }

    if let Some(v) = lookup("CHORDWISE_DEBOUNCE_MS") {
        config.listener.debounce_ms =
            v.trim().parse().map_err(|_| invalid("CHORDWISE_DEBOUNCE_MS", &v))?;
        sources.env_overrides.push("CHORDWISE_DEBOUNCE_MS".to_string());
    }
    if let Some(v) = lookup("CHORDWISE_REFRESH_MS") {
        config.listener.refresh_ms =
            v.trim().parse().map_err(|_| invalid("CHORDWISE_REFRESH_MS", &v))?;
        sources.env_overrides.push("CHORDWISE_REFRESH_MS".to_string());
    }

    Ok(())
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value)),
    }
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        field: var.to_string(),
        message: format!("cannot parse {:?}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_cli_override_is_last() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "custom.toml", "");
        let files = discover_config_files_with_override(Some(&path));
        assert_eq!(files.last(), Some(&path));
    }

    #[test]
    fn test_missing_cli_path_skips_local_file() {
        let dir = TempDir::new().unwrap();
        let local = write(&dir, "chordwise.toml", "[listener]\ndebounce_ms = 250\n");
        let typo = dir.path().join("typo.toml");

        let files = discover_with_local(Some(&typo), &local);
        assert!(!files.contains(&local), "{:?}", files);
        assert!(!files.contains(&typo), "{:?}", files);

        let files = discover_with_local(None, &local);
        assert_eq!(files.last(), Some(&local));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.toml", "[histogram]\ntime_exponent = 0.45\n");

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.histogram.time_exponent, 0.45);
        // Other values should be defaults
        assert_eq!(config.histogram.length_exponent, 0.6);
        assert_eq!(config.listener.refresh_ms, 1000);
    }

    #[test]
    fn test_later_file_wins_key_by_key() {
        let dir = TempDir::new().unwrap();
        let system = write(
            &dir,
            "system.toml",
            "[histogram]\ntime_exponent = 0.5\nlength_exponent = 0.9\n\n[listener]\ndebounce_ms = 100\n",
        );
        let local = write(&dir, "local.toml", "[histogram]\ntime_exponent = 0.4\n");

        let (config, sources) = load_files(&[system.clone(), local.clone()]).unwrap();
        assert_eq!(config.histogram.time_exponent, 0.4);
        assert_eq!(config.histogram.length_exponent, 0.9);
        assert_eq!(config.listener.debounce_ms, 100);
        assert_eq!(sources.files, vec![system, local]);
    }

    #[test]
    fn test_parse_full_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "full.toml",
            r#"
[histogram]
min_time_delta_ms = 250.0
duplicate_note_on = "restart"

[key]
degree_weights = [5.0, 0.0, 2.0, 0.0, 3.0, -1.0, 0.0]
out_of_scale_weight = -3.0
min_score = 0.25
restricted_modes = []

[performance]
allow_additional_extensions = false
extension_threshold_semitones = 24

[telemetry]
log_level = "debug"
"#,
        );

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.histogram.min_time_delta_ms, 250.0);
        assert_eq!(config.histogram.duplicate_note_on, DuplicateNotePolicy::Restart);
        assert_eq!(config.key.degree_weights[0], 5.0);
        assert_eq!(config.key.out_of_scale_weight, -3.0);
        assert_eq!(config.key.min_score, Some(0.25));
        assert!(config.key.restricted_modes.is_empty());
        assert!(!config.performance.allow_additional_extensions);
        assert_eq!(config.performance.extension_threshold_semitones, 24);
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.toml", "[histogram\n");
        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "typed.toml", "[listener]\ndebounce_ms = \"soon\"\n");
        assert!(matches!(load_from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CHORDWISE_LOG_LEVEL", "warn"),
            ("CHORDWISE_ALLOW_EXTENSIONS", "false"),
            ("CHORDWISE_EXTENSION_THRESHOLD", "19"),
            ("CHORDWISE_DUPLICATE_NOTE_ON", "restart"),
            ("CHORDWISE_DEBOUNCE_MS", "150"),
        ]
        .into_iter()
        .collect();

        let mut config = ChordwiseConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides(&mut config, &mut sources, |k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.telemetry.log_level, "warn");
        assert!(!config.performance.allow_additional_extensions);
        assert_eq!(config.performance.extension_threshold_semitones, 19);
        assert_eq!(config.histogram.duplicate_note_on, DuplicateNotePolicy::Restart);
        assert_eq!(config.listener.debounce_ms, 150);
        assert_eq!(sources.env_overrides.len(), 5);
    }

    #[test]
    fn test_rust_log_beats_chordwise_log_level() {
        let mut config = ChordwiseConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides(&mut config, &mut sources, |k| match k {
            "CHORDWISE_LOG_LEVEL" => Some("warn".into()),
            "RUST_LOG" => Some("chordwise=trace".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.telemetry.log_level, "chordwise=trace");
    }

    #[test]
    fn test_bad_env_value_is_invalid() {
        let mut config = ChordwiseConfig::default();
        let mut sources = ConfigSources::default();
        let err = apply_env_overrides(&mut config, &mut sources, |k| {
            (k == "CHORDWISE_ALLOW_EXTENSIONS").then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
