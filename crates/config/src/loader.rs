use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env::apply_env_overrides,
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::TelemetryConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "admitly.toml",
    "admitly.yaml",
    "admitly.yml",
    "admitly.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<TelemetryConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("parsing {}", path.display()))
}

/// Discover config from standard locations, then apply environment overrides.
///
/// Search order:
/// 1. `./admitly.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/admitly/admitly.{toml,yaml,yml,json}`
///
/// A missing or unreadable file falls back to `TelemetryConfig::default()`.
pub fn discover_and_load() -> TelemetryConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading telemetry config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                TelemetryConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            TelemetryConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Returns the user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "admitly").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<TelemetryConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::ExporterType, std::io::Write};

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "admitly.toml",
            "service_name = \"advisor\"\nexporter = \"otlp\"\nsampling_ratio = 0.25\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.service_name, "advisor");
        assert_eq!(cfg.exporter, ExporterType::Otlp);
        assert_eq!(cfg.sampling_ratio, 0.25);
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write_file(&dir, "admitly.yaml", "exporter: jaeger\nretention_secs: 60\n");
        let cfg = load_config(&yaml).unwrap();
        assert_eq!(cfg.exporter, ExporterType::Jaeger);
        assert_eq!(cfg.retention_secs, 60);

        let json = write_file(&dir, "admitly.json", r#"{"metrics": {"enabled": false}}"#);
        let cfg = load_config(&json).unwrap();
        assert!(!cfg.metrics.enabled);
        assert_eq!(cfg.metrics.prefix, "ai_agent");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "admitly.ini", "enabled = true");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format: .ini"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/definitely/not/here/admitly.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
