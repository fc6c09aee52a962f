//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [mount] section
    if let Some(section) = ini.section(Some("mount")) {
        if let Some(v) = section.get("threads_per_root") {
            config.mount.threads_per_root = match v.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigFileError::InvalidValue {
                        section: "mount".to_string(),
                        key: "threads_per_root".to_string(),
                        value: v.to_string(),
                        reason: "must be a positive integer".to_string(),
                    });
                }
            };
        }
        if let Some(v) = section.get("read_only") {
            config.mount.read_only = parse_bool(v);
        }
        if let Some(v) = section.get("allow_other") {
            config.mount.allow_other = parse_bool(v);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    // [trace] section
    if let Some(section) = ini.section(Some("trace")) {
        if let Some(v) = section.get("enabled") {
            config.trace.enabled = parse_bool(v);
        }
        if let Some(v) = section.get("delay_ms") {
            config.trace.delay_ms =
                v.trim()
                    .parse()
                    .map_err(|_| ConfigFileError::InvalidValue {
                        section: "trace".to_string(),
                        key: "delay_ms".to_string(),
                        value: v.to_string(),
                        reason: "must be a non-negative integer (milliseconds)".to_string(),
                    })?;
        }
    }

    Ok(config)
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.mount.threads_per_root, 10);
        assert!(config.mount.read_only);
        assert_eq!(config.trace.delay_ms, DEFAULT_TRACE_DELAY_MS);
    }

    #[test]
    fn test_parse_all_sections() {
        let config = parse(
            "[mount]\nthreads_per_root = 4\nread_only = false\nallow_other = yes\n\
             [logging]\nfile = /tmp/pufs-test.log\n\
             [trace]\nenabled = on\ndelay_ms = 250\n",
        )
        .unwrap();

        assert_eq!(config.mount.threads_per_root, 4);
        assert!(!config.mount.read_only);
        assert!(config.mount.allow_other);
        assert_eq!(config.logging.file, PathBuf::from("/tmp/pufs-test.log"));
        assert!(config.trace.enabled);
        assert_eq!(config.trace.delay_ms, 250);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = parse("[mount]\nthreads_per_root = 0\n").unwrap_err();
        assert!(err.to_string().contains("mount.threads_per_root"));
    }

    #[test]
    fn test_invalid_delay_rejected() {
        let err = parse("[trace]\ndelay_ms = soon\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("no"));
        assert!(!parse_bool("garbage"));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x.log"), home.join("x.log"));
        }
    }
}
