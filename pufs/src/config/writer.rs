//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[mount]
; Concurrent backing calls allowed per root (default: 10)
; The worker pool holds roots x threads_per_root slots
threads_per_root = {}
; Mount the union read-only (default: true)
read_only = {}
; Allow other users to access the mount (default: false)
; Requires user_allow_other in /etc/fuse.conf
allow_other = {}

[logging]
; Log file path (default: ~/.pufs/logs/pufs.log)
file = {}

[trace]
; Log every backing call and delay it (default: false)
enabled = {}
; Delay before each traced call in milliseconds (default: 1000)
delay_ms = {}
"#,
        config.mount.threads_per_root,
        config.mount.read_only,
        config.mount.allow_other,
        path_to_string(&config.logging.file),
        config.trace.enabled,
        config.trace.delay_ms,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
