//! Persisted application settings — plain `key=value` lines in a `.cfg`
//! file under the user's config directory. Missing or corrupt files fall
//! back to defaults; saving silently skips on I/O failure.

use std::path::PathBuf;

use crate::host::PrefStore;

pub struct AppSettings {
    /// Transparency panel: apply only on explicit Refresh instead of live.
    pub manual_update: bool,
    /// Dark UI theme.
    pub dark_mode: bool,
    /// Directory the Open dialog starts in (last directory a file was
    /// loaded from). Empty = OS default.
    pub last_open_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            manual_update: false,
            dark_mode: true,
            last_open_dir: String::new(),
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/rasterveil/rasterveil_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\RasterVeil\rasterveil_settings.cfg
    /// On macOS:   ~/Library/Application Support/RasterVeil/rasterveil_settings.cfg
    /// Fallback:   same directory as the executable.
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("rasterveil");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("rasterveil_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_else(|_| {
                    std::env::current_exe()
                        .ok()
                        .and_then(|p| p.parent().map(|d| d.to_string_lossy().into_owned()))
                        .unwrap_or_default()
                });
            let config_dir = PathBuf::from(appdata).join("RasterVeil");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("rasterveil_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("RasterVeil");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("rasterveil_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("rasterveil_settings.cfg")))
        }
    }

    fn to_config_string(&self) -> String {
        format!(
            "manual_update={}\n\
             dark_mode={}\n\
             last_open_dir={}\n",
            self.manual_update, self.dark_mode, self.last_open_dir,
        )
    }

    fn apply_config_line(&mut self, line: &str) {
        let Some((key, val)) = line.split_once('=') else { return };
        let key = key.trim();
        let val = val.trim();
        match key {
            "manual_update" => self.manual_update = val == "true",
            "dark_mode" => self.dark_mode = val == "true",
            "last_open_dir" => self.last_open_dir = val.to_string(),
            _ => {} // unknown key from a newer/older version — ignore
        }
    }

    /// Save settings to disk.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        let _ = std::fs::write(path, self.to_config_string());
    }

    /// Load settings from disk (returns default if file missing or corrupt).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        let mut s = Self::default();
        for line in content.lines() {
            s.apply_config_line(line);
        }
        s
    }
}

impl PrefStore for AppSettings {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match key {
            "manual_update" => self.manual_update,
            "dark_mode" => self.dark_mode,
            _ => default,
        }
    }

    fn set_bool(&mut self, key: &str, value: bool) {
        match key {
            "manual_update" => self.manual_update = value,
            "dark_mode" => self.dark_mode = value,
            _ => return,
        }
        self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trip() {
        let mut s = AppSettings {
            manual_update: true,
            dark_mode: false,
            last_open_dir: "/data/rasters".to_string(),
        };
        let text = s.to_config_string();
        s = AppSettings::default();
        for line in text.lines() {
            s.apply_config_line(line);
        }
        assert!(s.manual_update);
        assert!(!s.dark_mode);
        assert_eq!(s.last_open_dir, "/data/rasters");
    }

    #[test]
    fn corrupt_lines_are_ignored() {
        let mut s = AppSettings::default();
        s.apply_config_line("not a key-value line");
        s.apply_config_line("unknown_key=whatever");
        s.apply_config_line("manual_update=yes"); // not "true" → false
        assert!(!s.manual_update);
    }

    #[test]
    fn pref_store_reads_known_keys() {
        let s = AppSettings {
            manual_update: true,
            ..Default::default()
        };
        assert!(s.get_bool("manual_update", false));
        assert!(s.get_bool("no_such_key", true));
    }
}
