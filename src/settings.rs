use std::path::{Path, PathBuf};

/// Settings that persist across runs.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Maximum number of history snapshots kept per session (0 = unbounded).
    pub max_history: usize,
    /// Directory the JSON session store writes to.
    pub sessions_dir: PathBuf,
    /// Directory holding precomputed `{session_id}_mask.png` files.
    pub masks_dir: PathBuf,
    /// Resample uploads to the mask's working resolution.
    pub resample_to_mask: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let base = crate::logger::data_dir().join("FaceTint");
        Self {
            max_history: 100,
            sessions_dir: base.join("sessions"),
            masks_dir: base.join("masks"),
            resample_to_mask: true,
        }
    }
}

impl Settings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/facetint/facetint_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\FaceTint\facetint_settings.cfg
    /// On macOS:   ~/Library/Application Support/FaceTint/facetint_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?
                .join("facetint");
            return Some(config_dir.join("facetint_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(PathBuf::from(appdata).join("FaceTint").join("facetint_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("FaceTint")
                    .join("facetint_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("facetint_settings.cfg")))
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_history={}\n\
             sessions_dir={}\n\
             masks_dir={}\n\
             resample_to_mask={}\n",
            self.max_history,
            self.sessions_dir.display(),
            self.masks_dir.display(),
            self.resample_to_mask,
        )
    }

    /// Parse `key=value` lines on top of the defaults. Unknown keys, comments
    /// and malformed values are skipped.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "max_history" => {
                    if let Ok(n) = val.parse() {
                        s.max_history = n;
                    }
                }
                "sessions_dir" if !val.is_empty() => {
                    s.sessions_dir = PathBuf::from(val);
                }
                "masks_dir" if !val.is_empty() => {
                    s.masks_dir = PathBuf::from(val);
                }
                "resample_to_mask" => {
                    s.resample_to_mask = val == "true";
                }
                _ => {}
            }
        }
        s
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from the default location (defaults if missing or corrupt).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            crate::log_warn!("Could not write settings {}: {}", path.display(), e);
        }
    }

    /// History cap as understood by `HistoryStack`.
    pub fn history_limit(&self) -> Option<usize> {
        (self.max_history > 0).then_some(self.max_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trip() {
        let s = Settings {
            max_history: 7,
            sessions_dir: PathBuf::from("/tmp/sessions"),
            masks_dir: PathBuf::from("/tmp/masks"),
            resample_to_mask: false,
        };
        assert_eq!(Settings::from_config_str(&s.to_config_string()), s);
    }

    #[test]
    fn corrupt_lines_fall_back_to_defaults() {
        let s = Settings::from_config_str("# comment\nmax_history=lots\nbogus\nunknown=1\nresample_to_mask=true\n");
        assert_eq!(s.max_history, Settings::default().max_history);
        assert!(s.resample_to_mask);
    }

    #[test]
    fn zero_means_unbounded_history() {
        let s = Settings::from_config_str("max_history=0");
        assert_eq!(s.history_limit(), None);
        assert_eq!(Settings::default().history_limit(), Some(100));
    }

    #[test]
    fn saved_file_loads_back() {
        let dir = std::env::temp_dir().join(format!("facetint_settings_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("facetint_settings.cfg");
        let s = Settings {
            max_history: 12,
            resample_to_mask: false,
            ..Settings::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("facetint_no_such_settings.cfg");
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
