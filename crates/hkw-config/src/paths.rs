use std::path::PathBuf;

/// XDG app name used for global config lookups.
pub const APP_NAME: &str = "hookwarden";

fn project_config_dir(app_name: &str) -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", app_name).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Global engine settings (`~/.config/hookwarden/config.toml` on Linux).
pub fn global_settings_path() -> Option<PathBuf> {
    project_config_dir(APP_NAME).map(|dir| dir.join("config.toml"))
}

/// Global hooks document merged underneath the project one.
pub fn global_hooks_path() -> Option<PathBuf> {
    project_config_dir(APP_NAME).map(|dir| dir.join("hooks.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_paths_share_config_dir() {
        let (Some(settings), Some(hooks)) = (global_settings_path(), global_hooks_path()) else {
            // No home directory in this environment.
            return;
        };
        assert_eq!(settings.parent(), hooks.parent());
        assert!(settings.ends_with("config.toml"));
        assert!(hooks.ends_with("hooks.toml"));
        assert!(
            settings
                .to_string_lossy()
                .to_lowercase()
                .contains(APP_NAME),
            "global path should be namespaced by app name: {}",
            settings.display()
        );
    }
}
