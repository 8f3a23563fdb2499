//! Sandbox settings
//!
//! Window options and keybindings, stored as RON next to the executable.

use bevy::prelude::*;
use bevy::window::{MonitorSelection, PresentMode, WindowMode, WindowResolution};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::keybindings::Keybindings;

/// Default settings file
pub const SETTINGS_PATH: &str = "settings.ron";

/// User-configurable sandbox settings
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default = "default_window_mode")]
    pub window_mode: WindowModeOption,
    #[serde(default = "default_resolution")]
    pub resolution: ResolutionOption,
    #[serde(default = "default_vsync")]
    pub vsync: bool,
    #[serde(default)]
    pub keybindings: Keybindings,
}

fn default_window_mode() -> WindowModeOption {
    WindowModeOption::Windowed
}

fn default_resolution() -> ResolutionOption {
    ResolutionOption::HD720
}

fn default_vsync() -> bool {
    true
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            window_mode: default_window_mode(),
            resolution: default_resolution(),
            vsync: default_vsync(),
            keybindings: Keybindings::default(),
        }
    }
}

impl GameSettings {
    /// Read settings from a RON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        ron::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    /// Load settings from the default file, or defaults if missing or broken
    pub fn load() -> Self {
        if !Path::new(SETTINGS_PATH).exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }
        match Self::load_from(SETTINGS_PATH) {
            Ok(settings) => {
                info!("Loaded settings from {}", SETTINGS_PATH);
                settings
            }
            Err(e) => {
                warn!("{}", e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let path = path.as_ref();
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(path, contents).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn save(&self) -> Result<(), String> {
        self.save_to(SETTINGS_PATH)
    }

    /// Primary window described by these settings
    pub fn window(&self, title: &str) -> Window {
        let (width, height) = self.resolution.dimensions();
        Window {
            title: title.to_string(),
            resolution: WindowResolution::new(width, height),
            mode: self.window_mode.to_bevy(),
            present_mode: if self.vsync {
                PresentMode::AutoVsync
            } else {
                PresentMode::AutoNoVsync
            },
            ..default()
        }
    }
}

/// Window mode options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowModeOption {
    Windowed,
    BorderlessFullscreen,
}

impl WindowModeOption {
    pub fn to_bevy(&self) -> WindowMode {
        match self {
            WindowModeOption::Windowed => WindowMode::Windowed,
            WindowModeOption::BorderlessFullscreen => WindowMode::BorderlessFullscreen(MonitorSelection::Current),
        }
    }
}

/// Resolution presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionOption {
    HD720,
    HD1080,
    QHD1440,
}

impl ResolutionOption {
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            ResolutionOption::HD720 => (1280.0, 720.0),
            ResolutionOption::HD1080 => (1920.0, 1080.0),
            ResolutionOption::QHD1440 => (2560.0, 1440.0),
        }
    }
}

/// Loads settings and exposes the keybindings as their own resource
pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        let settings = GameSettings::load();
        let keybindings = settings.keybindings.clone();

        app.insert_resource(settings)
            .insert_resource(keybindings)
            .add_systems(Update, (save_settings_on_change, sync_keybindings));
    }
}

fn save_settings_on_change(settings: Res<GameSettings>) {
    if settings.is_changed() && !settings.is_added() {
        if let Err(e) = settings.save() {
            error!("Failed to save settings: {}", e);
        }
    }
}

/// Keep the Keybindings resource in sync with GameSettings
fn sync_keybindings(settings: Res<GameSettings>, mut keybindings: ResMut<Keybindings>) {
    if settings.is_changed() && !settings.is_added() {
        *keybindings = settings.keybindings.clone();
        info!("Synced keybindings from settings");
    }
}
