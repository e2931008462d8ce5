//! Application-wide constants
//!
//! This module contains the magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Configuration file locations
pub mod config {
    /// Directory under the platform config dir holding user-scope settings
    pub const APP_DIR: &str = "FakeNewsDetector";

    /// User-scope configuration file name
    pub const USER_FILENAME: &str = "user.config.json";

    /// Directory next to the executable holding system-scope settings
    pub const SYSTEM_DIR: &str = "config";

    /// System-scope configuration file name
    pub const SYSTEM_FILENAME: &str = "system.config.json";

    /// Maximum number of entries kept in the recent files list
    pub const MAX_RECENT_FILES: usize = 10;
}

/// Closed ranges and allow-lists enforced by the validator
pub mod validation {
    pub const VALID_THEMES: &[&str] = &["Light", "Dark", "System"];
    pub const VALID_LANGUAGES: &[&str] = &["zh-CN", "en-US"];

    pub const MIN_WINDOW_WIDTH: f64 = 800.0;
    pub const MAX_WINDOW_WIDTH: f64 = 4000.0;
    pub const MIN_WINDOW_HEIGHT: f64 = 600.0;
    pub const MAX_WINDOW_HEIGHT: f64 = 3000.0;

    /// API timeout bounds in seconds
    pub const MIN_API_TIMEOUT: i32 = 5;
    pub const MAX_API_TIMEOUT: i32 = 120;

    pub const MIN_RETRY_COUNT: i32 = 0;
    pub const MAX_RETRY_COUNT: i32 = 10;

    pub const MIN_FONT_SIZE: f64 = 8.0;
    pub const MAX_FONT_SIZE: f64 = 24.0;
}

/// Built-in default values (lowest precedence in the merge)
pub mod defaults {
    pub const THEME: &str = "Light";
    pub const LANGUAGE: &str = "zh-CN";

    pub const WINDOW_WIDTH: f64 = 1280.0;
    pub const WINDOW_HEIGHT: f64 = 720.0;
    pub const WINDOW_X: f64 = 100.0;
    pub const WINDOW_Y: f64 = 100.0;

    pub const API_BASE_URL: &str = "https://api.fakenewsdetector.com";
    pub const API_TIMEOUT: i32 = 30;
    pub const API_RETRY_COUNT: i32 = 3;

    pub const FONT_SIZE: f64 = 14.0;
}

/// File watching and reload timing
pub mod timing {
    /// Delay after a change event before reloading, lets external writers finish
    pub const WATCH_DEBOUNCE_MS: u64 = 300;

    /// Window after our own save completes during which change events are ignored
    pub const SELF_WRITE_GRACE_MS: u64 = 500;

    /// Capacity of the channel between the notify callback and the reload task
    pub const WATCH_CHANNEL_CAPACITY: usize = 100;
}

/// Page titles shown in the shell header
pub mod titles {
    pub const HOME: &str = "Home";
    pub const DETECTION: &str = "Detection";
    pub const SETTINGS: &str = "Settings";
    pub const HISTORY: &str = "History";
    pub const STATISTICS: &str = "Statistics";
    pub const TEST: &str = "Feature Tests";
    pub const UNKNOWN: &str = "Unknown";
}
