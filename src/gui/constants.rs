//! GUI-specific constants for layout, status colors and intervals

use egui;

/// Main window dimensions
pub const WINDOW_WIDTH: f32 = 1280.0;
pub const WINDOW_HEIGHT: f32 = 720.0;
pub const WINDOW_MIN_WIDTH: f32 = 800.0;
pub const WINDOW_MIN_HEIGHT: f32 = 600.0;

/// Layout spacing
pub const PADDING: f32 = 10.0;
pub const SECTION_SPACING: f32 = 15.0;
pub const ITEM_SPACING: f32 = 8.0;
pub const NAV_PANEL_WIDTH: f32 = 180.0;

/// Status colors, by event severity
pub const STATUS_INFO: egui::Color32 = egui::Color32::from_rgb(0, 200, 0);
pub const STATUS_WARNING: egui::Color32 = egui::Color32::from_rgb(200, 200, 0);
pub const STATUS_ERROR: egui::Color32 = egui::Color32::from_rgb(200, 0, 0);

/// Classification colors on the home page
pub const REAL_NEWS: egui::Color32 = egui::Color32::from_rgb(76, 175, 80);
pub const SUSPICIOUS_NEWS: egui::Color32 = egui::Color32::from_rgb(255, 152, 0);
pub const FAKE_NEWS: egui::Color32 = egui::Color32::from_rgb(244, 67, 54);

/// Idle repaint interval; queued UI work requests its own repaint
pub const REPAINT_INTERVAL_MS: u64 = 500;
