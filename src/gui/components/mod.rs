pub mod pages;
pub mod settings_editor;
