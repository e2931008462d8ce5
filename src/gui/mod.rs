//! egui front end

pub mod components;
pub mod constants;
mod manager;

pub use manager::{Services, run_gui};
