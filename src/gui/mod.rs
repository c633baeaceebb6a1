//! GUI module for the Wave Portal application
//!
//! A thin eframe shell over [`crate::app::WaveController`]: it renders the
//! latest `AppSnapshot` and sends `Action`s back.
//!
//! ## Module Structure
//!
//! - `app` - WaveApp struct, window lifecycle and `launch`
//! - `theme` - Theme and styling (AppTheme)
//! - `views` - Feed and settings views
//!
//! ## Usage
//!
//! ```no_run
//! use wave_portal::config::Config;
//! use wave_portal::gui;
//!
//! let config = Config::default();
//! gui::launch(config).expect("Failed to launch GUI");
//! ```

mod app;
pub mod theme;
pub mod views;

pub use app::{launch, GuiSection, WaveApp};
pub use theme::{configure_style, AppTheme};
