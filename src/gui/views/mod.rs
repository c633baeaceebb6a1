//! View modules for the GUI
//!
//! Each submodule adds a `view_*` method to `WaveApp`, called from
//! `App::update` in `app.rs`.
//!
//! - `feed` - Composer, last transaction and the wave feed
//! - `settings` - Endpoints and contract configuration

pub mod feed;
pub mod settings;
