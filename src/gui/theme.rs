//! Colors, spacing and button styles for the wave portal window.

use crate::notifications::NoticeLevel;
use eframe::egui::{self, Color32, FontFamily, FontId, Stroke, TextStyle};

#[derive(Clone, Copy)]
pub struct AppTheme {
    pub background: Color32,
    pub surface: Color32,
    pub panel_fill: Color32,
    /// Fill for pressed widgets and small buttons.
    pub muted: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub primary: Color32,
    pub warning: Color32,
    pub error: Color32,
    pub accent_blue: Color32,

    pub spacing_xs: f32,
    pub spacing_sm: f32,
    pub spacing_md: f32,

    pub compact_button: egui::Vec2,
    pub action_button: egui::Vec2,
}

impl Default for AppTheme {
    fn default() -> Self {
        let green = Color32::from_rgb(0, 221, 119);
        Self {
            background: Color32::from_rgb(8, 8, 8),
            surface: Color32::from_rgb(15, 15, 15),
            panel_fill: Color32::from_rgb(12, 12, 12),
            muted: Color32::from_rgb(60, 60, 60),
            text_primary: green,
            text_secondary: Color32::from_rgb(170, 170, 170),
            primary: green,
            warning: Color32::from_rgb(255, 170, 0),
            error: Color32::from_rgb(255, 85, 85),
            accent_blue: Color32::from_rgb(0, 170, 170),

            spacing_xs: 6.0,
            spacing_sm: 12.0,
            spacing_md: 20.0,

            compact_button: egui::vec2(100.0, 28.0),
            action_button: egui::vec2(140.0, 36.0),
        }
    }
}

impl AppTheme {
    fn outlined(&self, text: egui::RichText, border: Stroke, size: egui::Vec2) -> egui::Button<'static> {
        egui::Button::new(text).fill(self.surface).stroke(border).min_size(size)
    }

    pub fn button_primary(&self, text: &str) -> egui::Button<'static> {
        let label = egui::RichText::new(text).color(self.text_primary).strong();
        self.outlined(label, Stroke::new(3.0, self.primary), self.action_button)
    }

    pub fn button_secondary(&self, text: &str) -> egui::Button<'static> {
        let label = egui::RichText::new(text).color(self.text_primary);
        self.outlined(label, Stroke::new(2.0, self.muted), self.action_button)
    }

    pub fn button_small(&self, text: &str) -> egui::Button<'static> {
        egui::Button::new(egui::RichText::new(text).color(self.text_primary))
            .fill(self.muted)
            .min_size(self.compact_button)
    }

    pub fn frame_panel(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.panel_fill)
            .rounding(2.0)
            .inner_margin(self.spacing_md)
            .stroke(Stroke::new(2.0, self.primary))
    }

    pub fn notice_color(&self, level: NoticeLevel) -> Color32 {
        match level {
            NoticeLevel::Info => self.text_primary,
            NoticeLevel::Warning => self.warning,
            NoticeLevel::Error => self.error,
        }
    }
}

/// Install the theme's visuals and monospace text styles on `ctx`.
pub fn configure_style(ctx: &egui::Context, theme: &AppTheme) {
    let mut visuals = egui::Visuals::dark();
    visuals.window_fill = theme.background;
    visuals.panel_fill = theme.panel_fill;
    visuals.override_text_color = Some(theme.text_primary);
    visuals.widgets.inactive.bg_fill = theme.surface;
    visuals.widgets.inactive.bg_stroke = Stroke::new(2.0, theme.primary);
    visuals.widgets.active.bg_fill = theme.muted;
    visuals.widgets.active.bg_stroke = Stroke::new(3.0, theme.primary);
    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(12.0, 8.0);
    for (text_style, size) in [(TextStyle::Heading, 20.0), (TextStyle::Body, 14.0), (TextStyle::Button, 14.0)] {
        style.text_styles.insert(text_style, FontId::new(size, FontFamily::Monospace));
    }
    ctx.set_style(style);
}
