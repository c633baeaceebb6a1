//! Feed view: message composer, transaction status and the list of waves.

use crate::events::Action;
use crate::feed::SourceStatus;
use crate::gui::app::WaveApp;
use crate::transaction_coordinator::TxPhase;
use crate::types::WaveRecord;
use eframe::egui::{self, RichText};

/// Shown in place of an empty message.
pub const EMPTY_MESSAGE_PLACEHOLDER: &str = "*NO Message FOUND!*";

pub fn display_message(record: &WaveRecord) -> &str {
    if record.message.is_empty() {
        EMPTY_MESSAGE_PLACEHOLDER
    } else {
        &record.message
    }
}

fn source_label(status: SourceStatus) -> &'static str {
    match status {
        SourceStatus::Idle => "idle",
        SourceStatus::Pending => "loading",
        SourceStatus::Ready => "ok",
        SourceStatus::Degraded => "unavailable",
    }
}

impl WaveApp {
    pub(crate) fn view_feed(&mut self, ui: &mut egui::Ui) {
        self.render_composer(ui);
        ui.add_space(self.theme.spacing_md);
        self.render_last_transaction(ui);
        self.render_wave_list(ui);
    }

    fn render_composer(&mut self, ui: &mut egui::Ui) {
        self.theme.frame_panel().show(ui, |ui| {
            ui.label(RichText::new("Send a wave").size(18.0).strong());
            if self.snapshot.account.is_none() {
                ui.label(RichText::new("Connect your wallet to wave.").color(self.theme.text_secondary));
            }
            ui.add_space(self.theme.spacing_xs);

            let busy = self.snapshot.phase.is_busy();
            let edit = ui.add_enabled(
                !busy,
                egui::TextEdit::multiline(&mut self.draft)
                    .hint_text("Say hi...")
                    .desired_rows(2)
                    .desired_width(f32::INFINITY),
            );
            if edit.changed() {
                self.send(Action::SetDraft(self.draft.clone()));
            }

            ui.horizontal(|ui| {
                if ui.add_enabled(!busy, self.theme.button_primary("Wave at Me")).clicked() {
                    self.send(Action::SubmitWrite);
                }
                if self.snapshot.phase != TxPhase::Idle {
                    ui.spinner();
                    ui.label(RichText::new(self.snapshot.phase.label()).color(self.theme.warning));
                }
                if let Some(hash) = self.snapshot.pending_tx_hash {
                    ui.label(RichText::new(format!("{:?}", hash)).small().color(self.theme.text_secondary));
                }
            });
        });
    }

    fn render_last_transaction(&mut self, ui: &mut egui::Ui) {
        let Some(last) = self.snapshot.last_transaction.clone() else {
            return;
        };
        ui.horizontal(|ui| {
            match &last.error {
                None => ui.label(RichText::new("Last wave confirmed").color(self.theme.text_primary)),
                Some(error) => ui.label(RichText::new(format!("Last wave failed: {}", error)).color(self.theme.error)),
            };
            if let Some(url) = &last.explorer_url {
                if ui.add(self.theme.button_small("View on explorer")).clicked() {
                    if let Err(e) = open::that(url) {
                        tracing::warn!("Failed to open explorer URL {}: {}", url, e);
                    }
                }
            } else if let Some(hash) = last.tx_hash {
                ui.label(RichText::new(format!("{:?}", hash)).small().color(self.theme.text_secondary));
            }
        });
        ui.add_space(self.theme.spacing_sm);
    }

    fn render_wave_list(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Waves ({})", self.snapshot.records.len())).size(16.0).strong());
            if let Some(total) = self.snapshot.total_records {
                ui.label(RichText::new(format!("contract total: {}", total)).color(self.theme.text_secondary));
            }
            ui.label(
                RichText::new(format!(
                    "history: {} · live: {}",
                    source_label(self.snapshot.history_status),
                    source_label(self.snapshot.live_status)
                ))
                .small()
                .color(self.theme.text_secondary),
            );
        });
        ui.add_space(self.theme.spacing_xs);

        if self.snapshot.records.is_empty() {
            ui.label(RichText::new("No waves yet.").color(self.theme.text_secondary));
            return;
        }

        for record in &self.snapshot.records {
            egui::Frame::none()
                .fill(self.theme.surface)
                .inner_margin(self.theme.spacing_xs)
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(record.author.short()).strong().color(self.theme.accent_blue))
                            .on_hover_text(record.author.to_string());
                        ui.label(
                            RichText::new(
                                record
                                    .timestamp
                                    .with_timezone(&chrono::Local)
                                    .format("%Y-%m-%d %H:%M:%S")
                                    .to_string(),
                            )
                            .small()
                            .color(self.theme.text_secondary),
                        );
                    });
                    ui.label(display_message(record));
                });
            ui.add_space(4.0);
        }
    }
}
