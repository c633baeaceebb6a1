//! Settings view: wallet and ledger endpoints, contract address, confirmation timeout.
//!
//! Saved values are applied on the next launch.

use crate::config::Config;
use crate::gui::app::{SettingsForm, WaveApp};
use crate::user_settings::UserSettings;
use anyhow::{anyhow, Result};
use eframe::egui::{self, RichText};

impl SettingsForm {
    /// Turn the form into settings, checking them against `base`.
    pub(crate) fn to_settings(&self, base: &Config) -> Result<UserSettings> {
        let timeout = self.confirmation_timeout_secs.trim();
        let confirmation_timeout_secs = if timeout.is_empty() {
            None
        } else {
            let secs: u64 = timeout
                .parse()
                .map_err(|_| anyhow!("Confirmation timeout must be a whole number of seconds"))?;
            if secs == 0 {
                return Err(anyhow!("Confirmation timeout must be at least 1 second"));
            }
            Some(secs)
        };
        let optional = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        let settings = UserSettings {
            wallet_url: optional(&self.wallet_url),
            rpc_url: optional(&self.rpc_url),
            chain_id: Some(base.chain_id),
            contract_address: optional(&self.contract_address),
            confirmation_timeout_secs,
        };

        let mut probe = base.clone();
        settings.apply_to(&mut probe)?;
        probe.get_provider()?;
        probe.get_wallet_provider()?;
        Ok(settings)
    }
}

impl WaveApp {
    pub(crate) fn view_settings(&mut self, ui: &mut egui::Ui) {
        self.theme.frame_panel().show(ui, |ui| {
            ui.label(RichText::new("Settings").size(18.0).strong());
            ui.add_space(self.theme.spacing_sm);

            egui::Grid::new("settings_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_xs])
                .show(ui, |ui| {
                    ui.label("Wallet URL:");
                    ui.text_edit_singleline(&mut self.settings_form.wallet_url);
                    ui.end_row();

                    ui.label("RPC URL:");
                    ui.text_edit_singleline(&mut self.settings_form.rpc_url);
                    ui.end_row();

                    ui.label("Contract:");
                    ui.text_edit_singleline(&mut self.settings_form.contract_address);
                    ui.end_row();

                    ui.label("Confirmation timeout (s):");
                    ui.text_edit_singleline(&mut self.settings_form.confirmation_timeout_secs);
                    ui.end_row();
                });

            ui.add_space(self.theme.spacing_sm);
            ui.horizontal(|ui| {
                if ui.add(self.theme.button_primary("Save")).clicked() {
                    self.save_settings();
                }
                if ui.add(self.theme.button_secondary("Reset")).clicked() {
                    self.settings_form = SettingsForm::from_config(&self.config);
                }
            });

            if self.restart_pending() {
                ui.label(RichText::new("Saved settings differ from this session; restart to apply.").color(self.theme.warning));
            }
            if let Some((ok, message)) = &self.settings_form.status {
                let color = if *ok { self.theme.text_primary } else { self.theme.error };
                ui.label(RichText::new(message).color(color));
            }

            ui.add_space(self.theme.spacing_sm);
            ui.label(
                RichText::new(format!("Settings file: {}", UserSettings::settings_path_display()))
                    .small()
                    .color(self.theme.text_secondary),
            );
            if let Some(account) = self.snapshot.account {
                if let Some(url) = crate::config::get_address_explorer_url(self.config.chain_id, &account.to_string()) {
                    if ui.add(self.theme.button_small("View account on explorer")).clicked() {
                        if let Err(e) = open::that(&url) {
                            tracing::warn!("Failed to open explorer URL {}: {}", url, e);
                        }
                    }
                }
            }
        });
    }

    /// Whether the saved settings would change the running configuration.
    fn restart_pending(&self) -> bool {
        let mut saved = self.config.clone();
        if self.user_settings.apply_to(&mut saved).is_err() {
            return false;
        }
        saved.wallet_url != self.config.wallet_url
            || saved.rpc_url != self.config.rpc_url
            || saved.contract_address != self.config.contract_address
            || saved.confirmation_timeout_secs != self.config.confirmation_timeout_secs
    }

    fn save_settings(&mut self) {
        let result = self
            .settings_form
            .to_settings(&self.config)
            .and_then(|settings| settings.save().map(|_| settings));
        self.settings_form.status = Some(match result {
            Ok(settings) => {
                self.user_settings = settings;
                (true, "Saved. Restart to apply.".to_string())
            }
            Err(e) => {
                tracing::warn!("Settings not saved: {}", e);
                (false, format!("Not saved: {}", e))
            }
        });
    }
}
