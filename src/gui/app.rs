use crate::{
    app::{AppSnapshot, ControllerHandle, WaveController},
    config::Config,
    events::Action,
    gateway::{ContractGateway, LedgerGateway},
    user_settings::UserSettings,
    wallet::{JsonRpcWallet, WalletCapability},
};
use anyhow::{anyhow, Result};
use eframe::{egui, egui::RichText, App, Frame, NativeOptions};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder;

use super::theme::{configure_style, AppTheme};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuiSection {
    Feed,
    Settings,
}

/// Editable copy of the persisted settings.
#[derive(Default)]
pub(crate) struct SettingsForm {
    pub(crate) wallet_url: String,
    pub(crate) rpc_url: String,
    pub(crate) contract_address: String,
    pub(crate) confirmation_timeout_secs: String,
    pub(crate) status: Option<(bool, String)>,
}

impl SettingsForm {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            wallet_url: config.wallet_url.clone(),
            rpc_url: config.rpc_url.clone(),
            contract_address: format!("{:?}", config.contract_address),
            confirmation_timeout_secs: config.confirmation_timeout_secs.to_string(),
            status: None,
        }
    }
}

pub struct WaveApp {
    pub(crate) config: Config,
    pub(crate) controller: ControllerHandle,
    pub(crate) snapshot: AppSnapshot,
    pub(crate) theme: AppTheme,
    pub(crate) section: GuiSection,
    /// Local copy of the message box; resynced when the controller rewrites it.
    pub(crate) draft: String,
    pub(crate) draft_revision: u64,
    pub(crate) user_settings: UserSettings,
    pub(crate) settings_form: SettingsForm,
}

impl WaveApp {
    pub fn new(config: Config, controller: ControllerHandle, ctx: &egui::Context) -> Self {
        let theme = AppTheme::default();
        configure_style(ctx, &theme);
        let snapshot = controller.snapshot.borrow().clone();
        Self {
            settings_form: SettingsForm::from_config(&config),
            user_settings: UserSettings::load(),
            draft: snapshot.draft.clone(),
            draft_revision: snapshot.draft_revision,
            snapshot,
            config,
            controller,
            theme,
            section: GuiSection::Feed,
        }
    }

    pub(crate) fn send(&self, action: Action) {
        if !self.controller.send(action) {
            tracing::warn!("Controller stopped; action dropped");
        }
    }

    fn sync_snapshot(&mut self) {
        if self.controller.snapshot.has_changed().unwrap_or(false) {
            self.snapshot = self.controller.snapshot.borrow_and_update().clone();
        }
        if self.snapshot.draft_revision != self.draft_revision {
            self.draft = self.snapshot.draft.clone();
            self.draft_revision = self.snapshot.draft_revision;
        }
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        ui.horizontal_wrapped(|ui| {
            ui.heading(RichText::new("👋 Wave Portal").size(24.0).color(self.theme.text_primary));
            ui.label(
                RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                    .size(12.0)
                    .color(self.theme.text_primary),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    RichText::new(format!("{} ({})", self.snapshot.network_label, self.config.native_token()))
                        .color(self.theme.accent_blue),
                );
                ui.separator();
                match self.snapshot.account {
                    Some(account) => {
                        if ui.add(self.theme.button_small("Disconnect")).clicked() {
                            self.send(Action::Disconnect);
                        }
                        let label = ui.label(RichText::new(account.short()).strong());
                        label.on_hover_text(account.to_string());
                    }
                    None => {
                        let text = if self.snapshot.connecting { "Connecting..." } else { "Connect Wallet" };
                        let button = ui.add_enabled(!self.snapshot.connecting, self.theme.button_primary(text));
                        if button.clicked() {
                            self.send(Action::Connect);
                        }
                        if self.snapshot.wallet_unavailable {
                            ui.label(
                                RichText::new(format!("No wallet at {}", self.config.wallet_url))
                                    .color(self.theme.warning),
                            );
                        }
                    }
                }
            });
        });
        ui.add_space(6.0);
    }

    fn render_notifications(&self, ui: &mut egui::Ui) {
        ui.label(RichText::new("Notifications").strong().color(self.theme.text_secondary));
        egui::ScrollArea::vertical()
            .max_height(110.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if self.snapshot.notices.is_empty() {
                    ui.label(RichText::new("Nothing yet.").color(self.theme.text_secondary));
                }
                for notice in self.snapshot.notices.iter().rev() {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(format!("[{}]", notice.time_ago()))
                                .size(11.0)
                                .color(self.theme.text_secondary),
                        );
                        ui.label(
                            RichText::new(&notice.message)
                                .size(12.0)
                                .color(self.theme.notice_color(notice.level)),
                        );
                    });
                }
            });
    }
}

impl App for WaveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.sync_snapshot();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| self.render_top_bar(ui));

        egui::TopBottomPanel::bottom("notifications")
            .resizable(false)
            .show(ctx, |ui| self.render_notifications(ui));

        egui::SidePanel::left("nav")
            .resizable(false)
            .default_width(140.0)
            .show(ctx, |ui| {
                ui.add_space(self.theme.spacing_md);
                for (section, label) in [(GuiSection::Feed, "[~] Waves"), (GuiSection::Settings, "[*] Settings")] {
                    let selected = self.section == section;
                    let color = if selected { self.theme.text_primary } else { self.theme.text_secondary };
                    if ui.selectable_label(selected, RichText::new(label).color(color)).clicked() {
                        self.section = section;
                    }
                    ui.add_space(self.theme.spacing_xs);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(self.theme.spacing_sm);
            egui::ScrollArea::vertical().show(ui, |ui| match self.section {
                GuiSection::Feed => self.view_feed(ui),
                GuiSection::Settings => self.view_settings(ui),
            });
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.send(Action::Shutdown);
    }
}

/// Build the wallet, gateway and controller, run the controller on its own
/// current-thread runtime, and open the window.
pub fn launch(config: Config) -> Result<()> {
    let wallet: Arc<dyn WalletCapability> = Arc::new(JsonRpcWallet::new(
        config.get_wallet_provider()?,
        config.wallet_url.clone(),
    ));
    let gateway: Arc<dyn LedgerGateway> = Arc::new(ContractGateway::new(
        config.get_provider()?,
        wallet.clone(),
        config.contract_address,
        config.gas_limit,
    ));
    let (controller, handle) = WaveController::new(config.clone(), wallet, gateway);

    let worker = thread::spawn(move || {
        match Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime.block_on(controller.run()),
            Err(e) => tracing::error!("Failed to create async runtime: {}", e),
        }
    });

    let app_handle = handle.clone();
    let app_creator = move |cc: &eframe::CreationContext<'_>| {
        Box::new(WaveApp::new(config.clone(), app_handle.clone(), &cc.egui_ctx)) as Box<dyn App>
    };

    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 720.0]),
        persist_window: true,
        ..Default::default()
    };

    let result = eframe::run_native("Wave Portal", native_options, Box::new(app_creator))
        .map_err(|e| anyhow!("Failed to start GUI: {}", e));

    // The window may fail before on_exit ever ran.
    handle.send(Action::Shutdown);
    if worker.join().is_err() {
        tracing::error!("Controller thread panicked");
    }
    result
}
