use std::sync::Arc;

use chrono::{DateTime, Local};
use ridemap_core::{
    coordinator::MapBootstrap,
    model::{MapStatus, MapView, Snapshot, SwitchOutcome},
    subscription::Subscription,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Passenger,
    Driver,
    Dispatcher,
}

impl Panel {
    pub(crate) const ALL: [Self; 3] = [Self::Passenger, Self::Driver, Self::Dispatcher];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Passenger => "Passenger",
            Self::Driver => "Driver",
            Self::Dispatcher => "Dispatcher",
        }
    }
}

/// Messages delivered to the UI loop from listeners and background tasks.
pub(crate) enum Update {
    Panel { panel: Panel, status: MapStatus },
    Switched(SwitchOutcome),
    Refreshed(MapStatus),
}

pub(crate) struct PanelSlot {
    pub panel: Panel,
    pub subscription: Option<Subscription>,
    pub view: Option<MapView>,
    pub notifications: usize,
}

pub(crate) struct LogLine {
    pub at: DateTime<Local>,
    pub source: String,
    pub message: String,
}

pub(crate) struct App {
    pub bootstrap: Arc<MapBootstrap>,

    pub panels: Vec<PanelSlot>,
    pub panel_index: usize,

    pub snapshot: Snapshot,
    pub log: Vec<LogLine>,

    pub is_busy: bool,
    pub error_message: Option<String>,

    updates_tx: UnboundedSender<Update>,
    updates_rx: UnboundedReceiver<Update>,
}

impl App {
    pub(crate) fn new(bootstrap: Arc<MapBootstrap>) -> Self {
        let (updates_tx, updates_rx) = unbounded_channel();
        let snapshot = bootstrap.get_state();
        Self {
            bootstrap,
            panels: Panel::ALL
                .into_iter()
                .map(|panel| PanelSlot {
                    panel,
                    subscription: None,
                    view: None,
                    notifications: 0,
                })
                .collect(),
            panel_index: 0,
            snapshot,
            log: Vec::new(),
            is_busy: false,
            error_message: None,
            updates_tx,
            updates_rx,
        }
    }

    pub(crate) fn selected_panel(&self) -> Option<&PanelSlot> {
        self.panels.get(self.panel_index)
    }

    /// Mount the selected panel, or unmount it if it is mounted.
    pub(crate) fn toggle_selected(&mut self) {
        let tx = self.updates_tx.clone();
        let bootstrap = Arc::clone(&self.bootstrap);
        let Some(slot) = self.panels.get_mut(self.panel_index) else {
            return;
        };
        let panel = slot.panel;

        let message = if let Some(subscription) = slot.subscription.take() {
            subscription.unsubscribe();
            slot.view = None;
            "unmounted"
        } else {
            slot.subscription = Some(bootstrap.mount(move |snapshot: &Snapshot| {
                tx.send(Update::Panel {
                    panel,
                    status: snapshot.status.clone(),
                })
                .ok();
            }));
            slot.view = Some(bootstrap.view());
            "mounted"
        };
        self.push_log(panel.label(), message.to_owned());
    }

    pub(crate) fn request_switch(&mut self) {
        let tx = self.updates_tx.clone();
        let bootstrap = Arc::clone(&self.bootstrap);
        self.is_busy = true;
        self.error_message = None;
        tokio::spawn(async move {
            let outcome = bootstrap.switch_provider().await;
            tx.send(Update::Switched(outcome)).ok();
        });
    }

    pub(crate) fn request_refresh(&mut self) {
        let tx = self.updates_tx.clone();
        let bootstrap = Arc::clone(&self.bootstrap);
        self.is_busy = true;
        self.error_message = None;
        tokio::spawn(async move {
            let status = bootstrap.refresh_config().await;
            tx.send(Update::Refreshed(status)).ok();
        });
    }

    /// Apply everything listeners and background tasks delivered since the last frame.
    pub(crate) fn drain_updates(&mut self) {
        while let Ok(update) = self.updates_rx.try_recv() {
            match update {
                Update::Panel { panel, status } => {
                    let view = self.bootstrap.view();
                    if let Some(slot) = self.panels.iter_mut().find(|slot| slot.panel == panel) {
                        slot.notifications += 1;
                        slot.view = Some(view);
                    }
                    self.push_log(panel.label(), status.to_string());
                }
                Update::Switched(outcome) => {
                    self.is_busy = false;
                    let message = match outcome {
                        SwitchOutcome::Switched(provider) => format!("switched to {provider}"),
                        SwitchOutcome::Loaded { requested, status } => {
                            format!("loaded {requested}: {status}")
                        }
                        SwitchOutcome::Ignored(rejection) => {
                            self.error_message = Some(format!("Switch ignored: {rejection:?}"));
                            format!("ignored ({rejection:?})")
                        }
                    };
                    self.push_log("switch", message);
                }
                Update::Refreshed(status) => {
                    self.is_busy = false;
                    self.push_log("settings", format!("refreshed, {status}"));
                }
            }
        }
        self.snapshot = self.bootstrap.get_state();
    }

    fn push_log(&mut self, source: &str, message: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.remove(0);
        }
        self.log.push(LogLine {
            at: Local::now(),
            source: source.to_owned(),
            message,
        });
    }
}
