// ═══════════════════════════════════════════════════════════════════════════════
//  Application State
// ═══════════════════════════════════════════════════════════════════════════════

use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::controller::{Notice, PageController};
use crate::device::DeviceApi;
use crate::form::{FieldId, FieldKind, field_def};
use crate::ui;
use crate::wheel::{Channel, viewport_px};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Tab {
    Network,
    Time,
    Led,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Network, Tab::Time, Tab::Led];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Network => "Network",
            Self::Time => "Time",
            Self::Led => "Backlight",
        }
    }

    pub fn rows(&self) -> &'static [Row] {
        match self {
            Self::Network => &[Row::Field(FieldId::Ssid), Row::Field(FieldId::Pass)],
            Self::Time => &[
                Row::Field(FieldId::Ntp),
                Row::Field(FieldId::TimeFmt),
                Row::Field(FieldId::Colon),
                Row::Field(FieldId::Timezone),
            ],
            Self::Led => &[
                Row::Field(FieldId::LedMode),
                Row::Wheel(Channel::Hue),
                Row::Wheel(Channel::Saturation),
                Row::Wheel(Channel::Value),
                Row::Field(FieldId::RgbR),
                Row::Field(FieldId::RgbG),
                Row::Field(FieldId::RgbB),
            ],
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Network => Self::Time,
            Self::Time => Self::Led,
            Self::Led => Self::Network,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Network => Self::Led,
            Self::Time => Self::Network,
            Self::Led => Self::Time,
        }
    }
}

/// One selectable line on a tab.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Row {
    Field(FieldId),
    Wheel(Channel),
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed,
}

/// Where to write the device address once it has answered.
struct Remember {
    config: ClientConfig,
    path: PathBuf,
}

pub struct App<D> {
    pub page: PageController<D>,
    pub tab: Tab,
    pub sel: usize,
    /// Text being typed into the selected field, if any.
    pub editing: Option<String>,
    pub load: LoadState,
    pub device: String,
    pub status: String,
    pub err: bool,
    pub quit: bool,
    /// A wheel channel has moved since the last release.
    dragging: bool,
    remember: Option<Remember>,
}

impl<D: DeviceApi> App<D> {
    pub fn new(page: PageController<D>, device: String) -> Self {
        Self {
            page,
            tab: Tab::Network,
            sel: 0,
            editing: None,
            load: LoadState::Loading,
            status: format!("Connecting to {device}…"),
            device,
            err: false,
            quit: false,
            dragging: false,
            remember: None,
        }
    }

    /// Saves `config` to `path` after the first successful load.
    pub fn remember_device(&mut self, config: ClientConfig, path: PathBuf) {
        self.remember = Some(Remember { config, path });
    }

    pub fn selected_row(&self) -> Row {
        let rows = self.tab.rows();
        rows[self.sel.min(rows.len() - 1)]
    }

    fn set_status(&mut self, msg: String, err: bool) {
        self.status = msg;
        self.err = err;
    }

    // ─── Notices ────────────────────────────────────────────────────────────

    pub fn on_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Loaded(record) => {
                self.page.apply_loaded(&record);
                self.load = LoadState::Loaded;
                self.set_status(format!("  ✓ Loaded settings from {}", self.device), false);
                if let Some(r) = self.remember.take() {
                    match r.config.save(&r.path) {
                        Ok(()) => info!(path = %r.path.display(), "device address saved"),
                        Err(e) => warn!("saving device address failed: {e:#}"),
                    }
                }
            }
            Notice::LoadFailed(msg) => {
                self.load = LoadState::Failed;
                self.set_status(format!("  ✗ Load failed: {msg}"), true);
            }
            Notice::Done(action) => self.set_status(format!("  ✓ {action}"), false),
            Notice::Failed(action, msg) => {
                self.set_status(format!("  ✗ {}: {msg}", action.subject()), true);
            }
        }
    }

    // ─── Key Handling ───────────────────────────────────────────────────────

    pub fn on_key(&mut self, k: KeyEvent) {
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }

        if self.editing.is_some() {
            self.on_key_edit(k);
            return;
        }

        match k.code {
            KeyCode::F(1) => return self.switch_tab(Tab::Network),
            KeyCode::F(2) => return self.switch_tab(Tab::Time),
            KeyCode::F(3) => return self.switch_tab(Tab::Led),
            KeyCode::Tab => return self.switch_tab(self.tab.next()),
            KeyCode::BackTab => return self.switch_tab(self.tab.prev()),
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.quit = true;
                return;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => return self.submit(),
            KeyCode::Char('R') => return self.reboot(),
            KeyCode::Char('r') => return self.reload(),
            _ => {}
        }

        let len = self.tab.rows().len();
        match k.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.finish_drag();
                self.sel = if self.sel > 0 { self.sel - 1 } else { len - 1 };
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.finish_drag();
                self.sel = (self.sel + 1) % len;
            }
            KeyCode::Left | KeyCode::Char('h') => self.adjust(k, false),
            KeyCode::Right | KeyCode::Char('l') => self.adjust(k, true),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate(),
            _ => {}
        }
    }

    fn on_key_edit(&mut self, k: KeyEvent) {
        let Some(buf) = self.editing.as_mut() else {
            return;
        };
        match k.code {
            KeyCode::Char(c) => buf.push(c),
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Enter => {
                if let (Some(text), Row::Field(id)) = (self.editing.take(), self.selected_row()) {
                    self.page.form_mut().set_text(id, text);
                    self.set_status(
                        format!("  ✓ {} updated │ s to save", field_def(id).label),
                        false,
                    );
                }
            }
            KeyCode::Esc => {
                self.editing = None;
                self.set_status("Cancelled".into(), false);
            }
            _ => {}
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.finish_drag();
        self.tab = tab;
        self.sel = 0;
    }

    fn adjust(&mut self, k: KeyEvent, forward: bool) {
        match self.selected_row() {
            Row::Wheel(ch) => {
                if !self.page.wheel().is_some_and(|w| w.is_enabled()) {
                    self.set_status("  Color is driven by the audio spectrum".into(), false);
                    return;
                }
                let step = if k.modifiers.contains(KeyModifiers::SHIFT) { 5 } else { 1 };
                self.page.nudge_wheel(ch, if forward { step } else { -step });
                self.dragging = true;
            }
            Row::Field(id) => match field_def(id).kind {
                FieldKind::Toggle => self.page.form_mut().toggle(id),
                FieldKind::Choice => self.cycle(id, forward),
                _ => {}
            },
        }
    }

    fn activate(&mut self) {
        match self.selected_row() {
            Row::Wheel(_) => self.finish_drag(),
            Row::Field(id) => match field_def(id).kind {
                FieldKind::Text | FieldKind::Secret => {
                    self.editing = Some(self.page.form().value(id).to_string());
                    self.set_status("  Editing │ Enter to keep │ Esc to cancel".into(), false);
                }
                FieldKind::Toggle => self.page.form_mut().toggle(id),
                FieldKind::Choice => self.cycle(id, true),
                FieldKind::Mirror => {}
            },
        }
    }

    fn cycle(&mut self, id: FieldId, forward: bool) {
        if let Some(mode) = self.page.form_mut().cycle(id, forward) {
            self.page.change_mode(mode);
            self.set_status(format!("  ▶ LED mode → {}", mode.label()), false);
        }
    }

    /// Letting go of a wheel channel pushes the color right away.
    fn finish_drag(&mut self) {
        if std::mem::take(&mut self.dragging) {
            self.page.release_wheel();
        }
    }

    fn submit(&mut self) {
        self.finish_drag();
        let record = self.page.submit();
        self.set_status(format!("  Saving settings ({})…", record.color), false);
    }

    fn reboot(&mut self) {
        if self.page.reboot() {
            self.set_status("  Reboot requested…".into(), false);
        } else {
            self.set_status("  Reboot already in progress".into(), false);
        }
    }

    fn reload(&mut self) {
        self.finish_drag();
        self.load = LoadState::Loading;
        self.set_status(format!("Reloading from {}…", self.device), false);
        self.page.load();
    }

    // ─── Main Loop ──────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        mut term: ratatui::DefaultTerminal,
        mut notices: mpsc::UnboundedReceiver<Notice>,
    ) -> Result<()> {
        let cols = term.size()?.width;
        self.page.construct_wheel(viewport_px(cols));
        self.page.load();

        let mut events = EventStream::new();
        loop {
            term.draw(|f| ui::draw(f, &self))?;

            tokio::select! {
                Some(notice) = notices.recv() => self.on_notice(notice),
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(k))) if k.kind == KeyEventKind::Press => self.on_key(k),
                    Some(Ok(Event::Resize(cols, _))) => self.page.resize(viewport_px(cols)),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                    _ => {}
                },
            }

            if self.quit {
                break;
            }
        }
        Ok(())
    }
}
