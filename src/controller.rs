//! The settings page: form, color wheel and device calls under one owner.
//!
//! Every device call is fire-and-forget. Outcomes come back to the UI loop
//! as [`Notice`]s; failures are logged and shown, never retried.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::device::DeviceApi;
use crate::form::{SettingsForm, TimezoneOption};
use crate::record::{ConfigRecord, LedMode, Rgb};
use crate::sync::ColorSync;
use crate::wheel::{Channel, ColorWheel, WheelEvent, size_for_viewport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Color(Rgb),
    Mode(LedMode),
    Save,
    Reboot,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(rgb) => write!(f, "Color → {rgb}"),
            Self::Mode(mode) => write!(f, "LED mode → {mode}"),
            Self::Save => f.write_str("Settings saved"),
            Self::Reboot => f.write_str("Reboot requested"),
        }
    }
}

impl Action {
    /// Short name used when the request failed.
    pub fn subject(&self) -> String {
        match self {
            Self::Color(rgb) => format!("Color {rgb}"),
            Self::Mode(mode) => format!("LED mode {mode}"),
            Self::Save => "Save".into(),
            Self::Reboot => "Reboot".into(),
        }
    }
}

pub enum Notice {
    Loaded(ConfigRecord),
    LoadFailed(String),
    Done(Action),
    Failed(Action, String),
}

#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub debounce: Duration,
    pub static_resync: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(10),
            static_resync: Duration::from_millis(100),
        }
    }
}

/// Clears the reboot flag when dropped, whichever way the request ends.
struct RebootGuard(Arc<AtomicBool>);

impl Drop for RebootGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PageController<D> {
    device: Arc<D>,
    form: SettingsForm,
    wheel: Option<ColorWheel>,
    sync: ColorSync<D>,
    mode_tx: watch::Sender<LedMode>,
    reboot_busy: Arc<AtomicBool>,
    notices: mpsc::UnboundedSender<Notice>,
    timing: Timing,
}

impl<D: DeviceApi> PageController<D> {
    pub fn new(
        device: Arc<D>,
        timezones: Vec<TimezoneOption>,
        timing: Timing,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        let (mode_tx, mode_rx) = watch::channel(LedMode::Static);
        let sync = ColorSync::new(Arc::clone(&device), timing.debounce, mode_rx, notices.clone());
        Self {
            device,
            form: SettingsForm::new(timezones),
            wheel: None,
            sync,
            mode_tx,
            reboot_busy: Arc::new(AtomicBool::new(false)),
            notices,
            timing,
        }
    }

    pub fn form(&self) -> &SettingsForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SettingsForm {
        &mut self.form
    }

    pub fn wheel(&self) -> Option<&ColorWheel> {
        self.wheel.as_ref()
    }

    pub fn mode(&self) -> LedMode {
        self.form.mode()
    }

    pub fn reboot_enabled(&self) -> bool {
        !self.reboot_busy.load(Ordering::SeqCst)
    }

    /// Builds the widget sized for the viewport. Does nothing if it exists.
    pub fn construct_wheel(&mut self, viewport_px: u32) {
        if self.wheel.is_some() {
            return;
        }
        let mut wheel = ColorWheel::new(size_for_viewport(viewport_px));
        wheel.set_enabled(!self.form.mode().is_spectrum());
        self.sync.seed(wheel.rgb());
        self.wheel = Some(wheel);
    }

    pub fn resize(&mut self, viewport_px: u32) {
        if let Some(wheel) = self.wheel.as_mut() {
            wheel.resize(size_for_viewport(viewport_px));
        }
    }

    // ─── Form Loader ────────────────────────────────────────────────────────

    pub fn load(&self) {
        let device = Arc::clone(&self.device);
        let notices = self.notices.clone();
        tokio::spawn(async move {
            let notice = match device.fetch_config().await {
                Ok(record) => {
                    info!(city = %record.time.city, mode = %record.led_mode, "settings loaded");
                    Notice::Loaded(record)
                }
                Err(e) => {
                    warn!("loading settings failed: {e:#}");
                    Notice::LoadFailed(format!("{e:#}"))
                }
            };
            let _ = notices.send(notice);
        });
    }

    /// Applies a fetched document to the inputs, mode selector and widget.
    pub fn apply_loaded(&mut self, record: &ConfigRecord) {
        self.form.populate(record);
        self.set_mode_state(record.led_mode);
        if self.wheel.is_some() {
            self.set_wheel_color(record.color);
        } else {
            self.form.mirror_color(record.color);
        }
    }

    // ─── Color Sync ─────────────────────────────────────────────────────────

    pub fn on_wheel_event(&mut self, event: WheelEvent) {
        match event {
            WheelEvent::ColorChange(rgb) => {
                self.form.mirror_color(rgb);
                self.sync.color_changed(rgb);
            }
            WheelEvent::InputEnd(rgb) => {
                self.form.mirror_color(rgb);
                self.sync.commit(rgb);
            }
        }
    }

    pub fn nudge_wheel(&mut self, channel: Channel, steps: i32) {
        if let Some(event) = self.wheel.as_mut().and_then(|w| w.nudge(channel, steps)) {
            self.on_wheel_event(event);
        }
    }

    pub fn release_wheel(&mut self) {
        if let Some(event) = self.wheel.as_ref().and_then(|w| w.release()) {
            self.on_wheel_event(event);
        }
    }

    pub fn set_wheel_color(&mut self, rgb: Rgb) {
        if let Some(wheel) = self.wheel.as_mut() {
            let event = wheel.set_rgb(rgb);
            self.on_wheel_event(event);
        }
    }

    // ─── Mode Toggle ────────────────────────────────────────────────────────

    fn set_mode_state(&mut self, mode: LedMode) {
        self.form.set_mode(mode);
        self.mode_tx.send_replace(mode);
        if let Some(wheel) = self.wheel.as_mut() {
            wheel.set_enabled(!mode.is_spectrum());
        }
    }

    pub fn change_mode(&mut self, mode: LedMode) {
        self.set_mode_state(mode);

        let device = Arc::clone(&self.device);
        let notices = self.notices.clone();
        tokio::spawn(async move {
            let action = Action::Mode(mode);
            match device.push_mode(mode).await {
                Ok(()) => {
                    info!(%mode, "LED mode pushed");
                    let _ = notices.send(Notice::Done(action));
                }
                Err(e) => {
                    warn!(%mode, "LED mode push failed: {e:#}");
                    let _ = notices.send(Notice::Failed(action, format!("{e:#}")));
                }
            }
        });

        // Re-assert the static color once the device has closed the mode request.
        if mode == LedMode::Static {
            self.sync.force_after(self.timing.static_resync);
        }
    }

    // ─── Form Submit ────────────────────────────────────────────────────────

    pub fn submit(&self) -> ConfigRecord {
        let record = self.form.collect(self.wheel.as_ref().map(ColorWheel::rgb));
        let payload = record.clone();
        let device = Arc::clone(&self.device);
        let notices = self.notices.clone();
        tokio::spawn(async move {
            match device.save_config(&payload).await {
                Ok(()) => {
                    info!(ssid = %payload.ssid, city = %payload.time.city, "settings saved");
                    let _ = notices.send(Notice::Done(Action::Save));
                }
                Err(e) => {
                    warn!("saving settings failed: {e:#}");
                    let _ = notices.send(Notice::Failed(Action::Save, format!("{e:#}")));
                }
            }
        });
        record
    }

    // ─── Reboot ─────────────────────────────────────────────────────────────

    /// Returns false when a reboot request is already in flight.
    pub fn reboot(&self) -> bool {
        if self.reboot_busy.swap(true, Ordering::SeqCst) {
            return false;
        }
        let guard = RebootGuard(Arc::clone(&self.reboot_busy));
        let device = Arc::clone(&self.device);
        let notices = self.notices.clone();
        tokio::spawn(async move {
            let result = device.reboot().await;
            drop(guard);
            match result {
                Ok(reply) => {
                    info!(%reply, "reboot requested");
                    let _ = notices.send(Notice::Done(Action::Reboot));
                }
                Err(e) => {
                    warn!("reboot request failed: {e:#}");
                    let _ = notices.send(Notice::Failed(Action::Reboot, format!("{e:#}")));
                }
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::timezone_options;
    use crate::testing::{Call, RecordingDevice};
    use crate::wheel::{COMPACT_SIZE, FULL_SIZE};
    use tokio::time::sleep;

    fn page(
        device: &Arc<RecordingDevice>,
    ) -> (PageController<RecordingDevice>, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timezones = vec![
            TimezoneOption::new("Los Angeles", "PST8PDT,M3.2.0,M11.1.0"),
            TimezoneOption::new("New York", "America/New_York"),
        ];
        let mut page = PageController::new(Arc::clone(device), timezones, Timing::default(), tx);
        page.construct_wheel(800);
        (page, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn load_populates_form_widget_and_mode() {
        let mut record = ConfigRecord {
            ssid: "home".into(),
            color: Rgb::new(10, 20, 30),
            led_mode: LedMode::Spectrum,
            ..Default::default()
        };
        record.time.city = "New York".into();
        let device = Arc::new(RecordingDevice::with_record(record));
        let (mut page, mut rx) = page(&device);

        page.load();
        let Some(Notice::Loaded(loaded)) = rx.recv().await else {
            panic!("expected loaded notice");
        };
        page.apply_loaded(&loaded);
        sleep(Duration::from_millis(50)).await;

        assert_eq!(page.form().ssid, "home");
        assert_eq!(page.form().selected_timezone().unwrap().city, "New York");
        assert_eq!(page.mode(), LedMode::Spectrum);
        let wheel = page.wheel().unwrap();
        assert_eq!(wheel.rgb(), Rgb::new(10, 20, 30));
        assert!(!wheel.is_enabled());
        assert_eq!(page.form().rgb_b, "30");
        // Spectrum suppresses the push the programmatic set would cause.
        assert_eq!(device.calls(), vec![Call::Fetch]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_leaves_defaults() {
        let device = Arc::new(RecordingDevice::failing());
        let (page, mut rx) = page(&device);

        page.load();
        assert!(matches!(rx.recv().await, Some(Notice::LoadFailed(_))));
        assert_eq!(page.form().ssid, "");
        assert_eq!(page.form().selected_timezone().unwrap().city, "Los Angeles");
        assert_eq!(device.calls(), vec![Call::Fetch]);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_to_static_pushes_mode_then_forced_color() {
        let device = Arc::new(RecordingDevice::default());
        let (mut page, _rx) = page(&device);
        page.change_mode(LedMode::Spectrum);
        page.set_wheel_color(Rgb::new(50, 60, 70));
        sleep(Duration::from_millis(200)).await;
        assert_eq!(device.calls(), vec![Call::Mode(LedMode::Spectrum)]);

        page.change_mode(LedMode::Static);
        assert!(page.wheel().unwrap().is_enabled());
        sleep(Duration::from_millis(50)).await;
        assert_eq!(
            device.calls(),
            vec![Call::Mode(LedMode::Spectrum), Call::Mode(LedMode::Static)]
        );

        sleep(Duration::from_millis(60)).await;
        assert_eq!(
            device.calls(),
            vec![
                Call::Mode(LedMode::Spectrum),
                Call::Mode(LedMode::Static),
                Call::Color(Rgb::new(50, 60, 70)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn static_resync_without_prior_color_sends_wheel_color() {
        let device = Arc::new(RecordingDevice::default());
        let (mut page, _rx) = page(&device);

        page.change_mode(LedMode::Spectrum);
        page.change_mode(LedMode::Static);
        sleep(Duration::from_millis(200)).await;

        let shown = page.wheel().unwrap().rgb();
        assert_eq!(shown, Rgb::new(255, 255, 255));
        assert_eq!(device.color_calls(), vec![shown]);
    }

    #[tokio::test(start_paused = true)]
    async fn spectrum_disables_wheel_input() {
        let device = Arc::new(RecordingDevice::default());
        let (mut page, _rx) = page(&device);
        page.change_mode(LedMode::Spectrum);
        page.nudge_wheel(Channel::Hue, 4);
        page.release_wheel();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(device.calls(), vec![Call::Mode(LedMode::Spectrum)]);
    }

    #[tokio::test(start_paused = true)]
    async fn drag_end_pushes_immediately_and_refreshes_mirrors() {
        let device = Arc::new(RecordingDevice::default());
        let (mut page, _rx) = page(&device);
        page.set_wheel_color(Rgb::new(255, 0, 0));
        page.nudge_wheel(Channel::Value, -50);
        page.release_wheel();
        let rgb = page.wheel().unwrap().rgb();
        assert_eq!(page.form().rgb_r, rgb.r.to_string());

        sleep(Duration::from_millis(1)).await;
        assert_eq!(device.color_calls(), vec![rgb]);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(device.color_calls(), vec![rgb, rgb]);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_posts_live_color_and_timezone() {
        let device = Arc::new(RecordingDevice::default());
        let (mut page, _rx) = page(&device);
        page.form_mut().select_timezone("New York");
        page.form_mut().time_fmt = "0".into();
        page.form_mut().ssid = "home".into();
        page.set_wheel_color(Rgb::new(10, 20, 30));
        page.form_mut().rgb_r = "99".into();

        let sent = page.submit();
        sleep(Duration::from_millis(50)).await;

        let saved: Vec<ConfigRecord> = device
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Save(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(saved, vec![sent.clone()]);
        assert_eq!(sent.color, Rgb::new(10, 20, 30));
        assert_eq!(sent.time.city, "New York");
        assert_eq!(sent.time.timezone, "America/New_York");
        assert_eq!(sent.time.time_fmt, "0");
        assert_eq!(sent.ssid, "home");
    }

    #[tokio::test(start_paused = true)]
    async fn submit_without_widget_uses_mirrors() {
        let device = Arc::new(RecordingDevice::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut page = PageController::new(
            Arc::clone(&device),
            timezone_options(&[]),
            Timing::default(),
            tx,
        );
        page.apply_loaded(&ConfigRecord {
            color: Rgb::new(4, 5, 6),
            ..Default::default()
        });
        assert_eq!(page.submit().color, Rgb::new(4, 5, 6));
    }

    #[tokio::test(start_paused = true)]
    async fn reboot_guard_reenables_after_success() {
        let device = Arc::new(RecordingDevice::default().latency(Duration::from_millis(30)));
        let (page, mut rx) = page(&device);

        assert!(page.reboot());
        assert!(!page.reboot_enabled());
        assert!(!page.reboot());

        assert!(matches!(rx.recv().await, Some(Notice::Done(Action::Reboot))));
        assert!(page.reboot_enabled());
        assert_eq!(device.calls(), vec![Call::Reboot]);
    }

    #[tokio::test(start_paused = true)]
    async fn reboot_guard_reenables_after_failure() {
        let device = Arc::new(RecordingDevice::failing().latency(Duration::from_millis(30)));
        let (page, mut rx) = page(&device);

        assert!(page.reboot());
        assert!(!page.reboot_enabled());
        assert!(matches!(
            rx.recv().await,
            Some(Notice::Failed(Action::Reboot, _))
        ));
        assert!(page.reboot_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn resize_follows_breakpoint_and_waits_for_widget() {
        let device = Arc::new(RecordingDevice::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut page = PageController::new(device, timezone_options(&[]), Timing::default(), tx);

        page.resize(300);
        assert!(page.wheel().is_none());

        page.construct_wheel(300);
        assert_eq!(page.wheel().unwrap().size(), COMPACT_SIZE);
        page.resize(1024);
        assert_eq!(page.wheel().unwrap().size(), FULL_SIZE);
        page.resize(499);
        assert_eq!(page.wheel().unwrap().size(), COMPACT_SIZE);
    }
}
