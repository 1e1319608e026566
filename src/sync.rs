//! Debounced color pushes to `/rgb`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::controller::{Action, Notice};
use crate::device::DeviceApi;
use crate::record::{LedMode, Rgb};

pub struct ColorSync<D> {
    device: Arc<D>,
    debounce: Duration,
    mode: watch::Receiver<LedMode>,
    latest: watch::Sender<Rgb>,
    pending: Option<JoinHandle<()>>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl<D: DeviceApi> ColorSync<D> {
    pub fn new(
        device: Arc<D>,
        debounce: Duration,
        mode: watch::Receiver<LedMode>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        Self {
            device,
            debounce,
            mode,
            latest: watch::Sender::new(Rgb::default()),
            pending: None,
            notices,
        }
    }

    /// Records the widget's color without scheduling a push.
    pub fn seed(&mut self, rgb: Rgb) {
        self.latest.send_replace(rgb);
    }

    /// Widget `color:change`. Restarts the debounce timer; at most one timer
    /// is pending at any time.
    pub fn color_changed(&mut self, rgb: Rgb) {
        self.latest.send_replace(rgb);
        if let Some(prev) = self.pending.take()
            && !prev.is_finished()
        {
            prev.abort();
            debug!("color push superseded");
        }

        let device = Arc::clone(&self.device);
        let latest = self.latest.subscribe();
        let mode = self.mode.clone();
        let notices = self.notices.clone();
        let delay = self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let rgb = *latest.borrow();
            let mode = *mode.borrow();
            // The request runs detached so a later event cannot cancel it mid-flight.
            tokio::spawn(push(device, rgb, false, mode, notices));
        }));
    }

    /// Widget `input:end`. Pushes right away whatever the mode.
    pub fn commit(&mut self, rgb: Rgb) {
        self.latest.send_replace(rgb);
        let mode = *self.mode.borrow();
        tokio::spawn(push(
            Arc::clone(&self.device),
            rgb,
            true,
            mode,
            self.notices.clone(),
        ));
    }

    /// One forced push of the color current at fire time, `delay` from now.
    /// Independent of the debounce timer.
    pub fn force_after(&self, delay: Duration) {
        let device = Arc::clone(&self.device);
        let latest = self.latest.subscribe();
        let mode = self.mode.clone();
        let notices = self.notices.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let rgb = *latest.borrow();
            let mode = *mode.borrow();
            push(device, rgb, true, mode, notices).await;
        });
    }
}

async fn push<D: DeviceApi>(
    device: Arc<D>,
    rgb: Rgb,
    force: bool,
    mode: LedMode,
    notices: mpsc::UnboundedSender<Notice>,
) {
    if mode.is_spectrum() && !force {
        debug!(%rgb, "spectrum mode active, color push suppressed");
        return;
    }
    let action = Action::Color(rgb);
    match device.push_color(rgb).await {
        Ok(()) => {
            info!(%rgb, force, "color pushed");
            let _ = notices.send(Notice::Done(action));
        }
        Err(e) => {
            warn!(%rgb, "color push failed: {e:#}");
            let _ = notices.send(Notice::Failed(action, format!("{e:#}")));
        }
    }
}
