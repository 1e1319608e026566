//! In-memory clock that records every call, for controller and sync tests.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, bail};

use crate::device::DeviceApi;
use crate::record::{ConfigRecord, LedMode, Rgb};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Color(Rgb),
    Mode(LedMode),
    Save(ConfigRecord),
    Reboot,
}

#[derive(Default)]
pub struct RecordingDevice {
    calls: Mutex<Vec<Call>>,
    record: ConfigRecord,
    fail: bool,
    latency: Duration,
}

impl RecordingDevice {
    pub fn with_record(record: ConfigRecord) -> Self {
        Self {
            record,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn color_calls(&self) -> Vec<Rgb> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Color(rgb) => Some(rgb),
                _ => None,
            })
            .collect()
    }

    async fn answer(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail {
            bail!("device unreachable");
        }
        Ok(())
    }
}

impl DeviceApi for RecordingDevice {
    async fn fetch_config(&self) -> Result<ConfigRecord> {
        self.answer(Call::Fetch).await?;
        Ok(self.record.clone())
    }

    async fn push_color(&self, rgb: Rgb) -> Result<()> {
        self.answer(Call::Color(rgb)).await
    }

    async fn push_mode(&self, mode: LedMode) -> Result<()> {
        self.answer(Call::Mode(mode)).await
    }

    async fn save_config(&self, record: &ConfigRecord) -> Result<()> {
        self.answer(Call::Save(record.clone())).await
    }

    async fn reboot(&self) -> Result<String> {
        self.answer(Call::Reboot).await?;
        Ok("Rebooting...".into())
    }
}
