//! The configuration document stored on the clock and exchanged over `/data`
//! and `/update`.
//!
//! The firmware writes its defaults with every value quoted (`"r": "0"`,
//! `"colon": "1"`) while the settings page posts plain integers, so decoding
//! accepts either form. Encoding always produces integer color channels and
//! string flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
//  Color
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rgb {
    #[serde(deserialize_with = "loose_channel")]
    pub r: u8,
    #[serde(deserialize_with = "loose_channel")]
    pub g: u8,
    #[serde(deserialize_with = "loose_channel")]
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  LED Mode
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LedMode {
    #[default]
    Static,
    Spectrum,
}

impl LedMode {
    pub const ALL: [LedMode; 2] = [LedMode::Static, LedMode::Spectrum];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Spectrum => "spectrum",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Static => "Static color",
            Self::Spectrum => "Audio spectrum",
        }
    }

    pub fn is_spectrum(&self) -> bool {
        matches!(self, Self::Spectrum)
    }
}

impl fmt::Display for LedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "spectrum" => Ok(Self::Spectrum),
            other => anyhow::bail!("unknown LED mode '{other}'"),
        }
    }
}

impl<'de> Deserialize<'de> for LedMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = loose_string(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|_| {
            tracing::warn!(mode = %raw, "device reported an unknown LED mode, using static");
            LedMode::Static
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration Record
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSettings {
    #[serde(deserialize_with = "loose_string")]
    pub city: String,
    /// POSIX TZ string handed to `setenv("TZ")` on the device.
    #[serde(deserialize_with = "loose_string")]
    pub timezone: String,
    #[serde(deserialize_with = "loose_string")]
    pub time_fmt: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRecord {
    #[serde(deserialize_with = "loose_string")]
    pub ssid: String,
    #[serde(deserialize_with = "loose_string")]
    pub pass: String,
    #[serde(deserialize_with = "loose_string")]
    pub colon: String,
    #[serde(deserialize_with = "loose_string")]
    pub ntp: String,
    #[serde(deserialize_with = "loose_string")]
    pub time_fmt: String,
    pub color: Rgb,
    pub time: TimeSettings,
    pub led_mode: LedMode,
}

impl ConfigRecord {
    /// Time format as the form shows it. The page reads the nested value and
    /// only falls back to the top-level copy when that is blank.
    pub fn effective_time_fmt(&self) -> &str {
        if self.time.time_fmt.is_empty() {
            &self.time_fmt
        } else {
            &self.time.time_fmt
        }
    }
}

// ─── Lenient Decoding ───────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
    Flag(bool),
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        None => String::new(),
        Some(Loose::Text(s)) => s,
        Some(Loose::Flag(b)) => String::from(if b { "1" } else { "0" }),
        Some(Loose::Number(n)) if n.fract() == 0.0 => format!("{}", n as i64),
        Some(Loose::Number(n)) => n.to_string(),
    })
}

fn loose_channel<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = match Option::<Loose>::deserialize(deserializer)? {
        None => return Ok(0),
        Some(Loose::Number(n)) => n,
        Some(Loose::Text(s)) if s.trim().is_empty() => return Ok(0),
        Some(Loose::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid color channel '{s}'")))?,
        Some(Loose::Flag(_)) => {
            return Err(serde::de::Error::custom("color channel cannot be a boolean"));
        }
    };
    Ok(clamp_channel(value))
}

pub fn clamp_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
