//! Terminal color wheel.
//!
//! Holds its color as floating point HSV and reports integer RGB, fires
//! `ColorChange` on every adjustment (programmatic sets included) and
//! `InputEnd` when the user lets go of a channel.

use crate::record::{Rgb, clamp_channel};

pub const COMPACT_SIZE: u16 = 280;
pub const FULL_SIZE: u16 = 400;
pub const BREAKPOINT_PX: u32 = 500;

/// Pixels per terminal column used to map the terminal onto the breakpoint.
pub const CELL_WIDTH_PX: u32 = 8;

const HUE_STEP: f64 = 5.0;
const SV_STEP: f64 = 2.0;

pub fn viewport_px(columns: u16) -> u32 {
    columns as u32 * CELL_WIDTH_PX
}

pub fn size_for_viewport(width_px: u32) -> u16 {
    if width_px < BREAKPOINT_PX {
        COMPACT_SIZE
    } else {
        FULL_SIZE
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  HSV
// ═══════════════════════════════════════════════════════════════════════════════

/// `h` in degrees `[0, 360)`, `s` and `v` in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Hsv {
    pub fn from_rgb(c: Rgb) -> Self {
        let r = c.r as f64 / 255.0;
        let g = c.g as f64 / 255.0;
        let b = c.b as f64 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let s = if max == 0.0 { 0.0 } else { delta / max };

        Self {
            h: h.rem_euclid(360.0),
            s: s * 100.0,
            v: max * 100.0,
        }
    }

    pub fn to_rgb(self) -> Rgb {
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let v = (self.v / 100.0).clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0) / 60.0;
        let c = v * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Rgb::new(
            clamp_channel((r + m) * 255.0),
            clamp_channel((g + m) * 255.0),
            clamp_channel((b + m) * 255.0),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Wheel
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WheelEvent {
    ColorChange(Rgb),
    InputEnd(Rgb),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Hue,
    Saturation,
    Value,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Hue, Channel::Saturation, Channel::Value];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::Value => "Brightness",
        }
    }
}

pub struct ColorWheel {
    hsv: Hsv,
    size: u16,
    enabled: bool,
}

impl ColorWheel {
    pub fn new(size: u16) -> Self {
        Self {
            hsv: Hsv {
                h: 0.0,
                s: 0.0,
                v: 100.0,
            },
            size,
            enabled: true,
        }
    }

    pub fn rgb(&self) -> Rgb {
        self.hsv.to_rgb()
    }

    pub fn hsv(&self) -> Hsv {
        self.hsv
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn resize(&mut self, size: u16) {
        self.size = size;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Programmatic set. Fires a change event even while disabled, like a
    /// script assigning the color does.
    pub fn set_rgb(&mut self, rgb: Rgb) -> WheelEvent {
        let mut hsv = Hsv::from_rgb(rgb);
        // Greys carry no hue; keep the previous one so the marker does not jump.
        if hsv.s == 0.0 || hsv.v == 0.0 {
            hsv.h = self.hsv.h;
        }
        self.hsv = hsv;
        WheelEvent::ColorChange(self.rgb())
    }

    /// User drag on one channel. Ignored while disabled.
    pub fn nudge(&mut self, channel: Channel, steps: i32) -> Option<WheelEvent> {
        if !self.enabled || steps == 0 {
            return None;
        }
        let d = steps as f64;
        match channel {
            Channel::Hue => self.hsv.h = (self.hsv.h + d * HUE_STEP).rem_euclid(360.0),
            Channel::Saturation => self.hsv.s = (self.hsv.s + d * SV_STEP).clamp(0.0, 100.0),
            Channel::Value => self.hsv.v = (self.hsv.v + d * SV_STEP).clamp(0.0, 100.0),
        }
        Some(WheelEvent::ColorChange(self.rgb()))
    }

    pub fn release(&self) -> Option<WheelEvent> {
        self.enabled.then(|| WheelEvent::InputEnd(self.rgb()))
    }

    /// Position of `channel` as a fraction of its range.
    pub fn fraction(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Hue => self.hsv.h / 360.0,
            Channel::Saturation => self.hsv.s / 100.0,
            Channel::Value => self.hsv.v / 100.0,
        }
    }

    /// Color at `fraction` along `channel` with the other two held.
    pub fn sample(&self, channel: Channel, fraction: f64) -> Rgb {
        let f = fraction.clamp(0.0, 1.0);
        let mut hsv = self.hsv;
        match channel {
            Channel::Hue => {
                hsv.h = f * 360.0;
                hsv.s = hsv.s.max(60.0);
                hsv.v = hsv.v.max(60.0);
            }
            Channel::Saturation => hsv.s = f * 100.0,
            Channel::Value => hsv.v = f * 100.0,
        }
        hsv.to_rgb()
    }

    /// Bar width for the current size, scaled against the full size.
    pub fn bar_width(&self, available: u16) -> u16 {
        ((available as u32 * self.size as u32) / FULL_SIZE as u32).max(1) as u16
    }
}
