//! The editable copy of the clock's settings shown on the page.

use serde::{Deserialize, Serialize};

use crate::record::{ConfigRecord, LedMode, Rgb, TimeSettings};

// ═══════════════════════════════════════════════════════════════════════════════
//  Timezones  (city label → POSIX TZ string)
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneOption {
    pub city: String,
    pub timezone: String,
}

impl TimezoneOption {
    pub fn new(city: &str, timezone: &str) -> Self {
        Self {
            city: city.into(),
            timezone: timezone.into(),
        }
    }
}

const BUILTIN_TIMEZONES: &[(&str, &str)] = &[
    ("Honolulu", "HST10"),
    ("Anchorage", "AKST9AKDT,M3.2.0,M11.1.0"),
    ("Los Angeles", "PST8PDT,M3.2.0,M11.1.0"),
    ("Phoenix", "MST7"),
    ("Denver", "MST7MDT,M3.2.0,M11.1.0"),
    ("Chicago", "CST6CDT,M3.2.0,M11.1.0"),
    ("New York", "EST5EDT,M3.2.0,M11.1.0"),
    ("Sao Paulo", "<-03>3"),
    ("London", "GMT0BST,M3.5.0/1,M10.5.0"),
    ("Berlin", "CET-1CEST,M3.5.0,M10.5.0/3"),
    ("Athens", "EET-2EEST,M3.5.0/3,M10.5.0/4"),
    ("Moscow", "MSK-3"),
    ("Dubai", "<+04>-4"),
    ("Kolkata", "IST-5:30"),
    ("Shanghai", "CST-8"),
    ("Tokyo", "JST-9"),
    ("Sydney", "AEST-10AEDT,M10.1.0,M4.1.0/3"),
    ("Auckland", "NZST-12NZDT,M9.5.0,M4.1.0/3"),
];

/// Built-in table followed by any user additions whose label is new.
pub fn timezone_options(extra: &[TimezoneOption]) -> Vec<TimezoneOption> {
    let mut options: Vec<TimezoneOption> = BUILTIN_TIMEZONES
        .iter()
        .map(|(city, tz)| TimezoneOption::new(city, tz))
        .collect();
    for opt in extra {
        if !options.iter().any(|o| o.city == opt.city) {
            options.push(opt.clone());
        }
    }
    options
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Fields
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldId {
    Ssid,
    Pass,
    Ntp,
    TimeFmt,
    Colon,
    Timezone,
    LedMode,
    RgbR,
    RgbG,
    RgbB,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Secret,
    Toggle,
    Choice,
    /// Read-only display of a widget channel.
    Mirror,
}

pub struct FieldDef {
    pub id: FieldId,
    pub label: &'static str,
    pub desc: &'static str,
    pub kind: FieldKind,
}

pub const FIELDS: &[FieldDef] = &[
    FieldDef {
        id: FieldId::Ssid,
        label: "Wi-Fi SSID",
        desc: "Network the clock joins on boot",
        kind: FieldKind::Text,
    },
    FieldDef {
        id: FieldId::Pass,
        label: "Wi-Fi Password",
        desc: "Stored on the clock in plain text",
        kind: FieldKind::Secret,
    },
    FieldDef {
        id: FieldId::Ntp,
        label: "NTP Server",
        desc: "Time source queried after every boot",
        kind: FieldKind::Text,
    },
    FieldDef {
        id: FieldId::TimeFmt,
        label: "Time Format",
        desc: "12-hour or 24-hour display on the tubes",
        kind: FieldKind::Choice,
    },
    FieldDef {
        id: FieldId::Colon,
        label: "Colon Separator",
        desc: "Blink the INS-1 indicators between digits",
        kind: FieldKind::Toggle,
    },
    FieldDef {
        id: FieldId::Timezone,
        label: "Timezone",
        desc: "City whose local time the clock shows",
        kind: FieldKind::Choice,
    },
    FieldDef {
        id: FieldId::LedMode,
        label: "LED Mode",
        desc: "Static backlight color or microphone-driven spectrum",
        kind: FieldKind::Choice,
    },
    FieldDef {
        id: FieldId::RgbR,
        label: "Red",
        desc: "Red channel of the wheel color",
        kind: FieldKind::Mirror,
    },
    FieldDef {
        id: FieldId::RgbG,
        label: "Green",
        desc: "Green channel of the wheel color",
        kind: FieldKind::Mirror,
    },
    FieldDef {
        id: FieldId::RgbB,
        label: "Blue",
        desc: "Blue channel of the wheel color",
        kind: FieldKind::Mirror,
    },
];

pub fn field_def(id: FieldId) -> &'static FieldDef {
    FIELDS
        .iter()
        .find(|f| f.id == id)
        .unwrap_or(&FIELDS[0])
}

const TIME_FORMATS: &[(&str, &str)] = &[("0", "12-hour"), ("1", "24-hour")];

// ═══════════════════════════════════════════════════════════════════════════════
//  Form
// ═══════════════════════════════════════════════════════════════════════════════

pub struct SettingsForm {
    pub ssid: String,
    pub pass: String,
    pub ntp: String,
    pub time_fmt: String,
    pub colon: String,
    pub rgb_r: String,
    pub rgb_g: String,
    pub rgb_b: String,
    timezones: Vec<TimezoneOption>,
    timezone_sel: usize,
    mode: LedMode,
}

impl SettingsForm {
    pub fn new(timezones: Vec<TimezoneOption>) -> Self {
        Self {
            ssid: String::new(),
            pass: String::new(),
            ntp: String::new(),
            time_fmt: String::new(),
            colon: String::new(),
            rgb_r: String::new(),
            rgb_g: String::new(),
            rgb_b: String::new(),
            timezones,
            timezone_sel: 0,
            mode: LedMode::Static,
        }
    }

    pub fn selected_timezone(&self) -> Option<&TimezoneOption> {
        self.timezones.get(self.timezone_sel)
    }

    /// Selects the option labelled `city`. Leaves the selection alone and
    /// returns false when no label matches.
    pub fn select_timezone(&mut self, city: &str) -> bool {
        match self.timezones.iter().position(|o| o.city == city) {
            Some(idx) => {
                self.timezone_sel = idx;
                true
            }
            None => false,
        }
    }

    pub fn mode(&self) -> LedMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LedMode) {
        self.mode = mode;
    }

    pub fn value(&self, id: FieldId) -> &str {
        match id {
            FieldId::Ssid => &self.ssid,
            FieldId::Pass => &self.pass,
            FieldId::Ntp => &self.ntp,
            FieldId::TimeFmt => &self.time_fmt,
            FieldId::Colon => &self.colon,
            FieldId::Timezone => self
                .selected_timezone()
                .map(|o| o.timezone.as_str())
                .unwrap_or(""),
            FieldId::LedMode => self.mode.as_str(),
            FieldId::RgbR => &self.rgb_r,
            FieldId::RgbG => &self.rgb_g,
            FieldId::RgbB => &self.rgb_b,
        }
    }

    /// Writes a free-text field. Selectors and mirrors are not text-editable.
    pub fn set_text(&mut self, id: FieldId, value: String) {
        match id {
            FieldId::Ssid => self.ssid = value,
            FieldId::Pass => self.pass = value,
            FieldId::Ntp => self.ntp = value,
            _ => {}
        }
    }

    pub fn display(&self, id: FieldId) -> String {
        match id {
            FieldId::Pass if self.pass.is_empty() => "(none)".into(),
            FieldId::Pass => "•".repeat(self.pass.chars().count()),
            FieldId::TimeFmt => TIME_FORMATS
                .iter()
                .find(|(v, _)| *v == self.time_fmt)
                .map(|(_, l)| l.to_string())
                .unwrap_or_else(|| self.time_fmt.clone()),
            FieldId::Colon => match self.colon.as_str() {
                "1" => "Enabled".into(),
                "0" => "Disabled".into(),
                o => o.into(),
            },
            FieldId::Timezone => self
                .selected_timezone()
                .map(|o| o.city.clone())
                .unwrap_or_else(|| "N/A".into()),
            FieldId::LedMode => self.mode.label().into(),
            _ => self.value(id).to_string(),
        }
    }

    pub fn toggle(&mut self, id: FieldId) {
        if id == FieldId::Colon {
            self.colon = String::from(if self.colon == "1" { "0" } else { "1" });
        }
    }

    /// Steps a choice field. Returns the new LED mode when that selector moved.
    pub fn cycle(&mut self, id: FieldId, forward: bool) -> Option<LedMode> {
        match id {
            FieldId::TimeFmt => {
                let cur = TIME_FORMATS
                    .iter()
                    .position(|(v, _)| *v == self.time_fmt)
                    .unwrap_or(0);
                let nxt = step(cur, TIME_FORMATS.len(), forward);
                self.time_fmt = TIME_FORMATS[nxt].0.into();
                None
            }
            FieldId::Timezone => {
                if !self.timezones.is_empty() {
                    self.timezone_sel = step(self.timezone_sel, self.timezones.len(), forward);
                }
                None
            }
            FieldId::LedMode => {
                let cur = LedMode::ALL
                    .iter()
                    .position(|m| *m == self.mode)
                    .unwrap_or(0);
                Some(LedMode::ALL[step(cur, LedMode::ALL.len(), forward)])
            }
            _ => None,
        }
    }

    pub fn mirror_color(&mut self, rgb: Rgb) {
        self.rgb_r = rgb.r.to_string();
        self.rgb_g = rgb.g.to_string();
        self.rgb_b = rgb.b.to_string();
    }

    fn mirrored_color(&self) -> Rgb {
        let ch = |s: &str| s.trim().parse::<u8>().unwrap_or(0);
        Rgb::new(ch(&self.rgb_r), ch(&self.rgb_g), ch(&self.rgb_b))
    }

    /// Copies a device document into the inputs. Color and mode belong to the
    /// widget and mode selector and are applied by the page controller.
    pub fn populate(&mut self, record: &ConfigRecord) {
        self.ssid = record.ssid.clone();
        self.pass = record.pass.clone();
        self.ntp = record.ntp.clone();
        self.colon = record.colon.clone();
        self.time_fmt = record.effective_time_fmt().to_string();
        self.select_timezone(&record.time.city);
    }

    /// Assembles the document posted to `/update`. `live` is the widget's
    /// color; the numeric mirrors are only consulted without a widget.
    pub fn collect(&self, live: Option<Rgb>) -> ConfigRecord {
        let (city, timezone) = self
            .selected_timezone()
            .map(|o| (o.city.clone(), o.timezone.clone()))
            .unwrap_or_default();
        ConfigRecord {
            ssid: self.ssid.clone(),
            pass: self.pass.clone(),
            colon: self.colon.clone(),
            ntp: self.ntp.clone(),
            time_fmt: self.time_fmt.clone(),
            color: live.unwrap_or_else(|| self.mirrored_color()),
            time: TimeSettings {
                city,
                timezone,
                time_fmt: self.time_fmt.clone(),
            },
            led_mode: self.mode,
        }
    }
}

fn step(cur: usize, len: usize, forward: bool) -> usize {
    if forward {
        (cur + 1) % len
    } else if cur > 0 {
        cur - 1
    } else {
        len - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SettingsForm {
        SettingsForm::new(timezone_options(&[TimezoneOption::new(
            "Reykjavik",
            "GMT0",
        )]))
    }

    #[test]
    fn populate_selects_matching_city() {
        let mut form = form();
        let mut record = ConfigRecord {
            ssid: "home".into(),
            colon: "1".into(),
            ..Default::default()
        };
        record.time.city = "Tokyo".into();
        record.time.time_fmt = "0".into();
        form.populate(&record);
        assert_eq!(form.ssid, "home");
        assert_eq!(form.time_fmt, "0");
        assert_eq!(form.selected_timezone().unwrap().city, "Tokyo");
        assert_eq!(form.display(FieldId::TimeFmt), "12-hour");
    }

    #[test]
    fn populate_without_match_keeps_selection() {
        let mut form = form();
        assert!(form.select_timezone("Berlin"));
        let mut record = ConfigRecord::default();
        record.time.city = "Atlantis".into();
        form.populate(&record);
        assert_eq!(form.selected_timezone().unwrap().city, "Berlin");
    }

    #[test]
    fn user_timezones_append_without_duplicates() {
        let options = timezone_options(&[
            TimezoneOption::new("Tokyo", "JST-9"),
            TimezoneOption::new("Reykjavik", "GMT0"),
        ]);
        assert_eq!(options.iter().filter(|o| o.city == "Tokyo").count(), 1);
        assert_eq!(options.last().unwrap().city, "Reykjavik");
    }

    #[test]
    fn collect_uses_live_color_and_selected_timezone() {
        let mut form = SettingsForm::new(vec![
            TimezoneOption::new("Los Angeles", "PST8PDT,M3.2.0,M11.1.0"),
            TimezoneOption::new("New York", "America/New_York"),
        ]);
        form.select_timezone("New York");
        form.time_fmt = "1".into();
        form.mirror_color(Rgb::new(1, 1, 1));
        let record = form.collect(Some(Rgb::new(10, 20, 30)));
        assert_eq!(record.color, Rgb::new(10, 20, 30));
        assert_eq!(
            record.time,
            TimeSettings {
                city: "New York".into(),
                timezone: "America/New_York".into(),
                time_fmt: "1".into(),
            }
        );
        assert_eq!(record.time_fmt, "1");
    }

    #[test]
    fn collect_falls_back_to_mirrors_without_widget() {
        let mut form = form();
        form.rgb_r = "40".into();
        form.rgb_g = "junk".into();
        form.rgb_b = " 60 ".into();
        assert_eq!(form.collect(None).color, Rgb::new(40, 0, 60));
    }

    #[test]
    fn cycling_mode_reports_new_mode_without_applying_it() {
        let mut form = form();
        assert_eq!(form.cycle(FieldId::LedMode, true), Some(LedMode::Spectrum));
        assert_eq!(form.mode(), LedMode::Static);
        assert_eq!(form.cycle(FieldId::TimeFmt, false), None);
        assert_eq!(form.time_fmt, "1");
    }

    #[test]
    fn colon_toggles_between_flags() {
        let mut form = form();
        form.colon = "1".into();
        form.toggle(FieldId::Colon);
        assert_eq!(form.colon, "0");
        assert_eq!(form.display(FieldId::Colon), "Disabled");
        form.toggle(FieldId::Colon);
        assert_eq!(form.colon, "1");
    }

    #[test]
    fn password_is_masked() {
        let mut form = form();
        assert_eq!(form.display(FieldId::Pass), "(none)");
        form.set_text(FieldId::Pass, "hunter2".into());
        assert_eq!(form.display(FieldId::Pass), "•••••••");
    }
}
