use core::net::Ipv4Addr;

use heapless::String;

use crate::types::{WifiCredentials, WIFI_PASSWORD_MAX, WIFI_SSID_MAX};

pub const MANAGER_MAX_RETRY_DEFAULT: u8 = 5;
pub const MANAGER_RECONNECT_INTERVAL_DEFAULT_MS: i32 = 10_000;
pub const MANAGER_AP_SSID_DEFAULT: &str = "WifiSetup";
pub const MANAGER_AP_PASSWORD_DEFAULT: &str = "12345678";
pub const MANAGER_AP_IP_DEFAULT: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
pub const MANAGER_SAVE_COUNT_DEFAULT: u8 = 5;
pub const MANAGER_SAVE_COUNT_MAX: u8 = 20;
pub const MANAGER_WEB_PORT_DEFAULT: u16 = 80;
pub const MANAGER_STEP_INTERVAL_DEFAULT_MS: u32 = 1_000;
pub const MANAGER_CONNECT_TIMEOUT_DEFAULT_MS: u32 = 30_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Carried for compatibility with provisioning tools; the sweep does not read it.
    pub max_retry_count: u8,
    /// Delay before a new sweep after a full round failed. Negative disables auto-retry.
    pub reconnect_interval_ms: i32,
    pub ap_ssid: String<WIFI_SSID_MAX>,
    pub ap_password: String<WIFI_PASSWORD_MAX>,
    pub ap_ip: Ipv4Addr,
    /// Capacity of the saved credential list.
    pub save_count: u8,
    pub web_port: u16,
    pub step_interval_ms: u32,
    /// In-flight attempt watchdog. Zero waits for the driver forever.
    pub connect_timeout_ms: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ManagerConfig {
    pub fn defaults() -> Self {
        Self {
            max_retry_count: MANAGER_MAX_RETRY_DEFAULT,
            reconnect_interval_ms: MANAGER_RECONNECT_INTERVAL_DEFAULT_MS,
            ap_ssid: bounded(MANAGER_AP_SSID_DEFAULT),
            ap_password: bounded(MANAGER_AP_PASSWORD_DEFAULT),
            ap_ip: MANAGER_AP_IP_DEFAULT,
            save_count: MANAGER_SAVE_COUNT_DEFAULT,
            web_port: MANAGER_WEB_PORT_DEFAULT,
            step_interval_ms: MANAGER_STEP_INTERVAL_DEFAULT_MS,
            connect_timeout_ms: MANAGER_CONNECT_TIMEOUT_DEFAULT_MS,
        }
    }

    /// Defaults with build-time `WIFI_MANAGER_*` overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::defaults();
        if let Some(ssid) = option_env!("WIFI_MANAGER_AP_SSID") {
            if let Some(value) = try_bounded(ssid) {
                config.ap_ssid = value;
            }
        }
        if let Some(password) = option_env!("WIFI_MANAGER_AP_PASSWORD") {
            if let Some(value) = try_bounded(password) {
                config.ap_password = value;
            }
        }
        if let Some(ms) = option_env!("WIFI_MANAGER_RECONNECT_MS").and_then(|v| v.parse().ok()) {
            config.reconnect_interval_ms = ms;
        }
        if let Some(count) = option_env!("WIFI_MANAGER_SAVE_COUNT").and_then(|v| v.parse().ok()) {
            config.save_count = count;
        }
        if let Some(port) = option_env!("WIFI_MANAGER_WEB_PORT").and_then(|v| v.parse().ok()) {
            config.web_port = port;
        }
        config.sanitized()
    }

    pub fn sanitized(mut self) -> Self {
        self.save_count = clamp_u8(self.save_count, 1, MANAGER_SAVE_COUNT_MAX);
        if self.web_port == 0 {
            self.web_port = MANAGER_WEB_PORT_DEFAULT;
        }
        self.step_interval_ms = clamp_u32(self.step_interval_ms, 100, 60_000);
        if self.connect_timeout_ms != 0 {
            self.connect_timeout_ms = clamp_u32(self.connect_timeout_ms, 2_000, 180_000);
        }
        self
    }

    pub fn auto_retry_enabled(&self) -> bool {
        self.reconnect_interval_ms >= 0
    }
}

/// Station credentials baked in at build time, used for a one-off connect at boot.
pub fn compiled_credentials() -> Option<WifiCredentials> {
    let ssid = option_env!("WIFI_MANAGER_SSID")?;
    let password = option_env!("WIFI_MANAGER_PASSWORD").unwrap_or("");
    WifiCredentials::new(ssid, password).ok()
}

fn bounded<const N: usize>(value: &str) -> String<N> {
    try_bounded(value).unwrap_or_default()
}

fn try_bounded<const N: usize>(value: &str) -> Option<String<N>> {
    let mut out = String::new();
    out.push_str(value).ok()?;
    Some(out)
}

const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

const fn clamp_u8(value: u8, min: u8, max: u8) -> u8 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
