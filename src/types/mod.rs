mod status;
mod wifi;

pub use status::{ConnectionState, ConnectionStatus, LinkInfo, ScanRecord};
pub(crate) use wifi::ssid_field;
pub use wifi::{ssid_from_bytes, Ssid, WifiCredentials};

pub const WIFI_SSID_MAX: usize = 32;
pub const WIFI_PASSWORD_MAX: usize = 64;
/// `ssid[32] | ssid_len | password[64] | password_len`
pub const CREDENTIAL_RECORD_LEN: usize = WIFI_SSID_MAX + 1 + WIFI_PASSWORD_MAX + 1;
