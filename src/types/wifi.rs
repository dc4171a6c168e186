use core::fmt;

use super::{WIFI_PASSWORD_MAX, WIFI_SSID_MAX};
use crate::error::ManagerError;

pub type Ssid = heapless::String<WIFI_SSID_MAX>;

/// One saved network. Fields are fixed width and zero padded so identity can be
/// checked over the whole SSID field.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WifiCredentials {
    pub(crate) ssid: [u8; WIFI_SSID_MAX],
    pub(crate) ssid_len: u8,
    pub(crate) password: [u8; WIFI_PASSWORD_MAX],
    pub(crate) password_len: u8,
}

impl WifiCredentials {
    /// Builds credentials from user input. An empty password means an open network.
    pub fn new(ssid: &str, password: &str) -> Result<Self, ManagerError> {
        Self::from_parts(ssid.as_bytes(), password.as_bytes())
    }

    pub fn from_parts(ssid: &[u8], password: &[u8]) -> Result<Self, ManagerError> {
        if ssid.is_empty() || ssid.len() > WIFI_SSID_MAX || password.len() > WIFI_PASSWORD_MAX {
            return Err(ManagerError::ArgumentInvalid);
        }
        let mut result = Self::empty();
        result.ssid[..ssid.len()].copy_from_slice(ssid);
        result.ssid_len = ssid.len() as u8;
        result.password[..password.len()].copy_from_slice(password);
        result.password_len = password.len() as u8;
        Ok(result)
    }

    pub(crate) const fn empty() -> Self {
        Self {
            ssid: [0u8; WIFI_SSID_MAX],
            ssid_len: 0,
            password: [0u8; WIFI_PASSWORD_MAX],
            password_len: 0,
        }
    }

    pub fn ssid_bytes(&self) -> &[u8] {
        &self.ssid[..self.ssid_len as usize]
    }

    pub fn password_bytes(&self) -> &[u8] {
        &self.password[..self.password_len as usize]
    }

    pub fn ssid(&self) -> Ssid {
        ssid_from_bytes(self.ssid_bytes())
    }

    pub fn password_str(&self) -> Option<&str> {
        core::str::from_utf8(self.password_bytes()).ok()
    }

    pub fn is_open(&self) -> bool {
        self.password_len == 0
    }

    pub(crate) fn has_empty_ssid(&self) -> bool {
        self.ssid_len == 0 || self.ssid[0] == 0
    }

    /// Field-wise identity: every byte of the fixed SSID field must match.
    pub fn same_network(&self, other: &Self) -> bool {
        self.ssid == other.ssid
    }

    pub(crate) fn matches_field(&self, field: &[u8; WIFI_SSID_MAX]) -> bool {
        &self.ssid == field
    }
}

/// Pads a lookup SSID to the stored field width.
pub(crate) fn ssid_field(ssid: &[u8]) -> Result<[u8; WIFI_SSID_MAX], ManagerError> {
    if ssid.is_empty() || ssid.len() > WIFI_SSID_MAX {
        return Err(ManagerError::ArgumentInvalid);
    }
    let mut field = [0u8; WIFI_SSID_MAX];
    field[..ssid.len()].copy_from_slice(ssid);
    Ok(field)
}

/// Keeps the longest valid UTF-8 prefix; radio SSIDs are raw bytes.
pub fn ssid_from_bytes(bytes: &[u8]) -> Ssid {
    let valid = match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => core::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default(),
    };
    let mut ssid = Ssid::new();
    for ch in valid.chars() {
        if ssid.push(ch).is_err() {
            break;
        }
    }
    ssid
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid().as_str())
            .field("password_len", &self.password_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversized_input() {
        assert_eq!(
            WifiCredentials::new("", "pw"),
            Err(ManagerError::ArgumentInvalid)
        );
        let long_ssid = "s".repeat(WIFI_SSID_MAX + 1);
        assert!(WifiCredentials::new(&long_ssid, "").is_err());
        let long_password = "p".repeat(WIFI_PASSWORD_MAX + 1);
        assert!(WifiCredentials::new("home", &long_password).is_err());
    }

    #[test]
    fn empty_password_is_open_network() {
        let open = WifiCredentials::new("cafe", "").expect("credentials");
        assert!(open.is_open());
        assert_eq!(open.ssid().as_str(), "cafe");
    }

    #[test]
    fn identity_compares_whole_field() {
        let a = WifiCredentials::new("lab", "one").expect("credentials");
        let b = WifiCredentials::new("lab", "two").expect("credentials");
        let c = WifiCredentials::new("lab2", "one").expect("credentials");
        assert!(a.same_network(&b));
        assert!(!a.same_network(&c));

        let mut dirty = a;
        dirty.ssid[WIFI_SSID_MAX - 1] = 0x7F;
        assert!(!a.same_network(&dirty));
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = WifiCredentials::new("home", "hunter22").expect("credentials");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("home"));
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn non_utf8_ssid_keeps_valid_prefix() {
        let ssid = ssid_from_bytes(&[b'a', b'b', 0xFF, b'c']);
        assert_eq!(ssid.as_str(), "ab");
    }
}
