use alloc::string::String;

use serde::Deserialize;

use crate::error::ManagerError;

#[derive(Deserialize)]
struct RawConfigure {
    ssid: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
struct RawSsid {
    ssid: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub(super) struct ConfigureBody {
    pub(super) ssid: String,
    /// Empty for open networks.
    pub(super) password: String,
}

impl ConfigureBody {
    pub(super) fn parse(body: &[u8]) -> Result<Self, ManagerError> {
        let raw: RawConfigure = parse_json(body)?;
        Ok(Self {
            ssid: required(raw.ssid)?,
            password: raw.password.unwrap_or_default(),
        })
    }
}

pub(super) struct SsidBody;

impl SsidBody {
    pub(super) fn parse(body: &[u8]) -> Result<String, ManagerError> {
        let raw: RawSsid = parse_json(body)?;
        required(raw.ssid)
    }
}

fn parse_json<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, ManagerError> {
    serde_json::from_slice(body).map_err(|err| {
        log::debug!("wifi_api: bad body err={}", err);
        ManagerError::ArgumentInvalid
    })
}

fn required(value: Option<String>) -> Result<String, ManagerError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ManagerError::ArgumentInvalid),
    }
}
