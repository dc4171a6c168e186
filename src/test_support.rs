use alloc::{collections::VecDeque, vec, vec::Vec};
use core::net::Ipv4Addr;

use embedded_storage::{ReadStorage, Storage};

use crate::driver::NetworkDriver;
use crate::error::ManagerError;
use crate::types::{ssid_from_bytes, LinkInfo, ScanRecord, WifiCredentials};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MemoryFlashError;

/// NOR image in RAM. `tear_after` cuts the next write short after that many
/// bytes and fails it.
pub(crate) struct MemoryFlash {
    pub(crate) bytes: Vec<u8>,
    pub(crate) read_fault: bool,
    pub(crate) tear_after: Option<usize>,
}

impl MemoryFlash {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            bytes: vec![0xFF; len],
            read_fault: false,
            tear_after: None,
        }
    }
}

impl ReadStorage for MemoryFlash {
    type Error = MemoryFlashError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.read_fault {
            return Err(MemoryFlashError);
        }
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.bytes.len() {
            return Err(MemoryFlashError);
        }
        bytes.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for MemoryFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        if start + bytes.len() > self.bytes.len() {
            return Err(MemoryFlashError);
        }
        if let Some(limit) = self.tear_after.take() {
            let written = limit.min(bytes.len());
            self.bytes[start..start + written].copy_from_slice(&bytes[..written]);
            return Err(MemoryFlashError);
        }
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Driver double: accepts or rejects per SSID and records every request.
/// Outcome events are injected by the test through the manager.
pub(crate) struct ScriptedDriver {
    pub(crate) requests: Vec<WifiCredentials>,
    pub(crate) rejected: Vec<&'static str>,
    pub(crate) unavailable: bool,
    pub(crate) scan_results: VecDeque<Result<Vec<ScanRecord>, ManagerError>>,
    pub(crate) link: Option<LinkInfo>,
}

impl ScriptedDriver {
    pub(crate) fn new() -> Self {
        Self {
            requests: Vec::new(),
            rejected: Vec::new(),
            unavailable: false,
            scan_results: VecDeque::new(),
            link: None,
        }
    }

    pub(crate) fn rejecting(ssids: &[&'static str]) -> Self {
        let mut driver = Self::new();
        driver.rejected.extend_from_slice(ssids);
        driver
    }

    pub(crate) fn requested_ssids(&self) -> Vec<&str> {
        self.requests
            .iter()
            .map(|creds| core::str::from_utf8(creds.ssid_bytes()).unwrap_or("?"))
            .collect()
    }

    pub(crate) fn associate(&mut self, ssid: &str) {
        self.link = Some(LinkInfo {
            ssid: ssid_from_bytes(ssid.as_bytes()),
            rssi: -52,
            bssid: [0x02, 0x11, 0x22, 0x33, 0x44, 0x55],
            ip: Ipv4Addr::new(192, 168, 1, 50),
        });
    }
}

impl NetworkDriver for ScriptedDriver {
    fn connect(&mut self, credentials: &WifiCredentials) -> Result<(), ManagerError> {
        if self.unavailable {
            return Err(ManagerError::DriverUnavailable);
        }
        self.requests.push(*credentials);
        let rejected = self
            .rejected
            .iter()
            .any(|ssid| ssid.as_bytes() == credentials.ssid_bytes());
        if rejected {
            Err(ManagerError::StateInvalid)
        } else {
            Ok(())
        }
    }

    async fn scan(&mut self) -> Result<Vec<ScanRecord>, ManagerError> {
        self.scan_results.pop_front().unwrap_or(Ok(Vec::new()))
    }

    fn link_info(&self) -> Option<LinkInfo> {
        self.link.clone()
    }
}

pub(crate) fn creds(ssid: &str, password: &str) -> WifiCredentials {
    WifiCredentials::new(ssid, password).expect("credentials")
}
