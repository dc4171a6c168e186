mod blob;
mod flash;
mod record;
#[cfg(test)]
mod tests;

use alloc::vec::Vec;

pub use blob::{BlobStore, MemoryBlobStore};
pub use flash::{FlashBlobStore, BLOB_HEADER_LEN, BLOB_SLOT_LEN};
#[cfg(test)]
pub(crate) use record::encode_list;

use crate::error::ManagerError;
use crate::types::{ssid_field, WifiCredentials};

pub const WIFI_STORE_NAMESPACE: &str = "wifi_store";
pub const WIFI_STORE_KEY: &str = "wifi_list";

/// Bounded most-recently-successful list of saved networks. Index 0 is the network
/// that connected last; every mutation rewrites the whole list in one blob.
pub struct CredentialStore<S> {
    blobs: S,
    capacity: usize,
}

impl<S: BlobStore> CredentialStore<S> {
    pub fn new(blobs: S, capacity: usize) -> Self {
        Self {
            blobs,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    pub fn blobs_mut(&mut self) -> &mut S {
        &mut self.blobs
    }

    pub fn into_inner(self) -> S {
        self.blobs
    }

    pub fn load_all(&mut self) -> Result<Vec<WifiCredentials>, ManagerError> {
        match self.blobs.get(WIFI_STORE_NAMESPACE, WIFI_STORE_KEY)? {
            Some(blob) => record::decode_list(&blob, self.capacity),
            None => Ok(Vec::new()),
        }
    }

    pub fn find(&mut self, ssid: &[u8]) -> Result<Option<WifiCredentials>, ManagerError> {
        let field = ssid_field(ssid)?;
        Ok(self
            .load_all()?
            .into_iter()
            .find(|entry| entry.matches_field(&field)))
    }

    /// Upserts `credentials` at the front. Repeating the call with the same
    /// network leaves the list unchanged.
    pub fn on_connected(&mut self, credentials: &WifiCredentials) -> Result<(), ManagerError> {
        let mut list = self.load_all()?;
        promote(&mut list, *credentials, self.capacity)?;
        self.commit(&list)?;
        log::info!(
            "wifi_store: promoted ssid={} count={}",
            credentials.ssid().as_str(),
            list.len()
        );
        Ok(())
    }

    /// Missing entries are not an error.
    pub fn delete_by_ssid(&mut self, ssid: &[u8]) -> Result<(), ManagerError> {
        let field = ssid_field(ssid)?;
        let mut list = self.load_all()?;
        let before = list.len();
        list.retain(|entry| !entry.matches_field(&field));
        if list.len() == before {
            return Ok(());
        }
        self.commit(&list)?;
        log::info!("wifi_store: deleted count={}", list.len());
        Ok(())
    }

    fn commit(&mut self, list: &[WifiCredentials]) -> Result<(), ManagerError> {
        let blob = record::encode_list(list)?;
        self.blobs
            .set(WIFI_STORE_NAMESPACE, WIFI_STORE_KEY, &blob)
            .inspect_err(|err| log::warn!("wifi_store: commit failed err={}", err))
    }
}

fn promote(
    list: &mut Vec<WifiCredentials>,
    credentials: WifiCredentials,
    capacity: usize,
) -> Result<(), ManagerError> {
    if let Some(position) = list
        .iter()
        .position(|entry| entry.same_network(&credentials))
    {
        list.remove(position);
    } else if list.len() >= capacity {
        list.truncate(capacity - 1);
    }
    list.try_reserve(1)?;
    list.insert(0, credentials);
    Ok(())
}
