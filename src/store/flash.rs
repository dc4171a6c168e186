use alloc::vec::Vec;

use embedded_storage::{ReadStorage, Storage};

use super::blob::BlobStore;
use crate::error::ManagerError;

pub const BLOB_STORE_MAGIC: u32 = 0x5746_4C53;
pub const BLOB_STORE_VERSION: u8 = 1;
/// One erase sector per slot.
pub const BLOB_SLOT_LEN: u32 = 4096;
pub const BLOB_HEADER_LEN: usize = 16;

const SLOT_COUNT: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SlotHeader {
    seq: u32,
    tag: u32,
    len: u16,
}

/// Blob store over two ping-pong flash slots. A write always lands in the slot
/// that does not hold the newest valid copy, so a torn write leaves the previous
/// value readable. The region holds one blob at a time, identified by a tag
/// derived from its namespace and key.
pub struct FlashBlobStore<F> {
    flash: F,
    offset: u32,
}

impl<F> FlashBlobStore<F>
where
    F: ReadStorage + Storage,
{
    pub fn new(flash: F, offset: u32) -> Self {
        Self { flash, offset }
    }

    /// Places both slots in the last two sectors of the device.
    pub fn at_end(flash: F) -> Self {
        let capacity = flash.capacity() as u32;
        let offset = capacity.saturating_sub(BLOB_SLOT_LEN * SLOT_COUNT as u32);
        Self { flash, offset }
    }

    pub const fn payload_capacity() -> usize {
        BLOB_SLOT_LEN as usize - BLOB_HEADER_LEN
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    fn slot_offset(&self, slot: usize) -> u32 {
        self.offset + BLOB_SLOT_LEN * slot as u32
    }

    fn read_slot(&mut self, slot: usize) -> Result<Option<(SlotHeader, Vec<u8>)>, ManagerError> {
        let base = self.slot_offset(slot);
        let mut header = [0u8; BLOB_HEADER_LEN];
        self.flash
            .read(base, &mut header)
            .map_err(|_| ManagerError::StorageUnavailable)?;

        let Some(parsed) = parse_header(&header) else {
            return Ok(None);
        };
        let mut payload = Vec::new();
        payload.try_reserve_exact(parsed.len as usize)?;
        payload.resize(parsed.len as usize, 0);
        self.flash
            .read(base + BLOB_HEADER_LEN as u32, &mut payload)
            .map_err(|_| ManagerError::StorageUnavailable)?;

        let expected = checksum8_continue(
            checksum8_continue(CHECKSUM_SEED, &header[..BLOB_HEADER_LEN - 1]),
            &payload,
        );
        if expected != header[BLOB_HEADER_LEN - 1] {
            return Ok(None);
        }
        Ok(Some((parsed, payload)))
    }

    fn newest(&mut self) -> Result<Option<(usize, SlotHeader, Vec<u8>)>, ManagerError> {
        let mut newest: Option<(usize, SlotHeader, Vec<u8>)> = None;
        for slot in 0..SLOT_COUNT {
            let Some((header, payload)) = self.read_slot(slot)? else {
                continue;
            };
            let replace = match &newest {
                Some((_, current, _)) => seq_is_newer(header.seq, current.seq),
                None => true,
            };
            if replace {
                newest = Some((slot, header, payload));
            }
        }
        Ok(newest)
    }
}

impl<F> BlobStore for FlashBlobStore<F>
where
    F: ReadStorage + Storage,
{
    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, ManagerError> {
        let tag = blob_tag(namespace, key);
        Ok(self
            .newest()?
            .and_then(|(_, header, payload)| (header.tag == tag).then_some(payload)))
    }

    fn set(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), ManagerError> {
        if bytes.len() > Self::payload_capacity() {
            return Err(ManagerError::NoMemory);
        }
        let (slot, seq) = match self.newest()? {
            Some((slot, header, _)) => ((slot + 1) % SLOT_COUNT, header.seq.wrapping_add(1)),
            None => (0, 1),
        };

        let mut image = Vec::new();
        image.try_reserve_exact(BLOB_HEADER_LEN + bytes.len())?;
        image.extend_from_slice(&BLOB_STORE_MAGIC.to_le_bytes());
        image.push(BLOB_STORE_VERSION);
        image.extend_from_slice(&seq.to_le_bytes());
        image.extend_from_slice(&blob_tag(namespace, key).to_le_bytes());
        image.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
        let checksum = checksum8_continue(checksum8_continue(CHECKSUM_SEED, &image), bytes);
        image.push(checksum);
        image.extend_from_slice(bytes);

        let offset = self.slot_offset(slot);
        self.flash.write(offset, &image).map_err(|_| {
            log::warn!("wifi_store: flash write failed slot={} seq={}", slot, seq);
            ManagerError::StorageUnavailable
        })
    }
}

fn parse_header(header: &[u8; BLOB_HEADER_LEN]) -> Option<SlotHeader> {
    if u32::from_le_bytes([header[0], header[1], header[2], header[3]]) != BLOB_STORE_MAGIC {
        return None;
    }
    if header[4] != BLOB_STORE_VERSION {
        return None;
    }
    let seq = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
    let tag = u32::from_le_bytes([header[9], header[10], header[11], header[12]]);
    let len = u16::from_le_bytes([header[13], header[14]]);
    if len as usize > BLOB_SLOT_LEN as usize - BLOB_HEADER_LEN {
        return None;
    }
    Some(SlotHeader { seq, tag, len })
}

fn seq_is_newer(candidate: u32, current: u32) -> bool {
    (candidate.wrapping_sub(current) as i32) > 0
}

/// FNV-1a over `namespace \0 key`.
fn blob_tag(namespace: &str, key: &str) -> u32 {
    let mut hash = 0x811C_9DC5u32;
    for &byte in namespace
        .as_bytes()
        .iter()
        .chain(core::iter::once(&0u8))
        .chain(key.as_bytes())
    {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

const CHECKSUM_SEED: u8 = 0x5A;

fn checksum8_continue(mut acc: u8, bytes: &[u8]) -> u8 {
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_comparison_wraps() {
        assert!(seq_is_newer(2, 1));
        assert!(!seq_is_newer(1, 2));
        assert!(seq_is_newer(0, u32::MAX));
    }

    #[test]
    fn tag_separates_namespace_from_key() {
        assert_ne!(blob_tag("ab", "c"), blob_tag("a", "bc"));
        assert_eq!(blob_tag("wifi_store", "wifi_list"), blob_tag("wifi_store", "wifi_list"));
    }

    #[test]
    fn erased_header_is_not_a_slot() {
        assert!(parse_header(&[0xFF; BLOB_HEADER_LEN]).is_none());
    }
}
