use alloc::vec::Vec;

use crate::error::ManagerError;
use crate::types::{WifiCredentials, CREDENTIAL_RECORD_LEN, WIFI_PASSWORD_MAX, WIFI_SSID_MAX};

const SSID_LEN_AT: usize = WIFI_SSID_MAX;
const PASSWORD_AT: usize = WIFI_SSID_MAX + 1;
const PASSWORD_LEN_AT: usize = PASSWORD_AT + WIFI_PASSWORD_MAX;

pub(super) fn encode_record(credentials: &WifiCredentials) -> [u8; CREDENTIAL_RECORD_LEN] {
    let mut record = [0u8; CREDENTIAL_RECORD_LEN];
    record[..WIFI_SSID_MAX].copy_from_slice(&credentials.ssid);
    record[SSID_LEN_AT] = credentials.ssid_len;
    record[PASSWORD_AT..PASSWORD_LEN_AT].copy_from_slice(&credentials.password);
    record[PASSWORD_LEN_AT] = credentials.password_len;
    record
}

pub(super) fn decode_record(record: &[u8]) -> Result<WifiCredentials, ManagerError> {
    if record.len() != CREDENTIAL_RECORD_LEN {
        return Err(ManagerError::StorageCorrupt);
    }
    let ssid_len = record[SSID_LEN_AT];
    let password_len = record[PASSWORD_LEN_AT];
    if ssid_len as usize > WIFI_SSID_MAX || password_len as usize > WIFI_PASSWORD_MAX {
        return Err(ManagerError::StorageCorrupt);
    }
    let mut credentials = WifiCredentials::empty();
    credentials.ssid.copy_from_slice(&record[..WIFI_SSID_MAX]);
    credentials.ssid_len = ssid_len;
    credentials
        .password
        .copy_from_slice(&record[PASSWORD_AT..PASSWORD_LEN_AT]);
    credentials.password_len = password_len;
    Ok(credentials)
}

pub(crate) fn encode_list(list: &[WifiCredentials]) -> Result<Vec<u8>, ManagerError> {
    let mut blob = Vec::new();
    blob.try_reserve_exact(list.len() * CREDENTIAL_RECORD_LEN)?;
    for credentials in list {
        blob.extend_from_slice(&encode_record(credentials));
    }
    Ok(blob)
}

/// Decodes at most `capacity` records; extra stored records are ignored.
/// An empty blob is the list left behind after the last entry was deleted.
pub(super) fn decode_list(
    blob: &[u8],
    capacity: usize,
) -> Result<Vec<WifiCredentials>, ManagerError> {
    if blob.len() % CREDENTIAL_RECORD_LEN != 0 {
        return Err(ManagerError::StorageCorrupt);
    }
    let count = (blob.len() / CREDENTIAL_RECORD_LEN).min(capacity);
    let mut list = Vec::new();
    list.try_reserve_exact(count)?;
    for record in blob.chunks_exact(CREDENTIAL_RECORD_LEN).take(count) {
        list.push(decode_record(record)?);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout_is_fixed_width() {
        let creds = WifiCredentials::new("home", "secret").expect("credentials");
        let record = encode_record(&creds);
        assert_eq!(&record[..4], b"home");
        assert!(record[4..WIFI_SSID_MAX].iter().all(|&b| b == 0));
        assert_eq!(record[SSID_LEN_AT], 4);
        assert_eq!(&record[PASSWORD_AT..PASSWORD_AT + 6], b"secret");
        assert_eq!(record[PASSWORD_LEN_AT], 6);
        assert_eq!(decode_record(&record).expect("decode"), creds);
    }

    #[test]
    fn blob_of_partial_record_is_corrupt() {
        let creds = WifiCredentials::new("home", "").expect("credentials");
        let mut blob = encode_list(&[creds]).expect("encode");
        blob.pop();
        assert_eq!(decode_list(&blob, 5), Err(ManagerError::StorageCorrupt));
        assert!(decode_list(&[], 5).expect("empty").is_empty());
    }

    #[test]
    fn oversized_length_byte_is_corrupt() {
        let creds = WifiCredentials::new("home", "").expect("credentials");
        let mut record = encode_record(&creds);
        record[SSID_LEN_AT] = (WIFI_SSID_MAX + 1) as u8;
        assert!(matches!(
            decode_record(&record),
            Err(ManagerError::StorageCorrupt)
        ));
    }

    #[test]
    fn decode_truncates_to_capacity() {
        let list = [
            WifiCredentials::new("a", "").expect("credentials"),
            WifiCredentials::new("b", "").expect("credentials"),
            WifiCredentials::new("c", "").expect("credentials"),
        ];
        let blob = encode_list(&list).expect("encode");
        let decoded = decode_list(&blob, 2).expect("decode");
        assert_eq!(decoded.as_slice(), &list[..2]);
    }
}
