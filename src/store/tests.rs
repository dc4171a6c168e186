use super::*;
use crate::test_support::{creds, MemoryFlash};

fn ssids(list: &[WifiCredentials]) -> Vec<String> {
    list.iter().map(|c| c.ssid().as_str().to_string()).collect()
}

fn store_with(list: &[WifiCredentials], capacity: usize) -> CredentialStore<MemoryBlobStore> {
    let mut store = CredentialStore::new(MemoryBlobStore::new(), capacity);
    for entry in list.iter().rev() {
        store.on_connected(entry).expect("seed");
    }
    store
}

#[test]
fn missing_key_loads_empty_list() {
    let mut store = CredentialStore::new(MemoryBlobStore::new(), 5);
    assert!(store.load_all().expect("load").is_empty());
}

#[test]
fn zero_capacity_is_raised_to_one() {
    let store = CredentialStore::new(MemoryBlobStore::new(), 0);
    assert_eq!(store.capacity(), 1);
}

#[test]
fn partial_record_blob_surfaces_corruption() {
    let mut blobs = MemoryBlobStore::new();
    blobs.insert_raw(WIFI_STORE_NAMESPACE, WIFI_STORE_KEY, &[0u8; 50]);
    let mut store = CredentialStore::new(blobs, 5);
    assert_eq!(store.load_all(), Err(ManagerError::StorageCorrupt));
    assert_eq!(
        store.on_connected(&creds("home", "pw")),
        Err(ManagerError::StorageCorrupt)
    );
}

#[test]
fn medium_fault_surfaces_unavailable() {
    let mut store = store_with(&[creds("home", "pw")], 5);
    store.blobs_mut().set_read_fault(true);
    assert_eq!(store.load_all(), Err(ManagerError::StorageUnavailable));
}

#[test]
fn promotion_moves_existing_entry_to_front() {
    let mut store = store_with(&[creds("a", "1"), creds("b", "2"), creds("c", "3")], 5);
    store.on_connected(&creds("c", "3")).expect("promote");
    assert_eq!(ssids(&store.load_all().expect("load")), ["c", "a", "b"]);
}

#[test]
fn promotion_is_idempotent() {
    let mut store = store_with(&[creds("a", "1"), creds("b", "2"), creds("c", "3")], 5);
    store.on_connected(&creds("b", "2")).expect("promote");
    let once = store.load_all().expect("load");
    store.on_connected(&creds("b", "2")).expect("promote");
    assert_eq!(store.load_all().expect("load"), once);
}

#[test]
fn promotion_refreshes_password() {
    let mut store = store_with(&[creds("a", "old"), creds("b", "2")], 5);
    store.on_connected(&creds("a", "new")).expect("promote");
    let list = store.load_all().expect("load");
    assert_eq!(list[0].password_bytes(), b"new");
    assert_eq!(list.len(), 2);
}

#[test]
fn full_list_evicts_last_entry() {
    let mut store = store_with(&[creds("c0", ""), creds("c1", ""), creds("c2", "")], 3);
    store.on_connected(&creds("new", "")).expect("promote");
    assert_eq!(ssids(&store.load_all().expect("load")), ["new", "c0", "c1"]);
}

#[test]
fn growth_stays_bounded() {
    let mut store = CredentialStore::new(MemoryBlobStore::new(), 4);
    for index in 0..12 {
        let name = format!("net{}", index);
        store.on_connected(&creds(&name, "")).expect("promote");
        let list = store.load_all().expect("load");
        assert!(list.len() <= 4);
        assert_eq!(list[0].ssid().as_str(), name);
    }
}

#[test]
fn failed_write_keeps_previous_list() {
    let mut store = store_with(&[creds("a", "1"), creds("b", "2")], 5);
    store.blobs_mut().set_write_fault(true);
    assert_eq!(
        store.on_connected(&creds("z", "9")),
        Err(ManagerError::StorageUnavailable)
    );
    store.blobs_mut().set_write_fault(false);
    assert_eq!(ssids(&store.load_all().expect("load")), ["a", "b"]);
}

#[test]
fn delete_removes_entry_and_ignores_unknown() {
    let mut store = store_with(&[creds("a", "1"), creds("b", "2"), creds("c", "3")], 5);
    store.delete_by_ssid(b"b").expect("delete");
    assert_eq!(ssids(&store.load_all().expect("load")), ["a", "c"]);

    let writes = store.blobs().writes();
    store.delete_by_ssid(b"missing").expect("delete");
    assert_eq!(store.blobs().writes(), writes);
    assert_eq!(store.delete_by_ssid(b""), Err(ManagerError::ArgumentInvalid));
}

#[test]
fn deleting_last_entry_leaves_empty_list() {
    let mut store = store_with(&[creds("only", "")], 5);
    store.delete_by_ssid(b"only").expect("delete");
    assert!(store.load_all().expect("load").is_empty());
}

#[test]
fn find_matches_whole_ssid() {
    let mut store = store_with(&[creds("office", "pw"), creds("office-5g", "pw5")], 5);
    let found = store.find(b"office").expect("find").expect("entry");
    assert_eq!(found.password_bytes(), b"pw");
    assert!(store.find(b"offic").expect("find").is_none());
}

#[test]
fn flash_store_starts_empty() {
    let mut blobs = FlashBlobStore::at_end(MemoryFlash::new(BLOB_SLOT_LEN as usize * 4));
    assert_eq!(blobs.get(WIFI_STORE_NAMESPACE, WIFI_STORE_KEY), Ok(None));
}

#[test]
fn flash_store_returns_latest_write() {
    let mut blobs = FlashBlobStore::new(MemoryFlash::new(BLOB_SLOT_LEN as usize * 2), 0);
    blobs.set("ns", "key", b"first").expect("set");
    blobs.set("ns", "key", b"second").expect("set");
    blobs.set("ns", "key", b"third").expect("set");
    assert_eq!(blobs.get("ns", "key").expect("get").as_deref(), Some(&b"third"[..]));
    assert_eq!(blobs.get("ns", "other").expect("get"), None);
}

#[test]
fn flash_store_survives_torn_write() {
    let mut blobs = FlashBlobStore::new(MemoryFlash::new(BLOB_SLOT_LEN as usize * 2), 0);
    blobs.set("ns", "key", b"stable").expect("set");
    blobs.flash_mut().tear_after = Some(BLOB_HEADER_LEN + 2);
    assert_eq!(
        blobs.set("ns", "key", b"replacement"),
        Err(ManagerError::StorageUnavailable)
    );
    assert_eq!(blobs.get("ns", "key").expect("get").as_deref(), Some(&b"stable"[..]));
}

#[test]
fn flash_store_rejects_oversized_blob() {
    let mut blobs = FlashBlobStore::new(MemoryFlash::new(BLOB_SLOT_LEN as usize * 2), 0);
    let big = vec![0u8; BLOB_SLOT_LEN as usize];
    assert_eq!(blobs.set("ns", "key", &big), Err(ManagerError::NoMemory));
}

#[test]
fn flash_read_fault_is_unavailable() {
    let mut blobs = FlashBlobStore::new(MemoryFlash::new(BLOB_SLOT_LEN as usize * 2), 0);
    blobs.flash_mut().read_fault = true;
    assert_eq!(
        blobs.get("ns", "key"),
        Err(ManagerError::StorageUnavailable)
    );
}

#[test]
fn credential_store_over_flash_keeps_mru_order() {
    let flash = FlashBlobStore::new(MemoryFlash::new(BLOB_SLOT_LEN as usize * 2), 0);
    let mut store = CredentialStore::new(flash, 5);
    store.on_connected(&creds("A", "pw1")).expect("promote");
    store.on_connected(&creds("B", "pw2")).expect("promote");
    store.on_connected(&creds("A", "pw1")).expect("promote");
    assert_eq!(ssids(&store.load_all().expect("load")), ["A", "B"]);
}
