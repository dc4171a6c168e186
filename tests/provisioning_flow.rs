//! End-to-end host run of the public API: a fake radio, the in-memory blob store,
//! the JSON routes and the mailbox runtime.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use embassy_futures::{block_on, select::select, select::Either};
use serde_json::{json, Value};
use wifi_manager::api::{dispatch, ManagerApi};
use wifi_manager::runtime::{ManagerMailbox, ManagerRuntime};
use wifi_manager::types::ssid_from_bytes;
use wifi_manager::{
    ConnectionManager, ConnectionState, DriverEvent, LinkInfo, ManagerConfig, ManagerError,
    MemoryBlobStore, NetworkDriver, ScanRecord, WifiCredentials,
};

/// Radio that only knows which networks are in range.
struct FakeRadio {
    in_range: HashSet<&'static str>,
    pending: Option<WifiCredentials>,
    associated: Option<WifiCredentials>,
}

impl FakeRadio {
    fn with_networks(names: &[&'static str]) -> Self {
        Self {
            in_range: names.iter().copied().collect(),
            pending: None,
            associated: None,
        }
    }

    /// Completes the pending request the way a real radio would report it.
    fn settle(&mut self) -> Vec<DriverEvent> {
        let Some(request) = self.pending.take() else {
            return Vec::new();
        };
        let name = std::str::from_utf8(request.ssid_bytes()).expect("utf8 ssid");
        if self.in_range.contains(name) {
            self.associated = Some(request);
            vec![DriverEvent::AssociateOk, DriverEvent::GotIp]
        } else {
            vec![DriverEvent::AssociateFailed]
        }
    }
}

impl NetworkDriver for FakeRadio {
    fn connect(&mut self, credentials: &WifiCredentials) -> Result<(), ManagerError> {
        self.associated = None;
        self.pending = Some(*credentials);
        Ok(())
    }

    async fn scan(&mut self) -> Result<Vec<ScanRecord>, ManagerError> {
        let mut names: Vec<_> = self.in_range.iter().copied().collect();
        names.sort_unstable();
        Ok(names
            .into_iter()
            .map(|name| ScanRecord {
                ssid: ssid_from_bytes(name.as_bytes()),
                rssi: -60,
            })
            .collect())
    }

    fn link_info(&self) -> Option<LinkInfo> {
        self.associated.map(|credentials| LinkInfo {
            ssid: credentials.ssid(),
            rssi: -60,
            bssid: [0xAA, 0xBB, 0xCC, 0x00, 0x11, 0x22],
            ip: Ipv4Addr::new(10, 0, 0, 7),
        })
    }
}

type Manager = ConnectionManager<MemoryBlobStore, FakeRadio>;

fn manager(radio: FakeRadio) -> Manager {
    let config = ManagerConfig {
        save_count: 3,
        connect_timeout_ms: 0,
        ..ManagerConfig::default()
    };
    ConnectionManager::new(config, MemoryBlobStore::new(), radio)
}

fn settle(manager: &mut Manager) {
    for event in manager.driver_mut().settle() {
        manager.handle_driver_event(event);
    }
}

fn call<A: ManagerApi>(api: &mut A, method: &str, path: &str, body: Value) -> (u16, Value) {
    let body = if body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(&body).expect("encode body")
    };
    let response = block_on(dispatch(api, method, path, &body));
    let value = serde_json::from_str(&response.body).expect("json response");
    (response.status, value)
}

#[test]
fn provisioned_network_is_remembered_and_reused() {
    let mut manager = manager(FakeRadio::with_networks(&["home"]));

    let (status, _) = call(
        &mut manager,
        "POST",
        "/configure",
        json!({"ssid": "home", "password": "hunter22"}),
    );
    assert_eq!(status, 200);
    settle(&mut manager);
    assert_eq!(manager.state(), ConnectionState::Connected);

    let (_, saved) = call(&mut manager, "GET", "/api/saved", Value::Null);
    assert_eq!(saved, json!([{"ssid": "home"}]));
    let (_, link) = call(&mut manager, "GET", "/api/status", Value::Null);
    assert_eq!(link["ip"], "10.0.0.7");

    // Link loss restarts the sweep, which finds the saved entry again.
    manager.handle_driver_event(DriverEvent::LinkDown);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    manager.tick(1_000);
    settle(&mut manager);
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[test]
fn sweep_skips_networks_out_of_range() {
    let store = {
        let mut seed = manager(FakeRadio::with_networks(&["office", "home"]));
        for name in ["office", "home"] {
            seed.configure(name, "pw").expect("configure");
            settle(&mut seed);
        }
        seed.handle_driver_event(DriverEvent::LinkDown);
        seed
    };
    // Most recent first: home, then office.
    let mut manager = store;
    manager.driver_mut().in_range = ["office"].into_iter().collect();

    manager.tick(1_000);
    settle(&mut manager);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.snapshot().try_index, 1);

    manager.tick(2_000);
    settle(&mut manager);
    assert_eq!(manager.state(), ConnectionState::Connected);
    let saved: Vec<_> = manager
        .get_saved()
        .expect("saved")
        .iter()
        .map(|ssid| ssid.as_str().to_owned())
        .collect();
    assert_eq!(saved, ["office", "home"]);
}

#[test]
fn nothing_in_range_parks_until_interval() {
    let mut manager = manager(FakeRadio::with_networks(&["home"]));
    manager.configure("home", "pw").expect("configure");
    settle(&mut manager);
    manager.handle_driver_event(DriverEvent::LinkDown);
    manager.driver_mut().in_range.clear();

    manager.tick(1_000);
    settle(&mut manager);
    manager.tick(2_000);
    assert_eq!(manager.state(), ConnectionState::ConnectFailed);

    manager.tick(5_000);
    assert_eq!(manager.state(), ConnectionState::ConnectFailed);
    manager.tick(12_000);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[test]
fn save_count_bounds_the_list() {
    let mut manager = manager(FakeRadio::with_networks(&["a", "b", "c", "d"]));
    for name in ["a", "b", "c", "d"] {
        manager.configure(name, "pw").expect("configure");
        settle(&mut manager);
    }
    let saved: Vec<_> = manager
        .get_saved()
        .expect("saved")
        .iter()
        .map(|ssid| ssid.as_str().to_owned())
        .collect();
    assert_eq!(saved, ["d", "c", "b"]);
}

#[test]
fn routes_work_through_the_mailbox() {
    let mailbox = ManagerMailbox::new();
    let mut runtime = ManagerRuntime::new(manager(FakeRadio::with_networks(&["cafe"])), &mailbox);
    let mut handle = mailbox.handle();

    let client = async {
        let scan = block_on_api(&mut handle, "GET", "/scan").await;
        let configured = {
            let body = serde_json::to_vec(&json!({"ssid": "cafe"})).expect("encode body");
            dispatch(&mut handle, "POST", "/configure", &body).await
        };
        (scan, configured.status)
    };
    let (scan, configured) = match block_on(select(runtime.run(), client)) {
        Either::First(()) => unreachable!("runtime loop returned"),
        Either::Second(value) => value,
    };

    assert_eq!(
        scan,
        json!({"status": "ok", "networks": [{"ssid": "cafe", "rssi": -60}]})
    );
    assert_eq!(configured, 200);
    assert_eq!(
        runtime.manager().driver().pending.map(|c| c.ssid()),
        Some(ssid_from_bytes(b"cafe"))
    );
}

async fn block_on_api<A: ManagerApi>(api: &mut A, method: &str, path: &str) -> Value {
    let response = dispatch(api, method, path, b"").await;
    serde_json::from_str(&response.body).expect("json response")
}
