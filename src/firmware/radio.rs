use alloc::vec::Vec;
use core::cell::RefCell;
use core::net::Ipv4Addr;
use core::sync::atomic::{AtomicBool, AtomicI8, Ordering};

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex as BlockingMutex},
    channel::Channel,
};
use embassy_time::{with_timeout, Duration};
use esp_radio::wifi::{
    event::{self, EventExt},
    AccessPointConfig, AuthMethod, ClientConfig, Config as WifiRuntimeConfig, ModeConfig,
    ScanConfig, ScanMethod, ScanTypeConfig, WifiController,
};

use super::MAILBOX;
use crate::config::ManagerConfig;
use crate::driver::{DriverEvent, NetworkDriver};
use crate::error::ManagerError;
use crate::types::{ssid_from_bytes, LinkInfo, ScanRecord, Ssid, WifiCredentials};

const WIFI_RX_QUEUE_SIZE: usize = 3;
const WIFI_TX_QUEUE_SIZE: usize = 2;
const WIFI_STATIC_RX_BUF_NUM: u8 = 4;
const WIFI_DYNAMIC_RX_BUF_NUM: u16 = 8;
const WIFI_DYNAMIC_TX_BUF_NUM: u16 = 8;
const WIFI_RX_BA_WIN: u8 = 3;
const WIFI_SCAN_MAX_APS: usize = 16;
const WIFI_SCAN_ACTIVE_MIN_MS: u64 = 80;
const WIFI_SCAN_ACTIVE_MAX_MS: u64 = 240;
const WIFI_SCAN_REPLY_TIMEOUT_MS: u64 = 15_000;
const RADIO_COMMAND_DEPTH: usize = 2;

enum RadioCommand {
    Connect(WifiCredentials),
    Scan,
}

#[derive(Clone)]
struct LinkCache {
    ssid: Ssid,
    bssid: [u8; 6],
    rssi: i8,
    ip: Option<Ipv4Addr>,
}

static RADIO_COMMANDS: Channel<CriticalSectionRawMutex, RadioCommand, RADIO_COMMAND_DEPTH> =
    Channel::new();
static SCAN_RESULTS: Channel<CriticalSectionRawMutex, Result<Vec<ScanRecord>, ManagerError>, 1> =
    Channel::new();
static LINK: BlockingMutex<CriticalSectionRawMutex, RefCell<Option<LinkCache>>> =
    BlockingMutex::new(RefCell::new(None));
static ATTEMPT_IN_FLIGHT: AtomicBool = AtomicBool::new(false);
static SUPPRESS_DISCONNECT: AtomicBool = AtomicBool::new(false);
static TARGET_RSSI: AtomicI8 = AtomicI8::new(0);
static EVENT_HANDLERS_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Manager-side half of the radio. Requests are queued to [`run_radio`], which
/// owns the controller; outcomes come back through the manager mailbox.
pub(crate) struct RadioDriver;

impl NetworkDriver for RadioDriver {
    fn connect(&mut self, credentials: &WifiCredentials) -> Result<(), ManagerError> {
        if core::str::from_utf8(credentials.ssid_bytes()).is_err()
            || credentials.password_str().is_none()
        {
            return Err(ManagerError::ArgumentInvalid);
        }
        RADIO_COMMANDS
            .try_send(RadioCommand::Connect(*credentials))
            .map_err(|_| ManagerError::DriverUnavailable)
    }

    async fn scan(&mut self) -> Result<Vec<ScanRecord>, ManagerError> {
        while SCAN_RESULTS.try_receive().is_ok() {}
        RADIO_COMMANDS.send(RadioCommand::Scan).await;
        with_timeout(
            Duration::from_millis(WIFI_SCAN_REPLY_TIMEOUT_MS),
            SCAN_RESULTS.receive(),
        )
        .await
        .unwrap_or(Err(ManagerError::DriverUnavailable))
    }

    fn link_info(&self) -> Option<LinkInfo> {
        LINK.lock(|link| {
            let link = link.borrow();
            let cache = link.as_ref()?;
            Some(LinkInfo {
                ssid: cache.ssid.clone(),
                rssi: cache.rssi,
                bssid: cache.bssid,
                ip: cache.ip?,
            })
        })
    }
}

pub(super) fn wifi_runtime_config() -> WifiRuntimeConfig {
    WifiRuntimeConfig::default()
        .with_rx_queue_size(WIFI_RX_QUEUE_SIZE)
        .with_tx_queue_size(WIFI_TX_QUEUE_SIZE)
        .with_static_rx_buf_num(WIFI_STATIC_RX_BUF_NUM)
        .with_dynamic_rx_buf_num(WIFI_DYNAMIC_RX_BUF_NUM)
        .with_dynamic_tx_buf_num(WIFI_DYNAMIC_TX_BUF_NUM)
        .with_ampdu_rx_enable(false)
        .with_ampdu_tx_enable(false)
        .with_rx_ba_win(WIFI_RX_BA_WIN)
}

pub(super) fn access_point_config(config: &ManagerConfig) -> AccessPointConfig {
    let auth_method = if config.ap_password.len() >= 8 {
        AuthMethod::Wpa2Personal
    } else {
        AuthMethod::None
    };
    AccessPointConfig::default()
        .with_ssid(config.ap_ssid.as_str().into())
        .with_password(config.ap_password.as_str().into())
        .with_auth_method(auth_method)
}

/// Called by the address watcher once DHCP has configured the station.
pub(super) fn record_address(ip: Option<Ipv4Addr>) {
    LINK.lock(|link| {
        if let Some(cache) = link.borrow_mut().as_mut() {
            cache.ip = ip;
        }
    });
}

pub(super) async fn run_radio(mut controller: WifiController<'static>, ap: AccessPointConfig) {
    install_event_handlers();

    let idle = ModeConfig::ApSta(ClientConfig::default(), ap.clone());
    if let Err(err) = controller.set_config(&idle) {
        log::error!("wifi_radio: ap config err={:?}", err);
    }
    if let Err(err) = controller.start_async().await {
        log::error!("wifi_radio: start err={:?}", err);
    }
    log::info!("wifi_radio: started");

    loop {
        match RADIO_COMMANDS.receive().await {
            RadioCommand::Connect(credentials) => connect(&mut controller, &ap, credentials).await,
            RadioCommand::Scan => {
                let result = scan(&mut controller).await;
                if SCAN_RESULTS.try_send(result).is_err() {
                    log::warn!("wifi_radio: scan result dropped");
                }
            }
        }
    }
}

async fn connect(
    controller: &mut WifiController<'static>,
    ap: &AccessPointConfig,
    credentials: WifiCredentials,
) {
    if matches!(controller.is_connected(), Ok(true)) {
        SUPPRESS_DISCONNECT.store(true, Ordering::Release);
        let _ = controller.disconnect_async().await;
        SUPPRESS_DISCONNECT.store(false, Ordering::Release);
    }

    let Some(mode) = mode_config(&credentials, ap) else {
        post(DriverEvent::AssociateFailed);
        return;
    };
    if let Err(err) = controller.set_config(&mode) {
        log::warn!("wifi_radio: station config err={:?}", err);
        post(DriverEvent::AssociateFailed);
        return;
    }

    TARGET_RSSI.store(target_rssi(controller, &credentials).await, Ordering::Relaxed);
    ATTEMPT_IN_FLIGHT.store(true, Ordering::Release);
    log::info!(
        "wifi_radio: connecting ssid={}",
        credentials.ssid().as_str()
    );
    if let Err(err) = controller.connect_async().await {
        log::warn!("wifi_radio: connect err={:?}", err);
        if ATTEMPT_IN_FLIGHT.swap(false, Ordering::AcqRel) {
            post(DriverEvent::AssociateFailed);
        }
    }
}

fn mode_config(credentials: &WifiCredentials, ap: &AccessPointConfig) -> Option<ModeConfig> {
    let ssid = core::str::from_utf8(credentials.ssid_bytes()).ok()?;
    let password = credentials.password_str()?;
    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    let client = ClientConfig::default()
        .with_ssid(ssid.into())
        .with_password(password.into())
        .with_auth_method(auth_method)
        .with_scan_method(ScanMethod::AllChannels);
    Some(ModeConfig::ApSta(client, ap.clone()))
}

fn scan_config(target_ssid: Option<&str>) -> ScanConfig<'_> {
    let config = ScanConfig::default()
        .with_show_hidden(false)
        .with_max(WIFI_SCAN_MAX_APS)
        .with_scan_type(ScanTypeConfig::Active {
            min: Duration::from_millis(WIFI_SCAN_ACTIVE_MIN_MS).into(),
            max: Duration::from_millis(WIFI_SCAN_ACTIVE_MAX_MS).into(),
        });
    match target_ssid {
        Some(ssid) => config.with_ssid(ssid),
        None => config,
    }
}

async fn scan(controller: &mut WifiController<'static>) -> Result<Vec<ScanRecord>, ManagerError> {
    let results = controller
        .scan_with_config_async(scan_config(None))
        .await
        .map_err(|err| {
            log::warn!("wifi_radio: scan err={:?}", err);
            ManagerError::DriverUnavailable
        })?;
    let mut records = Vec::new();
    records.try_reserve_exact(results.len())?;
    records.extend(results.iter().map(|ap| ScanRecord {
        ssid: ssid_from_bytes(ap.ssid.as_bytes()),
        rssi: ap.signal_strength,
    }));
    log::info!("wifi_radio: scan found={}", records.len());
    Ok(records)
}

async fn target_rssi(controller: &mut WifiController<'static>, credentials: &WifiCredentials) -> i8 {
    let Ok(ssid) = core::str::from_utf8(credentials.ssid_bytes()) else {
        return 0;
    };
    match controller.scan_with_config_async(scan_config(Some(ssid))).await {
        Ok(results) => results
            .iter()
            .filter(|ap| ap.ssid == ssid)
            .map(|ap| ap.signal_strength)
            .max()
            .unwrap_or(0),
        Err(_) => 0,
    }
}

fn post(event: DriverEvent) {
    let _ = MAILBOX.try_send_driver_event(event);
}

fn install_event_handlers() {
    if EVENT_HANDLERS_INSTALLED.swap(true, Ordering::Relaxed) {
        return;
    }

    event::StaConnected::update_handler(|event| {
        let ssid_len = (event.ssid_len() as usize).min(event.ssid().len());
        let cache = LinkCache {
            ssid: ssid_from_bytes(&event.ssid()[..ssid_len]),
            bssid: event.bssid(),
            rssi: TARGET_RSSI.load(Ordering::Relaxed),
            ip: None,
        };
        log::info!(
            "wifi_radio: sta_connected ssid={} channel={}",
            cache.ssid.as_str(),
            event.channel()
        );
        LINK.lock(|link| *link.borrow_mut() = Some(cache));
        ATTEMPT_IN_FLIGHT.store(false, Ordering::Release);
        post(DriverEvent::AssociateOk);
    });

    event::StaDisconnected::update_handler(|event| {
        LINK.lock(|link| *link.borrow_mut() = None);
        if SUPPRESS_DISCONNECT.load(Ordering::Acquire) {
            return;
        }
        let reason = event.reason();
        let outcome = if ATTEMPT_IN_FLIGHT.swap(false, Ordering::AcqRel) {
            DriverEvent::AssociateFailed
        } else {
            DriverEvent::LinkDown
        };
        log::info!(
            "wifi_radio: sta_disconnected reason={} ({}) outcome={}",
            reason,
            disconnect_reason_label(reason),
            outcome.as_str()
        );
        post(outcome);
    });
}

fn disconnect_reason_label(reason: u8) -> &'static str {
    match reason {
        200 => "beacon_timeout",
        201 => "no_ap_found",
        202 => "auth_fail",
        203 => "assoc_fail",
        204 => "handshake_timeout",
        205 => "connection_fail",
        210 => "no_ap_found_compatible_security",
        211 => "no_ap_found_authmode_threshold",
        212 => "no_ap_found_rssi_threshold",
        _ => "other",
    }
}
