//! ESP32 bring-up: radio, network stacks, flash-backed credential store and the
//! tasks that feed the manager mailbox.

mod dhcp;
mod http;
mod radio;

use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Instant, Ticker};
use esp_hal::{rng::Rng, timer::timg::TimerGroup};
use esp_radio::wifi::{InternalWifiError, WifiController, WifiDevice, WifiError};
use esp_storage::FlashStorage;
use static_cell::StaticCell;

use self::http::HTTP_RW_BUF;
use self::radio::RadioDriver;
use crate::config::{compiled_credentials, ManagerConfig};
use crate::driver::DriverEvent;
use crate::manager::ConnectionManager;
use crate::runtime::{ManagerMailbox, ManagerRuntime};
use crate::store::FlashBlobStore;
use crate::types::{ConnectionState, WifiCredentials};

const HEAP_BYTES: usize = 72 * 1024;
const NET_SOCKETS: usize = 4;

pub(crate) static MAILBOX: ManagerMailbox = ManagerMailbox::new();

type FirmwareStore = FlashBlobStore<FlashStorage<'static>>;
type FirmwareRuntime = ManagerRuntime<'static, FirmwareStore, RadioDriver>;

struct NetStacks {
    controller: WifiController<'static>,
    sta: (Stack<'static>, Runner<'static, WifiDevice<'static>>),
    ap: (Stack<'static>, Runner<'static, WifiDevice<'static>>),
}

pub fn run() -> ! {
    esp_println::logger::init_logger(log::LevelFilter::Info);
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(size: HEAP_BYTES);
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let config = ManagerConfig::from_env();
    log::info!(
        "wifi_manager: boot ap_ssid={} save_count={} reconnect_ms={}",
        config.ap_ssid.as_str(),
        config.save_count,
        config.reconnect_interval_ms
    );

    let flash = FlashStorage::new(peripherals.FLASH).multicore_auto_park();
    let store = FlashBlobStore::at_end(flash);

    let stacks = match setup_network(peripherals.WIFI, &config) {
        Ok(stacks) => stacks,
        Err(err) => {
            log::error!("wifi_manager: network setup failed err={}", err);
            halt_forever();
        }
    };

    let manager = ConnectionManager::new(config.clone(), store, RadioDriver)
        .with_listener(log_state_change);
    let runtime = ManagerRuntime::new(manager, &MAILBOX);
    let ap_config = radio::access_point_config(&config);
    let (sta_stack, sta_runner) = stacks.sta;
    let (ap_stack, ap_runner) = stacks.ap;

    static HTTP_BUFFERS: StaticCell<[[u8; HTTP_RW_BUF]; 4]> = StaticCell::new();
    let [sta_rx, sta_tx, ap_rx, ap_tx] = HTTP_BUFFERS.init([[0u8; HTTP_RW_BUF]; 4]);

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(manager_task(runtime));
        spawner.must_spawn(radio_task(stacks.controller, ap_config));
        spawner.must_spawn(net_task(sta_runner));
        spawner.must_spawn(net_task(ap_runner));
        spawner.must_spawn(address_watch_task(sta_stack));
        spawner.must_spawn(tick_task(config.step_interval_ms));
        spawner.must_spawn(http_task(sta_stack, config.web_port, sta_rx, sta_tx));
        spawner.must_spawn(http_task(ap_stack, config.web_port, ap_rx, ap_tx));
        spawner.must_spawn(dhcp_task(ap_stack, config.ap_ip));
        if let Some(credentials) = compiled_credentials() {
            spawner.must_spawn(compiled_credentials_task(credentials));
        }
    });
}

fn setup_network(
    wifi: esp_hal::peripherals::WIFI<'static>,
    config: &ManagerConfig,
) -> Result<NetStacks, &'static str> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STA_RESOURCES: StaticCell<StackResources<NET_SOCKETS>> = StaticCell::new();
    static AP_RESOURCES: StaticCell<StackResources<NET_SOCKETS>> = StaticCell::new();

    let radio_ctrl = esp_radio::init().map_err(|err| {
        log::error!("wifi_manager: esp_radio::init err={:?}", err);
        "esp_radio::init failed"
    })?;
    let radio_ctrl = RADIO_CTRL.init(radio_ctrl);
    let (controller, ifaces) = esp_radio::wifi::new(radio_ctrl, wifi, radio::wifi_runtime_config())
        .map_err(|err| match err {
            WifiError::InvalidArguments => "wifi init failed invalid_args",
            WifiError::Unsupported => "wifi init failed unsupported",
            WifiError::NotInitialized => "wifi init failed not_initialized",
            WifiError::InternalError(InternalWifiError::NoMem) => "wifi init failed no_mem",
            _ => "wifi init failed other",
        })?;

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let sta = embassy_net::new(
        ifaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STA_RESOURCES.init(StackResources::<NET_SOCKETS>::new()),
        seed,
    );
    let ap = embassy_net::new(
        ifaces.ap,
        embassy_net::Config::ipv4_static(embassy_net::StaticConfigV4 {
            address: embassy_net::Ipv4Cidr::new(config.ap_ip, 24),
            gateway: Some(config.ap_ip),
            dns_servers: Default::default(),
        }),
        AP_RESOURCES.init(StackResources::<NET_SOCKETS>::new()),
        seed.rotate_left(17),
    );

    Ok(NetStacks { controller, sta, ap })
}

fn log_state_change(state: ConnectionState) {
    log::info!("wifi_manager: listener state={}", state.as_str());
}

#[embassy_executor::task]
async fn manager_task(mut runtime: FirmwareRuntime) {
    runtime.run().await
}

#[embassy_executor::task]
async fn radio_task(
    controller: WifiController<'static>,
    ap: esp_radio::wifi::AccessPointConfig,
) {
    radio::run_radio(controller, ap).await
}

#[embassy_executor::task(pool_size = 2)]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

#[embassy_executor::task(pool_size = 2)]
async fn http_task(
    stack: Stack<'static>,
    port: u16,
    rx_buffer: &'static mut [u8; HTTP_RW_BUF],
    tx_buffer: &'static mut [u8; HTTP_RW_BUF],
) {
    http::run_http_server(stack, port, rx_buffer, tx_buffer).await
}

#[embassy_executor::task]
async fn dhcp_task(stack: Stack<'static>, address: core::net::Ipv4Addr) {
    dhcp::run_dhcp_server(stack, address).await
}

#[embassy_executor::task]
async fn address_watch_task(stack: Stack<'static>) {
    loop {
        stack.wait_config_up().await;
        let ip = stack.config_v4().map(|cfg| cfg.address.address());
        radio::record_address(ip);
        if let Some(ip) = ip {
            log::info!("wifi_manager: got ip={}", ip);
        }
        MAILBOX.send_driver_event(DriverEvent::GotIp).await;
        stack.wait_config_down().await;
        radio::record_address(None);
    }
}

#[embassy_executor::task]
async fn tick_task(step_interval_ms: u32) {
    let mut ticker = Ticker::every(Duration::from_millis(step_interval_ms as u64));
    loop {
        ticker.next().await;
        MAILBOX.post_tick(Instant::now().as_millis());
    }
}

#[embassy_executor::task]
async fn compiled_credentials_task(credentials: WifiCredentials) {
    if let Err(err) = MAILBOX.handle().configure_credentials(credentials).await {
        log::warn!("wifi_manager: compiled credentials refused err={}", err);
    }
}

unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}

fn halt_forever() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
