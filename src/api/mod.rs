//! JSON routes for the provisioning page. Transport-agnostic: the caller supplies
//! method, target and body and writes back the returned [`ApiResponse`].

mod body;

use alloc::{format, string::String, vec::Vec};
use core::future::Future;

use serde::Serialize;

use crate::driver::NetworkDriver;
use crate::error::ManagerError;
use crate::manager::ConnectionManager;
use crate::runtime::ManagerHandle;
use crate::store::BlobStore;
use crate::types::{ConnectionStatus, ScanRecord, Ssid};

use body::{ConfigureBody, SsidBody};

const INDEX_HTML: &str = include_str!("index.html");

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Operations the routes need. Implemented by the manager itself for
/// single-task setups and by [`ManagerHandle`] when the manager runs behind a mailbox.
pub trait ManagerApi {
    fn status(&mut self) -> impl Future<Output = ConnectionStatus>;
    fn saved_networks(&mut self) -> impl Future<Output = Result<Vec<Ssid>, ManagerError>>;
    fn connect_to_saved(&mut self, ssid: &str) -> impl Future<Output = Result<(), ManagerError>>;
    fn forget(&mut self, ssid: &str) -> impl Future<Output = Result<(), ManagerError>>;
    fn restart_sweep(&mut self) -> impl Future<Output = ()>;
    fn join(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), ManagerError>>;
    fn scan_networks(&mut self) -> impl Future<Output = Result<Vec<ScanRecord>, ManagerError>>;
}

impl<S, D> ManagerApi for ConnectionManager<S, D>
where
    S: BlobStore,
    D: NetworkDriver,
{
    async fn status(&mut self) -> ConnectionStatus {
        self.get_status()
    }

    async fn saved_networks(&mut self) -> Result<Vec<Ssid>, ManagerError> {
        self.get_saved()
    }

    async fn connect_to_saved(&mut self, ssid: &str) -> Result<(), ManagerError> {
        self.connect_saved(ssid)
    }

    async fn forget(&mut self, ssid: &str) -> Result<(), ManagerError> {
        self.delete_saved(ssid)
    }

    async fn restart_sweep(&mut self) {
        self.reset_retry();
    }

    async fn join(&mut self, ssid: &str, password: &str) -> Result<(), ManagerError> {
        self.configure(ssid, password)
    }

    async fn scan_networks(&mut self) -> Result<Vec<ScanRecord>, ManagerError> {
        self.scan().await
    }
}

impl ManagerApi for ManagerHandle<'_> {
    async fn status(&mut self) -> ConnectionStatus {
        self.get_status().await
    }

    async fn saved_networks(&mut self) -> Result<Vec<Ssid>, ManagerError> {
        self.get_saved().await
    }

    async fn connect_to_saved(&mut self, ssid: &str) -> Result<(), ManagerError> {
        self.connect_saved(ssid).await
    }

    async fn forget(&mut self, ssid: &str) -> Result<(), ManagerError> {
        self.delete_saved(ssid).await
    }

    async fn restart_sweep(&mut self) {
        self.reset_retry().await;
    }

    async fn join(&mut self, ssid: &str, password: &str) -> Result<(), ManagerError> {
        self.configure(ssid, password).await
    }

    async fn scan_networks(&mut self) -> Result<Vec<ScanRecord>, ManagerError> {
        self.scan().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body,
        }
    }

    fn ok() -> Self {
        Self::json(200, String::from(r#"{"status":"ok"}"#))
    }

    fn error(err: ManagerError) -> Self {
        let status = match err {
            ManagerError::ArgumentInvalid => 400,
            ManagerError::NotFound => 404,
            _ => 500,
        };
        Self::json(
            status,
            to_json(&ErrorJson {
                status: "error",
                message: err.as_str(),
            }),
        )
    }

    fn not_found() -> Self {
        Self::json(
            404,
            to_json(&ErrorJson {
                status: "error",
                message: "no_route",
            }),
        )
    }

    /// HTTP/1.1 status line fragment, e.g. `200 OK`.
    pub fn status_line(&self) -> &'static str {
        match self.status {
            200 => "200 OK",
            400 => "400 Bad Request",
            404 => "404 Not Found",
            _ => "500 Internal Server Error",
        }
    }
}

#[derive(Serialize)]
struct ErrorJson {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize)]
struct NetworkJson<'a> {
    ssid: &'a str,
    rssi: i8,
}

#[derive(Serialize)]
struct ScanJson<'a> {
    status: &'static str,
    networks: Vec<NetworkJson<'a>>,
}

#[derive(Serialize)]
struct SavedJson<'a> {
    ssid: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum StatusJson<'a> {
    Connected {
        ssid: &'a str,
        ip: String,
        rssi: i8,
        bssid: String,
    },
    Disconnected,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        log::error!("wifi_api: encode failed err={}", err);
        String::from(r#"{"status":"error","message":"no_memory"}"#)
    })
}

fn format_bssid(bssid: &[u8; 6]) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        bssid[0], bssid[1], bssid[2], bssid[3], bssid[4], bssid[5]
    )
}

/// Routes one request. `target` may carry a query string, which is ignored.
pub async fn dispatch<A: ManagerApi>(
    api: &mut A,
    method: &str,
    target: &str,
    body: &[u8],
) -> ApiResponse {
    let path = target.split('?').next().unwrap_or(target);
    let response = match (method, path) {
        ("GET", "/") => ApiResponse {
            status: 200,
            content_type: CONTENT_TYPE_HTML,
            body: String::from(INDEX_HTML),
        },
        ("GET", "/scan") => scan(api).await,
        ("POST", "/configure") => configure(api, body).await,
        ("GET", "/api/status") => status(api).await,
        ("GET", "/api/saved") => saved(api).await,
        ("POST", "/api/connect") => match SsidBody::parse(body) {
            Ok(ssid) => done(api.connect_to_saved(&ssid).await),
            Err(err) => ApiResponse::error(err),
        },
        ("POST", "/api/delete") => match SsidBody::parse(body) {
            Ok(ssid) => done(api.forget(&ssid).await),
            Err(err) => ApiResponse::error(err),
        },
        ("POST", "/api/reset_retry") => {
            api.restart_sweep().await;
            ApiResponse::ok()
        }
        _ => ApiResponse::not_found(),
    };
    log::debug!(
        "wifi_api: {} {} status={}",
        method,
        path,
        response.status
    );
    response
}

fn done(result: Result<(), ManagerError>) -> ApiResponse {
    match result {
        Ok(()) => ApiResponse::ok(),
        Err(err) => ApiResponse::error(err),
    }
}

async fn scan<A: ManagerApi>(api: &mut A) -> ApiResponse {
    let records = match api.scan_networks().await {
        Ok(records) => records,
        Err(err) => return ApiResponse::error(err),
    };
    let networks = records
        .iter()
        .filter(|record| !record.ssid.is_empty())
        .map(|record| NetworkJson {
            ssid: record.ssid.as_str(),
            rssi: record.rssi,
        })
        .collect();
    ApiResponse::json(
        200,
        to_json(&ScanJson {
            status: "ok",
            networks,
        }),
    )
}

async fn configure<A: ManagerApi>(api: &mut A, body: &[u8]) -> ApiResponse {
    let request = match ConfigureBody::parse(body) {
        Ok(request) => request,
        Err(err) => return ApiResponse::error(err),
    };
    done(api.join(&request.ssid, &request.password).await)
}

async fn status<A: ManagerApi>(api: &mut A) -> ApiResponse {
    let body = match api.status().await {
        ConnectionStatus::Connected(link) => to_json(&StatusJson::Connected {
            ssid: link.ssid.as_str(),
            ip: format!("{}", link.ip),
            rssi: link.rssi,
            bssid: format_bssid(&link.bssid),
        }),
        ConnectionStatus::Disconnected => to_json(&StatusJson::Disconnected),
    };
    ApiResponse::json(200, body)
}

async fn saved<A: ManagerApi>(api: &mut A) -> ApiResponse {
    match api.saved_networks().await {
        Ok(list) => {
            let entries: Vec<SavedJson<'_>> = list
                .iter()
                .filter(|ssid| !ssid.is_empty())
                .map(|ssid| SavedJson {
                    ssid: ssid.as_str(),
                })
                .collect();
            ApiResponse::json(200, to_json(&entries))
        }
        Err(err) => ApiResponse::error(err),
    }
}
