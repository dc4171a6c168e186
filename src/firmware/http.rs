use embassy_net::{tcp::TcpSocket, IpListenEndpoint, Stack};
use embassy_time::{with_timeout, Duration};

mod helpers;

use helpers::{find_header_end, parse_content_length, parse_request_line, write_response};

use super::MAILBOX;
use crate::api::{self, CONTENT_TYPE_JSON};

const HTTP_HEADER_MAX: usize = 1024;
const HTTP_BODY_MAX: usize = 256;
pub(super) const HTTP_RW_BUF: usize = 2048;
const HTTP_SOCKET_TIMEOUT_SECS: u64 = 20;

pub(super) async fn run_http_server(
    stack: Stack<'static>,
    port: u16,
    rx_buffer: &'static mut [u8; HTTP_RW_BUF],
    tx_buffer: &'static mut [u8; HTTP_RW_BUF],
) {
    stack.wait_config_up().await;
    if let Some(cfg) = stack.config_v4() {
        log::info!(
            "wifi_http: listening addr={}:{}",
            cfg.address.address(),
            port
        );
    }

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer[..], &mut tx_buffer[..]);
        socket.set_timeout(Some(Duration::from_secs(HTTP_SOCKET_TIMEOUT_SECS)));

        let accepted = socket.accept(IpListenEndpoint { addr: None, port }).await;
        if let Err(err) = accepted {
            log::warn!("wifi_http: accept err={:?}", err);
            continue;
        }

        if let Err(err) = handle_connection(&mut socket).await {
            log::warn!("wifi_http: request err={}", err);
        }

        let _ = with_timeout(Duration::from_millis(250), socket.flush()).await;
        socket.close();
    }
}

async fn handle_connection(socket: &mut TcpSocket<'_>) -> Result<(), &'static str> {
    let mut buf = [0u8; HTTP_HEADER_MAX];
    let mut filled = 0usize;
    let header_end = loop {
        if filled == HTTP_HEADER_MAX {
            reject(socket, "413 Payload Too Large", "header_too_large").await;
            return Err("header too large");
        }

        let n = socket
            .read(&mut buf[filled..])
            .await
            .map_err(|_| "read")?;
        if n == 0 {
            return Err("eof");
        }
        filled += n;

        if let Some(end) = find_header_end(&buf[..filled]) {
            break end;
        }
    };

    let header = core::str::from_utf8(&buf[..header_end]).map_err(|_| "header utf8")?;
    let (method, target) = parse_request_line(header).ok_or("bad request line")?;
    let content_length = match parse_content_length(header) {
        Ok(value) => value.unwrap_or(0),
        Err(err) => {
            reject(socket, "400 Bad Request", "argument_invalid").await;
            return Err(err);
        }
    };
    if content_length > HTTP_BODY_MAX {
        reject(socket, "413 Payload Too Large", "body_too_large").await;
        return Err("body too large");
    }

    // Part of the body may have arrived with the header.
    let body_start = header_end + 4;
    let mut body = [0u8; HTTP_BODY_MAX];
    let in_buffer = filled.saturating_sub(body_start).min(content_length);
    body[..in_buffer].copy_from_slice(&buf[body_start..body_start + in_buffer]);
    let mut received = in_buffer;
    while received < content_length {
        let n = socket
            .read(&mut body[received..content_length])
            .await
            .map_err(|_| "read body")?;
        if n == 0 {
            return Err("body eof");
        }
        received += n;
    }

    let mut handle = MAILBOX.handle();
    let response = api::dispatch(&mut handle, method, target, &body[..content_length]).await;
    write_response(
        socket,
        response.status_line(),
        response.content_type,
        response.body.as_bytes(),
    )
    .await;
    Ok(())
}

async fn reject(socket: &mut TcpSocket<'_>, status: &str, label: &str) {
    let mut body = heapless::String::<64>::new();
    let _ = core::fmt::write(
        &mut body,
        format_args!(r#"{{"status":"error","message":"{}"}}"#, label),
    );
    write_response(socket, status, CONTENT_TYPE_JSON, body.as_bytes()).await;
}
