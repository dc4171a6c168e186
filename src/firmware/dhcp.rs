use core::net::Ipv4Addr;

use edge_dhcp::server::{Server, ServerOptions};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};

const DHCP_SERVER_PORT: u16 = 67;
const DHCP_PACKET_BUF: usize = 1536;
const PROVISIONING_LEASES: usize = 4;

/// Hands out addresses on the provisioning access point, with the AP itself as
/// gateway.
pub(super) async fn run_dhcp_server(stack: Stack<'static>, address: Ipv4Addr) {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0; DHCP_PACKET_BUF];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0; DHCP_PACKET_BUF];

    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    if let Err(err) = socket.bind(DHCP_SERVER_PORT) {
        log::error!("dhcp: bind failed port={} err={:?}", DHCP_SERVER_PORT, err);
        return;
    }
    log::info!("dhcp: serving leases on {}", address);

    let mut server = Server::<_, PROVISIONING_LEASES>::new_with_et(address);
    let gateways = [address];
    let mut server_options = ServerOptions::new(address, None);
    server_options.gateways = &gateways;

    let mut buffer = [0; DHCP_PACKET_BUF];
    loop {
        let (len, meta) = match socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(err) => {
                log::warn!("dhcp: recv failed err={:?}", err);
                continue;
            }
        };
        let request = match edge_dhcp::Packet::decode(&buffer[..len]) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("dhcp: undecodable packet err={:?}", err);
                continue;
            }
        };

        let mut options = edge_dhcp::Options::buf();
        let Some(reply) = server.handle_request(&mut options, &server_options, &request) else {
            continue;
        };
        let remote = if request.broadcast || meta.endpoint.addr.is_unspecified() {
            IpEndpoint::new(Ipv4Addr::BROADCAST.into(), meta.endpoint.port)
        } else {
            meta.endpoint
        };

        let mut out = [0; DHCP_PACKET_BUF];
        let reply = match reply.encode(&mut out) {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("dhcp: reply encode failed err={:?}", err);
                continue;
            }
        };
        if let Err(err) = socket.send_to(reply, remote).await {
            log::warn!("dhcp: send failed err={:?}", err);
        }
    }
}
