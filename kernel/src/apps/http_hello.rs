//! Minimal stateless HTTP/1.1 responder. Every reply's sequence and
//! acknowledgment numbers are derived entirely from the packet that
//! provoked it, so no per-connection table is kept. Grounded on
//! `original_source/apps/http-hello/http_hello.c`; `http_hello.h` is
//! absent from the retrieved source tree, so `PORT` and `BUFFER_SIZE`
//! below are chosen to match this kernel's other single-device network
//! apps rather than carried over from an original definition.
use super::netdev;
use crate::devices::DeviceRegistry;
use crate::drivers::resource::ResourceManager;
use crate::net::{arp, ethernet, ipv4, tcp};

const PORT: u16 = 80;
const BUFFER_SIZE: usize = 2048;

static mut ISN_COUNTER: u32 = 1000;

pub fn run(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    crate::arch::puts("[http-hello] starting...\n");
    let mut devices: [Option<(crate::drivers::resource::ResourceHandle, netdev::NetDevice)>; 1] =
        [const { None }; 1];
    let count = netdev::acquire_all(registry, resources, &mut devices);
    if count < 1 {
        crate::arch::puts("[http-hello] no network devices found\n");
        return;
    }
    let (_, device) = devices[0].as_ref().expect("checked count above");
    let mac = device.mac();

    crate::arch::puts("[http-hello] MAC: ");
    crate::net::print_mac(mac);
    crate::arch::puts("\n[http-hello] listening on port ");
    crate::net::print_decimal_u16(PORT);
    crate::arch::puts("...\n");

    let mut buffer = [0u8; BUFFER_SIZE];
    let mut reply = [0u8; BUFFER_SIZE];

    loop {
        let Ok(received_length) = device.receive(&mut buffer) else {
            continue;
        };
        if received_length < ethernet::HEADER_LEN {
            continue;
        }

        let eth_type = ethernet::eth_type(&buffer);

        if eth_type == ethernet::ETH_P_ARP {
            if let Some(header) = arp::parse(&buffer[..received_length.min(arp::PACKET_SIZE)]) {
                if header.opcode == arp::OP_REQUEST {
                    arp::build_reply(&mut reply, mac, header.target_ip, header.sender_mac, header.sender_ip);
                    let _ = device.transmit(&reply[..arp::PACKET_SIZE]);
                }
            }
            continue;
        }

        if eth_type != ethernet::ETH_P_IP {
            continue;
        }
        if received_length < ethernet::HEADER_LEN + ipv4::HEADER_LEN + tcp::HEADER_LEN {
            continue;
        }

        let Some(ip) = ipv4::parse(&buffer[ethernet::HEADER_LEN..]) else {
            continue;
        };
        if ip.protocol != ipv4::IPPROTO_TCP {
            continue;
        }

        let tcp_offset = ethernet::HEADER_LEN + ipv4::HEADER_LEN;
        let Some(segment) = tcp::parse(&buffer[tcp_offset..]) else {
            continue;
        };
        if segment.dst_port != PORT {
            continue;
        }

        let their_mac = ethernet::src_mac(&buffer);
        let data_offset = ((segment.data_offset >> 4) as usize) * 4;
        let tcp_payload_len = (ip.total_length as usize)
            .saturating_sub(ipv4::HEADER_LEN)
            .saturating_sub(data_offset);

        if segment.flags & tcp::FLAG_SYN != 0 {
            // SAFETY: single-threaded cooperative app dispatch.
            let our_isn = unsafe {
                let isn = ISN_COUNTER;
                ISN_COUNTER = ISN_COUNTER.wrapping_add(1);
                isn
            };
            send_tcp_packet(
                device,
                &mut reply,
                mac,
                their_mac,
                ip.dst_ip,
                ip.src_ip,
                segment.dst_port,
                segment.src_port,
                our_isn,
                segment.seq_num.wrapping_add(1),
                tcp::FLAG_SYN | tcp::FLAG_ACK,
                65535,
                &[],
            );
        }

        if tcp_payload_len > 0 {
            let mut body = [0u8; 32];
            let body_len = write_hello_body(&mut body, ip.src_ip);
            let mut http_buf = [0u8; 192];
            let http_len = build_http_response(&mut http_buf, &body[..body_len]);
            send_tcp_packet(
                device,
                &mut reply,
                mac,
                their_mac,
                ip.dst_ip,
                ip.src_ip,
                segment.dst_port,
                segment.src_port,
                segment.ack_num,
                segment.seq_num.wrapping_add(tcp_payload_len as u32),
                tcp::FLAG_PSH | tcp::FLAG_ACK,
                65535,
                &http_buf[..http_len],
            );
        }

        if segment.flags & tcp::FLAG_FIN != 0 && segment.flags & tcp::FLAG_SYN == 0 {
            send_tcp_packet(
                device,
                &mut reply,
                mac,
                their_mac,
                ip.dst_ip,
                ip.src_ip,
                segment.dst_port,
                segment.src_port,
                segment.ack_num,
                segment.seq_num.wrapping_add(1),
                tcp::FLAG_ACK,
                65535,
                &[],
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn send_tcp_packet(
    device: &netdev::NetDevice,
    reply: &mut [u8],
    our_mac: [u8; 6],
    their_mac: [u8; 6],
    src_ip: u32,
    dst_ip: u32,
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: u8,
    window: u16,
    payload: &[u8],
) {
    let ip_offset = ethernet::HEADER_LEN;
    let tcp_offset = ip_offset + ipv4::HEADER_LEN;
    let payload_offset = tcp_offset + tcp::HEADER_LEN;
    let total_len = payload_offset + payload.len();

    ethernet::build_header(reply, their_mac, our_mac, ethernet::ETH_P_IP);
    ipv4::build_header(
        &mut reply[ip_offset..],
        src_ip,
        dst_ip,
        ipv4::IPPROTO_TCP,
        (tcp::HEADER_LEN + payload.len()) as u16,
        64,
    );
    reply[payload_offset..payload_offset + payload.len()].copy_from_slice(payload);
    tcp::build_header(
        &mut reply[tcp_offset..],
        src_port,
        dst_port,
        seq,
        ack,
        flags,
        window,
        src_ip,
        dst_ip,
        payload.len() as u16,
    );

    let _ = device.transmit(&reply[..total_len]);
}

/// Writes `"Hello, A.B.C.D\n"` for a host-order IPv4 address.
fn write_hello_body(buf: &mut [u8], ip: u32) -> usize {
    let mut len = 0;
    buf[len..len + 7].copy_from_slice(b"Hello, ");
    len += 7;
    let octets = ip.to_be_bytes();
    for (i, octet) in octets.iter().enumerate() {
        let mut digits = [0u8; 3];
        let n = crate::net::write_decimal(*octet as u32, &mut digits);
        buf[len..len + n].copy_from_slice(&digits[..n]);
        len += n;
        if i < 3 {
            buf[len] = b'.';
            len += 1;
        }
    }
    buf[len] = b'\n';
    len += 1;
    len
}

/// Builds the full HTTP/1.1 response (headers plus body) into `buf`.
fn build_http_response(buf: &mut [u8], body: &[u8]) -> usize {
    let head = b"HTTP/1.1 200 OK\r\nConnection: keep-alive\r\nContent-Type: text/plain\r\nContent-Length: ";
    let mut len = 0;
    buf[len..len + head.len()].copy_from_slice(head);
    len += head.len();
    let mut digits = [0u8; 10];
    let n = crate::net::write_decimal(body.len() as u32, &mut digits);
    buf[len..len + n].copy_from_slice(&digits[..n]);
    len += n;
    buf[len..len + 4].copy_from_slice(b"\r\n\r\n");
    len += 4;
    buf[len..len + body.len()].copy_from_slice(body);
    len += body.len();
    len
}
