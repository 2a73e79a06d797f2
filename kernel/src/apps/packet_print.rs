//! Dumps every received frame to the console and answers two narrow
//! requests directed at a fixed local address: a UDP ping/pong echo
//! and an ARP reply. Grounded on
//! `original_source/apps/packet-print/packet_print.{h,c}`.

use super::netdev;
use crate::devices::DeviceRegistry;
use crate::drivers::resource::ResourceManager;
use crate::net::{arp, ethernet, ipv4, udp};

const BUFFER_SIZE: usize = 2048;
const IP_ADDR: u32 = 0x0A00020F; // 10.0.2.15
const UDP_PORT: u16 = 5000;
const MAX_PAYLOAD_DISPLAY: usize = 64;

pub fn run(registry: &mut DeviceRegistry, resources: &mut ResourceManager) {
    crate::arch::puts("[packet-print] starting...\n");
    let mut devices: [Option<(crate::drivers::resource::ResourceHandle, netdev::NetDevice)>; 1] =
        [const { None }; 1];
    let count = netdev::acquire_all(registry, resources, &mut devices);
    if count < 1 {
        crate::arch::puts("No network devices found\n");
        return;
    }
    let (handle, device) = devices[0].as_ref().expect("checked count above");

    resources.print_tag(registry, *handle);
    crate::arch::puts(" MAC: ");
    let mac = device.mac();
    crate::net::print_mac(mac);
    crate::arch::puts("\n");

    resources.print_tag(registry, *handle);
    crate::arch::puts(" Listening for UDP packets on port ");
    crate::net::print_decimal_u16(UDP_PORT);
    crate::arch::puts("...\n");

    let mut buffer = [0u8; BUFFER_SIZE];
    let mut reply = [0u8; BUFFER_SIZE];
    let mut handled_request = false;

    while !handled_request {
        let Ok(received_length) = device.receive(&mut buffer) else {
            continue;
        };
        if received_length == 0 {
            continue;
        }

        ethernet::print(&buffer[..received_length], 0);

        if received_length < ethernet::HEADER_LEN + ipv4::HEADER_LEN + udp::HEADER_LEN {
            continue;
        }

        let eth_type = ethernet::eth_type(&buffer);
        if eth_type == ethernet::ETH_P_IP {
            let Some(ip) = ipv4::parse(&buffer[ethernet::HEADER_LEN..]) else {
                continue;
            };
            if ip.protocol != ipv4::IPPROTO_UDP || ip.dst_ip != IP_ADDR {
                continue;
            }
            let udp_offset = ethernet::HEADER_LEN + ipv4::HEADER_LEN;
            let Some(udp_header) = udp::parse(&buffer[udp_offset..]) else {
                continue;
            };
            if udp_header.dst_port != UDP_PORT {
                continue;
            }

            let payload_offset = udp_offset + udp::HEADER_LEN;
            let payload_len = (udp_header.length as usize)
                .saturating_sub(udp::HEADER_LEN)
                .min(received_length.saturating_sub(payload_offset));
            let payload = &buffer[payload_offset..payload_offset + payload_len];

            resources.print_tag(registry, *handle);
            crate::arch::puts(" Received UDP payload: ");
            for &c in payload.iter().take(MAX_PAYLOAD_DISPLAY) {
                if (32..=126).contains(&c) {
                    crate::arch::putchar(c);
                } else {
                    crate::arch::putchar(b'.');
                }
            }
            crate::arch::puts("\n");

            if payload_len >= 6 && &payload[0..5] == b"ping-" {
                let mut num: u32 = 0;
                for &c in payload[5..payload_len].iter() {
                    if c.is_ascii_digit() {
                        num = num * 10 + (c - b'0') as u32;
                    } else {
                        break;
                    }
                }

                let mut response_payload = [0u8; 32];
                let mut response_len = 0;
                response_payload[0..5].copy_from_slice(b"pong-");
                response_len += 5;
                let mut digits = [0u8; 10];
                response_len += {
                    let n = crate::net::write_decimal(num + 1, &mut digits);
                    response_payload[response_len..response_len + n].copy_from_slice(&digits[..n]);
                    n
                };

                let eth_offset = 0;
                let ip_offset = ethernet::HEADER_LEN;
                let udp_reply_offset = ip_offset + ipv4::HEADER_LEN;
                let reply_payload_offset = udp_reply_offset + udp::HEADER_LEN;
                let total_len = reply_payload_offset + response_len;

                ethernet::build_header(
                    &mut reply[eth_offset..],
                    ethernet::src_mac(&buffer),
                    mac,
                    ethernet::ETH_P_IP,
                );
                ipv4::build_header(
                    &mut reply[ip_offset..],
                    ip.dst_ip,
                    ip.src_ip,
                    ipv4::IPPROTO_UDP,
                    (udp::HEADER_LEN + response_len) as u16,
                    64,
                );
                udp::build_header(
                    &mut reply[udp_reply_offset..],
                    udp_header.dst_port,
                    udp_header.src_port,
                    response_len as u16,
                );
                reply[reply_payload_offset..reply_payload_offset + response_len]
                    .copy_from_slice(&response_payload[..response_len]);

                if device.transmit(&reply[..total_len]).is_ok() {
                    resources.print_tag(registry, *handle);
                    crate::arch::puts(" Sent UDP echo reply\n");
                    handled_request = true;
                }
            }
        } else if eth_type == ethernet::ETH_P_ARP {
            let Some(header) = arp::parse(&buffer[..received_length.min(arp::PACKET_SIZE)]) else {
                continue;
            };
            if header.opcode == arp::OP_REQUEST && header.target_ip == IP_ADDR {
                arp::build_reply(
                    &mut reply,
                    mac,
                    IP_ADDR,
                    header.sender_mac,
                    header.sender_ip,
                );
                if device.transmit(&reply[..arp::PACKET_SIZE]).is_ok() {
                    resources.print_tag(registry, *handle);
                    crate::arch::puts(" Sent ARP reply\n");
                }
            }
        }
    }
}
