//! UDP: fixed 8-byte header. Checksum is always zero — legal for IPv4
//! per RFC 768 and what `udp_build_header` does; this kernel never
//! computes a UDP checksum. Grounded on
//! `original_source/apps/network/udp/udp.{h,c}`.

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

pub fn parse(buf: &[u8]) -> Option<UdpHeader> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    Some(UdpHeader {
        src_port: u16::from_be_bytes([buf[0], buf[1]]),
        dst_port: u16::from_be_bytes([buf[2], buf[3]]),
        length: u16::from_be_bytes([buf[4], buf[5]]),
        checksum: u16::from_be_bytes([buf[6], buf[7]]),
    })
}

/// Builds an 8-byte UDP header into `buf[0..8]` with checksum disabled.
pub fn build_header(buf: &mut [u8], src_port: u16, dst_port: u16, payload_length: u16) {
    buf[0..2].copy_from_slice(&src_port.to_be_bytes());
    buf[2..4].copy_from_slice(&dst_port.to_be_bytes());
    buf[4..6].copy_from_slice(&(HEADER_LEN as u16 + payload_length).to_be_bytes());
    buf[6..8].copy_from_slice(&0u16.to_be_bytes());
}

/// Prints the UDP header plus a full hexdump of the IPv4 packet it
/// came wrapped in, mirroring `udp_print`'s (slightly unusual) choice
/// to dump from the IPv4 header rather than just the UDP payload.
pub fn print(ip_packet: &[u8], leftpad: usize) {
    let Some(ip) = super::ipv4::parse(ip_packet) else {
        crate::arch::puts("  [UDP] Packet too small\n");
        return;
    };
    let ihl = (ip.version_ihl & 0x0f) as usize * 4;
    if ip_packet.len() < ihl + HEADER_LEN {
        crate::arch::puts("  [UDP] Packet too small for UDP header\n");
        return;
    }
    let header = parse(&ip_packet[ihl..]).expect("length checked above");

    for _ in 0..leftpad {
        crate::arch::puts(" ");
    }
    crate::arch::puts("[UDP] ");
    super::print_decimal_u16(header.src_port);
    crate::arch::puts(" -> ");
    super::print_decimal_u16(header.dst_port);
    crate::arch::puts(" len=");
    super::print_decimal_u16(header.length);
    crate::arch::puts("\n");

    super::hexdump(ip_packet, leftpad + 4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_header_disables_checksum_and_sets_length() {
        let mut buf = [0u8; HEADER_LEN];
        build_header(&mut buf, 12345, 80, 10);
        let header = parse(&buf).unwrap();
        assert_eq!(header.src_port, 12345);
        assert_eq!(header.dst_port, 80);
        assert_eq!(header.length, 18);
        assert_eq!(header.checksum, 0);
    }
}
