//! Intel 82540EM gigabit MAC driver: classic ring descriptors, MMIO
//! registers, no interrupts (polling only). Grounded directly on
//! `original_source/drivers/e1000/e1000.{c,h}`. Unlike the VirtIO
//! drivers, there is no timeout/retry loop on transmit — a full TX
//! ring is surfaced immediately as `WouldBlock`, matching the original's
//! single DD-bit check with no spin.

use crate::devices::Device;
use crate::error::{KResult, KernelError};

const PCI_VENDOR_ID_INTEL: u16 = 0x8086;
const DEVICE_ID_82540EM: u16 = 0x100e;

mod reg {
    pub const CTRL: usize = 0x00000;
    pub const ICR: usize = 0x000c0;
    pub const IMS: usize = 0x000d0;
    pub const RCTL: usize = 0x00100;
    pub const TCTL: usize = 0x00400;
    pub const RDBAL: usize = 0x02800;
    pub const RDBAH: usize = 0x02804;
    pub const RDLEN: usize = 0x02808;
    pub const RDH: usize = 0x02810;
    pub const RDT: usize = 0x02818;
    pub const TDBAL: usize = 0x03800;
    pub const TDBAH: usize = 0x03804;
    pub const TDLEN: usize = 0x03808;
    pub const TDH: usize = 0x03810;
    pub const TDT: usize = 0x03818;
    pub const RAL: usize = 0x05400;
    pub const RAH: usize = 0x05404;
}

const CTRL_SLU: u32 = 1 << 6;

const RCTL_EN: u32 = 1 << 1;
const RCTL_UPE: u32 = 1 << 3;
const RCTL_MPE: u32 = 1 << 4;
const RCTL_BAM: u32 = 1 << 15;
const RCTL_BSIZE_2K: u32 = 0 << 16;

const TCTL_EN: u32 = 1 << 1;
const TCTL_PSP: u32 = 1 << 3;

const RXD_STAT_DD: u8 = 1 << 0;
const RXD_STAT_EOP: u8 = 1 << 1;

const TXD_CMD_EOP: u8 = 1 << 0;
const TXD_CMD_RS: u8 = 1 << 3;
const TXD_STAT_DD: u8 = 1 << 0;

pub const NUM_RX_DESC: usize = 8;
pub const NUM_TX_DESC: usize = 8;
pub const RX_BUFFER_SIZE: usize = 2048;
pub const TX_BUFFER_SIZE: usize = 2048;
const LINK_SETTLE_SPINS: u32 = 100_000;

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct RxDesc {
    buffer_addr: u64,
    length: u16,
    checksum: u16,
    status: u8,
    errors: u8,
    special: u16,
}

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct TxDesc {
    buffer_addr: u64,
    length: u16,
    cso: u8,
    cmd: u8,
    status: u8,
    css: u8,
    special: u16,
}

#[repr(C, align(16))]
pub struct E1000Context {
    mmio_base: u64,
    initialized: bool,
    mac_addr: [u8; 6],
    rx_descs: [RxDesc; NUM_RX_DESC],
    rx_buffers: [[u8; RX_BUFFER_SIZE]; NUM_RX_DESC],
    rx_current: usize,
    tx_descs: [TxDesc; NUM_TX_DESC],
    tx_buffers: [[u8; TX_BUFFER_SIZE]; NUM_TX_DESC],
    tx_current: usize,
}

impl E1000Context {
    pub const fn new() -> Self {
        E1000Context {
            mmio_base: 0,
            initialized: false,
            mac_addr: [0; 6],
            rx_descs: [RxDesc {
                buffer_addr: 0,
                length: 0,
                checksum: 0,
                status: 0,
                errors: 0,
                special: 0,
            }; NUM_RX_DESC],
            rx_buffers: [[0; RX_BUFFER_SIZE]; NUM_RX_DESC],
            rx_current: 0,
            tx_descs: [TxDesc {
                buffer_addr: 0,
                length: 0,
                cso: 0,
                cmd: 0,
                status: 0,
                css: 0,
                special: 0,
            }; NUM_TX_DESC],
            tx_buffers: [[0; TX_BUFFER_SIZE]; NUM_TX_DESC],
            tx_current: 0,
        }
    }

    pub fn mac(&self) -> [u8; 6] {
        self.mac_addr
    }

    fn read32(&self, offset: usize) -> u32 {
        crate::arch::mmio_read32(self.mmio_base as usize + offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        crate::arch::mmio_write32(self.mmio_base as usize + offset, value)
    }

    fn read_mac_address(&mut self) {
        if self.mmio_base == 0 {
            self.mac_addr = [0; 6];
            return;
        }
        let ral = self.read32(reg::RAL);
        let rah = self.read32(reg::RAH);
        self.mac_addr[0] = ral as u8;
        self.mac_addr[1] = (ral >> 8) as u8;
        self.mac_addr[2] = (ral >> 16) as u8;
        self.mac_addr[3] = (ral >> 24) as u8;
        self.mac_addr[4] = rah as u8;
        self.mac_addr[5] = (rah >> 8) as u8;
    }

    fn bring_up(&mut self, device: &Device) -> Result<(), ()> {
        self.mmio_base = device.reg_base;
        self.rx_current = 0;
        self.tx_current = 0;

        let mut ctrl = self.read32(reg::CTRL);
        ctrl |= CTRL_SLU;
        self.write32(reg::CTRL, ctrl);

        for _ in 0..LINK_SETTLE_SPINS {
            core::hint::spin_loop();
        }

        self.read_mac_address();

        for i in 0..NUM_RX_DESC {
            let addr = self.rx_buffers[i].as_ptr() as u64;
            self.rx_descs[i].buffer_addr = addr;
            self.rx_descs[i].status = 0;
        }
        let rx_base = self.rx_descs.as_ptr() as u64;
        self.write32(reg::RDBAL, rx_base as u32);
        self.write32(reg::RDBAH, (rx_base >> 32) as u32);
        self.write32(reg::RDLEN, (NUM_RX_DESC * core::mem::size_of::<RxDesc>()) as u32);
        self.write32(reg::RDH, 0);
        self.write32(reg::RDT, (NUM_RX_DESC - 1) as u32);

        let _ = self.read32(reg::ICR);
        self.write32(reg::IMS, 0);

        // TX must come up before RX: the original's ordering, kept as-is.
        for i in 0..NUM_TX_DESC {
            let addr = self.tx_buffers[i].as_ptr() as u64;
            self.tx_descs[i].buffer_addr = addr;
            self.tx_descs[i].status = TXD_STAT_DD;
            self.tx_descs[i].cmd = 0;
        }
        let tx_base = self.tx_descs.as_ptr() as u64;
        self.write32(reg::TDBAL, tx_base as u32);
        self.write32(reg::TDBAH, (tx_base >> 32) as u32);
        self.write32(reg::TDLEN, (NUM_TX_DESC * core::mem::size_of::<TxDesc>()) as u32);
        self.write32(reg::TDH, 0);
        self.write32(reg::TDT, 0);

        self.write32(reg::TCTL, TCTL_EN | TCTL_PSP);
        self.write32(
            reg::RCTL,
            RCTL_EN | RCTL_UPE | RCTL_MPE | RCTL_BAM | RCTL_BSIZE_2K,
        );

        self.initialized = true;
        Ok(())
    }

    pub fn receive(&mut self, out: &mut [u8]) -> KResult<usize> {
        if !self.initialized {
            return Err(KernelError::Configuration("not initialized"));
        }
        let i = self.rx_current;
        if self.rx_descs[i].status & RXD_STAT_DD == 0 {
            return Err(KernelError::WouldBlock);
        }
        if self.rx_descs[i].status & RXD_STAT_EOP == 0 {
            self.rx_descs[i].status = 0;
            self.rx_current = (i + 1) % NUM_RX_DESC;
            return Err(KernelError::RingProtocol("multi-descriptor packet unsupported"));
        }

        let pkt_len = self.rx_descs[i].length as usize;
        if pkt_len > out.len() {
            self.rx_descs[i].status = 0;
            self.rx_current = (i + 1) % NUM_RX_DESC;
            return Err(KernelError::Configuration("buffer too small"));
        }

        out[..pkt_len].copy_from_slice(&self.rx_buffers[i][..pkt_len]);
        self.rx_descs[i].status = 0;
        self.write32(reg::RDT, i as u32);
        self.rx_current = (i + 1) % NUM_RX_DESC;
        Ok(pkt_len)
    }

    pub fn transmit(&mut self, payload: &[u8]) -> KResult<()> {
        if !self.initialized {
            return Err(KernelError::Configuration("not initialized"));
        }
        if payload.len() > TX_BUFFER_SIZE {
            return Err(KernelError::Configuration("payload too large"));
        }
        let i = self.tx_current;
        if self.tx_descs[i].status & TXD_STAT_DD == 0 {
            return Err(KernelError::WouldBlock);
        }

        self.tx_buffers[i][..payload.len()].copy_from_slice(payload);
        self.tx_descs[i].length = payload.len() as u16;
        self.tx_descs[i].cmd = TXD_CMD_EOP | TXD_CMD_RS;
        self.tx_descs[i].status = 0;

        let next = (i + 1) % NUM_TX_DESC;
        self.tx_current = next;
        self.write32(reg::TDT, next as u32);
        Ok(())
    }
}

impl Default for E1000Context {
    fn default() -> Self {
        Self::new()
    }
}

static ID_TABLE: &[crate::drivers::IdEntry] = &[crate::drivers::IdEntry {
    compatible: None,
    vendor_id: PCI_VENDOR_ID_INTEL,
    device_id: DEVICE_ID_82540EM,
}];

fn init_context(ctx: *mut (), device: &mut Device) -> i32 {
    if ctx.is_null() {
        return -1;
    }
    // SAFETY: `ctx` is a caller-owned `E1000Context`; see
    // `virtio::net::init_context` for the same contract.
    let context = unsafe { &mut *(ctx as *mut E1000Context) };
    match context.bring_up(device) {
        Ok(()) => 0,
        Err(()) => -1,
    }
}

fn deinit_context(_ctx: *mut ()) {}

pub static DRIVER: crate::drivers::Driver = crate::drivers::Driver {
    name: "e1000",
    version: "0.1.0",
    kind: crate::drivers::DriverType::Network,
    id_table: ID_TABLE,
    init_context,
    deinit_context,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_before_init_is_configuration_error() {
        let mut ctx = E1000Context::new();
        let mut buf = [0u8; 64];
        assert_eq!(
            ctx.receive(&mut buf),
            Err(KernelError::Configuration("not initialized"))
        );
    }

    #[test]
    fn transmit_before_init_is_configuration_error() {
        let mut ctx = E1000Context::new();
        assert_eq!(
            ctx.transmit(&[1, 2, 3]),
            Err(KernelError::Configuration("not initialized"))
        );
    }

    #[test]
    fn mac_read_with_zero_base_is_all_zero() {
        let mut ctx = E1000Context::new();
        ctx.read_mac_address();
        assert_eq!(ctx.mac(), [0; 6]);
    }
}
