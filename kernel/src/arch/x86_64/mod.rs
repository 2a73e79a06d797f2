//! x86_64 platform port: COM1 console, the ISA debug-exit halt device,
//! Multiboot2/PVH command-line extraction, and the IDT with a single
//! synchronous-trap handler for illegal-instruction.

mod idt;

use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;
use uart_16550::SerialPort;
use x86_64::instructions::port::Port;

const COM1: u16 = 0x3f8;

// SAFETY: COM1 is always present under QEMU's q35/pc machine types,
// which is the only target this kernel boots on.
static SERIAL: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(COM1) });
static SERIAL_INIT: AtomicBool = AtomicBool::new(false);

/// Emits one byte over COM1 via `uart_16550`'s driver, matching the
/// generic console sink's one-byte-at-a-time calling convention.
pub fn putchar(byte: u8) {
    use core::fmt::Write;
    let mut serial = SERIAL.lock();
    if !SERIAL_INIT.swap(true, Ordering::Relaxed) {
        serial.init();
    }
    let _ = serial.write_char(byte as char);
}

/// Reads the Multiboot2 command-line tag (type 1) out of the boot
/// information structure, if present. `boot_param` is the physical
/// address of the Multiboot2 info block handed to us in `%rbx` at entry.
pub fn cmdline(boot_param: usize) -> Option<&'static str> {
    if boot_param == 0 {
        return None;
    }
    // SAFETY: `boot_param` is the Multiboot2 info pointer passed by the
    // bootloader per the platform's boot protocol; its total_size field
    // bounds every subsequent read.
    unsafe {
        let total_size = core::ptr::read_unaligned(boot_param as *const u32) as usize;
        let mut offset = 8usize; // skip total_size + reserved
        while offset + 8 <= total_size {
            let tag_addr = boot_param + offset;
            let tag_type = core::ptr::read_unaligned(tag_addr as *const u32);
            let tag_size = core::ptr::read_unaligned((tag_addr + 4) as *const u32) as usize;
            if tag_type == 0 {
                break;
            }
            if tag_type == 1 && tag_size > 8 {
                let str_ptr = (tag_addr + 8) as *const u8;
                let str_len = tag_size - 8 - 1; // drop the trailing NUL
                let bytes = core::slice::from_raw_parts(str_ptr, str_len);
                if let Ok(s) = core::str::from_utf8(bytes) {
                    return Some(s);
                }
                return None;
            }
            offset += (tag_size + 7) & !7;
        }
    }
    None
}

/// Writes the QEMU ISA debug-exit value; the resulting guest exit code
/// is `(0x10 << 1) | 1 == 33`, matching the platform's documented exit
/// status for a clean shutdown.
pub fn halt() -> ! {
    // SAFETY: port 0xf4 is the `isa-debug-exit` device configured on the
    // QEMU machine types this kernel targets; writing to it is its whole
    // purpose.
    unsafe {
        let mut exit_port: Port<u8> = Port::new(0xf4);
        exit_port.write(0x10u8);
    }
    loop {
        // SAFETY: `hlt` with interrupts disabled simply parks the core;
        // this path only runs if the debug-exit device is absent.
        unsafe { core::arch::asm!("cli; hlt", options(nomem, nostack)) };
    }
}

pub fn install_trap_handler() {
    idt::init();
}

pub fn io_inb(port: u16) -> u8 {
    // SAFETY: port I/O has no memory-safety requirement beyond being the
    // intended device register; callers only address PCI config space.
    unsafe { Port::new(port).read() }
}

pub fn io_outb(port: u16, value: u8) {
    // SAFETY: see `io_inb`.
    unsafe { Port::new(port).write(value) }
}

pub fn io_inw(port: u16) -> u16 {
    // SAFETY: see `io_inb`.
    unsafe { Port::new(port).read() }
}

pub fn io_outw(port: u16, value: u16) {
    // SAFETY: see `io_inb`.
    unsafe { Port::new(port).write(value) }
}

pub fn io_inl(port: u16) -> u32 {
    // SAFETY: see `io_inb`.
    unsafe { Port::new(port).read() }
}

pub fn io_outl(port: u16, value: u32) {
    // SAFETY: see `io_inb`.
    unsafe { Port::new(port).write(value) }
}
