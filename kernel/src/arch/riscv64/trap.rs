//! Direct (non-vectored) supervisor trap handler. `scause` is decoded
//! only far enough to recognize illegal instruction (exception code 2);
//! every other synchronous trap is reported fatal the same way. This
//! kernel never enables `sie` bits, so interrupts never reach here.

use core::arch::{asm, global_asm};

global_asm!(
    r#"
.align 4
.global nodewatch_trap_entry
nodewatch_trap_entry:
    addi sp, sp, -16
    sd ra, 0(sp)
    sd a0, 8(sp)
    call {handler}
    ld ra, 0(sp)
    ld a0, 8(sp)
    addi sp, sp, 16
    sret
    "#,
    handler = sym trap_handler,
);

extern "C" {
    static nodewatch_trap_entry: u8;
}

pub fn init() {
    // SAFETY: `stvec` in direct mode just needs a 4-byte-aligned code
    // address; `nodewatch_trap_entry` is exactly that.
    unsafe {
        let addr = &nodewatch_trap_entry as *const u8 as usize;
        asm!("csrw stvec, {0}", in(reg) addr, options(nomem, nostack));
    }
    super::super::barriers::instruction_sync_barrier();
}

extern "C" fn trap_handler() {
    let scause: usize;
    let sepc: usize;
    // SAFETY: reading CSRs has no side effects.
    unsafe {
        asm!("csrr {0}, scause", out(reg) scause, options(nomem, nostack));
        asm!("csrr {0}, sepc", out(reg) sepc, options(nomem, nostack));
    }
    let is_interrupt = scause >> (usize::BITS - 1) != 0;
    let code = scause & !(1 << (usize::BITS - 1));
    if !is_interrupt && code == 2 {
        crate::error::report_fatal(sepc, "illegal instruction");
    }
    crate::error::report_fatal(sepc, "unexpected trap");
}
