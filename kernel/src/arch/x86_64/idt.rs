//! Interrupt Descriptor Table: installs exactly the synchronous-trap
//! handler the platform port contract requires (illegal instruction),
//! plus a double-fault backstop. No interrupt vectors are wired up —
//! this kernel is polling-only, per the non-goal on interrupt-driven I/O.

use lazy_static::lazy_static;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame};

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
        idt.general_protection_fault
            .set_handler_fn(general_protection_fault_handler);
        idt.double_fault.set_handler_fn(double_fault_handler);
        idt
    };
}

pub fn init() {
    IDT.load();
}

extern "x86-interrupt" fn invalid_opcode_handler(stack_frame: InterruptStackFrame) {
    crate::error::report_fatal(stack_frame.instruction_pointer.as_u64() as usize, "illegal instruction");
}

extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) {
    crate::error::report_fatal(stack_frame.instruction_pointer.as_u64() as usize, "general protection fault");
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    crate::error::report_fatal(stack_frame.instruction_pointer.as_u64() as usize, "double fault");
}
