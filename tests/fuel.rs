mod common;

use common::{op_imm, ModuleBuilder};
use runec_vm::opcode::Opcode;
use runec_vm::prelude::*;
use runec_vm::types::ValueType;

#[test]
fn fuel_is_exhausted_after_exactly_the_configured_number_of_instructions() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[], None);
    // An infinite self-loop: `JMP` is PC-relative, measured from the word
    // after its immediate, so jumping back to word 0 from next_pc=2 takes
    // rel=-2. Every pass through costs exactly one tick.
    let code = vec![op_imm(Opcode::Jmp as u8, 0, 0, 0, (-2i32) as u32)];
    let f = b.add_function(ty, 1, 0, code);
    b.export_func(f, "spin");
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default().with_fuel_limit(100));
    vm.init().unwrap();

    let err = vm.call("spin", &[]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Fuel);
}

#[test]
fn refuel_resets_the_budget_for_the_next_call() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[], None);
    // Self-loop: jump back to word 0 from next_pc=2, rel=-2.
    let code = vec![op_imm(Opcode::Jmp as u8, 0, 0, 0, (-2i32) as u32)];
    let f = b.add_function(ty, 1, 0, code);
    b.export_func(f, "spin");
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default().with_fuel_limit(10));
    vm.init().unwrap();

    assert_eq!(vm.call("spin", &[]).unwrap_err().code(), ErrorCode::Fuel);
    vm.refuel(5);
    assert_eq!(vm.call("spin", &[]).unwrap_err().code(), ErrorCode::Fuel);
}
