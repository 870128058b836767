mod common;

use common::{op, op_imm, ModuleBuilder};
use runec_vm::opcode::Opcode;
use runec_vm::prelude::*;
use runec_vm::types::ValueType;

#[test]
fn store_then_load_round_trips_through_linear_memory() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[ValueType::I32], Some(ValueType::I32));
    let code = vec![
        op_imm(Opcode::LdI32 as u8, 1, 0, 0, 0), // r1 = address 0
        op_imm(Opcode::Store32 as u8, 0, 1, 0, 0), // mem[r1 + 0] = r0 (the param)
        op_imm(Opcode::Load32 as u8, 0, 1, 0, 0),  // r0 = mem[r1 + 0]; `RET` always returns r0
        op(Opcode::Ret as u8, 0, 0, 0),
    ];
    let f = b.add_function(ty, 3, 0, code);
    b.export_func(f, "store_load");
    b.set_memory(1, 1);
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());
    vm.init().unwrap();

    let result = vm.call("store_load", &[Value::I32(12345)]).unwrap();
    assert_eq!(result, Value::I32(12345));
}

#[test]
fn out_of_bounds_access_traps_instead_of_reading_past_the_page() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[], Some(ValueType::I32));
    let code = vec![
        op_imm(Opcode::LdI32 as u8, 0, 0, 0, 0),
        op_imm(Opcode::Load32 as u8, 0, 0, 0, 65536), // one page, offset past it
        op(Opcode::Ret as u8, 0, 0, 0),
    ];
    let f = b.add_function(ty, 2, 0, code);
    b.export_func(f, "read_oob");
    b.set_memory(1, 1);
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());
    vm.init().unwrap();

    let err = vm.call("read_oob", &[]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Bounds);
}

#[test]
fn memory_grow_exposed_through_the_embedding_api() {
    let mut b = ModuleBuilder::new();
    b.set_memory(1, 4);
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());
    vm.init().unwrap();

    assert_eq!(vm.memory_size().unwrap(), 65536);
    let previous = vm.memory_grow(2).unwrap();
    assert_eq!(previous, 1);
    assert_eq!(vm.memory_size().unwrap(), 3 * 65536);
}

#[test]
fn a_module_declaring_more_memory_than_the_configured_limit_fails_init_with_oom() {
    let mut b = ModuleBuilder::new();
    b.set_memory(1, 4); // declares up to 4 pages = 256 KiB
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    // Cap the VM tighter than the module's declared max: one page.
    let mut vm = Vm::new(module, Config::default().with_memory_limit(65536));

    let err = vm.init().unwrap_err();
    assert_eq!(err.code(), ErrorCode::Oom);
}
