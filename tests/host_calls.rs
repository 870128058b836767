mod common;

use common::{op, op_imm, ModuleBuilder};
use runec_vm::opcode::Opcode;
use runec_vm::prelude::*;
use runec_vm::types::ValueType;

#[test]
fn guest_call_round_trips_through_a_registered_host_function() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[ValueType::I32, ValueType::I32], Some(ValueType::I32));
    b.add_import("env", "sum", ty);
    let code = vec![
        op(Opcode::Arg as u8, 0, 0, 0),
        op(Opcode::Arg as u8, 1, 1, 0),
        op_imm(Opcode::Call as u8, 0, 0, 0, 0), // target function index 0: the import; result into r0
        op(Opcode::Ret as u8, 0, 0, 0),
    ];
    let f = b.add_function(ty, 3, 0, code);
    b.export_func(f, "call_twice");
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());
    vm.register("env", "sum", |_caller, args| {
        let (Value::I32(a), Value::I32(b)) = (args[0], args[1]) else {
            return Err(-1);
        };
        Ok(Value::I32(a + b))
    })
    .unwrap();
    vm.init().unwrap();

    let result = vm.call("call_twice", &[Value::I32(3), Value::I32(7)]).unwrap();
    assert_eq!(result, Value::I32(10));
}

#[test]
fn registering_after_init_is_rejected() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[], None);
    let f = b.add_function(ty, 1, 0, vec![op(Opcode::Ret as u8, 0, 0, 0)]);
    b.export_func(f, "noop");
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());
    vm.init().unwrap();

    let err = vm.register("env", "late", |_c, _a| Ok(Value::Void)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::HostError);
}
