mod common;

use common::{op, ModuleBuilder};
use runec_vm::opcode::Opcode;
use runec_vm::prelude::*;
use runec_vm::types::ValueType;

/// `Vm::init`/`Vm::call` are `#[instrument]`d and log on trap; exercise them
/// under a real subscriber so a span/event panic (mismatched field, bad
/// format string) would show up here instead of only at runtime in an
/// embedder that happens to install a subscriber.
#[test]
fn calls_run_cleanly_under_a_tracing_subscriber() {
    let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[ValueType::I32, ValueType::I32], Some(ValueType::I32));
    let code = vec![
        op(Opcode::Div32 as u8, 0, 0, 1),
        op(Opcode::Ret as u8, 0, 0, 0),
    ];
    let f = b.add_function(ty, 3, 0, code);
    b.export_func(f, "divide");
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());
    vm.init().unwrap();

    assert_eq!(vm.call("divide", &[Value::I32(10), Value::I32(2)]).unwrap(), Value::I32(5));
    assert!(vm.call("divide", &[Value::I32(1), Value::I32(0)]).is_err());
}
