mod common;

use common::ModuleBuilder;
use runec_vm::prelude::*;
use runec_vm::types::ValueType;

#[test]
fn unresolved_import_fails_init_with_noimport() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[ValueType::I32], Some(ValueType::I32));
    b.add_import("env", "missing", ty);
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());

    let err = vm.init().unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoImport);
}

#[test]
fn calling_an_unknown_export_name_fails_with_noexport() {
    let mut b = ModuleBuilder::new();
    let bytes = b.build();

    let runtime = Runtime::new();
    let module = runtime.load(&bytes).unwrap();
    let mut vm = Vm::new(module, Config::default());
    vm.init().unwrap();

    let err = vm.call("nope", &[]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoExport);
}

#[test]
fn loading_a_module_with_bad_magic_is_rejected() {
    let mut bytes = vec![0u8; 20];
    bytes[0..4].copy_from_slice(b"NOPE");
    let runtime = Runtime::new();
    let err = runtime.load(&bytes).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadMagic);
}

#[test]
fn a_flipped_body_byte_is_caught_by_the_crc() {
    let mut b = ModuleBuilder::new();
    let ty = b.add_type(&[], Some(ValueType::I32));
    b.add_function(ty, 1, 0, vec![]);
    let mut bytes = b.build();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let runtime = Runtime::new();
    let err = runtime.load(&bytes).unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadModule);
}
