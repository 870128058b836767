//! Opaque-handle C ABI for non-Rust embedders, gated behind the `capi`
//! feature.
//!
//! Every function here is a thin, panic-catching wrapper around
//! [`crate::vm::Vm`]/[`crate::module::Module`]; the opaque `*mut` handles own
//! a boxed Rust value and must be freed exactly once with the matching
//! `_free` function.

use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;
use std::sync::Arc;

use crate::error::ErrorCode;
use crate::module::Module;
use crate::types::Value;
use crate::vm::{Config, Runtime, Vm};

/// Opaque runtime handle.
pub struct RunecRuntime(Runtime);

/// Opaque, reference-counted module handle.
pub struct RunecModule(Arc<Module>);

/// Opaque VM handle.
pub struct RunecVm {
    vm: Vm,
    /// Owned copy of the last error's formatted message, kept alive so
    /// `runec_vm_last_error`'s returned pointer stays valid until the next
    /// call into this VM.
    last_error_c: Option<CString>,
}

/// Signature of a host callback registered through [`runec_vm_register`].
///
/// `args`/`results` are raw bit patterns (`to_bits`/`from_bits`); the caller
/// and callee agree on how many of each via the import's declared type.
/// Returns `0` on success; any other value aborts the in-flight call and is
/// surfaced as `HOST_ERROR`.
pub type RunecHostFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    args: *const u64,
    arg_count: usize,
    out_result: *mut u64,
) -> i32;

/// Catches a panic unwinding out of `f` and returns `default` instead.
/// Every function below runs its body through this: a panic (an assertion,
/// an indexing bug) must not unwind across the `extern "C"` boundary, which
/// is undefined behavior, and a sandboxed guest's misbehavior must never be
/// able to trigger one in the first place.
fn catch_unwind_or<T>(default: T, f: impl FnOnce() -> T + std::panic::UnwindSafe) -> T {
    std::panic::catch_unwind(f).unwrap_or(default)
}

/// Create a runtime. Never returns null.
#[no_mangle]
pub extern "C" fn runec_runtime_new() -> *mut RunecRuntime {
    catch_unwind_or(ptr::null_mut(), || Box::into_raw(Box::new(RunecRuntime(Runtime::new()))))
}

/// Free a runtime created by [`runec_runtime_new`].
///
/// # Safety
/// `runtime` must be a pointer returned by `runec_runtime_new` and not yet
/// freed.
#[no_mangle]
pub unsafe extern "C" fn runec_runtime_free(runtime: *mut RunecRuntime) {
    catch_unwind_or((), || {
        if !runtime.is_null() {
            drop(Box::from_raw(runtime));
        }
    })
}

/// Parse and validate a module. Returns null on failure.
///
/// # Safety
/// `runtime` must be valid; `bytes` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn runec_module_load(runtime: *const RunecRuntime, bytes: *const u8, len: usize) -> *mut RunecModule {
    catch_unwind_or(ptr::null_mut(), || {
        let runtime = &(*runtime).0;
        let slice = std::slice::from_raw_parts(bytes, len);
        match runtime.load(slice) {
            Ok(module) => Box::into_raw(Box::new(RunecModule(module))),
            Err(_) => ptr::null_mut(),
        }
    })
}

/// Free a module created by [`runec_module_load`].
///
/// # Safety
/// Must not be called while any `RunecVm` still references this module.
#[no_mangle]
pub unsafe extern "C" fn runec_module_free(module: *mut RunecModule) {
    catch_unwind_or((), || {
        if !module.is_null() {
            drop(Box::from_raw(module));
        }
    })
}

/// Create a VM over `module` with default configuration.
///
/// # Safety
/// `module` must be a valid, non-null handle.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_new(module: *const RunecModule, fuel_limit: u64) -> *mut RunecVm {
    catch_unwind_or(ptr::null_mut(), || {
        let module = (*module).0.clone();
        let config = Config::default().with_fuel_limit(fuel_limit);
        Box::into_raw(Box::new(RunecVm { vm: Vm::new(module, config), last_error_c: None }))
    })
}

/// Free a VM created by [`runec_vm_new`].
///
/// # Safety
/// `vm` must be a pointer returned by `runec_vm_new` and not yet freed.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_free(vm: *mut RunecVm) {
    catch_unwind_or((), || {
        if !vm.is_null() {
            drop(Box::from_raw(vm));
        }
    })
}

/// Register a host function for `module::name`.
///
/// # Safety
/// `vm`, `module`, `name` must be valid; `callback` must be safe to invoke
/// with the given `user_data` for the lifetime of `vm`.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_register(
    vm: *mut RunecVm,
    module: *const c_char,
    name: *const c_char,
    callback: RunecHostFn,
    user_data: *mut c_void,
) -> ErrorCode {
    catch_unwind_or(ErrorCode::Trap, move || {
        let module_name = match CStr::from_ptr(module).to_str() {
            Ok(s) => s.to_owned(),
            Err(_) => return ErrorCode::BadModule,
        };
        let fn_name = match CStr::from_ptr(name).to_str() {
            Ok(s) => s.to_owned(),
            Err(_) => return ErrorCode::BadModule,
        };

        // SAFETY: the caller guarantees `callback` is safe to invoke with
        // `user_data` for as long as the VM lives; we only ever call it while
        // holding the `Vm`, never after `runec_vm_free`.
        struct SendableCallback(RunecHostFn, *mut c_void);
        unsafe impl Send for SendableCallback {}
        let wrapped = SendableCallback(callback, user_data);

        let vm = &mut (*vm).vm;
        let result = vm.register(&module_name, &fn_name, move |_caller, args| {
            let bits: Vec<u64> = args.iter().map(|v| v.to_bits()).collect();
            let mut out = 0u64;
            let rc = unsafe { (wrapped.0)(wrapped.1, bits.as_ptr(), bits.len(), &mut out as *mut u64) };
            if rc == 0 {
                Ok(Value::I64(out as i64))
            } else {
                Err(rc)
            }
        });

        result.map(|()| ErrorCode::Ok).unwrap_or_else(|e| e.code())
    })
}

/// Resolve imports and allocate resources.
///
/// # Safety
/// `vm` must be a valid, non-null handle.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_init(vm: *mut RunecVm) -> ErrorCode {
    catch_unwind_or(ErrorCode::Trap, move || {
        let vm = &mut (*vm).vm;
        vm.init().map(|()| ErrorCode::Ok).unwrap_or_else(|e| e.code())
    })
}

/// Call an exported function with raw-bits arguments, writing the raw-bits
/// result to `*out_result` on success.
///
/// # Safety
/// `vm`, `name` must be valid; `args` must point to `arg_count` readable
/// `u64`s; `out_result` must be writable.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_call(
    vm: *mut RunecVm,
    name: *const c_char,
    args: *const u64,
    arg_count: usize,
    out_result: *mut u64,
) -> ErrorCode {
    catch_unwind_or(ErrorCode::Trap, move || {
        let name = match CStr::from_ptr(name).to_str() {
            Ok(s) => s,
            Err(_) => return ErrorCode::NoExport,
        };
        let raw_args = std::slice::from_raw_parts(args, arg_count);
        let values: Vec<Value> = raw_args.iter().map(|bits| Value::I64(*bits as i64)).collect();

        let handle = &mut *vm;
        match handle.vm.call(name, &values) {
            Ok(value) => {
                *out_result = value.to_bits();
                ErrorCode::Ok
            }
            Err(e) => {
                let code = e.code();
                handle.last_error_c = CString::new(handle.vm.last_error().unwrap_or_default()).ok();
                code
            }
        }
    })
}

/// Base pointer of the VM's linear memory, or null if not yet initialized.
///
/// # Safety
/// `vm` must be valid. The returned pointer must not be retained across a
/// call to [`runec_vm_memory_grow`].
#[no_mangle]
pub unsafe extern "C" fn runec_vm_memory_base(vm: *const RunecVm) -> *const u8 {
    catch_unwind_or(ptr::null(), || (*vm).vm.memory_base().unwrap_or(ptr::null()))
}

/// Current linear memory size, in bytes.
///
/// # Safety
/// `vm` must be valid.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_memory_size(vm: *const RunecVm) -> u64 {
    catch_unwind_or(0, || (*vm).vm.memory_size().unwrap_or(0))
}

/// Grow linear memory by `pages`, returning the previous page count, or
/// `u32::MAX` on failure.
///
/// # Safety
/// `vm` must be valid.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_memory_grow(vm: *mut RunecVm, pages: u32) -> u32 {
    catch_unwind_or(u32::MAX, move || (*vm).vm.memory_grow(pages).unwrap_or(u32::MAX))
}

/// The last detailed error message recorded on this VM, or null if none.
/// The returned pointer is valid until the next call into this VM.
///
/// # Safety
/// `vm` must be valid.
#[no_mangle]
pub unsafe extern "C" fn runec_vm_last_error(vm: *const RunecVm) -> *const c_char {
    catch_unwind_or(ptr::null(), || (*vm).last_error_c.as_ref().map_or(ptr::null(), |s| s.as_ptr()))
}
