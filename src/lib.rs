//! Embeddable, sandboxed bytecode VM: a versioned container loader, a
//! register-based interpreter over ~140 opcodes, paged bounds-checked
//! linear memory, and a host-function import table, all driven through
//! [`vm::Vm`].

pub mod call;
pub mod consts;
pub mod container;
pub mod error;
pub mod host;
mod interpreter;
pub mod memory;
pub mod module;
pub mod opcode;
pub mod types;
pub mod vm;

#[cfg(feature = "capi")]
pub mod ffi;

pub mod prelude {
    //! Common imports for embedding applications.

    pub use crate::error::{ErrorCode, Trap, VmError, VmResult};
    pub use crate::host::Caller;
    pub use crate::module::Module;
    pub use crate::types::{FuncType, Value, ValueType};
    pub use crate::vm::{error_string, Config, Runtime, Vm};
}
