//! Runtime and loader error implementation.

use core::fmt;

use thiserror::Error;

/// The closed, stable error code surfaced across the embedding boundary.
///
/// This is the ABI-facing counterpart of [`VmError`]: every variant of
/// [`VmError`] maps to exactly one `ErrorCode` via [`VmError::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// No error.
    Ok = 0,
    /// Malformed container: bad section framing, over-limit counts, CRC
    /// mismatch, or unaligned code.
    BadModule,
    /// Header magic bytes did not match.
    BadMagic,
    /// Header version did not match the version this runtime accepts.
    Version,
    /// Allocation failure.
    Oom,
    /// Memory access outside the current linear memory range.
    Bounds,
    /// Integer division or remainder by zero.
    DivZero,
    /// A value was used in a way its type does not support.
    Type,
    /// `vm_call` was given a name with no matching export.
    NoExport,
    /// `vm_init` found an import with no matching registration.
    NoImport,
    /// The call stack depth limit was exceeded.
    StackOverflow,
    /// Guest code executed an explicit `TRAP` or another guest-fatal fault.
    Trap,
    /// The fuel budget was exhausted.
    Fuel,
    /// An opcode byte has no defined semantics.
    BadOpcode,
    /// A host callback returned an application-defined error.
    HostError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::BadModule => "BADMODULE",
            Self::BadMagic => "BADMAGIC",
            Self::Version => "VERSION",
            Self::Oom => "OOM",
            Self::Bounds => "BOUNDS",
            Self::DivZero => "DIVZERO",
            Self::Type => "TYPE",
            Self::NoExport => "NOEXPORT",
            Self::NoImport => "NOIMPORT",
            Self::StackOverflow => "STACKOVERFLOW",
            Self::Trap => "TRAP",
            Self::Fuel => "FUEL",
            Self::BadOpcode => "BADOPCODE",
            Self::HostError => "HOST_ERROR",
        };
        f.write_str(s)
    }
}

/// Guest-fatal conditions produced by the interpreter loop.
///
/// Traps abort only the current call chain; the [`crate::Vm`] remains usable
/// afterwards (globals and memory reflect whatever partial effects already
/// landed, per the single-threaded execution model).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// Memory access outside `[0, memory_pages * 65536)`.
    #[error("memory access out of bounds")]
    Bounds,
    /// Division or remainder by zero.
    #[error("division or remainder by zero")]
    DivZero,
    /// An instruction produced or consumed a value of the wrong shape.
    #[error("type error")]
    Type,
    /// Explicit `TRAP` instruction.
    #[error("explicit trap")]
    Explicit,
    /// Call depth exceeded `stack_size`.
    #[error("call stack overflow")]
    StackOverflow,
    /// Opcode byte has no defined semantics.
    #[error("unknown opcode {0:#04x}")]
    BadOpcode(u8),
    /// Fuel budget exhausted.
    #[error("fuel exhausted")]
    Fuel,
    /// A host callback returned an application error.
    #[error("host error: {0}")]
    Host(i32),
}

impl Trap {
    /// Map to the closed ABI error code.
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::Bounds => ErrorCode::Bounds,
            Self::DivZero => ErrorCode::DivZero,
            Self::Type => ErrorCode::Type,
            Self::Explicit => ErrorCode::Trap,
            Self::StackOverflow => ErrorCode::StackOverflow,
            Self::BadOpcode(_) => ErrorCode::BadOpcode,
            Self::Fuel => ErrorCode::Fuel,
            Self::Host(_) => ErrorCode::HostError,
        }
    }
}

/// Top-level runtime error.
///
/// Internal code matches on the variant-rich form; hosts crossing the
/// embedding boundary only ever see the flat [`ErrorCode`] from
/// [`VmError::code`] plus the formatted [`VmError::detail`] string.
#[derive(Debug, Error)]
pub enum VmError {
    /// The module container is malformed.
    #[error("bad module: {0}")]
    BadModule(String),
    /// Header magic bytes did not match.
    #[error("bad magic bytes")]
    BadMagic,
    /// Header version is not supported by this runtime.
    #[error("unsupported module version {0}")]
    Version(u32),
    /// Allocation failure (memory limit exceeded at init, or host OOM).
    #[error("out of memory: {0}")]
    Oom(String),
    /// `vm_call` was given an export name that doesn't exist.
    #[error("no export named {0:?}")]
    NoExport(String),
    /// An import has no matching host registration at `vm_init`.
    #[error("unresolved import {module}::{name}")]
    NoImport {
        /// Declared import module name.
        module: String,
        /// Declared import function name.
        name: String,
    },
    /// A guest-fatal trap occurred during execution.
    #[error(transparent)]
    Trap(#[from] Trap),
    /// The VM is not initialized and the requested operation requires it.
    #[error("vm is not initialized")]
    NotInitialized,
    /// A host registration was attempted after `vm_init`.
    #[error("cannot register host functions after init")]
    AlreadyInitialized,
    /// A `Vm` call was re-entered from within one of its own host callbacks.
    #[error("re-entrant call into the same vm")]
    ReEntrant,
}

impl VmError {
    /// Map to the closed ABI error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadModule(_) => ErrorCode::BadModule,
            Self::BadMagic => ErrorCode::BadMagic,
            Self::Version(_) => ErrorCode::Version,
            Self::Oom(_) => ErrorCode::Oom,
            Self::NoExport(_) => ErrorCode::NoExport,
            Self::NoImport { .. } => ErrorCode::NoImport,
            Self::Trap(t) => t.code(),
            Self::NotInitialized | Self::AlreadyInitialized | Self::ReEntrant => ErrorCode::HostError,
        }
    }

    /// The stable, human-readable message returned by `vm_last_error`.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// Convenience alias used throughout the interpreter.
pub type VmResult<T> = Result<T, VmError>;
