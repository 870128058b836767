//! The safe, primary embedding surface: [`Runtime`], [`Config`] and [`Vm`].
//!
//! This is the Rust-idiomatic realization of the ABI described in the
//! design notes (`vm_new`/`vm_register`/`vm_init`/`vm_call`/memory
//! accessors): methods on an owned struct instead of opaque-handle
//! C functions. The `ffi` module (behind the `capi` feature) restores the
//! literal C surface for non-Rust embedders.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::consts::{DEFAULT_MEMORY_LIMIT, DEFAULT_STACK_SIZE};
use crate::error::{VmError, VmResult};
use crate::host::{Caller, HostFunctionTable};
use crate::interpreter::{self, Fuel, Instance};
use crate::module::{ExportKind, Module};
use crate::types::Value;

/// Resource limits and metering knobs for a [`Vm`], set once at construction.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    stack_size: usize,
    memory_limit: u64,
    fuel_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            fuel_limit: 0,
        }
    }
}

impl Config {
    /// Maximum call depth. Default 512. Clamped to at least 1: a VM that
    /// cannot hold even its outermost frame could never run anything.
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size.max(1);
        self
    }

    /// Hard cap on linear memory, in bytes. Default 64 MiB. Clamped to at
    /// least one page, so a module that declares any memory at all can
    /// still be instantiated.
    pub fn with_memory_limit(mut self, memory_limit: u64) -> Self {
        self.memory_limit = memory_limit.max(crate::consts::PAGE_SIZE as u64);
        self
    }

    /// Instruction budget per call window; `0` disables metering.
    pub fn with_fuel_limit(mut self, fuel_limit: u64) -> Self {
        self.fuel_limit = fuel_limit;
        self
    }
}

/// A container-of-modules handle.
///
/// Carries no state of its own today beyond lifetime bookkeeping — modules
/// are `Arc`-shared and VMs borrow them directly — but gives the embedding
/// API a natural root to grow a module cache or shared diagnostics sink
/// into later.
#[derive(Debug, Default)]
pub struct Runtime;

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self
    }

    /// Parse and validate a module's bytes. Executes no guest code.
    pub fn load(&self, bytes: &[u8]) -> VmResult<Arc<Module>> {
        Ok(Arc::new(Module::load(bytes)?))
    }
}

/// One guest execution context: a module plus its own memory, globals, host
/// table and call stack.
///
/// Not `Sync` — a `Vm` is single-threaded cooperative per spec's concurrency
/// model, so the type only promises `Send` (moving a fully-idle `Vm` to
/// another thread is fine; calling it from two threads at once is not, and
/// the missing `Sync` impl makes the compiler enforce that the *caller*
/// serializes access rather than trusting documentation).
pub struct Vm {
    module: Arc<Module>,
    config: Config,
    host: HostFunctionTable,
    instance: Option<Instance>,
    fuel: Fuel,
    last_error: Option<String>,
    busy: bool,
}

impl Vm {
    /// Allocate frames and the host table for `module`. Touches no memory.
    pub fn new(module: Arc<Module>, config: Config) -> Self {
        let fuel_limit = if config.fuel_limit == 0 { None } else { Some(config.fuel_limit) };
        Self {
            module,
            config,
            host: HostFunctionTable::new(),
            instance: None,
            fuel: Fuel::new(fuel_limit),
            last_error: None,
            busy: false,
        }
    }

    /// Register a host callback for `module::name`. Rejected once
    /// [`Self::init`] has run, to prevent mid-call mutation of the host
    /// table the interpreter treats as read-only.
    pub fn register(
        &mut self,
        module: &str,
        name: &str,
        callback: impl FnMut(&mut Caller<'_>, &[Value]) -> Result<Value, i32> + Send + 'static,
    ) -> VmResult<()> {
        if self.instance.is_some() {
            return Err(self.record(VmError::AlreadyInitialized));
        }
        self.host.register(module, name, callback);
        Ok(())
    }

    /// Resolve imports, allocate memory, seed globals and data, and run
    /// `_init` if the module declares one.
    #[instrument(level = "debug", skip(self))]
    pub fn init(&mut self) -> VmResult<()> {
        if self.instance.is_some() {
            return Err(self.record(VmError::AlreadyInitialized));
        }
        match interpreter::instantiate(&self.module, &mut self.host, self.config.stack_size, self.config.memory_limit) {
            Ok(instance) => {
                debug!(pages = instance.memory.pages(), "vm initialized");
                self.instance = Some(instance);
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Locate an exported function by name and execute it.
    #[instrument(level = "debug", skip(self, args))]
    pub fn call(&mut self, name: &str, args: &[Value]) -> VmResult<Value> {
        if self.busy {
            return Err(self.record(VmError::ReEntrant));
        }
        if self.instance.is_none() {
            return Err(self.record(VmError::NotInitialized));
        }
        let export = match self.module.find_export(ExportKind::Func, name) {
            Some(export) => export,
            None => return Err(self.record(VmError::NoExport(name.to_owned()))),
        };

        self.busy = true;
        let instance = self.instance.as_mut().expect("checked Some above");
        let result = interpreter::call(
            &self.module,
            &mut instance.memory,
            &mut instance.globals,
            &mut self.host,
            &mut self.fuel,
            self.config.stack_size,
            export.index,
            args,
        );
        self.busy = false;

        result.map_err(|e| {
            warn!(%name, error = %e, "call trapped");
            self.record(e)
        })
    }

    /// Reset the fuel counter to a fresh budget.
    pub fn refuel(&mut self, budget: u64) {
        self.fuel = Fuel::new(if budget == 0 { None } else { Some(budget) });
    }

    /// Pointer to the start of linear memory.
    pub fn memory_base(&self) -> VmResult<*const u8> {
        Ok(self.instance_ref()?.memory.base_ptr())
    }

    /// Current linear memory size, in bytes.
    pub fn memory_size(&self) -> VmResult<u64> {
        Ok(self.instance_ref()?.memory.size())
    }

    /// Grow linear memory by `pages`, returning the previous page count.
    pub fn memory_grow(&mut self, pages: u32) -> VmResult<u32> {
        let instance = self.instance.as_mut().ok_or(VmError::NotInitialized)?;
        instance
            .memory
            .grow(pages)
            .ok_or_else(|| VmError::Oom(format!("grow by {pages} pages exceeds memory_limit")))
    }

    /// Copy `len` bytes out of linear memory at `offset`.
    pub fn memory_read(&self, offset: u32, len: u32) -> VmResult<&[u8]> {
        self.instance_ref()?.memory.read(offset as u64, len as u64).map_err(VmError::from)
    }

    /// Copy `src` into linear memory at `offset`.
    pub fn memory_write(&mut self, offset: u32, src: &[u8]) -> VmResult<()> {
        let instance = self.instance.as_mut().ok_or(VmError::NotInitialized)?;
        instance.memory.write(offset as u64, src).map_err(VmError::from)
    }

    /// The most recent error's detailed, human-readable message.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn instance_ref(&self) -> VmResult<&Instance> {
        self.instance.as_ref().ok_or(VmError::NotInitialized)
    }

    fn record(&mut self, err: VmError) -> VmError {
        self.last_error = Some(err.detail());
        err
    }
}

/// Stable, human-readable strings for each [`crate::error::ErrorCode`].
pub fn error_string(code: crate::error::ErrorCode) -> &'static str {
    use crate::error::ErrorCode::*;
    match code {
        Ok => "ok",
        BadModule => "malformed module",
        BadMagic => "bad magic number",
        Version => "unsupported container version",
        Oom => "out of memory",
        Bounds => "memory access out of bounds",
        DivZero => "division by zero",
        Type => "type mismatch",
        NoExport => "no such export",
        NoImport => "unresolved import",
        StackOverflow => "call stack overflow",
        Trap => "trap",
        Fuel => "fuel exhausted",
        BadOpcode => "unknown opcode",
        HostError => "host function error",
    }
}
