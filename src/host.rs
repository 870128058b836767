//! The per-VM host function registry.
//!
//! A host function is a callback the embedding application supplies for an
//! import the guest module declares. The Rust-idiomatic realization of
//! spec.md's "callback + opaque user pointer" contract is a boxed
//! `FnMut` closure: the closure's captured environment *is* the user
//! context, so there is no separate pointer to manage on this side of the
//! API (the `ffi` module's C ABI restores the explicit `void*` for callers
//! that need it).

use crate::memory::LinearMemory;
use crate::types::Value;

/// Restricted view of the VM a host callback is allowed to touch while it
/// runs: the linear memory, for reading arguments passed by pointer or
/// writing results back into guest memory.
pub struct Caller<'a> {
    memory: &'a mut LinearMemory,
}

impl<'a> Caller<'a> {
    pub(crate) fn new(memory: &'a mut LinearMemory) -> Self {
        Self { memory }
    }

    /// Read `len` bytes at `offset` out of the guest's linear memory.
    pub fn read(&self, offset: u32, len: u32) -> Result<&[u8], crate::error::Trap> {
        self.memory.read(offset as u64, len as u64)
    }

    /// Write `bytes` into the guest's linear memory at `offset`.
    pub fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), crate::error::Trap> {
        self.memory.write(offset as u64, bytes)
    }

    /// Current memory size, in pages.
    pub const fn memory_pages(&self) -> u32 {
        self.memory.pages()
    }
}

/// Signature every registered host function implements.
///
/// Returning `Err(code)` propagates as `HOST_ERROR` and aborts the in-flight
/// `vm_call`; `Ok(value)` continues execution with `value` staged as the
/// call's result.
pub type HostFn = dyn FnMut(&mut Caller<'_>, &[Value]) -> Result<Value, i32> + Send;

struct Entry {
    module: String,
    name: String,
    callback: Box<HostFn>,
}

/// A per-VM registry of `(module, name) -> callback`, grown as registrations
/// are added and frozen once `vm_init` resolves imports against it.
#[derive(Default)]
pub struct HostFunctionTable {
    entries: Vec<Entry>,
}

impl HostFunctionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a callback for `module::name`. A duplicate registration
    /// replaces the previous one in place ("last wins", per §4.5, so
    /// behavior is deterministic regardless of registration order).
    pub fn register(
        &mut self,
        module: &str,
        name: &str,
        callback: impl FnMut(&mut Caller<'_>, &[Value]) -> Result<Value, i32> + Send + 'static,
    ) {
        let callback = Box::new(callback);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.module == module && e.name == name) {
            entry.callback = callback;
        } else {
            self.entries.push(Entry {
                module: module.to_owned(),
                name: name.to_owned(),
                callback,
            });
        }
    }

    /// Resolve `(module, name)` to a stable index usable with [`Self::call`].
    pub fn resolve(&self, module: &str, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.module == module && e.name == name)
    }

    /// Invoke the callback at `index` with the given arguments.
    pub fn call(&mut self, index: usize, caller: &mut Caller<'_>, args: &[Value]) -> Result<Value, i32> {
        (self.entries[index].callback)(caller, args)
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for HostFunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunctionTable")
            .field("entries", &self.entries.iter().map(|e| (&e.module, &e.name)).collect::<Vec<_>>())
            .finish()
    }
}
