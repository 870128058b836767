//! Instantiation: resolve imports, allocate memory, seed globals, apply data
//! segments and run the optional `_init` export.

use super::dispatch;
use super::fuel::Fuel;
use crate::consts::PAGE_SIZE;
use crate::error::VmError;
use crate::host::HostFunctionTable;
use crate::memory::LinearMemory;
use crate::module::Module;
use crate::types::Value;

/// Owned, mutable state produced by instantiating a [`Module`] once.
pub(crate) struct Instance {
    pub(crate) memory: LinearMemory,
    pub(crate) globals: Vec<u64>,
}

/// Resolve every import against `host`, allocate memory, seed globals and
/// data, and — if the module exports `_init` — run it to completion.
///
/// Fails with [`VmError::NoImport`] on the first unresolved import, leaving
/// the VM uninitialized (§7: "OOM during init leaves the VM uninitialized").
pub(crate) fn instantiate(
    module: &Module,
    host: &mut HostFunctionTable,
    stack_capacity: usize,
    memory_limit: u64,
) -> Result<Instance, VmError> {
    for import in module.imports() {
        if host.resolve(&import.module, &import.name).is_none() {
            return Err(VmError::NoImport {
                module: import.module.clone(),
                name: import.name.clone(),
            });
        }
    }

    let desc = module.memory();
    let initial = desc.map_or(0, |d| d.initial_pages);
    let max = desc.map_or(0, |d| d.max_pages);
    let limit_pages = (memory_limit / PAGE_SIZE as u64) as u32;
    if initial.max(max) > limit_pages {
        return Err(VmError::Oom(format!(
            "module memory (initial={initial}, max={max} pages) exceeds the configured \
             memory_limit of {limit_pages} pages"
        )));
    }
    let mut memory = LinearMemory::new(initial, max);

    for segment in module.data() {
        memory.apply_data(segment.offset, &segment.bytes)?;
    }

    let globals: Vec<u64> = module.globals().iter().map(|g| g.init_bits).collect();

    let mut instance = Instance { memory, globals };

    if let Some(init_func) = module.init_func() {
        let mut fuel = Fuel::new(None);
        dispatch::call(
            module,
            &mut instance.memory,
            &mut instance.globals,
            host,
            &mut fuel,
            stack_capacity,
            init_func,
            &[] as &[Value],
        )?;
    }

    Ok(instance)
}
