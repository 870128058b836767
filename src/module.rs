//! The parsed, owning representation of a loaded bytecode container.
//!
//! See §4.1 of the design for the on-disk layout this module decodes.

use itertools::Itertools;

use crate::consts::{HEADER_LEN, MAGIC, MAX_PARAMS, VERSION, WORD_SIZE};
use crate::container::{crc32, Reader};
use crate::error::VmError;
use crate::types::{FuncType, ValueType};

const SEC_TYPE: u8 = 1;
const SEC_IMPORT: u8 = 2;
const SEC_FUNC: u8 = 3;
const SEC_MEMORY: u8 = 4;
const SEC_GLOBAL: u8 = 5;
const SEC_EXPORT: u8 = 6;
const SEC_CODE: u8 = 7;
const SEC_DATA: u8 = 8;

/// `(module_name, function_name, type_index)`.
#[derive(Debug, Clone)]
pub struct Import {
    /// Name of the module the host groups this function under.
    pub module: String,
    /// Function name within that module.
    pub name: String,
    /// Index into [`Module::types`].
    pub type_idx: u32,
}

/// A parsed function body: decoded 32-bit instruction words plus the
/// register/local counts declared in the FUNC section.
#[derive(Debug, Clone)]
pub struct FunctionBody {
    /// Index into [`Module::types`].
    pub type_idx: u32,
    /// Size of this activation's register window in use (`<= 256`).
    pub reg_count: u8,
    /// Number of local slots reserved beyond the parameters.
    pub local_count: u8,
    /// Decoded instruction words, owned by the body (see the design notes
    /// on why code is copied rather than borrowed from the container
    /// bytes).
    pub code: Vec<u32>,
}

/// A function is either a host import or a decoded body; both occupy the
/// same index space, imports first.
#[derive(Debug, Clone)]
pub enum Function {
    /// Resolved to a host callback at `vm_init`.
    Import(u32),
    /// A guest-defined function body.
    Body(FunctionBody),
}

/// `(type, mutable?, initial_value)`. Globals are instantiation templates;
/// a [`crate::vm::Vm`] copies them into a mutable array at `vm_init`.
#[derive(Debug, Clone, Copy)]
pub struct Global {
    /// Declared value type.
    pub ty: ValueType,
    /// Whether `STGLOBAL` may write this slot.
    pub mutable: bool,
    /// Raw bit pattern of the initial value.
    pub init_bits: u64,
}

/// `(initial_pages, max_pages)`. `max_pages == 0` is normalized to
/// `initial_pages` at parse time.
#[derive(Debug, Clone, Copy)]
pub struct MemoryDesc {
    /// Page count available immediately after instantiation.
    pub initial_pages: u32,
    /// Page count `MEM_GROW` may not exceed.
    pub max_pages: u32,
}

/// A one-shot byte copy applied into linear memory at instantiation.
#[derive(Debug, Clone)]
pub struct DataSegment {
    /// Reserved for future multi-memory support; always `0` today.
    pub mem_index: u8,
    /// Destination offset in linear memory.
    pub offset: u32,
    /// Bytes to copy.
    pub bytes: Vec<u8>,
}

/// The kind of item an [`Export`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    /// Names a function index.
    Func,
    /// Names the module's single memory.
    Memory,
    /// Names a global index.
    Global,
}

/// `(kind, index, name)`. Names are unique per kind.
#[derive(Debug, Clone)]
pub struct Export {
    /// What this export refers to.
    pub kind: ExportKind,
    /// Index into the corresponding table.
    pub index: u32,
    /// Export name, as seen by `vm_call`.
    pub name: String,
}

/// A validated, read-only parsed container produced from bytecode bytes.
///
/// Code slices borrow from nothing — each [`FunctionBody`] owns its decoded
/// words — so a `Module` has no internal lifetime parameter and can be
/// freely shared (`Arc<Module>`) across VM instances, matching §5's "the
/// Module they share is read-only after load".
#[derive(Debug, Clone)]
pub struct Module {
    types: Vec<FuncType>,
    imports: Vec<Import>,
    functions: Vec<Function>,
    memory: Option<MemoryDesc>,
    globals: Vec<Global>,
    exports: Vec<Export>,
    data: Vec<DataSegment>,
    init_func: Option<u32>,
}

impl Module {
    /// Parse and validate a module from its container bytes.
    ///
    /// Performs no guest-code execution: only structural validation as
    /// described in §4.4.
    pub fn load(bytes: &[u8]) -> Result<Self, VmError> {
        if bytes.len() < HEADER_LEN {
            return Err(VmError::BadModule("truncated header".into()));
        }

        if bytes[0..4] != MAGIC {
            return Err(VmError::BadMagic);
        }

        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(VmError::Version(version));
        }

        let declared_crc = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
        let actual_crc = crc32(&bytes[HEADER_LEN..]);
        if declared_crc != actual_crc {
            return Err(VmError::BadModule("crc mismatch".into()));
        }

        let mut type_bytes: Option<&[u8]> = None;
        let mut import_bytes: Option<&[u8]> = None;
        let mut func_bytes: Option<&[u8]> = None;
        let mut memory_bytes: Option<&[u8]> = None;
        let mut global_bytes: Option<&[u8]> = None;
        let mut export_bytes: Option<&[u8]> = None;
        let mut code_bytes: Option<&[u8]> = None;
        let mut data_bytes: Option<&[u8]> = None;

        let mut reader = Reader::new(&bytes[HEADER_LEN..]);
        while !reader.is_empty() {
            let id = reader.u8("section id")?;
            let size = reader.u32("section size")? as usize;
            let start = reader.position();
            let body = reader.take(size, "section body")?;
            let slot = match id {
                SEC_TYPE => &mut type_bytes,
                SEC_IMPORT => &mut import_bytes,
                SEC_FUNC => &mut func_bytes,
                SEC_MEMORY => &mut memory_bytes,
                SEC_GLOBAL => &mut global_bytes,
                SEC_EXPORT => &mut export_bytes,
                SEC_CODE => &mut code_bytes,
                SEC_DATA => &mut data_bytes,
                _ => continue, // unknown section: skip for forward compatibility
            };
            if slot.is_some() {
                return Err(VmError::BadModule(format!(
                    "duplicate section {id} at offset {start}"
                )));
            }
            *slot = Some(body);
        }

        let types = type_bytes.map(parse_types).transpose()?.unwrap_or_default();
        let imports = import_bytes
            .map(|b| parse_imports(b, types.len()))
            .transpose()?
            .unwrap_or_default();
        let bodies = func_bytes
            .map(|b| parse_func_headers(b, types.len()))
            .transpose()?
            .unwrap_or_default();
        let memory = memory_bytes.map(parse_memory).transpose()?;
        let globals = global_bytes.map(parse_globals).transpose()?.unwrap_or_default();
        let exports = export_bytes
            .map(|b| parse_exports(b, imports.len() + bodies.len(), globals.len(), memory.is_some()))
            .transpose()?
            .unwrap_or_default();
        let code = code_bytes
            .map(|b| parse_code(b, bodies.len()))
            .transpose()?
            .unwrap_or_default();
        if bodies.len() != code.len() {
            return Err(VmError::BadModule(format!(
                "FUNC declares {} bodies but CODE provides {}",
                bodies.len(),
                code.len()
            )));
        }
        let data = data_bytes
            .map(|b| parse_data(b, memory.map_or(0, |m| m.initial_pages)))
            .transpose()?
            .unwrap_or_default();

        let mut functions = Vec::with_capacity(imports.len() + bodies.len());
        functions.extend((0..imports.len() as u32).map(Function::Import));
        functions.extend(
            bodies
                .into_iter()
                .zip(code)
                .map(|((type_idx, reg_count, local_count), code)| {
                    Function::Body(FunctionBody {
                        type_idx,
                        reg_count,
                        local_count,
                        code,
                    })
                }),
        );

        let init_func = exports
            .iter()
            .find(|e| e.kind == ExportKind::Func && e.name == "_init")
            .map(|e| e.index);

        Ok(Self {
            types,
            imports,
            functions,
            memory,
            globals,
            exports,
            data,
            init_func,
        })
    }

    /// Declared function types.
    pub fn types(&self) -> &[FuncType] {
        &self.types
    }

    /// Declared imports, occupying function indices `[0, imports().len())`.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// All functions, imports first, then bodies.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// The module's single memory descriptor, if it declares one.
    pub const fn memory(&self) -> Option<MemoryDesc> {
        self.memory
    }

    /// Global templates, copied into a mutable array at `vm_init`.
    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// Named exports.
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Data segments, applied once at `vm_init`.
    pub fn data(&self) -> &[DataSegment] {
        &self.data
    }

    /// The function index exported as `_init`, if the module declares one.
    pub const fn init_func(&self) -> Option<u32> {
        self.init_func
    }

    /// Look up an export by name and kind.
    pub fn find_export(&self, kind: ExportKind, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.kind == kind && e.name == name)
    }

    /// The function type of a given function index, if it exists.
    pub fn function_type(&self, index: u32) -> Option<&FuncType> {
        let func = self.functions.get(index as usize)?;
        let type_idx = match func {
            Function::Import(i) => self.imports[*i as usize].type_idx,
            Function::Body(b) => b.type_idx,
        };
        self.types.get(type_idx as usize)
    }
}

fn parse_types(body: &[u8]) -> Result<Vec<FuncType>, VmError> {
    let mut r = Reader::new(body);
    let count = r.u32("type count")?;
    let mut out = Vec::new();
    for _ in 0..count {
        let param_count = r.u8("param count")? as usize;
        if param_count > MAX_PARAMS {
            return Err(VmError::BadModule(format!(
                "type declares {param_count} params, limit is {MAX_PARAMS}"
            )));
        }
        let return_count = r.u8("return count")?;
        if return_count > 1 {
            return Err(VmError::BadModule("multi-result types are not supported".into()));
        }
        let mut params = Vec::with_capacity(param_count);
        for _ in 0..param_count {
            params.push(read_value_type(&mut r, "param type")?);
        }
        let result = if return_count == 1 {
            Some(read_value_type(&mut r, "return type")?)
        } else {
            None
        };
        out.push(FuncType::new(params, result));
    }
    Ok(out)
}

fn read_value_type(r: &mut Reader<'_>, what: &str) -> Result<ValueType, VmError> {
    let b = r.u8(what)?;
    ValueType::from_byte(b).ok_or_else(|| VmError::BadModule(format!("unknown value type byte {b:#04x}")))
}

fn parse_imports(body: &[u8], type_count: usize) -> Result<Vec<Import>, VmError> {
    let mut r = Reader::new(body);
    let count = r.u32("import count")?;
    let mut out = Vec::new();
    for _ in 0..count {
        let module = r.str8("import module name")?.to_owned();
        let name = r.str8("import function name")?.to_owned();
        let type_idx = r.u16("import type index")? as u32;
        if type_idx as usize >= type_count {
            return Err(VmError::BadModule(format!(
                "import {module}::{name} references unknown type {type_idx}"
            )));
        }
        out.push(Import { module, name, type_idx });
    }
    Ok(out)
}

/// Returns `(type_idx, reg_count, local_count)` triples; bodies are matched
/// up with the CODE section afterward.
fn parse_func_headers(body: &[u8], type_count: usize) -> Result<Vec<(u32, u8, u8)>, VmError> {
    let mut r = Reader::new(body);
    let count = r.u32("func count")?;
    let mut out = Vec::new();
    for _ in 0..count {
        let type_idx = r.u16("func type index")? as u32;
        if type_idx as usize >= type_count {
            return Err(VmError::BadModule(format!("function references unknown type {type_idx}")));
        }
        let reg_count = r.u8("reg count")?;
        let local_count = r.u8("local count")?;
        out.push((type_idx, reg_count, local_count));
    }
    Ok(out)
}

fn parse_memory(body: &[u8]) -> Result<MemoryDesc, VmError> {
    let mut r = Reader::new(body);
    let initial = r.u16("memory initial pages")? as u32;
    let mut max = r.u16("memory max pages")? as u32;
    if max == 0 {
        max = initial;
    }
    if max < initial {
        return Err(VmError::BadModule("memory max pages is smaller than initial".into()));
    }
    Ok(MemoryDesc {
        initial_pages: initial,
        max_pages: max,
    })
}

fn parse_globals(body: &[u8]) -> Result<Vec<Global>, VmError> {
    let mut r = Reader::new(body);
    let count = r.u32("global count")?;
    let mut out = Vec::new();
    for _ in 0..count {
        let ty = read_value_type(&mut r, "global type")?;
        let mutable = r.u8("global mutable flag")? != 0;
        let init_bits = r.u64("global initial value")?;
        out.push(Global { ty, mutable, init_bits });
    }
    Ok(out)
}

fn parse_exports(
    body: &[u8],
    func_count: usize,
    global_count: usize,
    has_memory: bool,
) -> Result<Vec<Export>, VmError> {
    let mut r = Reader::new(body);
    let count = r.u32("export count")?;
    let mut out: Vec<Export> = Vec::new();
    for _ in 0..count {
        let kind_byte = r.u8("export kind")?;
        let kind = match kind_byte {
            0 => ExportKind::Func,
            1 => ExportKind::Memory,
            2 => ExportKind::Global,
            _ => return Err(VmError::BadModule(format!("unknown export kind {kind_byte:#04x}"))),
        };
        let index = r.u32("export index")?;
        let name = r.str8("export name")?.to_owned();

        let valid = match kind {
            ExportKind::Func => (index as usize) < func_count,
            ExportKind::Memory => has_memory && index == 0,
            ExportKind::Global => (index as usize) < global_count,
        };
        if !valid {
            return Err(VmError::BadModule(format!(
                "export {name:?} references an out-of-range index {index}"
            )));
        }
        out.push(Export { kind, index, name });
    }
    if let Some(dup) = out.iter().duplicates_by(|e| (e.kind, &e.name)).next() {
        return Err(VmError::BadModule(format!("duplicate export {:?}", dup.name)));
    }
    Ok(out)
}

fn parse_code(body: &[u8], expected_bodies: usize) -> Result<Vec<Vec<u32>>, VmError> {
    let mut r = Reader::new(body);
    let count = r.u32("code body count")? as usize;
    if count != expected_bodies {
        return Err(VmError::BadModule(format!(
            "CODE declares {count} bodies, FUNC declared {expected_bodies}"
        )));
    }
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let size = r.u32("code body size")? as usize;
        if size % WORD_SIZE != 0 {
            return Err(VmError::BadModule(format!("code body size {size} is not word-aligned")));
        }
        let bytes = r.take(size, "code body")?;
        let words = bytes
            .chunks_exact(WORD_SIZE)
            .map(|w| u32::from_le_bytes(w.try_into().unwrap()))
            .collect();
        out.push(words);
    }
    Ok(out)
}

fn parse_data(body: &[u8], initial_pages: u32) -> Result<Vec<DataSegment>, VmError> {
    let mut r = Reader::new(body);
    let count = r.u32("data segment count")?;
    let mem_size = initial_pages as u64 * crate::consts::PAGE_SIZE as u64;
    let mut out = Vec::new();
    for _ in 0..count {
        let mem_index = r.u8("data mem index")?;
        if mem_index != 0 {
            return Err(VmError::BadModule(format!("data segment references unknown memory {mem_index}")));
        }
        let offset = r.u32("data offset")?;
        let size = r.u32("data size")?;
        let bytes = r.take(size as usize, "data bytes")?.to_vec();
        let end = offset as u64 + size as u64;
        if end > mem_size {
            return Err(VmError::BadModule(format!(
                "data segment [{offset}, {end}) does not fit in {initial_pages} initial pages"
            )));
        }
        out.push(DataSegment {
            mem_index,
            offset,
            bytes,
        });
    }
    Ok(out)
}
