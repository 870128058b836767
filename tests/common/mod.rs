//! Hand-rolled container encoder shared by the integration tests.
//!
//! There is no assembler in the library itself — bytecode ships as bytes —
//! so the test suite builds modules the way a toolchain author would: one
//! section buffer at a time, mirroring `Module::load`'s layout in reverse.

#![allow(dead_code)]

use runec_vm::types::ValueType;

const SEC_TYPE: u8 = 1;
const SEC_IMPORT: u8 = 2;
const SEC_FUNC: u8 = 3;
const SEC_MEMORY: u8 = 4;
const SEC_GLOBAL: u8 = 5;
const SEC_EXPORT: u8 = 6;
const SEC_CODE: u8 = 7;
const SEC_DATA: u8 = 8;

/// One instruction word plus its trailing immediates, pre-encoded to `u32`s.
pub struct Instr(pub Vec<u32>);

/// `op dst s1 s2` with no immediates.
pub fn op(opcode: u8, dst: u8, s1: u8, s2: u8) -> Instr {
    Instr(vec![u32::from_le_bytes([opcode, dst, s1, s2])])
}

/// `op dst s1 s2, imm32` with one trailing immediate.
pub fn op_imm(opcode: u8, dst: u8, s1: u8, s2: u8, imm: u32) -> Instr {
    Instr(vec![u32::from_le_bytes([opcode, dst, s1, s2]), imm])
}

/// `op dst s1 s2, imm64` with two trailing immediates (low word first).
pub fn op_imm64(opcode: u8, dst: u8, s1: u8, s2: u8, imm: u64) -> Instr {
    Instr(vec![
        u32::from_le_bytes([opcode, dst, s1, s2]),
        imm as u32,
        (imm >> 32) as u32,
    ])
}

fn str8(out: &mut Vec<u8>, s: &str) {
    assert!(s.len() <= u8::MAX as usize);
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

#[derive(Default)]
struct Ty {
    params: Vec<ValueType>,
    result: Option<ValueType>,
}

struct Fn_ {
    type_idx: u32,
    reg_count: u8,
    local_count: u8,
    code: Vec<u32>,
}

struct Imp {
    module: String,
    name: String,
    type_idx: u32,
}

struct Glob {
    ty: ValueType,
    mutable: bool,
    init_bits: u64,
}

struct Exp {
    kind: u8,
    index: u32,
    name: String,
}

struct Data {
    offset: u32,
    bytes: Vec<u8>,
}

/// Builds a module byte-for-byte, so tests can express "what the container
/// looks like" instead of hand-assembling every header and section.
#[derive(Default)]
pub struct ModuleBuilder {
    types: Vec<Ty>,
    imports: Vec<Imp>,
    functions: Vec<Fn_>,
    memory: Option<(u16, u16)>,
    globals: Vec<Glob>,
    exports: Vec<Exp>,
    data: Vec<Data>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a function type, returning its index.
    pub fn add_type(&mut self, params: &[ValueType], result: Option<ValueType>) -> u32 {
        self.types.push(Ty {
            params: params.to_vec(),
            result,
        });
        (self.types.len() - 1) as u32
    }

    /// Declare an import, occupying the next function index.
    pub fn add_import(&mut self, module: &str, name: &str, type_idx: u32) -> u32 {
        self.imports.push(Imp {
            module: module.to_owned(),
            name: name.to_owned(),
            type_idx,
        });
        (self.imports.len() - 1) as u32
    }

    /// Declare a function body, returning its function index (imports occupy
    /// the lower indices, same as [`runec_vm::module::Module`]).
    pub fn add_function(&mut self, type_idx: u32, reg_count: u8, local_count: u8, code: Vec<Instr>) -> u32 {
        let words = code.into_iter().flat_map(|i| i.0).collect();
        self.functions.push(Fn_ {
            type_idx,
            reg_count,
            local_count,
            code: words,
        });
        (self.imports.len() + self.functions.len() - 1) as u32
    }

    pub fn set_memory(&mut self, initial_pages: u16, max_pages: u16) -> &mut Self {
        self.memory = Some((initial_pages, max_pages));
        self
    }

    pub fn add_global(&mut self, ty: ValueType, mutable: bool, init_bits: u64) -> u32 {
        self.globals.push(Glob { ty, mutable, init_bits });
        (self.globals.len() - 1) as u32
    }

    pub fn export_func(&mut self, index: u32, name: &str) -> &mut Self {
        self.exports.push(Exp {
            kind: 0,
            index,
            name: name.to_owned(),
        });
        self
    }

    pub fn export_memory(&mut self, name: &str) -> &mut Self {
        self.exports.push(Exp {
            kind: 1,
            index: 0,
            name: name.to_owned(),
        });
        self
    }

    pub fn export_global(&mut self, index: u32, name: &str) -> &mut Self {
        self.exports.push(Exp {
            kind: 2,
            index,
            name: name.to_owned(),
        });
        self
    }

    pub fn add_data(&mut self, offset: u32, bytes: &[u8]) -> &mut Self {
        self.data.push(Data {
            offset,
            bytes: bytes.to_vec(),
        });
        self
    }

    /// Encode every declared section into container bytes, header included.
    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();

        if !self.types.is_empty() {
            let mut sec = Vec::new();
            sec.extend((self.types.len() as u32).to_le_bytes());
            for t in &self.types {
                sec.push(t.params.len() as u8);
                sec.push(t.result.is_some() as u8);
                for p in &t.params {
                    sec.push(p.to_byte());
                }
                if let Some(r) = t.result {
                    sec.push(r.to_byte());
                }
            }
            push_section(&mut body, SEC_TYPE, &sec);
        }

        if !self.imports.is_empty() {
            let mut sec = Vec::new();
            sec.extend((self.imports.len() as u32).to_le_bytes());
            for i in &self.imports {
                str8(&mut sec, &i.module);
                str8(&mut sec, &i.name);
                sec.extend((i.type_idx as u16).to_le_bytes());
            }
            push_section(&mut body, SEC_IMPORT, &sec);
        }

        if !self.functions.is_empty() {
            let mut sec = Vec::new();
            sec.extend((self.functions.len() as u32).to_le_bytes());
            for f in &self.functions {
                sec.extend((f.type_idx as u16).to_le_bytes());
                sec.push(f.reg_count);
                sec.push(f.local_count);
            }
            push_section(&mut body, SEC_FUNC, &sec);
        }

        if let Some((initial, max)) = self.memory {
            let mut sec = Vec::new();
            sec.extend(initial.to_le_bytes());
            sec.extend(max.to_le_bytes());
            push_section(&mut body, SEC_MEMORY, &sec);
        }

        if !self.globals.is_empty() {
            let mut sec = Vec::new();
            sec.extend((self.globals.len() as u32).to_le_bytes());
            for g in &self.globals {
                sec.push(g.ty.to_byte());
                sec.push(g.mutable as u8);
                sec.extend(g.init_bits.to_le_bytes());
            }
            push_section(&mut body, SEC_GLOBAL, &sec);
        }

        if !self.exports.is_empty() {
            let mut sec = Vec::new();
            sec.extend((self.exports.len() as u32).to_le_bytes());
            for e in &self.exports {
                sec.push(e.kind);
                sec.extend(e.index.to_le_bytes());
                str8(&mut sec, &e.name);
            }
            push_section(&mut body, SEC_EXPORT, &sec);
        }

        if !self.functions.is_empty() {
            let mut sec = Vec::new();
            sec.extend((self.functions.len() as u32).to_le_bytes());
            for f in &self.functions {
                let bytes: Vec<u8> = f.code.iter().flat_map(|w| w.to_le_bytes()).collect();
                sec.extend((bytes.len() as u32).to_le_bytes());
                sec.extend(bytes);
            }
            push_section(&mut body, SEC_CODE, &sec);
        }

        if !self.data.is_empty() {
            let mut sec = Vec::new();
            sec.extend((self.data.len() as u32).to_le_bytes());
            for d in &self.data {
                sec.push(0); // mem_index
                sec.extend(d.offset.to_le_bytes());
                sec.extend((d.bytes.len() as u32).to_le_bytes());
                sec.extend(&d.bytes);
            }
            push_section(&mut body, SEC_DATA, &sec);
        }

        let mut out = Vec::with_capacity(20 + body.len());
        out.extend(*b"RUNE");
        out.extend(1u32.to_le_bytes()); // VERSION
        out.extend([0u8; 8]); // reserved
        out.extend(crc32(&body).to_le_bytes());
        out.extend(body);
        out
    }
}

fn push_section(out: &mut Vec<u8>, id: u8, sec: &[u8]) {
    out.push(id);
    out.extend((sec.len() as u32).to_le_bytes());
    out.extend(sec);
}

/// Same polynomial as `runec_vm::container::crc32`; duplicated here so the
/// builder has no dependency on the crate's private module.
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut table = [0u32; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut c = i as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
        }
        *slot = c;
    }
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let idx = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = table[idx] ^ (crc >> 8);
    }
    !crc
}
