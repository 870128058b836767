//! Runtime-wide limits and sizes.

/// Number of registers in a function activation's register window.
pub const REGISTER_WINDOW: usize = 256;

/// Number of VM-wide argument staging slots consumed by `CALL`/`CALL_HOST`.
pub const ARG_SLOTS: usize = 16;

/// Maximum declared parameter count for a function type.
pub const MAX_PARAMS: usize = 16;

/// Maximum register count a function body may declare.
pub const MAX_REG_COUNT: usize = 256;

/// Bytes per linear memory page.
pub const PAGE_SIZE: u32 = 64 * 1024;

/// Default call-stack depth (`Config::stack_size`).
pub const DEFAULT_STACK_SIZE: usize = 512;

/// Default hard memory cap in bytes (`Config::memory_limit`).
pub const DEFAULT_MEMORY_LIMIT: u64 = 64 * 1024 * 1024;

/// Size of the fixed container header, in bytes.
pub const HEADER_LEN: usize = 20;

/// Magic bytes every module must start with.
pub const MAGIC: [u8; 4] = *b"RUNE";

/// Container format version this runtime accepts.
pub const VERSION: u32 = 1;

/// Size of an instruction word, in bytes.
pub const WORD_SIZE: usize = 4;
