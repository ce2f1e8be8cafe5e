//! iron86: an instruction-accurate Intel 8086 core.
//!
//! The `cpu` module is the execution engine — registers, 1 MiB of physical
//! memory, the ModR/M addressing unit, the flag arithmetic and one handler
//! per instruction family. The `fixture` module runs the per-opcode
//! conformance files of (initial, final) state pairs against it.

pub mod cpu;
pub mod fixture;
