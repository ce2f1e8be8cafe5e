//! Conformance fixtures: per-opcode files of (initial, final) state pairs.
//!
//! A fixture file is a gzip-compressed JSON array; each element seeds a
//! fresh CPU, is stepped exactly once, and is then compared field by field.
//! `final.regs` lists only the registers the instruction changed — anything
//! unlisted must still hold its initial value.

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use serde::Deserialize;
use thiserror::Error;

use crate::cpu::{modrm, Cpu};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("case index {index} out of range: fixture holds {count} cases")]
    CaseOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Case {
    // Disassembly of the instruction under test.
    pub name: String,
    // The instruction encoding, placed at CS:IP.
    pub bytes: Vec<u8>,
    pub initial: CpuState,
    #[serde(rename = "final")]
    pub expected: CpuState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuState {
    #[serde(default)]
    pub regs: RegSet,
    // [address, byte] pairs.
    #[serde(default)]
    pub ram: Vec<(u32, u8)>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegSet {
    pub ax: Option<u16>,
    pub bx: Option<u16>,
    pub cx: Option<u16>,
    pub dx: Option<u16>,
    pub cs: Option<u16>,
    pub ss: Option<u16>,
    pub ds: Option<u16>,
    pub es: Option<u16>,
    pub sp: Option<u16>,
    pub bp: Option<u16>,
    pub si: Option<u16>,
    pub di: Option<u16>,
    pub ip: Option<u16>,
    pub flags: Option<u16>,
}

// A single field-level disagreement between the stepped CPU and the
// fixture's expected final state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub field: String,
    pub expected: u16,
    pub actual: u16,
}

// Load a fixture file. The content is sniffed: the gzip magic selects
// decompression, anything else is parsed as plain JSON (handy for small
// hand-written cases).
pub fn load(path: &Path) -> Result<Vec<Case>, FixtureError> {
    parse(&fs::read(path)?)
}

pub fn parse(data: &[u8]) -> Result<Vec<Case>, FixtureError> {
    if data.starts_with(&[0x1F, 0x8B]) {
        let mut json = Vec::new();
        GzDecoder::new(data).read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    } else {
        Ok(serde_json::from_slice(data)?)
    }
}

// Register values captured after seeding; the comparison baseline for every
// register the fixture's final state leaves unlisted.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    regs: [(&'static str, u16); 14],
}

fn snapshot(cpu: &Cpu) -> Snapshot {
    Snapshot {
        regs: [
            ("ax", cpu.ax),
            ("bx", cpu.bx),
            ("cx", cpu.cx),
            ("dx", cpu.dx),
            ("cs", cpu.cs),
            ("ss", cpu.ss),
            ("ds", cpu.ds),
            ("es", cpu.es),
            ("sp", cpu.sp),
            ("bp", cpu.bp),
            ("si", cpu.si),
            ("di", cpu.di),
            ("ip", cpu.ip),
            ("flags", cpu.flags),
        ],
    }
}

fn reg_by_name(set: &RegSet, name: &str) -> Option<u16> {
    match name {
        "ax" => set.ax,
        "bx" => set.bx,
        "cx" => set.cx,
        "dx" => set.dx,
        "cs" => set.cs,
        "ss" => set.ss,
        "ds" => set.ds,
        "es" => set.es,
        "sp" => set.sp,
        "bp" => set.bp,
        "si" => set.si,
        "di" => set.di,
        "ip" => set.ip,
        _ => set.flags,
    }
}

fn seed(cpu: &mut Cpu, case: &Case) {
    let regs = &case.initial.regs;
    if let Some(v) = regs.ax {
        cpu.ax = v;
    }
    if let Some(v) = regs.bx {
        cpu.bx = v;
    }
    if let Some(v) = regs.cx {
        cpu.cx = v;
    }
    if let Some(v) = regs.dx {
        cpu.dx = v;
    }
    if let Some(v) = regs.cs {
        cpu.cs = v;
    }
    if let Some(v) = regs.ss {
        cpu.ss = v;
    }
    if let Some(v) = regs.ds {
        cpu.ds = v;
    }
    if let Some(v) = regs.es {
        cpu.es = v;
    }
    if let Some(v) = regs.sp {
        cpu.sp = v;
    }
    if let Some(v) = regs.bp {
        cpu.bp = v;
    }
    if let Some(v) = regs.si {
        cpu.si = v;
    }
    if let Some(v) = regs.di {
        cpu.di = v;
    }
    if let Some(v) = regs.ip {
        cpu.ip = v;
    }
    if let Some(v) = regs.flags {
        cpu.flags = v;
    }

    // The encoding goes in first; initial.ram wins where they overlap.
    let code = modrm::phys(cpu.cs, cpu.ip);
    for (i, byte) in case.bytes.iter().enumerate() {
        cpu.memory.write_byte(code.wrapping_add(i as u32), *byte);
    }
    for &(addr, byte) in &case.initial.ram {
        cpu.memory.write_byte(addr, byte);
    }
}

// Seed a fresh CPU from the case, step once, and report every field that
// disagrees with the expected final state. An empty list is a pass.
pub fn run_case(case: &Case) -> Vec<Mismatch> {
    let mut cpu = Cpu::new();
    seed(&mut cpu, case);
    let before = snapshot(&cpu);
    cpu.step();
    let after = snapshot(&cpu);

    let mut mismatches = Vec::new();
    for (index, &(name, initial)) in before.regs.iter().enumerate() {
        let expected = reg_by_name(&case.expected.regs, name).unwrap_or(initial);
        let actual = after.regs[index].1;
        if actual != expected {
            mismatches.push(Mismatch { field: name.to_string(), expected, actual });
        }
    }
    for &(addr, byte) in &case.expected.ram {
        let actual = cpu.memory.read_byte(addr);
        if actual != byte {
            mismatches.push(Mismatch {
                field: format!("ram[{:#07x}]", addr),
                expected: byte as u16,
                actual: actual as u16,
            });
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    // MOV AL, 0x8A at 1000:5F6C; AH must survive, IP moves by two.
    const MOV_AL_CASE: &str = r#"[{
        "name": "mov al, 0x8a",
        "bytes": [176, 138],
        "initial": {
            "regs": { "ax": 43441, "cs": 4096, "ip": 24428, "flags": 0 },
            "ram": []
        },
        "final": {
            "regs": { "ax": 43402, "ip": 24430 },
            "ram": [[89964, 176], [89965, 138]]
        }
    }]"#;

    #[test]
    fn parses_plain_json() {
        let cases = parse(MOV_AL_CASE.as_bytes()).expect("schema should parse");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "mov al, 0x8a");
        assert_eq!(cases[0].bytes, vec![0xB0, 0x8A]);
        assert_eq!(cases[0].initial.regs.ax, Some(0xA9B1));
        assert_eq!(cases[0].expected.regs.bx, None);
    }

    #[test]
    fn parses_gzip_compressed_json() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(MOV_AL_CASE.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        let cases = parse(&compressed).expect("gzip fixture should parse");
        assert_eq!(cases.len(), 1);
    }

    #[test]
    fn passing_case_reports_no_mismatches() {
        let cases = parse(MOV_AL_CASE.as_bytes()).unwrap();
        assert_eq!(run_case(&cases[0]), vec![]);
    }

    #[test]
    fn unlisted_registers_are_checked_against_their_initial_values() {
        let mut cases = parse(MOV_AL_CASE.as_bytes()).unwrap();
        // Claim BX should have changed; the core must leave it at 0.
        cases[0].expected.regs.bx = Some(0x1234);
        let mismatches = run_case(&cases[0]);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "bx");
        assert_eq!(mismatches[0].expected, 0x1234);
        assert_eq!(mismatches[0].actual, 0x0000);
    }

    #[test]
    fn ram_expectations_are_compared_bytewise() {
        let mut cases = parse(MOV_AL_CASE.as_bytes()).unwrap();
        cases[0].expected.ram.push((0x0042, 0x99));
        let mismatches = run_case(&cases[0]);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "ram[0x00042]");
        assert_eq!(mismatches[0].actual, 0x00);
    }
}
