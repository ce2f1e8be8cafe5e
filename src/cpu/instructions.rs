//! Per-instruction semantics for the 8086 opcode map.
//!
//! `execute` is the single dispatch point: one exhaustive match over the
//! primary opcode byte, with the family handlers below it. Handlers are
//! responsible for advancing IP — linear instructions by their encoded
//! length, control flow directly to the target. Prefix bytes never reach
//! this module; `Cpu::step` consumes them first.
//!
//! Opcode map ref: http://www.mlsite.net/8086/

use log::debug;

use super::modrm::{self, ModRm, Operand};
use super::{alu, Cpu, Flags, RepPrefix, SegReg, StepOutcome, SAHF_MASK};

pub fn execute(cpu: &mut Cpu, opcode: u8, start_ip: u16) -> StepOutcome {
    match opcode {
        // ALU block: each row is op r/m,r | r,r/m | accumulator,imm
        0x00..=0x05 => alu_family(cpu, AluOp::Add, opcode),
        0x08..=0x0D => alu_family(cpu, AluOp::Or, opcode),
        0x10..=0x15 => alu_family(cpu, AluOp::Adc, opcode),
        0x18..=0x1D => alu_family(cpu, AluOp::Sbb, opcode),
        0x20..=0x25 => alu_family(cpu, AluOp::And, opcode),
        0x28..=0x2D => alu_family(cpu, AluOp::Sub, opcode),
        0x30..=0x35 => alu_family(cpu, AluOp::Xor, opcode),
        0x38..=0x3D => alu_family(cpu, AluOp::Cmp, opcode),

        // Segment register pushes and pops. 0x0F (POP CS) is undocumented
        // but decodes like its neighbours on the 8086.
        0x06 | 0x0E | 0x16 | 0x1E => push_seg(cpu, opcode),
        0x07 | 0x0F | 0x17 | 0x1F => pop_seg(cpu, opcode),

        0x27 => daa(cpu),
        0x2F => das(cpu),
        0x37 => aaa(cpu),
        0x3F => aas(cpu),

        0x40..=0x47 => inc_r16(cpu, opcode & 0x07),
        0x48..=0x4F => dec_r16(cpu, opcode & 0x07),
        0x50..=0x57 => push_r16(cpu, opcode & 0x07),
        0x58..=0x5F => pop_r16(cpu, opcode & 0x07),

        // 0x60..0x6F decode as aliases of the conditional jumps on the 8086.
        0x60..=0x7F => jcc(cpu, opcode & 0x0F),

        0x80..=0x83 => grp1(cpu, opcode),
        0x84 => test_rm_r8(cpu),
        0x85 => test_rm_r16(cpu),
        0x86 => xchg_rm_r8(cpu),
        0x87 => xchg_rm_r16(cpu),
        0x88 => mov_rm_r8(cpu),
        0x89 => mov_rm_r16(cpu),
        0x8A => mov_r_rm8(cpu),
        0x8B => mov_r_rm16(cpu),
        0x8C => mov_rm_sreg(cpu),
        0x8D => lea(cpu),
        0x8E => mov_sreg_rm(cpu),
        0x8F => pop_rm16(cpu),

        0x90..=0x97 => xchg_ax_r16(cpu, opcode & 0x07),
        0x98 => cbw(cpu),
        0x99 => cwd(cpu),
        0x9A => call_far(cpu),
        // No TEST pin is modelled; WAIT falls through immediately.
        0x9B => advance(cpu, 1),
        0x9C => pushf(cpu),
        0x9D => popf(cpu),
        0x9E => sahf(cpu),
        0x9F => lahf(cpu),

        0xA0..=0xA3 => mov_accumulator_moffs(cpu, opcode),
        0xA4..=0xA7 | 0xAA..=0xAF => string_family(cpu, opcode, start_ip),
        0xA8 => test_al_imm(cpu),
        0xA9 => test_ax_imm(cpu),

        0xB0..=0xB7 => mov_r8_imm(cpu, opcode & 0x07),
        0xB8..=0xBF => mov_r16_imm(cpu, opcode & 0x07),

        // 0xC0/0xC1 and 0xC8/0xC9 are undocumented aliases of the returns.
        0xC0 | 0xC2 => ret_near_imm(cpu),
        0xC1 | 0xC3 => ret_near(cpu),
        0xC4 => les(cpu),
        0xC5 => lds(cpu),
        0xC6 => mov_rm8_imm(cpu),
        0xC7 => mov_rm16_imm(cpu),
        0xC8 | 0xCA => ret_far_imm(cpu),
        0xC9 | 0xCB => ret_far(cpu),
        0xCC => {
            let next_ip = cpu.ip.wrapping_add(1);
            interrupt(cpu, 3, next_ip)
        }
        0xCD => {
            let vector = fetch_byte(cpu, 1);
            let next_ip = cpu.ip.wrapping_add(2);
            interrupt(cpu, vector, next_ip)
        }
        0xCE => into(cpu),
        0xCF => iret(cpu),

        0xD0..=0xD3 => grp2(cpu, opcode),
        0xD4 => aam(cpu),
        0xD5 => aad(cpu),
        0xD6 => salc(cpu),
        0xD7 => xlat(cpu),
        // ESC: the 8087 would claim these; decode the ModR/M and move on.
        0xD8..=0xDF => {
            let m = decode_modrm(cpu);
            advance(cpu, 1 + m.len as u16)
        }

        0xE0 => loop_cond(cpu, LoopKind::WhileNotZero),
        0xE1 => loop_cond(cpu, LoopKind::WhileZero),
        0xE2 => loop_cond(cpu, LoopKind::Plain),
        0xE3 => jcxz(cpu),
        0xE4..=0xE7 | 0xEC..=0xEF => io(cpu, opcode),
        0xE8 => call_near(cpu),
        0xE9 => jmp_near(cpu),
        0xEA => jmp_far(cpu),
        0xEB => jmp_short(cpu),

        0xF4 => hlt(cpu),
        0xF5 => cmc(cpu),
        0xF6 => grp3(cpu, false),
        0xF7 => grp3(cpu, true),
        0xF8 => set_single_flag(cpu, Flags::CF, false),
        0xF9 => set_single_flag(cpu, Flags::CF, true),
        0xFA => set_single_flag(cpu, Flags::IF, false),
        0xFB => set_single_flag(cpu, Flags::IF, true),
        0xFC => set_single_flag(cpu, Flags::DF, false),
        0xFD => set_single_flag(cpu, Flags::DF, true),
        0xFE => grp4(cpu),
        0xFF => grp5(cpu),

        // Everything else — including LOCK and 0xF1, which this core does
        // not accept as prefixes — is the undefined branch.
        _ => undefined(cpu, opcode),
    }
}

fn undefined(cpu: &Cpu, opcode: u8) -> StepOutcome {
    debug!("undefined opcode {:#04x} at {:04x}:{:04x}", opcode, cpu.cs, cpu.ip);
    StepOutcome::UndefinedOpcode(opcode)
}

// ---- fetch and operand plumbing --------------------------------------

fn advance(cpu: &mut Cpu, length: u16) -> StepOutcome {
    cpu.ip = cpu.ip.wrapping_add(length);
    StepOutcome::Continued
}

// Instruction bytes relative to the opcode at CS:IP.
fn fetch_byte(cpu: &Cpu, index: u16) -> u8 {
    cpu.memory.read_byte(modrm::phys(cpu.cs, cpu.ip.wrapping_add(index)))
}

fn fetch_word(cpu: &Cpu, index: u16) -> u16 {
    cpu.memory.read_word(modrm::phys(cpu.cs, cpu.ip.wrapping_add(index)))
}

fn decode_modrm(cpu: &Cpu) -> ModRm {
    modrm::decode(cpu, modrm::phys(cpu.cs, cpu.ip.wrapping_add(1)))
}

fn read_rm8(cpu: &Cpu, m: &ModRm) -> u8 {
    match m.operand {
        Operand::Reg(index) => cpu.reg8(index),
        Operand::Mem { addr, .. } => cpu.memory.read_byte(addr),
    }
}

fn write_rm8(cpu: &mut Cpu, m: &ModRm, value: u8) {
    match m.operand {
        Operand::Reg(index) => cpu.set_reg8(index, value),
        Operand::Mem { addr, .. } => cpu.memory.write_byte(addr, value),
    }
}

fn read_rm16(cpu: &Cpu, m: &ModRm) -> u16 {
    match m.operand {
        Operand::Reg(index) => cpu.reg16(index),
        Operand::Mem { addr, .. } => cpu.memory.read_word(addr),
    }
}

fn write_rm16(cpu: &mut Cpu, m: &ModRm, value: u16) {
    match m.operand {
        Operand::Reg(index) => cpu.set_reg16(index, value),
        Operand::Mem { addr, .. } => cpu.memory.write_word(addr, value),
    }
}

// ---- the two-operand ALU block ---------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AluOp {
    Add,
    Or,
    Adc,
    Sbb,
    And,
    Sub,
    Xor,
    Cmp,
}

impl AluOp {
    // Subfunction order shared by the 0x00..0x3D rows and Grp1.
    fn from_index(index: u8) -> AluOp {
        match index & 0x07 {
            0 => AluOp::Add,
            1 => AluOp::Or,
            2 => AluOp::Adc,
            3 => AluOp::Sbb,
            4 => AluOp::And,
            5 => AluOp::Sub,
            6 => AluOp::Xor,
            _ => AluOp::Cmp,
        }
    }

    fn writes_back(self) -> bool {
        self != AluOp::Cmp
    }
}

fn alu_op8(cpu: &mut Cpu, op: AluOp, dst: u8, src: u8) -> u8 {
    let carry = cpu.flag(Flags::CF);
    let (result, flags) = match op {
        AluOp::Add => alu::add8(cpu.flags, dst, src, false),
        AluOp::Adc => alu::add8(cpu.flags, dst, src, carry),
        AluOp::Sub | AluOp::Cmp => alu::sub8(cpu.flags, dst, src, false),
        AluOp::Sbb => alu::sub8(cpu.flags, dst, src, carry),
        AluOp::And => {
            let r = dst & src;
            (r, alu::logic8(cpu.flags, r))
        }
        AluOp::Or => {
            let r = dst | src;
            (r, alu::logic8(cpu.flags, r))
        }
        AluOp::Xor => {
            let r = dst ^ src;
            (r, alu::logic8(cpu.flags, r))
        }
    };
    cpu.flags = flags;
    result
}

fn alu_op16(cpu: &mut Cpu, op: AluOp, dst: u16, src: u16) -> u16 {
    let carry = cpu.flag(Flags::CF);
    let (result, flags) = match op {
        AluOp::Add => alu::add16(cpu.flags, dst, src, false),
        AluOp::Adc => alu::add16(cpu.flags, dst, src, carry),
        AluOp::Sub | AluOp::Cmp => alu::sub16(cpu.flags, dst, src, false),
        AluOp::Sbb => alu::sub16(cpu.flags, dst, src, carry),
        AluOp::And => {
            let r = dst & src;
            (r, alu::logic16(cpu.flags, r))
        }
        AluOp::Or => {
            let r = dst | src;
            (r, alu::logic16(cpu.flags, r))
        }
        AluOp::Xor => {
            let r = dst ^ src;
            (r, alu::logic16(cpu.flags, r))
        }
    };
    cpu.flags = flags;
    result
}

// The six encodings every ALU row shares, selected by the low opcode bits:
// 0 r/m8,r8  1 r/m16,r16  2 r8,r/m8  3 r16,r/m16  4 AL,imm8  5 AX,imm16.
fn alu_family(cpu: &mut Cpu, op: AluOp, opcode: u8) -> StepOutcome {
    match opcode & 0x07 {
        0 => {
            let m = decode_modrm(cpu);
            let dst = read_rm8(cpu, &m);
            let src = cpu.reg8(m.reg);
            let result = alu_op8(cpu, op, dst, src);
            if op.writes_back() {
                write_rm8(cpu, &m, result);
            }
            advance(cpu, 1 + m.len as u16)
        }
        1 => {
            let m = decode_modrm(cpu);
            let dst = read_rm16(cpu, &m);
            let src = cpu.reg16(m.reg);
            let result = alu_op16(cpu, op, dst, src);
            if op.writes_back() {
                write_rm16(cpu, &m, result);
            }
            advance(cpu, 1 + m.len as u16)
        }
        2 => {
            let m = decode_modrm(cpu);
            let dst = cpu.reg8(m.reg);
            let src = read_rm8(cpu, &m);
            let result = alu_op8(cpu, op, dst, src);
            if op.writes_back() {
                cpu.set_reg8(m.reg, result);
            }
            advance(cpu, 1 + m.len as u16)
        }
        3 => {
            let m = decode_modrm(cpu);
            let dst = cpu.reg16(m.reg);
            let src = read_rm16(cpu, &m);
            let result = alu_op16(cpu, op, dst, src);
            if op.writes_back() {
                cpu.set_reg16(m.reg, result);
            }
            advance(cpu, 1 + m.len as u16)
        }
        4 => {
            let dst = cpu.al();
            let src = fetch_byte(cpu, 1);
            let result = alu_op8(cpu, op, dst, src);
            if op.writes_back() {
                cpu.set_al(result);
            }
            advance(cpu, 2)
        }
        _ => {
            let dst = cpu.ax;
            let src = fetch_word(cpu, 1);
            let result = alu_op16(cpu, op, dst, src);
            if op.writes_back() {
                cpu.ax = result;
            }
            advance(cpu, 3)
        }
    }
}

// Grp1: immediate forms of the ALU block; `reg` selects the operation.
// 0x82 is a duplicate encoding of 0x80; 0x83 sign-extends its imm8.
fn grp1(cpu: &mut Cpu, opcode: u8) -> StepOutcome {
    let m = decode_modrm(cpu);
    let op = AluOp::from_index(m.reg);
    match opcode {
        0x81 => {
            let dst = read_rm16(cpu, &m);
            let imm = fetch_word(cpu, 1 + m.len as u16);
            let result = alu_op16(cpu, op, dst, imm);
            if op.writes_back() {
                write_rm16(cpu, &m, result);
            }
            advance(cpu, 3 + m.len as u16)
        }
        0x83 => {
            let dst = read_rm16(cpu, &m);
            let imm = fetch_byte(cpu, 1 + m.len as u16) as i8 as u16;
            let result = alu_op16(cpu, op, dst, imm);
            if op.writes_back() {
                write_rm16(cpu, &m, result);
            }
            advance(cpu, 2 + m.len as u16)
        }
        _ => {
            let dst = read_rm8(cpu, &m);
            let imm = fetch_byte(cpu, 1 + m.len as u16);
            let result = alu_op8(cpu, op, dst, imm);
            if op.writes_back() {
                write_rm8(cpu, &m, result);
            }
            advance(cpu, 2 + m.len as u16)
        }
    }
}

// ---- INC/DEC/PUSH/POP register short forms ---------------------------

fn inc_r16(cpu: &mut Cpu, index: u8) -> StepOutcome {
    let (result, flags) = alu::inc16(cpu.flags, cpu.reg16(index));
    cpu.set_reg16(index, result);
    cpu.flags = flags;
    advance(cpu, 1)
}

fn dec_r16(cpu: &mut Cpu, index: u8) -> StepOutcome {
    let (result, flags) = alu::dec16(cpu.flags, cpu.reg16(index));
    cpu.set_reg16(index, result);
    cpu.flags = flags;
    advance(cpu, 1)
}

fn push_r16(cpu: &mut Cpu, index: u8) -> StepOutcome {
    // PUSH SP on the 8086 stores the already-decremented value.
    let value = if index == 4 {
        cpu.sp.wrapping_sub(2)
    } else {
        cpu.reg16(index)
    };
    cpu.push(value);
    advance(cpu, 1)
}

fn pop_r16(cpu: &mut Cpu, index: u8) -> StepOutcome {
    let value = cpu.pop();
    cpu.set_reg16(index, value);
    advance(cpu, 1)
}

fn push_seg(cpu: &mut Cpu, opcode: u8) -> StepOutcome {
    let value = cpu.segment(SegReg::from_index(opcode >> 3));
    cpu.push(value);
    advance(cpu, 1)
}

fn pop_seg(cpu: &mut Cpu, opcode: u8) -> StepOutcome {
    let value = cpu.pop();
    cpu.set_segment(SegReg::from_index(opcode >> 3), value);
    advance(cpu, 1)
}

// ---- data movement ---------------------------------------------------

fn mov_rm_r8(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let value = cpu.reg8(m.reg);
    write_rm8(cpu, &m, value);
    advance(cpu, 1 + m.len as u16)
}

fn mov_rm_r16(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let value = cpu.reg16(m.reg);
    write_rm16(cpu, &m, value);
    advance(cpu, 1 + m.len as u16)
}

fn mov_r_rm8(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let value = read_rm8(cpu, &m);
    cpu.set_reg8(m.reg, value);
    advance(cpu, 1 + m.len as u16)
}

fn mov_r_rm16(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let value = read_rm16(cpu, &m);
    cpu.set_reg16(m.reg, value);
    advance(cpu, 1 + m.len as u16)
}

fn mov_rm_sreg(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let value = cpu.segment(SegReg::from_index(m.reg));
    write_rm16(cpu, &m, value);
    advance(cpu, 1 + m.len as u16)
}

fn mov_sreg_rm(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let value = read_rm16(cpu, &m);
    cpu.set_segment(SegReg::from_index(m.reg), value);
    advance(cpu, 1 + m.len as u16)
}

// LEA loads the offset half of the effective address; it never touches
// memory. A register source has no effective address — the destination is
// left alone and only IP moves.
fn lea(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    if let Operand::Mem { offset, .. } = m.operand {
        cpu.set_reg16(m.reg, offset);
    }
    advance(cpu, 1 + m.len as u16)
}

fn les(cpu: &mut Cpu) -> StepOutcome {
    load_far_pointer(cpu, SegReg::Es)
}

fn lds(cpu: &mut Cpu) -> StepOutcome {
    load_far_pointer(cpu, SegReg::Ds)
}

fn load_far_pointer(cpu: &mut Cpu, seg: SegReg) -> StepOutcome {
    let m = decode_modrm(cpu);
    match m.operand {
        Operand::Mem { addr, .. } => {
            let offset = cpu.memory.read_word(addr);
            let segment = cpu.memory.read_word(addr.wrapping_add(2));
            cpu.set_reg16(m.reg, offset);
            cpu.set_segment(seg, segment);
            advance(cpu, 1 + m.len as u16)
        }
        // A 16-bit register cannot supply a 32-bit pointer.
        Operand::Reg(_) => undefined(cpu, if seg == SegReg::Es { 0xC4 } else { 0xC5 }),
    }
}

fn xchg_rm_r8(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let from_rm = read_rm8(cpu, &m);
    let from_reg = cpu.reg8(m.reg);
    write_rm8(cpu, &m, from_reg);
    cpu.set_reg8(m.reg, from_rm);
    advance(cpu, 1 + m.len as u16)
}

fn xchg_rm_r16(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let from_rm = read_rm16(cpu, &m);
    let from_reg = cpu.reg16(m.reg);
    write_rm16(cpu, &m, from_reg);
    cpu.set_reg16(m.reg, from_rm);
    advance(cpu, 1 + m.len as u16)
}

// 0x90 is NOP by construction: XCHG AX, AX.
fn xchg_ax_r16(cpu: &mut Cpu, index: u8) -> StepOutcome {
    let other = cpu.reg16(index);
    let ax = cpu.ax;
    cpu.set_reg16(index, ax);
    cpu.ax = other;
    advance(cpu, 1)
}

fn mov_r8_imm(cpu: &mut Cpu, index: u8) -> StepOutcome {
    let imm = fetch_byte(cpu, 1);
    cpu.set_reg8(index, imm);
    advance(cpu, 2)
}

fn mov_r16_imm(cpu: &mut Cpu, index: u8) -> StepOutcome {
    let imm = fetch_word(cpu, 1);
    cpu.set_reg16(index, imm);
    advance(cpu, 3)
}

fn mov_rm8_imm(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let imm = fetch_byte(cpu, 1 + m.len as u16);
    write_rm8(cpu, &m, imm);
    advance(cpu, 2 + m.len as u16)
}

fn mov_rm16_imm(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let imm = fetch_word(cpu, 1 + m.len as u16);
    write_rm16(cpu, &m, imm);
    advance(cpu, 3 + m.len as u16)
}

// MOV between the accumulator and a direct address (0xA0..0xA3).
fn mov_accumulator_moffs(cpu: &mut Cpu, opcode: u8) -> StepOutcome {
    let offset = fetch_word(cpu, 1);
    let addr = modrm::phys(cpu.effective_seg(SegReg::Ds), offset);
    match opcode {
        0xA0 => {
            let value = cpu.memory.read_byte(addr);
            cpu.set_al(value);
        }
        0xA1 => cpu.ax = cpu.memory.read_word(addr),
        0xA2 => cpu.memory.write_byte(addr, cpu.al()),
        _ => cpu.memory.write_word(addr, cpu.ax),
    }
    advance(cpu, 3)
}

fn pop_rm16(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    if m.reg != 0 {
        return undefined(cpu, 0x8F);
    }
    let value = cpu.pop();
    write_rm16(cpu, &m, value);
    advance(cpu, 1 + m.len as u16)
}

// ---- sign extension --------------------------------------------------

fn cbw(cpu: &mut Cpu) -> StepOutcome {
    cpu.ax = cpu.al() as i8 as i16 as u16;
    advance(cpu, 1)
}

fn cwd(cpu: &mut Cpu) -> StepOutcome {
    cpu.dx = if cpu.ax & 0x8000 != 0 { 0xFFFF } else { 0x0000 };
    advance(cpu, 1)
}

// ---- FLAGS transfer --------------------------------------------------

fn pushf(cpu: &mut Cpu) -> StepOutcome {
    let flags = cpu.flags;
    cpu.push(flags);
    advance(cpu, 1)
}

fn popf(cpu: &mut Cpu) -> StepOutcome {
    cpu.flags = cpu.pop();
    advance(cpu, 1)
}

// SAHF replaces only the 8080-compatible flags; bit 1 reads back as set.
fn sahf(cpu: &mut Cpu) -> StepOutcome {
    let low = (cpu.ah() as u16 & SAHF_MASK) | 0x0002;
    cpu.flags = (cpu.flags & 0xFF00) | low;
    advance(cpu, 1)
}

// LAHF materialises the fixed bits: bit 1 set, bits 3 and 5 clear.
fn lahf(cpu: &mut Cpu) -> StepOutcome {
    let value = (cpu.flags as u8 & 0xD7) | 0x02;
    cpu.set_ah(value);
    advance(cpu, 1)
}

fn set_single_flag(cpu: &mut Cpu, mask: Flags, value: bool) -> StepOutcome {
    cpu.set_flag(mask, value);
    advance(cpu, 1)
}

fn cmc(cpu: &mut Cpu) -> StepOutcome {
    cpu.flags ^= Flags::CF.bits();
    advance(cpu, 1)
}

// ---- TEST ------------------------------------------------------------

fn test_rm_r8(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let result = read_rm8(cpu, &m) & cpu.reg8(m.reg);
    cpu.flags = alu::logic8(cpu.flags, result);
    advance(cpu, 1 + m.len as u16)
}

fn test_rm_r16(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let result = read_rm16(cpu, &m) & cpu.reg16(m.reg);
    cpu.flags = alu::logic16(cpu.flags, result);
    advance(cpu, 1 + m.len as u16)
}

fn test_al_imm(cpu: &mut Cpu) -> StepOutcome {
    let result = cpu.al() & fetch_byte(cpu, 1);
    cpu.flags = alu::logic8(cpu.flags, result);
    advance(cpu, 2)
}

fn test_ax_imm(cpu: &mut Cpu) -> StepOutcome {
    let result = cpu.ax & fetch_word(cpu, 1);
    cpu.flags = alu::logic16(cpu.flags, result);
    advance(cpu, 3)
}

// ---- BCD / ASCII adjust ----------------------------------------------

// DAA/DAS compare against the pre-adjust AL for the high-digit step.
// Ref: Intel 8086 Family User's Manual, DAA description
fn daa(cpu: &mut Cpu) -> StepOutcome {
    let old_al = cpu.al();
    let mut al = old_al;
    if (al & 0x0F) > 9 || cpu.flag(Flags::AF) {
        al = al.wrapping_add(0x06);
        cpu.set_flag(Flags::AF, true);
    } else {
        cpu.set_flag(Flags::AF, false);
    }
    if old_al > 0x99 || cpu.flag(Flags::CF) {
        al = al.wrapping_add(0x60);
        cpu.set_flag(Flags::CF, true);
    } else {
        cpu.set_flag(Flags::CF, false);
    }
    cpu.set_al(al);
    cpu.flags = alu::zsp8(cpu.flags, al);
    advance(cpu, 1)
}

fn das(cpu: &mut Cpu) -> StepOutcome {
    let old_al = cpu.al();
    let mut al = old_al;
    if (al & 0x0F) > 9 || cpu.flag(Flags::AF) {
        al = al.wrapping_sub(0x06);
        cpu.set_flag(Flags::AF, true);
    } else {
        cpu.set_flag(Flags::AF, false);
    }
    if old_al > 0x99 || cpu.flag(Flags::CF) {
        al = al.wrapping_sub(0x60);
        cpu.set_flag(Flags::CF, true);
    } else {
        cpu.set_flag(Flags::CF, false);
    }
    cpu.set_al(al);
    cpu.flags = alu::zsp8(cpu.flags, al);
    advance(cpu, 1)
}

fn aaa(cpu: &mut Cpu) -> StepOutcome {
    if (cpu.al() & 0x0F) > 9 || cpu.flag(Flags::AF) {
        let al = cpu.al().wrapping_add(0x06);
        cpu.set_al(al);
        let ah = cpu.ah().wrapping_add(1);
        cpu.set_ah(ah);
        cpu.set_flag(Flags::AF, true);
        cpu.set_flag(Flags::CF, true);
    } else {
        cpu.set_flag(Flags::AF, false);
        cpu.set_flag(Flags::CF, false);
    }
    let al = cpu.al() & 0x0F;
    cpu.set_al(al);
    advance(cpu, 1)
}

fn aas(cpu: &mut Cpu) -> StepOutcome {
    if (cpu.al() & 0x0F) > 9 || cpu.flag(Flags::AF) {
        let al = cpu.al().wrapping_sub(0x06);
        cpu.set_al(al);
        let ah = cpu.ah().wrapping_sub(1);
        cpu.set_ah(ah);
        cpu.set_flag(Flags::AF, true);
        cpu.set_flag(Flags::CF, true);
    } else {
        cpu.set_flag(Flags::AF, false);
        cpu.set_flag(Flags::CF, false);
    }
    let al = cpu.al() & 0x0F;
    cpu.set_al(al);
    advance(cpu, 1)
}

fn aam(cpu: &mut Cpu) -> StepOutcome {
    let divisor = fetch_byte(cpu, 1);
    if divisor == 0 {
        return StepOutcome::DivideError;
    }
    let al = cpu.al();
    cpu.set_ah(al / divisor);
    let al = al % divisor;
    cpu.set_al(al);
    cpu.flags = alu::zsp8(cpu.flags, al);
    advance(cpu, 2)
}

fn aad(cpu: &mut Cpu) -> StepOutcome {
    let factor = fetch_byte(cpu, 1);
    let al = (cpu.ah() as u16).wrapping_mul(factor as u16).wrapping_add(cpu.al() as u16) as u8;
    cpu.set_al(al);
    cpu.set_ah(0);
    cpu.flags = alu::zsp8(cpu.flags, al);
    advance(cpu, 2)
}

// ---- shifts and rotates (Grp2) ---------------------------------------

fn grp2(cpu: &mut Cpu, opcode: u8) -> StepOutcome {
    let m = decode_modrm(cpu);
    // 0xD0/0xD1 shift by one; 0xD2/0xD3 by CL, masked to 5 bits.
    let count = if opcode & 0x02 != 0 { cpu.reg8(1) & 0x1F } else { 1 };
    if opcode & 0x01 == 0 {
        let value = read_rm8(cpu, &m) as u16;
        let (result, flags) = shift_rotate(cpu.flags, m.reg, value, count, false);
        cpu.flags = flags;
        write_rm8(cpu, &m, result as u8);
    } else {
        let value = read_rm16(cpu, &m);
        let (result, flags) = shift_rotate(cpu.flags, m.reg, value, count, true);
        cpu.flags = flags;
        write_rm16(cpu, &m, result);
    }
    advance(cpu, 1 + m.len as u16)
}

// One bit per iteration, the bit shifted out landing in CF. OF is defined
// for a count of one (and forced clear above that); only the shifts touch
// AF/ZF/SF/PF — the rotates leave them alone. A count of zero changes
// nothing at all.
fn shift_rotate(flags: u16, op: u8, value: u16, count: u8, wide: bool) -> (u16, u16) {
    if count == 0 {
        return (value, flags);
    }
    let mask: u16 = if wide { 0xFFFF } else { 0x00FF };
    let msb: u16 = if wide { 0x8000 } else { 0x0080 };
    let mut v = value & mask;
    let mut cf = flags & Flags::CF.bits() != 0;

    for _ in 0..count {
        match op & 0x07 {
            0 => {
                // ROL
                let out = v & msb != 0;
                v = ((v << 1) | out as u16) & mask;
                cf = out;
            }
            1 => {
                // ROR
                let out = v & 1 != 0;
                v = (v >> 1) | if out { msb } else { 0 };
                cf = out;
            }
            2 => {
                // RCL: rotate through CF
                let out = v & msb != 0;
                v = ((v << 1) | cf as u16) & mask;
                cf = out;
            }
            3 => {
                // RCR
                let out = v & 1 != 0;
                v = (v >> 1) | if cf { msb } else { 0 };
                cf = out;
            }
            4 | 6 => {
                // SHL/SAL (6 is the undocumented duplicate)
                cf = v & msb != 0;
                v = (v << 1) & mask;
            }
            5 => {
                // SHR
                cf = v & 1 != 0;
                v >>= 1;
            }
            _ => {
                // SAR keeps the sign bit
                cf = v & 1 != 0;
                v = (v >> 1) | (v & msb);
            }
        }
    }

    let mut flags = alu::set(flags, Flags::CF, cf);
    let overflow = if count == 1 {
        match op & 0x07 {
            5 => value & msb != 0,        // SHR: MSB of the original value
            7 => false,                   // SAR
            _ => (v & msb != 0) ^ cf,     // rotates and SHL
        }
    } else {
        false
    };
    flags = alu::set(flags, Flags::OF, overflow);

    if matches!(op & 0x07, 4..=7) {
        flags = alu::set(flags, Flags::AF, false);
        flags = if wide {
            alu::zsp16(flags, v)
        } else {
            alu::zsp8(flags, v as u8)
        };
    }
    (v, flags)
}

// ---- Grp3: TEST/NOT/NEG/MUL/IMUL/DIV/IDIV ----------------------------

fn grp3(cpu: &mut Cpu, wide: bool) -> StepOutcome {
    let m = decode_modrm(cpu);
    match m.reg {
        // /1 is the undocumented duplicate of TEST.
        0 | 1 => {
            if wide {
                let imm = fetch_word(cpu, 1 + m.len as u16);
                let result = read_rm16(cpu, &m) & imm;
                cpu.flags = alu::logic16(cpu.flags, result);
                advance(cpu, 3 + m.len as u16)
            } else {
                let imm = fetch_byte(cpu, 1 + m.len as u16);
                let result = read_rm8(cpu, &m) & imm;
                cpu.flags = alu::logic8(cpu.flags, result);
                advance(cpu, 2 + m.len as u16)
            }
        }
        // NOT touches no flags.
        2 => {
            if wide {
                let value = !read_rm16(cpu, &m);
                write_rm16(cpu, &m, value);
            } else {
                let value = !read_rm8(cpu, &m);
                write_rm8(cpu, &m, value);
            }
            advance(cpu, 1 + m.len as u16)
        }
        3 => {
            if wide {
                let value = read_rm16(cpu, &m);
                let (result, flags) = alu::sub16(cpu.flags, 0, value, false);
                cpu.flags = flags;
                write_rm16(cpu, &m, result);
            } else {
                let value = read_rm8(cpu, &m);
                let (result, flags) = alu::sub8(cpu.flags, 0, value, false);
                cpu.flags = flags;
                write_rm8(cpu, &m, result);
            }
            advance(cpu, 1 + m.len as u16)
        }
        4 => {
            mul(cpu, &m, wide);
            advance(cpu, 1 + m.len as u16)
        }
        5 => {
            imul(cpu, &m, wide);
            advance(cpu, 1 + m.len as u16)
        }
        6 => match div(cpu, &m, wide) {
            StepOutcome::Continued => advance(cpu, 1 + m.len as u16),
            outcome => outcome,
        },
        _ => match idiv(cpu, &m, wide) {
            StepOutcome::Continued => advance(cpu, 1 + m.len as u16),
            outcome => outcome,
        },
    }
}

// CF and OF report a significant upper half; the other arithmetic flags
// are left as they were.
fn mul(cpu: &mut Cpu, m: &ModRm, wide: bool) {
    let upper_set = if wide {
        let product = cpu.ax as u32 * read_rm16(cpu, m) as u32;
        cpu.ax = product as u16;
        cpu.dx = (product >> 16) as u16;
        cpu.dx != 0
    } else {
        let product = cpu.al() as u16 * read_rm8(cpu, m) as u16;
        cpu.ax = product;
        product & 0xFF00 != 0
    };
    cpu.set_flag(Flags::CF, upper_set);
    cpu.set_flag(Flags::OF, upper_set);
}

// Signed multiply; CF/OF report that the upper half is more than a
// sign-extension of the lower.
fn imul(cpu: &mut Cpu, m: &ModRm, wide: bool) {
    let significant = if wide {
        let product = (cpu.ax as i16 as i32) * (read_rm16(cpu, m) as i16 as i32);
        cpu.ax = product as u16;
        cpu.dx = (product >> 16) as u16;
        product != product as i16 as i32
    } else {
        let product = (cpu.al() as i8 as i16) * (read_rm8(cpu, m) as i8 as i16);
        cpu.ax = product as u16;
        product != product as i8 as i16
    };
    cpu.set_flag(Flags::CF, significant);
    cpu.set_flag(Flags::OF, significant);
}

// Unsigned divide. Arithmetic flags stay untouched; a zero divisor or a
// quotient that cannot fit the destination aborts the instruction.
fn div(cpu: &mut Cpu, m: &ModRm, wide: bool) -> StepOutcome {
    if wide {
        let divisor = read_rm16(cpu, m) as u32;
        if divisor == 0 {
            return StepOutcome::DivideError;
        }
        let dividend = (cpu.dx as u32) << 16 | cpu.ax as u32;
        let quotient = dividend / divisor;
        if quotient > 0xFFFF {
            return StepOutcome::DivideError;
        }
        cpu.ax = quotient as u16;
        cpu.dx = (dividend % divisor) as u16;
    } else {
        let divisor = read_rm8(cpu, m) as u16;
        if divisor == 0 {
            return StepOutcome::DivideError;
        }
        let dividend = cpu.ax;
        let quotient = dividend / divisor;
        if quotient > 0xFF {
            return StepOutcome::DivideError;
        }
        cpu.set_al(quotient as u8);
        cpu.set_ah((dividend % divisor) as u8);
    }
    StepOutcome::Continued
}

// Signed divide, truncating toward zero. The 8086 accepts quotients only
// up to ±127 / ±32767 — one short of the two's-complement minimum.
fn idiv(cpu: &mut Cpu, m: &ModRm, wide: bool) -> StepOutcome {
    if wide {
        let divisor = read_rm16(cpu, m) as i16 as i64;
        if divisor == 0 {
            return StepOutcome::DivideError;
        }
        let dividend = ((cpu.dx as u32) << 16 | cpu.ax as u32) as i32 as i64;
        let quotient = dividend / divisor;
        if quotient > 0x7FFF || quotient < -0x7FFF {
            return StepOutcome::DivideError;
        }
        cpu.ax = quotient as u16;
        cpu.dx = (dividend % divisor) as u16;
    } else {
        let divisor = read_rm8(cpu, m) as i8 as i32;
        if divisor == 0 {
            return StepOutcome::DivideError;
        }
        let dividend = cpu.ax as i16 as i32;
        let quotient = dividend / divisor;
        if quotient > 0x7F || quotient < -0x7F {
            return StepOutcome::DivideError;
        }
        cpu.set_al(quotient as u8);
        cpu.set_ah((dividend % divisor) as u8);
    }
    StepOutcome::Continued
}

// ---- Grp4/Grp5 -------------------------------------------------------

fn grp4(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    match m.reg {
        0 => {
            let (result, flags) = alu::inc8(cpu.flags, read_rm8(cpu, &m));
            cpu.flags = flags;
            write_rm8(cpu, &m, result);
            advance(cpu, 1 + m.len as u16)
        }
        1 => {
            let (result, flags) = alu::dec8(cpu.flags, read_rm8(cpu, &m));
            cpu.flags = flags;
            write_rm8(cpu, &m, result);
            advance(cpu, 1 + m.len as u16)
        }
        _ => undefined(cpu, 0xFE),
    }
}

fn grp5(cpu: &mut Cpu) -> StepOutcome {
    let m = decode_modrm(cpu);
    let next_ip = cpu.ip.wrapping_add(1 + m.len as u16);
    match m.reg {
        0 => {
            let (result, flags) = alu::inc16(cpu.flags, read_rm16(cpu, &m));
            cpu.flags = flags;
            write_rm16(cpu, &m, result);
            advance(cpu, 1 + m.len as u16)
        }
        1 => {
            let (result, flags) = alu::dec16(cpu.flags, read_rm16(cpu, &m));
            cpu.flags = flags;
            write_rm16(cpu, &m, result);
            advance(cpu, 1 + m.len as u16)
        }
        2 => {
            let target = read_rm16(cpu, &m);
            cpu.push(next_ip);
            cpu.ip = target;
            StepOutcome::Continued
        }
        3 => match m.operand {
            Operand::Mem { addr, .. } => {
                let offset = cpu.memory.read_word(addr);
                let segment = cpu.memory.read_word(addr.wrapping_add(2));
                cpu.push(cpu.cs);
                cpu.push(next_ip);
                cpu.cs = segment;
                cpu.ip = offset;
                StepOutcome::Continued
            }
            Operand::Reg(_) => undefined(cpu, 0xFF),
        },
        4 => {
            cpu.ip = read_rm16(cpu, &m);
            StepOutcome::Continued
        }
        5 => match m.operand {
            Operand::Mem { addr, .. } => {
                cpu.ip = cpu.memory.read_word(addr);
                cpu.cs = cpu.memory.read_word(addr.wrapping_add(2));
                StepOutcome::Continued
            }
            Operand::Reg(_) => undefined(cpu, 0xFF),
        },
        6 => {
            // The same decremented-SP rule as the short PUSH forms.
            let value = match m.operand {
                Operand::Reg(4) => cpu.sp.wrapping_sub(2),
                _ => read_rm16(cpu, &m),
            };
            cpu.push(value);
            advance(cpu, 1 + m.len as u16)
        }
        _ => undefined(cpu, 0xFF),
    }
}

// ---- control flow ----------------------------------------------------

fn rel8_target(cpu: &Cpu, length: u16) -> u16 {
    let rel = fetch_byte(cpu, length - 1) as i8 as u16;
    cpu.ip.wrapping_add(length).wrapping_add(rel)
}

// Conditions in opcode order; bit 0 negates.
// Ref: Intel 8086 Family User's Manual, table 2-15
fn jcc(cpu: &mut Cpu, cond: u8) -> StepOutcome {
    let taken = {
        let base = match cond >> 1 {
            0 => cpu.flag(Flags::OF),
            1 => cpu.flag(Flags::CF),
            2 => cpu.flag(Flags::ZF),
            3 => cpu.flag(Flags::CF) || cpu.flag(Flags::ZF),
            4 => cpu.flag(Flags::SF),
            5 => cpu.flag(Flags::PF),
            6 => cpu.flag(Flags::SF) != cpu.flag(Flags::OF),
            _ => cpu.flag(Flags::ZF) || (cpu.flag(Flags::SF) != cpu.flag(Flags::OF)),
        };
        base != (cond & 1 == 1)
    };
    if taken {
        cpu.ip = rel8_target(cpu, 2);
        StepOutcome::Continued
    } else {
        advance(cpu, 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    Plain,
    WhileZero,
    WhileNotZero,
}

// LOOP always decrements CX first; the ZF condition is layered on top.
fn loop_cond(cpu: &mut Cpu, kind: LoopKind) -> StepOutcome {
    cpu.cx = cpu.cx.wrapping_sub(1);
    let zf = cpu.flag(Flags::ZF);
    let taken = cpu.cx != 0
        && match kind {
            LoopKind::Plain => true,
            LoopKind::WhileZero => zf,
            LoopKind::WhileNotZero => !zf,
        };
    if taken {
        cpu.ip = rel8_target(cpu, 2);
        StepOutcome::Continued
    } else {
        advance(cpu, 2)
    }
}

fn jcxz(cpu: &mut Cpu) -> StepOutcome {
    if cpu.cx == 0 {
        cpu.ip = rel8_target(cpu, 2);
        StepOutcome::Continued
    } else {
        advance(cpu, 2)
    }
}

fn jmp_short(cpu: &mut Cpu) -> StepOutcome {
    cpu.ip = rel8_target(cpu, 2);
    StepOutcome::Continued
}

fn jmp_near(cpu: &mut Cpu) -> StepOutcome {
    let rel = fetch_word(cpu, 1);
    cpu.ip = cpu.ip.wrapping_add(3).wrapping_add(rel);
    StepOutcome::Continued
}

fn jmp_far(cpu: &mut Cpu) -> StepOutcome {
    let offset = fetch_word(cpu, 1);
    let segment = fetch_word(cpu, 3);
    cpu.ip = offset;
    cpu.cs = segment;
    StepOutcome::Continued
}

// The return address is the first byte past the CALL.
fn call_near(cpu: &mut Cpu) -> StepOutcome {
    let rel = fetch_word(cpu, 1);
    let next_ip = cpu.ip.wrapping_add(3);
    cpu.push(next_ip);
    cpu.ip = next_ip.wrapping_add(rel);
    StepOutcome::Continued
}

fn call_far(cpu: &mut Cpu) -> StepOutcome {
    let offset = fetch_word(cpu, 1);
    let segment = fetch_word(cpu, 3);
    let next_ip = cpu.ip.wrapping_add(5);
    cpu.push(cpu.cs);
    cpu.push(next_ip);
    cpu.cs = segment;
    cpu.ip = offset;
    StepOutcome::Continued
}

fn ret_near(cpu: &mut Cpu) -> StepOutcome {
    cpu.ip = cpu.pop();
    StepOutcome::Continued
}

fn ret_near_imm(cpu: &mut Cpu) -> StepOutcome {
    let extra = fetch_word(cpu, 1);
    cpu.ip = cpu.pop();
    cpu.sp = cpu.sp.wrapping_add(extra);
    StepOutcome::Continued
}

fn ret_far(cpu: &mut Cpu) -> StepOutcome {
    cpu.ip = cpu.pop();
    cpu.cs = cpu.pop();
    StepOutcome::Continued
}

fn ret_far_imm(cpu: &mut Cpu) -> StepOutcome {
    let extra = fetch_word(cpu, 1);
    cpu.ip = cpu.pop();
    cpu.cs = cpu.pop();
    cpu.sp = cpu.sp.wrapping_add(extra);
    StepOutcome::Continued
}

// Software interrupt: FLAGS, CS, return IP on the stack, IF/TF cleared,
// then the far pointer from entry `vector` of the table at address 0.
fn interrupt(cpu: &mut Cpu, vector: u8, next_ip: u16) -> StepOutcome {
    let flags = cpu.flags;
    cpu.push(flags);
    cpu.push(cpu.cs);
    cpu.push(next_ip);
    cpu.set_flag(Flags::IF, false);
    cpu.set_flag(Flags::TF, false);
    let entry = vector as u32 * 4;
    cpu.ip = cpu.memory.read_word(entry);
    cpu.cs = cpu.memory.read_word(entry.wrapping_add(2));
    StepOutcome::Continued
}

fn into(cpu: &mut Cpu) -> StepOutcome {
    if cpu.flag(Flags::OF) {
        let next_ip = cpu.ip.wrapping_add(1);
        interrupt(cpu, 4, next_ip)
    } else {
        advance(cpu, 1)
    }
}

fn iret(cpu: &mut Cpu) -> StepOutcome {
    cpu.ip = cpu.pop();
    cpu.cs = cpu.pop();
    cpu.flags = cpu.pop();
    StepOutcome::Continued
}

// HLT latches the halted state but IP still moves past the instruction.
fn hlt(cpu: &mut Cpu) -> StepOutcome {
    cpu.ip = cpu.ip.wrapping_add(1);
    StepOutcome::Halted
}

// ---- string operations -----------------------------------------------

fn string_family(cpu: &mut Cpu, opcode: u8, start_ip: u16) -> StepOutcome {
    let wide = opcode & 0x01 != 0;
    match opcode {
        0xA4 | 0xA5 => repeat_string(cpu, start_ip, false, wide, movs_once),
        0xA6 | 0xA7 => repeat_string(cpu, start_ip, true, wide, cmps_once),
        0xAA | 0xAB => repeat_string(cpu, start_ip, false, wide, stos_once),
        0xAC | 0xAD => repeat_string(cpu, start_ip, false, wide, lods_once),
        _ => repeat_string(cpu, start_ip, true, wide, scas_once),
    }
}

// Under REP/REPNE a step performs exactly one iteration: element operation,
// CX decrement, and IP rewound to the first prefix byte while the repeat
// condition still holds. CX = 0 at entry skips the element entirely. A
// full-run loop gets the complete repeat by stepping until IP moves on.
fn repeat_string(
    cpu: &mut Cpu,
    start_ip: u16,
    conditional: bool,
    wide: bool,
    op: fn(&mut Cpu, bool),
) -> StepOutcome {
    match cpu.rep {
        None => {
            op(cpu, wide);
            advance(cpu, 1)
        }
        Some(prefix) => {
            if cpu.cx == 0 {
                return advance(cpu, 1);
            }
            op(cpu, wide);
            cpu.cx = cpu.cx.wrapping_sub(1);
            let mut more = cpu.cx != 0;
            if conditional && more {
                let zf = cpu.flag(Flags::ZF);
                more = match prefix {
                    RepPrefix::Rep => zf,
                    RepPrefix::RepNe => !zf,
                };
            }
            if more {
                cpu.ip = start_ip;
                StepOutcome::Continued
            } else {
                advance(cpu, 1)
            }
        }
    }
}

// SI/DI move by the operand size, backwards when DF is set.
fn string_delta(cpu: &Cpu, wide: bool) -> u16 {
    let size: u16 = if wide { 2 } else { 1 };
    if cpu.flag(Flags::DF) {
        size.wrapping_neg()
    } else {
        size
    }
}

// The source side honours a segment override; ES:DI never does.
fn movs_once(cpu: &mut Cpu, wide: bool) {
    let src = modrm::phys(cpu.effective_seg(SegReg::Ds), cpu.si);
    let dst = modrm::phys(cpu.es, cpu.di);
    if wide {
        let value = cpu.memory.read_word(src);
        cpu.memory.write_word(dst, value);
    } else {
        let value = cpu.memory.read_byte(src);
        cpu.memory.write_byte(dst, value);
    }
    let delta = string_delta(cpu, wide);
    cpu.si = cpu.si.wrapping_add(delta);
    cpu.di = cpu.di.wrapping_add(delta);
}

fn cmps_once(cpu: &mut Cpu, wide: bool) {
    let src = modrm::phys(cpu.effective_seg(SegReg::Ds), cpu.si);
    let dst = modrm::phys(cpu.es, cpu.di);
    if wide {
        let a = cpu.memory.read_word(src);
        let b = cpu.memory.read_word(dst);
        cpu.flags = alu::sub16(cpu.flags, a, b, false).1;
    } else {
        let a = cpu.memory.read_byte(src);
        let b = cpu.memory.read_byte(dst);
        cpu.flags = alu::sub8(cpu.flags, a, b, false).1;
    }
    let delta = string_delta(cpu, wide);
    cpu.si = cpu.si.wrapping_add(delta);
    cpu.di = cpu.di.wrapping_add(delta);
}

fn scas_once(cpu: &mut Cpu, wide: bool) {
    let dst = modrm::phys(cpu.es, cpu.di);
    if wide {
        let b = cpu.memory.read_word(dst);
        cpu.flags = alu::sub16(cpu.flags, cpu.ax, b, false).1;
    } else {
        let b = cpu.memory.read_byte(dst);
        cpu.flags = alu::sub8(cpu.flags, cpu.al(), b, false).1;
    }
    let delta = string_delta(cpu, wide);
    cpu.di = cpu.di.wrapping_add(delta);
}

fn lods_once(cpu: &mut Cpu, wide: bool) {
    let src = modrm::phys(cpu.effective_seg(SegReg::Ds), cpu.si);
    if wide {
        cpu.ax = cpu.memory.read_word(src);
    } else {
        let value = cpu.memory.read_byte(src);
        cpu.set_al(value);
    }
    let delta = string_delta(cpu, wide);
    cpu.si = cpu.si.wrapping_add(delta);
}

fn stos_once(cpu: &mut Cpu, wide: bool) {
    let dst = modrm::phys(cpu.es, cpu.di);
    if wide {
        cpu.memory.write_word(dst, cpu.ax);
    } else {
        cpu.memory.write_byte(dst, cpu.al());
    }
    let delta = string_delta(cpu, wide);
    cpu.di = cpu.di.wrapping_add(delta);
}

// ---- I/O -------------------------------------------------------------

// No device model behind the port space: reads float high, writes vanish.
fn io(cpu: &mut Cpu, opcode: u8) -> StepOutcome {
    let length = if opcode & 0x08 != 0 { 1 } else { 2 };
    match opcode & 0x03 {
        0 => cpu.set_al(0xFF),
        1 => cpu.ax = 0xFFFF,
        _ => {}
    }
    advance(cpu, length)
}

// ---- undocumented ----------------------------------------------------

// SALC: AL from CF, all ones or all zeroes.
fn salc(cpu: &mut Cpu) -> StepOutcome {
    let value = if cpu.flag(Flags::CF) { 0xFF } else { 0x00 };
    cpu.set_al(value);
    advance(cpu, 1)
}

// XLAT: table lookup at DS:(BX + AL), override honoured.
fn xlat(cpu: &mut Cpu) -> StepOutcome {
    let offset = cpu.bx.wrapping_add(cpu.al() as u16);
    let value = cpu.memory.read_byte(modrm::phys(cpu.effective_seg(SegReg::Ds), offset));
    cpu.set_al(value);
    advance(cpu, 1)
}
