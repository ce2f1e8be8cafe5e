use iron86::cpu::{Flags, SegReg};

mod common;
use common::{cpu_at, run_code};

#[test]
fn mov_al_imm_preserves_ah_and_flags() {
    let mut cpu = cpu_at(0x1000, 0x5F6C);
    cpu.ax = 0xA9B1;
    cpu.flags = 0x0891;

    // B0 8A -> MOV AL, 0x8A
    run_code(&mut cpu, &[0xB0, 0x8A]);

    assert_eq!(cpu.ax, 0xA98A, "AH must survive a MOV into AL");
    assert_eq!(cpu.ip, 0x5F6E);
    assert_eq!(cpu.flags, 0x0891, "MOV has no flag side effects");
}

#[test]
fn mov_r16_imm_loads_a_full_word() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    // BE 34 12 -> MOV SI, 0x1234
    run_code(&mut cpu, &[0xBE, 0x34, 0x12]);
    assert_eq!(cpu.si, 0x1234);
    assert_eq!(cpu.ip, 0x0103);
}

#[test]
fn mov_accumulator_to_direct_address() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x3000;
    cpu.ax = 0x00C7;
    // A2 10 00 -> MOV [0x0010], AL
    run_code(&mut cpu, &[0xA2, 0x10, 0x00]);
    assert_eq!(cpu.memory.read_byte(0x3_0010), 0xC7);
    assert_eq!(cpu.ip, 0x0103);
}

#[test]
fn xchg_ax_with_register() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ax = 0x1111;
    cpu.bx = 0x2222;
    // 93 -> XCHG AX, BX
    run_code(&mut cpu, &[0x93]);
    assert_eq!(cpu.ax, 0x2222, "XCHG failed to update AX");
    assert_eq!(cpu.bx, 0x1111, "XCHG failed to update BX");
}

#[test]
fn xchg_register_with_memory() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.bx = 0x5555;
    cpu.memory.write_word(0x1000, 0xAAAA);
    cpu.ds = 0x0000;
    // 87 1E 00 10 -> XCHG BX, [0x1000]
    run_code(&mut cpu, &[0x87, 0x1E, 0x00, 0x10]);
    assert_eq!(cpu.bx, 0xAAAA, "XCHG reg<->mem failed to update the register");
    assert_eq!(cpu.memory.read_word(0x1000), 0x5555, "XCHG reg<->mem failed to update memory");
}

#[test]
fn mov_with_bp_base_defaults_to_stack_segment() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x4000;
    cpu.ss = 0x2000;
    cpu.bp = 0x0010;
    cpu.memory.write_word(0x4_0010, 0xDA7A);
    cpu.memory.write_word(0x2_0010, 0x5555);
    // 8B 46 00 -> MOV AX, [BP+0]
    run_code(&mut cpu, &[0x8B, 0x46, 0x00]);
    assert_eq!(cpu.ax, 0x5555, "a BP base must address SS, not DS");
}

#[test]
fn segment_override_redirects_a_load() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x4000;
    cpu.es = 0x3000;
    cpu.si = 0x0020;
    cpu.memory.write_byte(0x4_0020, 0x11);
    cpu.memory.write_byte(0x3_0020, 0x99);
    // 26 8A 04 -> MOV AL, ES:[SI]
    run_code(&mut cpu, &[0x26, 0x8A, 0x04]);
    assert_eq!(cpu.al(), 0x99);
    assert_eq!(cpu.ip, 0x0103, "the prefix byte counts toward the length");
}

#[test]
fn lea_loads_the_offset_and_never_reads_memory() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x5000;
    cpu.bx = 0x1000;
    cpu.si = 0x0005;
    // 8D 40 05 -> LEA AX, [BX+SI+0x05]
    run_code(&mut cpu, &[0x8D, 0x40, 0x05]);
    assert_eq!(cpu.ax, 0x100A, "LEA must not include the segment base");
}

#[test]
fn lds_loads_offset_then_segment() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x0000;
    cpu.memory.write_word(0x1000, 0xBEEF);
    cpu.memory.write_word(0x1002, 0x8000);
    // C5 36 00 10 -> LDS SI, [0x1000]
    run_code(&mut cpu, &[0xC5, 0x36, 0x00, 0x10]);
    assert_eq!(cpu.si, 0xBEEF);
    assert_eq!(cpu.ds, 0x8000);
    assert_eq!(cpu.ip, 0x0104);
}

#[test]
fn les_loads_into_es() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x0000;
    cpu.memory.write_word(0x2000, 0x0042);
    cpu.memory.write_word(0x2002, 0x7000);
    // C4 3E 00 20 -> LES DI, [0x2000]
    run_code(&mut cpu, &[0xC4, 0x3E, 0x00, 0x20]);
    assert_eq!(cpu.di, 0x0042);
    assert_eq!(cpu.es, 0x7000);
}

#[test]
fn mov_between_segment_register_and_r16() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ax = 0x2345;
    // 8E D8 -> MOV DS, AX
    run_code(&mut cpu, &[0x8E, 0xD8]);
    assert_eq!(cpu.ds, 0x2345);

    cpu.ip = 0x0102;
    // 8C DB -> MOV BX, DS
    run_code(&mut cpu, &[0x8C, 0xDB]);
    assert_eq!(cpu.bx, 0x2345);
}

#[test]
fn xlat_translates_through_the_table_at_bx() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x0000;
    cpu.bx = 0x2000;
    cpu.set_al(0x02);
    cpu.memory.write_byte(0x2002, 0x99);
    // D7 -> XLAT
    run_code(&mut cpu, &[0xD7]);
    assert_eq!(cpu.al(), 0x99, "XLAT failed to look up the table byte");
}

#[test]
fn lahf_materialises_the_fixed_bits() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.flags = Flags::CF.bits() | Flags::ZF.bits() | Flags::SF.bits();
    // 9F -> LAHF
    run_code(&mut cpu, &[0x9F]);
    assert_eq!(cpu.ah(), 0xC3, "CF|ZF|SF plus the always-set bit 1");
}

#[test]
fn sahf_replaces_only_the_low_flag_byte() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.flags = Flags::OF.bits() | Flags::DF.bits();
    cpu.set_ah(0xFF);
    // 9E -> SAHF
    run_code(&mut cpu, &[0x9E]);
    assert!(cpu.flag(Flags::CF));
    assert!(cpu.flag(Flags::PF));
    assert!(cpu.flag(Flags::AF));
    assert!(cpu.flag(Flags::ZF));
    assert!(cpu.flag(Flags::SF));
    assert!(cpu.flag(Flags::OF), "the high byte is not SAHF's to change");
    assert!(cpu.flag(Flags::DF));
    assert_eq!(cpu.flags & 0x0002, 0x0002, "bit 1 reads back as set");
}

#[test]
fn salc_sets_al_from_the_carry() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_flag(Flags::CF, true);
    run_code(&mut cpu, &[0xD6]);
    assert_eq!(cpu.al(), 0xFF);

    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ax = 0x12AA;
    run_code(&mut cpu, &[0xD6]);
    assert_eq!(cpu.al(), 0x00);
    assert_eq!(cpu.ah(), 0x12);
}

#[test]
fn cbw_and_cwd_sign_extend() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ax = 0x0080;
    // 98 -> CBW
    run_code(&mut cpu, &[0x98]);
    assert_eq!(cpu.ax, 0xFF80);

    cpu.ip = 0x0101;
    // 99 -> CWD
    run_code(&mut cpu, &[0x99]);
    assert_eq!(cpu.dx, 0xFFFF);
    assert_eq!(cpu.ax, 0xFF80);
}

#[test]
fn effective_seg_helper_honours_the_default() {
    let cpu = cpu_at(0x1000, 0x0100);
    assert_eq!(cpu.effective_seg(SegReg::Ds), cpu.ds);
    assert_eq!(cpu.effective_seg(SegReg::Ss), cpu.ss);
}
