use iron86::cpu::Flags;

mod common;
use common::{cpu_at, run_code};

#[test]
fn shl_by_one_shifts_the_msb_into_cf() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_al(0x81);
    // D0 E0 -> SHL AL, 1
    run_code(&mut cpu, &[0xD0, 0xE0]);
    assert_eq!(cpu.al(), 0x02);
    assert!(cpu.flag(Flags::CF));
    assert!(cpu.flag(Flags::OF), "sign changed: MSB(result) != CF");
    assert!(!cpu.flag(Flags::ZF));
    assert_eq!(cpu.ip, 0x0102);
}

#[test]
fn shr_by_one_takes_of_from_the_original_sign() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_al(0x80);
    // D0 E8 -> SHR AL, 1
    run_code(&mut cpu, &[0xD0, 0xE8]);
    assert_eq!(cpu.al(), 0x40);
    assert!(!cpu.flag(Flags::CF));
    assert!(cpu.flag(Flags::OF));
}

#[test]
fn sar_drags_the_sign_down() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_al(0x83);
    // D0 F8 -> SAR AL, 1
    run_code(&mut cpu, &[0xD0, 0xF8]);
    assert_eq!(cpu.al(), 0xC1);
    assert!(cpu.flag(Flags::CF), "bit 0 shifted out");
    assert!(!cpu.flag(Flags::OF));
    assert!(cpu.flag(Flags::SF));
}

#[test]
fn rcl_rotates_the_carry_into_bit_zero() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_al(0x80);
    cpu.set_flag(Flags::CF, true);
    // D0 D0 -> RCL AL, 1
    run_code(&mut cpu, &[0xD0, 0xD0]);
    assert_eq!(cpu.al(), 0x01);
    assert!(cpu.flag(Flags::CF), "the old MSB moved into CF");
}

#[test]
fn rcr_word_rotates_the_carry_into_the_msb() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ax = 0x0001;
    cpu.set_flag(Flags::CF, true);
    // D1 D8 -> RCR AX, 1
    run_code(&mut cpu, &[0xD1, 0xD8]);
    assert_eq!(cpu.ax, 0x8000);
    assert!(cpu.flag(Flags::CF));
}

#[test]
fn rotate_preserves_the_result_flags() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_al(0x01);
    cpu.flags = Flags::ZF.bits() | Flags::SF.bits();
    // D0 C0 -> ROL AL, 1
    run_code(&mut cpu, &[0xD0, 0xC0]);
    assert_eq!(cpu.al(), 0x02);
    assert!(cpu.flag(Flags::ZF), "rotates do not touch ZF");
    assert!(cpu.flag(Flags::SF), "rotates do not touch SF");
}

#[test]
fn shift_count_from_cl_is_masked_to_five_bits() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_al(0x55);
    cpu.cx = 0x0020; // CL = 32 -> masked count 0
    cpu.flags = Flags::CF.bits() | Flags::OF.bits();
    // D2 E0 -> SHL AL, CL
    run_code(&mut cpu, &[0xD2, 0xE0]);
    assert_eq!(cpu.al(), 0x55, "count 0 leaves the value alone");
    assert!(cpu.flag(Flags::CF), "count 0 changes no flags");
    assert!(cpu.flag(Flags::OF));
}

#[test]
fn multi_bit_shift_clears_of_and_updates_zsp() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.set_al(0xC0);
    cpu.cx = 0x0002;
    // D2 E0 -> SHL AL, CL
    run_code(&mut cpu, &[0xD2, 0xE0]);
    assert_eq!(cpu.al(), 0x00);
    assert!(cpu.flag(Flags::CF), "the last bit out was set");
    assert!(!cpu.flag(Flags::OF), "OF is forced clear for counts above one");
    assert!(cpu.flag(Flags::ZF));
    assert!(!cpu.flag(Flags::AF), "shifts clear AF");
}

#[test]
fn shift_applies_to_a_memory_operand() {
    let mut cpu = cpu_at(0x1000, 0x0100);
    cpu.ds = 0x0000;
    cpu.memory.write_word(0x2000, 0x4000);
    // D1 26 00 20 -> SHL word [0x2000], 1
    run_code(&mut cpu, &[0xD1, 0x26, 0x00, 0x20]);
    assert_eq!(cpu.memory.read_word(0x2000), 0x8000);
    assert!(cpu.flag(Flags::SF));
    assert!(cpu.flag(Flags::OF), "MSB(result)=1 with CF=0");
    assert_eq!(cpu.ip, 0x0104);
}
