/// Conversion between the SCA wire data format and the register format.
///
/// SCA data is transported over HDLC as two 16-bit halves, sent LSB to MSB,
/// i.e. as `[<16:31><0:15>]`. The GEM AMC firmware stores the same word as
/// `[<7:0><15:8><23:16><31:24>]`, so every payload written to the command
/// register and every reply read back has its byte order reversed.
///
/// The transform is its own inverse.
pub const fn format_sca_data(data: u32) -> u32 {
    data.swap_bytes()
}

#[test]
fn format_known_word() {
    assert_eq!(format_sca_data(0x1234_5678), 0x7856_3412);
    assert_eq!(format_sca_data(0x0000_0001), 0x0100_0000);
    assert_eq!(format_sca_data(0xff00_0000), 0x0000_00ff);
}

#[test]
fn format_is_involution() {
    let mut x: u32 = 0x9e37_79b9;
    for _ in 0..10_000 {
        assert_eq!(format_sca_data(format_sca_data(x)), x);
        x = x.wrapping_mul(0x0019_660d).wrapping_add(0x3c6e_f35f);
    }
    for x in [0, u32::MAX, 0x8000_0000, 0x0000_ffff, 0xdead_beef] {
        assert_eq!(format_sca_data(format_sca_data(x)), x);
    }
}

#[test]
fn format_matches_shift_and_mask() {
    let by_hand = |data: u32| {
        ((data & 0xff00_0000) >> 24)
            + ((data >> 8) & 0x0000_ff00)
            + ((data & 0x0000_ff00) << 8)
            + ((data & 0x0000_00ff) << 24)
    };
    for x in [0x0102_0304, 0xa1b2_c3d4, 0x00ff_00ff, 0x1234_5678] {
        assert_eq!(format_sca_data(x), by_hand(x));
    }
}
