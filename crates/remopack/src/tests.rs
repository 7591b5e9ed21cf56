use crate::*;
use std::io::Cursor;

fn reader(bytes: Vec<u8>) -> Reader<Cursor<Vec<u8>>> {
    Reader::new(Cursor::new(bytes))
}

// ============================================================================
//  FIXED WIDTH
// ============================================================================

#[test]
fn test_fixed_width_is_big_endian() -> Result<()> {
    let mut enc = Encoder::new();
    enc.u16(0x0102);
    enc.u32(0x0304_0506);
    enc.i32(-2);
    enc.i64(1);

    let bytes = enc.into_bytes();
    assert_eq!(&bytes[..6], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    assert_eq!(&bytes[6..10], &[0xff, 0xff, 0xff, 0xfe]);

    let mut dec = reader(bytes);
    assert_eq!(dec.u16()?, 0x0102);
    assert_eq!(dec.u32()?, 0x0304_0506);
    assert_eq!(dec.i32()?, -2);
    assert_eq!(dec.i64()?, 1);
    Ok(())
}

#[test]
fn test_bool_accepts_any_nonzero() -> Result<()> {
    let mut dec = reader(vec![0x00, 0x01, 0x7f]);
    assert!(!dec.bool()?);
    assert!(dec.bool()?);
    assert!(dec.bool()?);
    Ok(())
}

// ============================================================================
//  PACKED INTEGERS
// ============================================================================

#[test]
fn test_packed_known_encodings() {
    let cases: &[(u32, &[u8])] = &[
        (0, &[0x00]),
        (1, &[0x01]),
        (127, &[0x7f]),
        (128, &[0x80, 0x01]),
        (300, &[0xac, 0x02]),
        (16_384, &[0x80, 0x80, 0x01]),
        (u32::MAX, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
    ];

    for (value, expected) in cases {
        let mut enc = Encoder::new();
        enc.packed_u32(*value);
        assert_eq!(&enc.into_bytes(), expected, "encoding of {}", value);
    }
}

#[test]
fn test_packed_decodes_known_bytes() -> Result<()> {
    let mut dec = reader(vec![0xac, 0x02, 0x00, 0xff, 0xff, 0xff, 0xff, 0x0f]);
    assert_eq!(dec.packed_u32()?, 300);
    assert_eq!(dec.packed_u32()?, 0);
    assert_eq!(dec.packed_u32()?, u32::MAX);
    Ok(())
}

#[test]
fn test_packed_rejects_six_byte_encoding() {
    let mut dec = reader(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
    assert!(matches!(dec.packed_u32(), Err(Error::PackedIntegerOverflow)));
}

#[test]
fn test_packed_rejects_value_above_u32() {
    let mut dec = reader(vec![0xff, 0xff, 0xff, 0xff, 0x1f]);
    assert!(matches!(dec.packed_u32(), Err(Error::PackedIntegerOverflow)));
}

#[test]
fn test_packed_truncated_continuation() {
    let mut dec = reader(vec![0x80]);
    assert!(matches!(dec.packed_u32(), Err(Error::UnexpectedEnd)));
}

// ============================================================================
//  BLOBS AND STRINGS
// ============================================================================

#[test]
fn test_blob_layout() -> Result<()> {
    let mut enc = Encoder::new();
    enc.blob(&[0xaa, 0xbb, 0xcc])?;
    assert_eq!(enc.into_bytes(), vec![0x03, 0xaa, 0xbb, 0xcc]);
    Ok(())
}

#[test]
fn test_long_blob_uses_multi_byte_length() -> Result<()> {
    let payload = vec![7u8; 200];
    let mut enc = Encoder::new();
    enc.blob(&payload)?;
    let bytes = enc.into_bytes();
    assert_eq!(&bytes[..2], &[0xc8, 0x01]);

    let mut dec = reader(bytes);
    assert_eq!(dec.blob()?, payload);
    Ok(())
}

#[test]
fn test_string_and_empty_string() -> Result<()> {
    let mut enc = Encoder::new();
    enc.str("ledger")?;
    enc.str("")?;

    let mut dec = reader(enc.into_bytes());
    assert_eq!(dec.string()?, "ledger");
    assert_eq!(dec.string()?, "");
    Ok(())
}

#[test]
fn test_invalid_utf8() {
    let mut dec = reader(vec![0x02, 0xc3, 0x28]);
    assert!(matches!(dec.string(), Err(Error::InvalidUtf8)));
}

#[test]
fn test_truncated_blob() {
    let mut dec = reader(vec![0x05, 0x01, 0x02]);
    assert!(matches!(dec.blob(), Err(Error::UnexpectedEnd)));
}

#[test]
fn test_reader_stops_at_field_boundary() -> Result<()> {
    let mut dec = reader(vec![0x00, 0x07, 0x01, 0xee, 0x99]);
    assert_eq!(dec.u16()?, 7);
    assert_eq!(dec.blob()?, vec![0xee]);
    let rest = dec.into_inner();
    assert_eq!(rest.position(), 4);
    Ok(())
}

#[test]
fn test_io_errors_other_than_eof_are_kept() {
    struct Broken;
    impl std::io::Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("wire cut"))
        }
    }

    let mut dec = Reader::new(Broken);
    assert!(matches!(dec.u8(), Err(Error::Io(_))));
}
