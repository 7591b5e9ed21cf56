use std::io::Cursor;

use anyhow::Result;
use remopack::Reader;

use crate::*;

fn sample_triple() -> ModuleTriple {
    ModuleTriple::new("shop", "billing", "eu")
}

// ============================================================================
//  HEADERS
// ============================================================================

#[test]
fn test_header_bytes_are_stable() {
    assert_eq!(MessageHeader::SessionOpenRequest.as_u8(), 0x01);
    assert_eq!(MessageHeader::SessionOpenResponse.as_u8(), 0x02);
    assert_eq!(MessageHeader::InvocationRequest.as_u8(), 0x03);
    assert_eq!(MessageHeader::InvocationResponse.as_u8(), 0x05);
    assert_eq!(MessageHeader::ModuleAvailable.as_u8(), 0x08);
    assert_eq!(MessageHeader::TxResponse.as_u8(), 0x14);
}

#[test]
fn test_every_assigned_byte_maps_back() {
    for b in 0u8..=0xff {
        if let Some(h) = MessageHeader::from_u8(b) {
            assert_eq!(h.as_u8(), b);
        }
    }
    assert_eq!(MessageHeader::from_u8(0x07), None);
    assert_eq!(MessageHeader::from_u8(0x00), None);
}

#[test]
fn test_unknown_header_is_rejected() {
    let err = Message::decode(&[0x7f, 0x00]).unwrap_err();
    assert!(matches!(err, Error::UnknownHeader(0x7f)));
}

#[test]
fn test_expect_header_mismatch() {
    let mut r = Reader::new(Cursor::new(vec![0x05]));
    let err = MessageHeader::expect(&mut r, MessageHeader::SessionOpenResponse).unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedHeader {
            expected: MessageHeader::SessionOpenResponse,
            found: MessageHeader::InvocationResponse
        }
    ));
}

// ============================================================================
//  ATTACHMENTS
// ============================================================================

#[test]
fn test_empty_attachment_block_is_one_byte() -> Result<()> {
    let mut enc = remopack::Encoder::new();
    Attachments::new().write(&mut enc)?;
    assert_eq!(enc.into_bytes(), vec![0x00]);
    Ok(())
}

#[test]
fn test_attachment_layout() -> Result<()> {
    let mut att = Attachments::new();
    att.insert(AttachmentKey::SessionAffinity, b"n1".to_vec());

    let mut enc = remopack::Encoder::new();
    att.write(&mut enc)?;
    assert_eq!(enc.into_bytes(), vec![0x01, 0x00, 0x02, 0x02, b'n', b'1']);
    Ok(())
}

#[test]
fn test_custom_key_normalizes_onto_reserved_code() {
    let mut att = Attachments::new();
    att.insert(AttachmentKey::Custom(1), b"tx".to_vec());
    assert_eq!(att.get(AttachmentKey::TransactionId), Some(&b"tx"[..]));
    assert_eq!(att.len(), 1);
}

#[test]
fn test_unknown_keys_survive_decoding() -> Result<()> {
    let bytes = vec![0x02, 0x12, 0x34, 0x01, 0xaa, 0x00, 0x01, 0x00];
    let mut r = Reader::new(Cursor::new(bytes));
    let att = Attachments::read(&mut r)?;
    assert_eq!(att.get(AttachmentKey::Custom(0x1234)), Some(&[0xaa][..]));
    assert_eq!(att.get(AttachmentKey::TransactionId), Some(&[][..]));
    Ok(())
}

#[test]
fn test_too_many_attachments() {
    let mut att = Attachments::new();
    for code in 0..300u16 {
        att.insert(AttachmentKey::Custom(code + 10), vec![]);
    }
    let mut enc = remopack::Encoder::new();
    assert!(matches!(att.write(&mut enc), Err(Error::ProtocolViolation(_))));
}

// ============================================================================
//  SESSION OPEN
// ============================================================================

#[test]
fn test_session_open_response_layout() -> Result<()> {
    let frame = SessionOpenResponse {
        invocation_id: 0x0102,
        session: SessionId::new(vec![0xde, 0xad]),
        attachments: Attachments::new(),
    };
    let bytes = frame.encode()?;
    assert_eq!(bytes, vec![0x02, 0x01, 0x02, 0x02, 0xde, 0xad, 0x00]);
    assert_eq!(Message::decode(&bytes)?, Message::SessionOpenResponse(frame));
    Ok(())
}

#[test]
fn test_session_open_response_tail_stops_after_attachments() -> Result<()> {
    let mut bytes = SessionOpenResponse {
        invocation_id: 9,
        session: SessionId::new(vec![1, 2, 3]),
        attachments: Attachments::new(),
    }
    .encode()?;
    bytes.push(0xff);

    let mut r = Reader::new(Cursor::new(bytes));
    MessageHeader::expect(&mut r, MessageHeader::SessionOpenResponse)?;
    assert_eq!(read_invocation_id(&mut r)?, 9);
    let (session, attachments) = SessionOpenResponse::read_tail(&mut r)?;
    assert_eq!(session.as_bytes(), &[1, 2, 3]);
    assert!(attachments.is_empty());
    assert_eq!(r.u8()?, 0xff);
    Ok(())
}

#[test]
fn test_session_open_request_decodes() -> Result<()> {
    let frame = SessionOpenRequest {
        invocation_id: 4,
        module: sample_triple(),
        bean: "Cart".into(),
        attachments: Attachments::new(),
    };
    assert_eq!(Message::decode(&frame.encode()?)?, Message::SessionOpenRequest(frame));
    Ok(())
}

// ============================================================================
//  INVOCATIONS
// ============================================================================

#[test]
fn test_invocation_request_with_session() -> Result<()> {
    let mut attachments = Attachments::new();
    attachments.insert(AttachmentKey::TransactionId, b"tx-1".to_vec());

    let frame = InvocationRequest {
        invocation_id: 77,
        module: sample_triple(),
        bean: "Cart".into(),
        view: "CartRemote".into(),
        method: "add".into(),
        signature: vec!["string".into(), "int".into()],
        session: Some(SessionId::new(vec![5, 5])),
        payload: vec![9, 8, 7],
        attachments,
    };

    let bytes = frame.encode()?;
    assert_eq!(bytes[0], 0x03);
    assert_eq!(&bytes[1..3], &[0x00, 77]);
    assert_eq!(Message::decode(&bytes)?, Message::InvocationRequest(frame));
    Ok(())
}

#[test]
fn test_trailing_bytes_are_a_violation() -> Result<()> {
    let mut bytes = CancelRequest { invocation_id: 1, may_interrupt: true }.encode();
    bytes.push(0);
    assert!(matches!(Message::decode(&bytes), Err(Error::ProtocolViolation(_))));
    Ok(())
}

#[test]
fn test_failure_attachments_only_for_application_exceptions() -> Result<()> {
    let exception = InvocationFailure {
        kind: FailureKind::ApplicationException,
        invocation_id: 3,
        message: "boom".into(),
        attachments: Attachments::new(),
    };
    let no_method = InvocationFailure { kind: FailureKind::NoSuchMethod, ..exception.clone() };

    let a = exception.encode()?;
    let b = no_method.encode()?;
    assert_eq!(a.len(), b.len() + 1);
    assert_eq!(b[0], 0x0B);

    assert_eq!(Message::decode(&a)?, Message::Failure(exception));
    assert_eq!(Message::decode(&b)?, Message::Failure(no_method));
    Ok(())
}

#[test]
fn test_truncated_response_is_a_pack_error() {
    let err = Message::decode(&[0x05, 0x00]).unwrap_err();
    assert!(matches!(err, Error::Pack(remopack::Error::UnexpectedEnd)));
}

// ============================================================================
//  MODULES, TRANSACTIONS, NOTIFICATIONS
// ============================================================================

#[test]
fn test_module_unavailable_uses_its_own_header() -> Result<()> {
    let frame = ModuleAvailability { available: false, modules: vec![sample_triple()] };
    let bytes = frame.encode()?;
    assert_eq!(bytes[0], 0x09);
    assert_eq!(Message::decode(&bytes)?, Message::ModuleAvailability(frame));
    Ok(())
}

#[test]
fn test_commit_carries_one_phase_flag() -> Result<()> {
    let frame = TxRequest {
        invocation_id: 12,
        kind: TxKind::Commit { one_phase: true },
        transaction: TransactionId::new(b"branch".to_vec()),
    };
    let bytes = frame.encode()?;
    assert_eq!(bytes[0], 0x0F);
    assert_eq!(*bytes.last().unwrap_or(&0), 0x01);
    assert_eq!(Message::decode(&bytes)?, Message::TxRequest(frame));
    Ok(())
}

#[test]
fn test_tx_response_with_and_without_value() -> Result<()> {
    let voted = TxResponse { invocation_id: 1, value: Some(3) };
    let plain = TxResponse { invocation_id: 2, value: None };
    assert_eq!(voted.encode(), vec![0x14, 0x00, 0x01, 0x01, 0x03]);
    assert_eq!(Message::decode(&plain.encode())?, Message::TxResponse(plain));
    Ok(())
}

#[test]
fn test_async_notification() -> Result<()> {
    let frame = AsyncMethodNotification { invocation_id: 0xbeef };
    assert_eq!(frame.encode(), vec![0x0E, 0xbe, 0xef]);
    assert_eq!(Message::decode(&frame.encode())?.header(), MessageHeader::AsyncMethodNotification);
    Ok(())
}

#[test]
fn test_ids_display_as_hex() {
    assert_eq!(SessionId::new(vec![0x0a, 0xff]).to_string(), "session-0aff");
    assert_eq!(TransactionId::new(vec![0x01]).to_string(), "tx-01");
}
