//! Unit tests for the streaming TLV reader.

use rstest::rstest;

use super::*;

#[test]
fn decodes_structure_members_in_order() {
    let bytes = [
        0x15, // structure
        0x24, 0x00, 0x2A, // 0: u8 42
        0x29, 0x01, // 1: true
        0x2C, 0x02, 0x02, b'o', b'k', // 2: "ok"
        0x34, 0x03, // 3: null
        0x18,
    ];
    let element = TlvReader::read_single(&bytes).expect("decode");
    assert_eq!(element.tag(), Tag::Anonymous);
    assert_eq!(element.raw(), bytes.as_slice());

    let mut fields = element.as_structure().expect("structure");
    let first = fields.next_element().expect("decode").expect("field 0");
    assert_eq!(first.tag(), Tag::Context(0));
    assert_eq!(first.as_u8().expect("u8"), 42);

    let second = fields.next_element().expect("decode").expect("field 1");
    assert!(second.as_bool().expect("bool"));

    let third = fields.next_element().expect("decode").expect("field 2");
    assert_eq!(third.as_str().expect("str"), "ok");

    let fourth = fields.next_element().expect("decode").expect("field 3");
    assert!(fourth.is_null());

    assert_eq!(fields.next_element().expect("decode"), None);
    assert!(fields.is_exhausted());
}

#[test]
fn nested_containers_are_skipped_as_one_element() {
    let bytes = [
        0x16, // array
        0x17, 0x24, 0x00, 0x01, 0x18, // list [0: 1]
        0x15, 0x36, 0x00, 0x18, 0x18, // structure { 0: [] }
        0x18,
    ];
    let element = TlvReader::read_single(&bytes).expect("decode");
    let mut members = element.as_array().expect("array");

    let list = members.next_element().expect("decode").expect("list");
    assert_eq!(list.raw(), &[0x17, 0x24, 0x00, 0x01, 0x18]);
    let mut list_members = list.as_list().expect("list");
    let inner = list_members.next_element().expect("decode").expect("member");
    assert_eq!(inner.as_u64().expect("u64"), 1);

    let structure = members.next_element().expect("decode").expect("structure");
    let mut fields = structure.as_structure().expect("structure");
    let empty = fields.next_element().expect("decode").expect("field");
    assert_eq!(empty.as_array().expect("array").next_element(), Ok(None));

    assert_eq!(members.next_element().expect("decode"), None);
}

#[rstest]
#[case::i8(&[0x00, 0xFF], -1)]
#[case::i16(&[0x01, 0xD4, 0xFE], -300)]
#[case::i64(&[0x03, 0, 0, 0, 0, 0, 0, 0, 0x80], i64::MIN)]
fn decodes_signed_integers(#[case] bytes: &[u8], #[case] expected: i64) {
    let element = TlvReader::read_single(bytes).expect("decode");
    assert_eq!(element.as_i64().expect("i64"), expected);
}

#[test]
fn decodes_floats_and_octet_strings() {
    let mut bytes = vec![0x0A];
    bytes.extend_from_slice(&1.5_f32.to_le_bytes());
    bytes.extend_from_slice(&[0x10, 0x02, 0xDE, 0xAD]);

    let mut reader = TlvReader::new(&bytes);
    let float = reader.next_element().expect("decode").expect("float");
    assert_eq!(float.value(), &Value::Float(1.5));
    let octets = reader.next_element().expect("decode").expect("bytes");
    assert_eq!(octets.as_bytes().expect("bytes"), &[0xDE, 0xAD]);
    assert!(reader.is_exhausted());
}

// ---------------------------------------------------------------------------
// Malformed input
// ---------------------------------------------------------------------------

#[rstest]
#[case::empty(&[], TlvError::Truncated)]
#[case::short_integer(&[0x05, 0x01], TlvError::Truncated)]
#[case::short_string(&[0x0C, 0x05, b'a'], TlvError::Truncated)]
#[case::missing_context_tag(&[0x24], TlvError::Truncated)]
#[case::unterminated_container(&[0x15, 0x24, 0x00, 0x01], TlvError::Truncated)]
#[case::reserved_element_type(&[0x19], TlvError::InvalidElementType(0x19))]
#[case::profile_tag(&[0x44, 0x00], TlvError::UnsupportedTagControl(0x40))]
#[case::stray_end(&[0x18], TlvError::UnexpectedEndOfContainer)]
#[case::trailing(&[0x04, 0x01, 0x04], TlvError::TrailingBytes { remaining: 1 })]
#[case::invalid_utf8(&[0x0C, 0x01, 0xFF], TlvError::InvalidUtf8)]
fn rejects_malformed_input(#[case] bytes: &[u8], #[case] expected: TlvError) {
    assert_eq!(TlvReader::read_single(bytes), Err(expected));
}

#[test]
fn narrowing_reports_out_of_range() {
    let element = TlvReader::read_single(&[0x05, 0x00, 0x01]).expect("decode");
    assert_eq!(element.as_u16().expect("u16"), 256);
    assert_eq!(
        element.as_u8(),
        Err(TlvError::OutOfRange {
            value: 256,
            target: "u8"
        })
    );
}

#[test]
fn accessors_report_type_mismatch() {
    let element = TlvReader::read_single(&[0x09]).expect("decode");
    assert_eq!(
        element.as_u64(),
        Err(TlvError::TypeMismatch {
            expected: "unsigned integer",
            found: "boolean"
        })
    );
    assert_eq!(
        element.as_structure(),
        Err(TlvError::TypeMismatch {
            expected: "structure",
            found: "boolean"
        })
    );
}

#[test]
fn container_kind_must_match() {
    let element = TlvReader::read_single(&[0x17, 0x18]).expect("decode");
    assert_eq!(
        element.as_array(),
        Err(TlvError::TypeMismatch {
            expected: "array",
            found: "list"
        })
    );
}
