use super::{
    decode, encode, FrameError, Task, CLOSE_MARKER, FILLER, MAX_MESSAGE_SIZE, OPEN_MARKER,
};

#[test]
pub fn round_trip() {
    let task = Task::new("solve", "--timeout 60 bench.cnf");
    let frame = encode(&task).unwrap();

    assert_eq!(frame.as_bytes().len(), MAX_MESSAGE_SIZE);
    assert_eq!(decode(frame.as_bytes()).unwrap(), task);
}

#[test]
pub fn round_trip_empty_parameters() {
    let task = Task::new("NOP", "");
    let frame = encode(&task).unwrap();

    assert_eq!(decode(frame.as_bytes()).unwrap(), task);
}

#[test]
pub fn layout_is_bit_exact() {
    let frame = encode(&Task::new("A", "x")).unwrap();

    // 3 digits + '<' + "A" + ';' + "x" + '>' = 8 payload bytes
    assert_eq!(&frame.as_bytes()[..8], b"008<A;x>".as_ref());
    assert!(frame.as_bytes()[8..].iter().all(|byte| *byte == FILLER));
}

#[test]
pub fn payload_at_exact_capacity() {
    // overhead is 6 bytes, so command + parameters of 250 hit the limit
    let task = Task::new("c".repeat(50), "p".repeat(200));
    let frame = encode(&task).unwrap();

    assert_eq!(decode(frame.as_bytes()).unwrap(), task);
}

#[test]
pub fn payload_over_capacity() {
    let task = Task::new("c".repeat(50), "p".repeat(201));

    assert_eq!(encode(&task), Err(FrameError::FrameTooLarge(257)));
}

#[test]
pub fn delimiter_rejected_in_command() {
    assert_eq!(
        encode(&Task::new("do;stuff", "x")),
        Err(FrameError::InvalidPayload)
    );
}

#[test]
pub fn delimiter_rejected_in_parameters() {
    assert_eq!(
        encode(&Task::new("do", "a;b")),
        Err(FrameError::InvalidPayload)
    );
}

#[test]
pub fn missing_delimiter_yields_empty_parameters() {
    let mut bytes = [FILLER; MAX_MESSAGE_SIZE];
    bytes[..3].copy_from_slice(b"008");
    bytes[3] = OPEN_MARKER;
    bytes[4..7].copy_from_slice(b"cmd");
    bytes[7] = CLOSE_MARKER;

    assert_eq!(decode(&bytes).unwrap(), Task::new("cmd", ""));
}

#[test]
pub fn trailing_filler_never_inspected() {
    let frame = encode(&Task::new("A", "x")).unwrap();
    let mut bytes = [0u8; MAX_MESSAGE_SIZE];
    bytes.copy_from_slice(frame.as_bytes());

    // garbage (even invalid UTF-8) beyond the declared payload length
    for byte in bytes[8..].iter_mut() {
        *byte = 0xFF;
    }

    assert_eq!(decode(&bytes).unwrap(), Task::new("A", "x"));
}

#[test]
pub fn missing_open_marker() {
    let frame = encode(&Task::new("A", "x")).unwrap();
    let mut bytes = [0u8; MAX_MESSAGE_SIZE];
    bytes.copy_from_slice(frame.as_bytes());
    bytes[3] = b'(';

    assert!(matches!(
        decode(&bytes),
        Err(FrameError::MalformedFrame("missing open marker"))
    ));
}

#[test]
pub fn declared_length_without_close_marker() {
    // length field claims 10 payload bytes but offset 9 holds filler
    let mut bytes = [FILLER; MAX_MESSAGE_SIZE];
    bytes[..3].copy_from_slice(b"010");
    bytes[3] = OPEN_MARKER;
    bytes[4..9].copy_from_slice(b"ABCDE");

    assert!(matches!(
        decode(&bytes),
        Err(FrameError::MalformedFrame("missing close marker"))
    ));
}

#[test]
pub fn non_decimal_length_field() {
    let mut bytes = [FILLER; MAX_MESSAGE_SIZE];
    bytes[..3].copy_from_slice(b"1x0");

    assert!(matches!(
        decode(&bytes),
        Err(FrameError::MalformedFrame("length field is not decimal"))
    ));
}

#[test]
pub fn length_field_out_of_range() {
    let mut bytes = [FILLER; MAX_MESSAGE_SIZE];
    bytes[..3].copy_from_slice(b"999");
    bytes[3] = OPEN_MARKER;

    assert!(matches!(
        decode(&bytes),
        Err(FrameError::MalformedFrame("length field out of range"))
    ));
}

#[test]
pub fn truncated_buffer() {
    assert!(matches!(
        decode(b"009<A;"),
        Err(FrameError::MalformedFrame("length field out of range"))
    ));
    assert!(matches!(
        decode(b"009<"),
        Err(FrameError::MalformedFrame("shorter than the fixed header"))
    ));
}

#[test]
pub fn empty_task_predicate() {
    assert!(Task::new("", "").is_empty());
    assert!(!Task::new("cmd", "").is_empty());
    // an empty command with real parameters is still work, the predicate
    // must not classify it as the sentinel
    assert!(!Task::new("", "params").is_empty());
}

#[test]
pub fn sentinel_tasks() {
    assert!(Task::terminate().is_termination());
    assert!(!Task::finished().is_termination());
    assert!(!Task::finished().is_empty());
}
