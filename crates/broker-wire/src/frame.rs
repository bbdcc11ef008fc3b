use thiserror::Error;

use crate::xor::xor_fold;

/// Byte that must open every source frame.
const HEADER: u8 = 0x01;
/// Size of the fixed meta block: header + serial + source id + state + count.
const HEADER_SIZE: usize = 13;
/// Width of the opaque ASCII source-id and telemetry-name fields.
pub const SOURCE_ID_SIZE: usize = 8;
/// Width of one telemetry record: 8-byte name, 4-byte value, 1-byte XOR.
pub const RECORD_SIZE: usize = 13;

/// A source's reported operating mode, carried as a single byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SourceState {
    Idle = 0x01,
    Active = 0x02,
    Recharge = 0x03,
}

impl SourceState {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Idle),
            0x02 => Some(Self::Active),
            0x03 => Some(Self::Recharge),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// The name used in announce lines: `IDLE`, `ACTIVE`, `RECHARGE`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Active => "ACTIVE",
            Self::Recharge => "RECHARGE",
        }
    }
}

/// One telemetry record after XOR verification.
///
/// `Corrupt` preserves the record's position in the frame without carrying
/// its (untrustworthy) payload; §4.1 mandates dropping only the bad record,
/// not the whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryItem {
    Valid { name: [u8; SOURCE_ID_SIZE], value: u32 },
    Corrupt,
}

/// A fully parsed, XOR-checked source frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    pub serial_num: u16,
    pub source_id: [u8; SOURCE_ID_SIZE],
    pub state: SourceState,
    pub items: Vec<TelemetryItem>,
}

/// Why a source frame was rejected outright (§4.1's reject cases).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame shorter than the 13-byte meta block")]
    TooShort,
    #[error("bad header byte {0:#04x}, expected 0x01")]
    BadHeader(u8),
    #[error("unknown source state byte {0:#04x}")]
    BadState(u8),
    #[error("payload is {actual} bytes, expected {expected} for {count} record(s)")]
    LengthMismatch { expected: usize, actual: usize, count: u8 },
}

/// Parses a source frame per §4.1. Frame-level malformation is rejected
/// wholesale; a single corrupt telemetry record inside an otherwise valid
/// frame is reported as [`TelemetryItem::Corrupt`] in place, not rejected.
pub fn parse_source_frame(buf: &[u8]) -> Result<SourceFrame, FrameError> {
    if buf.len() < HEADER_SIZE {
        return Err(FrameError::TooShort);
    }
    if buf[0] != HEADER {
        return Err(FrameError::BadHeader(buf[0]));
    }
    let state = SourceState::from_byte(buf[11]).ok_or(FrameError::BadState(buf[11]))?;

    let serial_num = u16::from_be_bytes([buf[1], buf[2]]);
    let mut source_id = [0u8; SOURCE_ID_SIZE];
    source_id.copy_from_slice(&buf[3..11]);

    let count = buf[12];
    let expected = count as usize * RECORD_SIZE;
    let payload = &buf[HEADER_SIZE..];
    if payload.len() != expected {
        return Err(FrameError::LengthMismatch { expected, actual: payload.len(), count });
    }

    let items = payload
        .chunks_exact(RECORD_SIZE)
        .map(|record| {
            let body = &record[..12];
            let checksum = record[12];
            if xor_fold(body) != checksum {
                return TelemetryItem::Corrupt;
            }
            let mut name = [0u8; SOURCE_ID_SIZE];
            name.copy_from_slice(&body[..8]);
            let value = u32::from_be_bytes([body[8], body[9], body[10], body[11]]);
            TelemetryItem::Valid { name, value }
        })
        .collect();

    Ok(SourceFrame { serial_num, source_id, state, items })
}

/// Builds a wire-format source frame from valid `(name, value)` telemetry
/// pairs. Every record gets a correct XOR checksum; to build a frame with a
/// deliberately corrupt record for tests, flip a byte in the returned
/// buffer after encoding.
pub fn encode_source_frame(
    serial_num: u16,
    source_id: [u8; SOURCE_ID_SIZE],
    state: SourceState,
    items: &[([u8; SOURCE_ID_SIZE], u32)],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + items.len() * RECORD_SIZE);
    out.push(HEADER);
    out.extend_from_slice(&serial_num.to_be_bytes());
    out.extend_from_slice(&source_id);
    out.push(state.as_byte());
    out.push(items.len() as u8);

    for (name, value) in items {
        let mut record = Vec::with_capacity(RECORD_SIZE);
        record.extend_from_slice(name);
        record.extend_from_slice(&value.to_be_bytes());
        let checksum = xor_fold(&record);
        record.push(checksum);
        out.extend_from_slice(&record);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> [u8; SOURCE_ID_SIZE] {
        let mut out = [0u8; SOURCE_ID_SIZE];
        out.copy_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn round_trip_empty_frame() {
        let bytes = encode_source_frame(1, id("asdfghjk"), SourceState::Idle, &[]);
        assert_eq!(bytes, [0x01, 0x00, 0x01, b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', 0x01, 0x00]);
        let parsed = parse_source_frame(&bytes).unwrap();
        assert_eq!(parsed.serial_num, 1);
        assert_eq!(parsed.source_id, id("asdfghjk"));
        assert_eq!(parsed.state, SourceState::Idle);
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn round_trip_with_items() {
        let items = [(id("asdfqwer"), 1u32), (id("zxcvbnma"), 42)];
        let bytes = encode_source_frame(7, id("basderty"), SourceState::Active, &items);
        let parsed = parse_source_frame(&bytes).unwrap();
        assert_eq!(parsed.serial_num, 7);
        assert_eq!(parsed.state, SourceState::Active);
        assert_eq!(
            parsed.items,
            vec![
                TelemetryItem::Valid { name: id("asdfqwer"), value: 1 },
                TelemetryItem::Valid { name: id("zxcvbnma"), value: 42 },
            ]
        );
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(parse_source_frame(&[0x01, 0x00]), Err(FrameError::TooShort));
    }

    #[test]
    fn rejects_bad_header() {
        let mut bytes = encode_source_frame(1, id("asdfghjk"), SourceState::Idle, &[]);
        bytes[0] = 0x00;
        assert_eq!(parse_source_frame(&bytes), Err(FrameError::BadHeader(0x00)));
    }

    #[test]
    fn rejects_unknown_state() {
        let mut bytes = encode_source_frame(1, id("asdfghjk"), SourceState::Idle, &[]);
        bytes[11] = 0x09;
        assert_eq!(parse_source_frame(&bytes), Err(FrameError::BadState(0x09)));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut bytes = encode_source_frame(1, id("asdfghjk"), SourceState::Idle, &[]);
        bytes[12] = 0x02; // claims 2 records, carries 0
        assert_eq!(
            parse_source_frame(&bytes),
            Err(FrameError::LengthMismatch { expected: 26, actual: 0, count: 2 })
        );
    }

    #[test]
    fn selective_corruption_drops_only_bad_record() {
        let items = [(id("x1xxxxxx"), 1u32), (id("x2xxxxxx"), 2u32)];
        let mut bytes = encode_source_frame(1, id("basderty"), SourceState::Idle, &items);
        // Flip the checksum byte of the second record only.
        let second_checksum_offset = 13 + RECORD_SIZE + 12;
        bytes[second_checksum_offset] ^= 0xFF;

        let parsed = parse_source_frame(&bytes).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0], TelemetryItem::Valid { name: id("x1xxxxxx"), value: 1 });
        assert_eq!(parsed.items[1], TelemetryItem::Corrupt);
    }
}
