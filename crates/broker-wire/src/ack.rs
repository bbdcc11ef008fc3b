use crate::xor::xor_fold;

/// Size in bytes of an ack frame: header, serial, XOR checksum.
pub const ACK_FRAME_SIZE: usize = 4;

const ACK_SUCCESS: u8 = 0x11;
const ACK_FAILURE: u8 = 0x12;

/// The outcome a source's ack frame reports for one received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Frame accepted; echoes its serial number.
    Success { serial_num: u16 },
    /// Frame rejected outright (§4.1's reject cases); serial is always 0.
    Failure,
}

/// Encodes an ack frame: header byte, 2-byte serial (big-endian), then the
/// XOR checksum of those 3 preceding bytes.
pub fn encode_ack(ack: Ack) -> [u8; ACK_FRAME_SIZE] {
    let (header, serial_num) = match ack {
        Ack::Success { serial_num } => (ACK_SUCCESS, serial_num),
        Ack::Failure => (ACK_FAILURE, 0),
    };
    let serial_bytes = serial_num.to_be_bytes();
    let mut out = [0u8; ACK_FRAME_SIZE];
    out[0] = header;
    out[1] = serial_bytes[0];
    out[2] = serial_bytes[1];
    out[3] = xor_fold(&out[..3]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_success_ack() {
        // spec §8 scenario 1: serial=1 -> ack `11 00 01 10`.
        assert_eq!(encode_ack(Ack::Success { serial_num: 1 }), [0x11, 0x00, 0x01, 0x10]);
    }

    #[test]
    fn failure_ack_is_always_serial_zero() {
        // spec §8 scenario 2.
        assert_eq!(encode_ack(Ack::Failure), [0x12, 0x00, 0x00, 0x12]);
    }
}
