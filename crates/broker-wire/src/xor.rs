/// Folds a byte slice down to a single XOR checksum byte.
///
/// `xor_fold(bytes)` followed by appending the result and re-folding always
/// yields `0x00`: `xor_fold(&[bytes, &[xor_fold(bytes)]].concat()) == 0`.
pub fn xor_fold(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(xor_fold(&[]), 0);
    }

    #[test]
    fn self_checksum_round_trips_to_zero() {
        let body = [0x11u8, 0x00, 0x01];
        let checksum = xor_fold(&body);
        let mut folded = body.to_vec();
        folded.push(checksum);
        assert_eq!(xor_fold(&folded), 0x00);
    }

    #[test]
    fn matches_ack_worked_example() {
        // header=0x11, serial=0x0001 -> checksum 0x10 per spec §8 scenario 1.
        assert_eq!(xor_fold(&[0x11, 0x00, 0x01]), 0x10);
        // failure ack: header=0x12, serial=0x0000 -> checksum 0x12.
        assert_eq!(xor_fold(&[0x12, 0x00, 0x00]), 0x12);
    }
}
