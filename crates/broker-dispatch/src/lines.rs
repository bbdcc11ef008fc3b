use std::time::Instant;

use broker_registry::SourceRecord;

/// Renders the source-announce line for `record` as observed at `now`.
///
/// `name`/`id` fields are 8 raw ASCII bytes passed through unchanged, per
/// §4.4 ("implementers must pass through bytes unchanged; no re-encoding").
pub fn announce_line(record: &SourceRecord, now: Instant) -> Vec<u8> {
    // §4.4 specifies a floating-point millisecond count ("may be 0.0"),
    // not an integer — keep sub-millisecond precision rather than truncating.
    let ms = now.saturating_duration_since(record.last_received).as_secs_f64() * 1000.0;
    let mut line = Vec::with_capacity(32);
    line.push(b'[');
    line.extend_from_slice(&record.id);
    line.extend_from_slice(
        format!("] {} | {} | {ms:.3}\r\n", record.serial_num, record.state.name()).as_bytes(),
    );
    line
}

/// Renders one telemetry line for `(source_id, name, value)`.
pub fn telemetry_line(source_id: &[u8; 8], name: &[u8; 8], value: u32) -> Vec<u8> {
    let mut line = Vec::with_capacity(24);
    line.push(b'[');
    line.extend_from_slice(source_id);
    line.extend_from_slice(b"] ");
    line.extend_from_slice(name);
    line.extend_from_slice(format!(" | {value}\r\n").as_bytes());
    line
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use broker_wire::SourceState;

    use super::*;

    fn id(s: &str) -> [u8; 8] {
        let mut out = [0u8; 8];
        out.copy_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn announce_line_format() {
        let now = Instant::now();
        let record = SourceRecord { id: id("basderty"), serial_num: 1, state: SourceState::Idle, last_received: now };
        let line = announce_line(&record, now);
        assert_eq!(line, b"[basderty] 1 | IDLE | 0.000\r\n");
    }

    #[test]
    fn announce_line_reflects_elapsed_time() {
        let t0 = Instant::now();
        let record = SourceRecord { id: id("basderty"), serial_num: 1, state: SourceState::Idle, last_received: t0 };
        // simulate elapsed time by constructing `now` later than `t0`
        std::thread::sleep(Duration::from_millis(2));
        let now = Instant::now();
        let line = announce_line(&record, now);
        let text = String::from_utf8(line).unwrap();
        assert!(text.starts_with("[basderty] 1 | IDLE | "));
        assert!(!text.trim_end().ends_with("| 0"));
    }

    #[test]
    fn telemetry_line_format() {
        let line = telemetry_line(&id("basderty"), &id("asdfqwer"), 1);
        assert_eq!(line, b"[basderty] asdfqwer | 1\r\n");
    }
}
