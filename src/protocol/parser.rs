// Line parser for the vision module protocol
//
// Pure function from one line of bytes to a Command. Anything that does
// not match one of the two message shapes becomes Command::None.

use crate::config::LINE_CAPACITY;
use crate::messages::{Command, SERVO_PREFIX, ServoAngles, TARGET_PREFIX, TargetReport};

/// Parse one line (newline-terminated or not).
///
/// Input longer than `LINE_CAPACITY - 1` bytes is truncated before parsing.
/// Numbers are scanned the way `scanf("%d,%d")` does: leading whitespace and
/// a sign are accepted before each integer, and anything after the last
/// required integer is ignored.
pub fn parse_command(data: &[u8]) -> Command {
    if data.is_empty() {
        return Command::None;
    }

    let line = trim_line(&data[..data.len().min(LINE_CAPACITY - 1)]);

    if let Some(rest) = line.strip_prefix(TARGET_PREFIX) {
        if let Some([x, y, valid]) = scan_ints::<3>(rest) {
            return Command::Target(TargetReport {
                x,
                y,
                valid: valid != 0,
            });
        }
    }

    if let Some(rest) = line.strip_prefix(SERVO_PREFIX) {
        if let Some([pan, tilt]) = scan_ints::<2>(rest) {
            return Command::ServoAngles(ServoAngles { pan, tilt });
        }
    }

    Command::None
}

/// Cut at the first newline, then drop trailing '\r', '\n' and ' '
fn trim_line(data: &[u8]) -> &[u8] {
    let mut line = match data.iter().position(|&b| b == b'\n') {
        Some(i) => &data[..i],
        None => data,
    };
    while let [head @ .., b'\r' | b'\n' | b' '] = line {
        line = head;
    }
    line
}

/// Scan N comma-separated decimal integers from the start of `input`
fn scan_ints<const N: usize>(input: &[u8]) -> Option<[i32; N]> {
    let mut values = [0i32; N];
    let mut rest = input;

    for (i, slot) in values.iter_mut().enumerate() {
        if i > 0 {
            rest = rest.strip_prefix(b",")?;
        }
        let (value, tail) = scan_int(rest)?;
        *slot = value;
        rest = tail;
    }

    Some(values)
}

/// One `%d` conversion. Out-of-range values fail the scan.
fn scan_int(input: &[u8]) -> Option<(i32, &[u8])> {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace() && *b != 0x0B)
        .unwrap_or(input.len());
    let mut rest = &input[start..];

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let mut magnitude: i64 = 0;
    for &d in &rest[..digits] {
        magnitude = magnitude.checked_mul(10)?.checked_add(i64::from(d - b'0'))?;
        if magnitude > i64::from(i32::MAX) + 1 {
            return None;
        }
    }

    let value = if negative { -magnitude } else { magnitude };
    let value = i32::try_from(value).ok()?;
    Some((value, &rest[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_command(b"$TARGET,240,400,1\n"),
            Command::target(240, 400, true)
        );
        assert_eq!(
            parse_command(b"$TARGET,-12,+7,0"),
            Command::target(-12, 7, false)
        );
    }

    #[test]
    fn test_valid_is_any_nonzero() {
        assert_eq!(
            parse_command(b"$TARGET,1,2,-5\n"),
            Command::target(1, 2, true)
        );
        assert_eq!(
            parse_command(b"$TARGET,1,2,7\n"),
            Command::target(1, 2, true)
        );
    }

    #[test]
    fn test_parse_servo() {
        assert_eq!(parse_command(b"$SERVO,30,-20\n"), Command::servo(30, -20));
    }

    #[test]
    fn test_trailing_whitespace_and_crlf() {
        assert_eq!(
            parse_command(b"$SERVO,30,-20 \r\n"),
            Command::servo(30, -20)
        );
        assert_eq!(
            parse_command(b"$TARGET,1,2,1\r\r  "),
            Command::target(1, 2, true)
        );
    }

    #[test]
    fn test_empty_and_unknown_lines() {
        assert_eq!(parse_command(b""), Command::None);
        assert_eq!(parse_command(b"\n"), Command::None);
        assert_eq!(parse_command(b"NO_TARGET\n"), Command::None);
        assert_eq!(parse_command(b"$GPGGA,1,2,3\n"), Command::None);
        assert_eq!(parse_command(b"$target,1,2,1\n"), Command::None);
    }

    #[test]
    fn test_wrong_field_count_is_none() {
        assert_eq!(parse_command(b"$TARGET,1,2\n"), Command::None);
        assert_eq!(parse_command(b"$SERVO,1\n"), Command::None);
        assert_eq!(parse_command(b"$TARGET,\n"), Command::None);
        assert_eq!(parse_command(b"$TARGET,a,b,c\n"), Command::None);
    }

    #[test]
    fn test_no_alternate_delimiters() {
        assert_eq!(parse_command(b"$TARGET;1;2;1\n"), Command::None);
        assert_eq!(parse_command(b"$TARGET,1 ,2,1\n"), Command::None);
        assert_eq!(parse_command(b"$SERVO,\"1\",2\n"), Command::None);
    }

    #[test]
    fn test_scanf_leniency() {
        // Leading spaces before a number and trailing content are tolerated
        assert_eq!(
            parse_command(b"$TARGET, 1, 2, 1\n"),
            Command::target(1, 2, true)
        );
        assert_eq!(
            parse_command(b"$TARGET,1,2,1,99\n"),
            Command::target(1, 2, true)
        );
        assert_eq!(parse_command(b"$SERVO,10,20deg\n"), Command::servo(10, 20));
    }

    #[test]
    fn test_only_first_line_is_parsed() {
        assert_eq!(
            parse_command(b"$SERVO,1,2\n$TARGET,1,2,1\n"),
            Command::servo(1, 2)
        );
    }

    #[test]
    fn test_out_of_range_integer_is_none() {
        assert_eq!(parse_command(b"$SERVO,2147483648,0\n"), Command::None);
        assert_eq!(
            parse_command(b"$SERVO,-2147483648,2147483647\n"),
            Command::servo(i32::MIN, i32::MAX)
        );
        assert_eq!(
            parse_command(b"$SERVO,99999999999999999999999,0\n"),
            Command::None
        );
    }

    #[test]
    fn test_non_utf8_bytes_do_not_panic() {
        assert_eq!(parse_command(&[0xFF, 0xFE, b'\n']), Command::None);
        assert_eq!(parse_command(b"$SERVO,1,2\xFF\n"), Command::servo(1, 2));
    }

    #[test]
    fn test_max_length_line_parses() {
        // 255 content bytes plus newline: the newline is cut, the content survives
        let mut line = b"$SERVO,1,2".to_vec();
        line.resize(255, b' ');
        line.push(b'\n');
        assert_eq!(line.len(), 256);
        assert_eq!(parse_command(&line), Command::servo(1, 2));
    }

    #[test]
    fn test_overlong_line_truncates() {
        // Digits past byte 255 are dropped
        let mut line = b"$SERVO,1,".to_vec();
        line.resize(250, b'0');
        line.extend_from_slice(b"123456789\n");
        assert!(line.len() > 256);
        assert_eq!(parse_command(&line), Command::servo(1, 12345));

        let mut padded = b"$TARGET,5,6,1".to_vec();
        padded.resize(1000, b' ');
        padded.push(b'\n');
        assert_eq!(parse_command(&padded), Command::target(5, 6, true));
    }

    proptest! {
        #[test]
        fn test_target_round_trip(x in any::<i32>(), y in any::<i32>(), valid in any::<bool>()) {
            let line = format!("$TARGET,{},{},{}\n", x, y, if valid { 1 } else { 0 });
            prop_assert_eq!(parse_command(line.as_bytes()), Command::target(x, y, valid));
        }

        #[test]
        fn test_servo_round_trip(pan in any::<i32>(), tilt in any::<i32>()) {
            let line = Command::servo(pan, tilt).encode_line();
            prop_assert_eq!(parse_command(line.as_bytes()), Command::servo(pan, tilt));
        }

        #[test]
        fn test_arbitrary_bytes_never_panic(
            bytes in proptest::collection::vec(any::<u8>(), 0..600)
        ) {
            let _ = parse_command(&bytes);
        }
    }
}
