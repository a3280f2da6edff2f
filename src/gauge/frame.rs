//! Wire framing of the MKS 974B serial protocol.
//!
//! Requests are ASCII frames `@{address:03}{mnemonic}?;FF` (query) or
//! `@{address:03}{mnemonic}!{value};FF` (set). The gauge answers with
//! `@{address:03}ACK{payload};FF`.

use crate::constants::ACK_TOKEN;

/// Build a query frame.
///
/// # Arguments
/// * `address` - RS-485 device address.
/// * `code` - Command mnemonic.
///
/// # Returns
/// The frame string.
pub fn query(address: u8, code: &str) -> String {
    format!("@{:03}{}?;FF", address, code)
}

/// Build a set frame.
///
/// # Arguments
/// * `address` - RS-485 device address.
/// * `code` - Command mnemonic.
/// * `value` - Value to set.
///
/// # Returns
/// The frame string.
pub fn set(address: u8, code: &str, value: &str) -> String {
    format!("@{:03}{}!{};FF", address, code, value)
}

/// Extract the payload of an acknowledgement frame.
///
/// # Arguments
/// * `response` - Raw response bytes.
///
/// # Returns
/// The payload between `ACK` and the `;FF` terminator, or None when the
/// response is not a well-formed acknowledgement.
pub fn ack_payload(response: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(response).ok()?;
    let body = text.strip_suffix(";FF")?;

    if !body.starts_with('@') {
        return None;
    }

    // The 3-character device address sits between '@' and the ACK token.
    body.get(4..)?.strip_prefix(ACK_TOKEN).map(String::from)
}

/// Check if the response is the echo of a transmitted frame. On a half-duplex
/// RS-485 line the sender reads its own command back before the reply.
///
/// # Arguments
/// * `response` - Raw response bytes.
/// * `sent` - The frame that was transmitted.
///
/// # Returns
/// True if the response is the echo.
pub fn is_echo(response: &[u8], sent: &str) -> bool {
    response == sent.as_bytes()
}

/// Format a value the way the gauge expects its scientific notation, e.g.
/// `5.00E+02` or `1.00E-04`.
///
/// # Arguments
/// * `value` - Value to format.
///
/// # Returns
/// The formatted string.
pub fn scientific(value: f64) -> String {
    let formatted = format!("{:.2E}", value);

    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            format!("{}E{}{:02}", mantissa, if exponent < 0 { "-" } else { "+" }, exponent.abs())
        }
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query() {
        assert_eq!(query(1, "PR4"), "@001PR4?;FF");
        assert_eq!(query(253, "SN"), "@253SN?;FF");
    }

    #[test]
    fn test_set() {
        assert_eq!(set(1, "ENC", "ON"), "@001ENC!ON;FF");
        assert_eq!(set(12, "SP1", "5.00E+02"), "@012SP1!5.00E+02;FF");
    }

    #[test]
    fn test_ack_payload() {
        assert_eq!(
            ack_payload(b"@001ACK1.23E-6;FF"),
            Some(String::from("1.23E-6"))
        );
        assert_eq!(ack_payload(b"@253ACK;FF"), Some(String::new()));
    }

    #[test]
    fn test_ack_payload_malformed() {
        // Missing terminator.
        assert_eq!(ack_payload(b"@001ACK1.23E-6"), None);

        // Not an acknowledgement.
        assert_eq!(ack_payload(b"@001NAK180;FF"), None);

        // Truncated and empty responses.
        assert_eq!(ack_payload(b"@0;FF"), None);
        assert_eq!(ack_payload(b""), None);

        // Not a frame at all.
        assert_eq!(ack_payload(b"garbage"), None);
    }

    #[test]
    fn test_is_echo() {
        let frame = query(1, "PR4");

        assert!(is_echo(b"@001PR4?;FF", &frame));
        assert!(!is_echo(b"@001ACK1.0E-6;FF", &frame));
        assert!(!is_echo(b"", &frame));
    }

    #[test]
    fn test_scientific() {
        assert_eq!(scientific(500.0), "5.00E+02");
        assert_eq!(scientific(1.0e-4), "1.00E-04");
        assert_eq!(scientific(7.5e-4), "7.50E-04");
        assert_eq!(scientific(0.0), "0.00E+00");
    }
}
