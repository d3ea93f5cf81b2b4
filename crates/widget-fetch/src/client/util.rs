use std::io::Write;

use http::Request;

use crate::{FetchError, Result};

/// Writes the provided [Request] in the HTTP/1.1 wire format into `dst`.
pub fn encode_request<T: AsRef<[u8]>, O: Write>(req: &Request<T>, mut dst: O) -> Result<()> {
    // Write start line
    write!(
        dst,
        "{} {} {:?}\r\n",
        req.method(),
        req.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/"),
        req.version()
    )
    .map_err(|e| FetchError::from_io_error_with_description(e, || "failed to encode the HTTP start line".into()))?;

    for (name, value) in req.headers() {
        write!(
            dst,
            "{}: {}\r\n",
            name,
            value.to_str().map_err(|_| FetchError::Other(
                format!("invalid value for the '{name}' HTTP header: '{value:?}'").into()
            ))?
        )
        .map_err(|e| {
            FetchError::from_io_error_with_description(e, || format!("failed to encode the '{name}' HTTP header").into())
        })?;
    }

    // End of headers
    write!(dst, "\r\n").map_err(|e| {
        FetchError::from_io_error_with_description(e, || "failed to write an empty line after HTTP headers".into())
    })?;

    if !req.body().as_ref().is_empty() {
        dst.write_all(req.body().as_ref()).map_err(|e| {
            FetchError::from_io_error_with_description(e, || "failed to write an HTTP request body".into())
        })?;
    }

    Ok(())
}

/// Converts an ASCII hex digit into its value.
pub fn hex_digit_to_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as usize),
        b'a'..=b'f' => Some((byte - b'a' + 10) as usize),
        b'A'..=b'F' => Some((byte - b'A' + 10) as usize),
        _ => None,
    }
}

/// Appends a base-16 digit to the provided number.
#[inline]
pub fn add_base16_digit(value: usize, digit: usize) -> usize {
    value * 16 + digit
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn encodes_a_get_request() {
        let request = Request::builder()
            .uri("/rows?page=2")
            .header("host", "localhost:8080")
            .header("accept", "application/json")
            .body(Vec::new())
            .unwrap();

        let mut buf = Vec::new();
        encode_request(&request, &mut buf).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "GET /rows?page=2 HTTP/1.1\r\nhost: localhost:8080\r\naccept: application/json\r\n\r\n"
        );
    }

    #[test]
    fn parses_hex_digits() {
        let size = b"1aF"
            .iter()
            .map(|b| hex_digit_to_value(*b).unwrap())
            .fold(0, add_base16_digit);
        assert_eq!(size, 0x1af);
        assert_eq!(hex_digit_to_value(b'g'), None);
    }
}
