//! `data:` URL decoding (RFC 2397)

use base64::Engine;

const DATA_URL_PREFIX: &str = "data:";

/// Whether `locator` is already self-contained inline data
pub fn is_data_url(locator: &str) -> bool {
    locator
        .get(..DATA_URL_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DATA_URL_PREFIX))
}

/// Decode the payload of a `data:` URL into bytes.
///
/// The error is a plain reason string; callers attach the locator.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, String> {
    if !is_data_url(url) {
        return Err("URL does not start with 'data:'".to_string());
    }

    let rest = &url[DATA_URL_PREFIX.len()..];
    let (metadata, data) = rest
        .split_once(',')
        .ok_or_else(|| "Missing comma in data URL".to_string())?;

    let is_base64 = metadata
        .split(';')
        .skip(1)
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        decode_base64_data(data)
    } else {
        percent_decode(data)
    }
}

/// Decode base64 payloads, tolerating ASCII whitespace.
fn decode_base64_data(data: &str) -> Result<Vec<u8>, String> {
    let cleaned: Vec<u8> = data
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| format!("Invalid base64: {e}"))
}

/// Percent-decode a URL payload without treating '+' specially.
fn percent_decode(input: &str) -> Result<Vec<u8>, String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    return Err("Incomplete percent-escape".to_string());
                }
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push(((hi << 4) | lo) as u8);
                        i += 3;
                    }
                    _ => return Err("Invalid percent-escape".to_string()),
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_data_urls() {
        assert!(is_data_url("data:image/png;base64,AAAA"));
        assert!(is_data_url("DATA:text/plain,hi"));
        assert!(!is_data_url("images/data.png"));
        assert!(!is_data_url("dat"));
    }

    #[test]
    fn decodes_base64_with_whitespace() {
        let bytes = decode_data_url("data:text/plain;base64,aGVs\n bG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn decodes_percent_encoding() {
        let bytes = decode_data_url("data:text/html,%3Cp%3Ehi%3C/p%3E").unwrap();
        assert_eq!(bytes, b"<p>hi</p>");
    }

    #[test]
    fn rejects_missing_comma() {
        assert!(decode_data_url("data:text/plain").is_err());
    }

    #[test]
    fn rejects_truncated_escape() {
        assert!(decode_data_url("data:,abc%4").is_err());
    }
}
