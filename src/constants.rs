pub(crate) const DEFAULT_WHOLE_STREAM_SIZE_LIMIT: u64 = u64::MAX;
pub(crate) const DEFAULT_PER_FIELD_SIZE_LIMIT: u64 = u64::MAX;

/// Capacity of the buffer holding a single header name or value.
pub(crate) const MAX_HEADER_FIELD_SIZE: usize = 200;
pub(crate) const MAX_HEADERS: usize = 32;

pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CRLF: &str = "\r\n";

pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const DASH: u8 = b'-';
pub(crate) const COLON: u8 = b':';
pub(crate) const SPACE: u8 = b' ';

/// Builds the delimiter searched for inside the body: `CRLF "--" boundary`.
pub(crate) fn boundary_key(boundary: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(CRLF.len() + BOUNDARY_EXT.len() + boundary.len());
    key.extend_from_slice(CRLF.as_bytes());
    key.extend_from_slice(BOUNDARY_EXT.as_bytes());
    key.extend_from_slice(boundary.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_key() {
        assert_eq!(boundary_key("X-BOUNDARY"), b"\r\n--X-BOUNDARY".to_vec());
        assert_eq!(boundary_key("----abc"), b"\r\n------abc".to_vec());
    }

    #[test]
    fn test_key_holds_single_cr() {
        let key = boundary_key("--WebKitFormBoundary7MA4YWxkTrZu0gW");
        assert_eq!(key.iter().filter(|b| **b == CR).count(), 1);
        assert_eq!(key[0], CR);
        assert_eq!(key[2], DASH);
    }
}
