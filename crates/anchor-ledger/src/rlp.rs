//! Recursive Length Prefix encoding
//!
//! Only the encoder is needed: transactions are built locally and the node
//! answers in JSON.

/// Encode a byte string
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return vec![bytes[0]];
    }
    let mut out = length_prefix(0x80, bytes.len());
    out.extend_from_slice(bytes);
    out
}

/// Encode an unsigned integer as its minimal big-endian byte string
pub fn encode_uint(value: u128) -> Vec<u8> {
    let be = value.to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    encode_bytes(&be[first..])
}

/// Encode a list whose items are already RLP-encoded
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = items.iter().map(Vec::len).sum();
    let mut out = length_prefix(0xc0, payload_len);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

fn length_prefix(offset: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        return vec![offset + len as u8];
    }
    let be = (len as u64).to_be_bytes();
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len() - 1);
    let len_bytes = &be[first..];
    let mut out = Vec::with_capacity(1 + len_bytes.len());
    out.push(offset + 55 + len_bytes.len() as u8);
    out.extend_from_slice(len_bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_strings() {
        assert_eq!(encode_bytes(b"dog"), hex::decode("83646f67").unwrap());
        assert_eq!(encode_bytes(b""), vec![0x80]);
        assert_eq!(encode_bytes(&[0x0f]), vec![0x0f]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
    }

    #[test]
    fn test_integers() {
        assert_eq!(encode_uint(0), vec![0x80]);
        assert_eq!(encode_uint(1), vec![0x01]);
        assert_eq!(encode_uint(127), vec![0x7f]);
        assert_eq!(encode_uint(128), vec![0x81, 0x80]);
        assert_eq!(encode_uint(1024), hex::decode("820400").unwrap());
    }

    #[test]
    fn test_lists() {
        assert_eq!(encode_list(&[]), vec![0xc0]);
        let cat_dog = encode_list(&[encode_bytes(b"cat"), encode_bytes(b"dog")]);
        assert_eq!(cat_dog, hex::decode("c88363617483646f67").unwrap());
    }

    #[test]
    fn test_long_string() {
        let text = b"Lorem ipsum dolor sit amet, consectetur adipisicing elit";
        assert_eq!(text.len(), 56);

        let encoded = encode_bytes(text);
        assert_eq!(&encoded[..2], &[0xb8, 0x38]);
        assert_eq!(&encoded[2..], text);
    }

    #[test]
    fn test_long_list_prefix() {
        let items: Vec<Vec<u8>> = (0..60).map(|_| encode_uint(1)).collect();
        let encoded = encode_list(&items);
        assert_eq!(&encoded[..2], &[0xf8, 60]);
        assert_eq!(encoded.len(), 62);
    }
}
