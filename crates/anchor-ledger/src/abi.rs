//! Minimal Solidity ABI codec
//!
//! Covers the types the registry and credential contracts use: `address`,
//! `uint256` (values up to `u128`), `bytes32`, `bool`, `string`, dynamic
//! arrays and tuples.

use anchor_core::{keccak256, Address, Hash32};

use crate::error::{LedgerError, Result};

const WORD: usize = 32;

/// A value to encode, or a decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u128),
    FixedBytes(Hash32),
    Bool(bool),
    String(String),
    Array(Vec<Token>),
    Tuple(Vec<Token>),
}

/// Expected shape of a value when decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint,
    FixedBytes32,
    Bool,
    String,
    Array(Box<ParamType>),
    Tuple(Vec<ParamType>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Array(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<u128> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_fixed_bytes(self) -> Option<Hash32> {
        match self {
            Token::FixedBytes(h) => Some(h),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Token>> {
        match self {
            Token::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_tuple(self) -> Option<Vec<Token>> {
        match self {
            Token::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl ParamType {
    fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Array(_) => true,
            ParamType::Tuple(items) => items.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Head size of a static type
    fn static_size(&self) -> usize {
        match self {
            ParamType::Tuple(items) => items.iter().map(ParamType::static_size).sum(),
            _ => WORD,
        }
    }
}

/// First four bytes of keccak of the canonical function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.as_bytes()[..4]);
    out
}

/// Encode a function call: selector followed by the encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(args));
    out
}

/// Encode a list of values as the ABI encodes function arguments
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    encode_sequence(tokens)
}

fn word_from_u128(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn encode_sequence(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens
        .iter()
        .map(|t| if t.is_dynamic() { WORD } else { static_len(t) })
        .sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&word_from_u128((head_len + tail.len()) as u128));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }

    head.extend(tail);
    head
}

fn static_len(token: &Token) -> usize {
    match token {
        Token::Tuple(items) => items.iter().map(static_len).sum(),
        _ => WORD,
    }
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_bytes());
            word.to_vec()
        }
        Token::Uint(value) => word_from_u128(*value).to_vec(),
        Token::FixedBytes(hash) => hash.as_bytes().to_vec(),
        Token::Bool(b) => word_from_u128(*b as u128).to_vec(),
        Token::String(s) => {
            let bytes = s.as_bytes();
            let mut out = word_from_u128(bytes.len() as u128).to_vec();
            out.extend_from_slice(bytes);
            let padding = (WORD - bytes.len() % WORD) % WORD;
            out.extend(std::iter::repeat(0u8).take(padding));
            out
        }
        Token::Array(items) => {
            let mut out = word_from_u128(items.len() as u128).to_vec();
            out.extend(encode_sequence(items));
            out
        }
        Token::Tuple(items) => encode_sequence(items),
    }
}

/// Decode return data into values of the given types
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    decode_sequence(types, data, 0)
}

fn read_word(data: &[u8], at: usize) -> Result<[u8; WORD]> {
    let end = at
        .checked_add(WORD)
        .ok_or_else(|| LedgerError::Encoding("offset overflow".into()))?;
    let slice = data.get(at..end).ok_or_else(|| {
        LedgerError::Encoding(format!(
            "word at {} out of bounds (data length {})",
            at,
            data.len()
        ))
    })?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(slice);
    Ok(word)
}

fn read_u128(data: &[u8], at: usize) -> Result<u128> {
    let word = read_word(data, at)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(LedgerError::Encoding(format!(
            "integer at {} exceeds 128 bits",
            at
        )));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize> {
    let value = read_u128(data, at)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v <= data.len())
        .ok_or_else(|| LedgerError::Encoding(format!("length or offset {} out of range", value)))
}

fn decode_sequence(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>> {
    let mut cursor = base;
    let mut out = Vec::with_capacity(types.len());

    for ty in types {
        if ty.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            out.push(decode_token(ty, data, base + offset)?);
            cursor += WORD;
        } else {
            out.push(decode_token(ty, data, cursor)?);
            cursor += ty.static_size();
        }
    }

    Ok(out)
}

fn decode_token(ty: &ParamType, data: &[u8], at: usize) -> Result<Token> {
    match ty {
        ParamType::Address => Ok(Token::Address(Address::from_word(&read_word(data, at)?))),
        ParamType::Uint => Ok(Token::Uint(read_u128(data, at)?)),
        ParamType::FixedBytes32 => Ok(Token::FixedBytes(Hash32::from_bytes(read_word(data, at)?))),
        ParamType::Bool => Ok(Token::Bool(read_u128(data, at)? != 0)),
        ParamType::String => {
            let len = read_usize(data, at)?;
            let start = at + WORD;
            let bytes = data.get(start..start + len).ok_or_else(|| {
                LedgerError::Encoding(format!("string of length {} at {} out of bounds", len, at))
            })?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|e| LedgerError::Encoding(e.to_string()))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let types = vec![(**inner).clone(); len];
            decode_sequence(&types, data, at + WORD).map(Token::Array)
        }
        ParamType::Tuple(items) => decode_sequence(items, data, at).map(Token::Tuple),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("updateMerkleRoot(bytes32)")), "4783f0ef");
    }

    #[test]
    fn test_encode_static_arguments() {
        let root = Hash32::from_bytes([0x11; 32]);
        let data = encode_call("updateMerkleRoot(bytes32)", &[Token::FixedBytes(root)]);

        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[4..], root.as_bytes());
    }

    #[test]
    fn test_encode_string_layout() {
        let encoded = encode(&[Token::Uint(7), Token::String("abc".into())]);

        // head: uint, offset(64); tail: len(3), "abc" padded
        assert_eq!(encoded.len(), 4 * 32);
        assert_eq!(encoded[31], 7);
        assert_eq!(encoded[63], 64);
        assert_eq!(encoded[95], 3);
        assert_eq!(&encoded[96..99], b"abc");
        assert!(encoded[99..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_bool_array() {
        let encoded = encode(&[Token::Array(vec![Token::Bool(true), Token::Bool(false)])]);

        // offset, length, two elements
        assert_eq!(encoded.len(), 4 * 32);
        assert_eq!(encoded[31], 32);
        assert_eq!(encoded[63], 2);
        assert_eq!(encoded[95], 1);
        assert_eq!(encoded[127], 0);
    }

    #[test]
    fn test_decode_credential_array() {
        let holder = Address::from_bytes([0x22; 20]);
        let record = |n: u8, data: &str| {
            Token::Tuple(vec![
                Token::FixedBytes(Hash32::from_bytes([n; 32])),
                Token::Address(Address::from_bytes([n; 20])),
                Token::Address(holder),
                Token::Uint(1_700_000_000 + n as u128),
                Token::String(data.into()),
            ])
        };
        let encoded = encode(&[Token::Array(vec![
            record(1, "Alpha University BSc"),
            record(2, "Beta College a considerably longer metadata string spanning words"),
        ])]);

        let credential = ParamType::Tuple(vec![
            ParamType::FixedBytes32,
            ParamType::Address,
            ParamType::Address,
            ParamType::Uint,
            ParamType::String,
        ]);
        let decoded = decode(&[ParamType::Array(Box::new(credential))], &encoded).unwrap();

        let items = decoded.into_iter().next().unwrap().into_array().unwrap();
        assert_eq!(items.len(), 2);

        let second = items[1].clone().into_tuple().unwrap();
        assert_eq!(second[1], Token::Address(Address::from_bytes([2; 20])));
        assert_eq!(second[3], Token::Uint(1_700_000_002));
        assert_eq!(
            second[4],
            Token::String(
                "Beta College a considerably longer metadata string spanning words".into()
            )
        );
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        let result = decode(&[ParamType::String], &[0u8; 16]);
        assert!(result.is_err());

        // Offset points past the end
        let mut data = vec![0u8; 32];
        data[31] = 0xff;
        assert!(decode(&[ParamType::String], &data).is_err());
    }

    #[test]
    fn test_decode_empty_array() {
        let encoded = encode(&[Token::Array(vec![])]);
        let decoded = decode(&[ParamType::Array(Box::new(ParamType::Uint))], &encoded).unwrap();
        assert_eq!(decoded, vec![Token::Array(vec![])]);
    }
}
