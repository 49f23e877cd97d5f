//! Legacy (EIP-155) transaction building and signing

use anchor_core::{keccak256, Address, Hash32, KeyPair, RecoverableSignature};

use crate::error::Result;
use crate::rlp;
use crate::types::TxHash;

/// Fields of an unsigned legacy transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSpec {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// A signed transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// RLP-encoded signed transaction
    pub raw: Vec<u8>,

    /// keccak of `raw`, the hash the node will report
    pub hash: TxHash,

    pub signature: RecoverableSignature,
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

impl TxSpec {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp::encode_uint(self.nonce as u128),
            rlp::encode_uint(self.gas_price),
            rlp::encode_uint(self.gas_limit as u128),
            rlp::encode_bytes(self.to.as_bytes()),
            rlp::encode_uint(self.value),
            rlp::encode_bytes(&self.data),
        ]
    }

    /// RLP payload whose hash is signed: the six fields plus `chain_id, 0, 0`
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(self.chain_id as u128));
        fields.push(rlp::encode_uint(0));
        fields.push(rlp::encode_uint(0));
        rlp::encode_list(&fields)
    }

    pub fn signing_hash(&self) -> Hash32 {
        keccak256(self.signing_payload())
    }

    /// Sign with `key`, folding the chain id into `v`
    pub fn sign(&self, key: &KeyPair) -> Result<SignedTransaction> {
        let signature = key.sign_prehash(&self.signing_hash())?;
        let v = signature.recovery_id() as u128 + self.chain_id as u128 * 2 + 35;

        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(v));
        fields.push(rlp::encode_bytes(strip_leading_zeros(signature.r())));
        fields.push(rlp::encode_bytes(strip_leading_zeros(signature.s())));

        let raw = rlp::encode_list(&fields);
        let hash = keccak256(&raw);
        Ok(SignedTransaction {
            raw,
            hash,
            signature,
        })
    }
}

/// Sign `spec` with `key`
pub fn build_and_sign(spec: &TxSpec, key: &KeyPair) -> Result<SignedTransaction> {
    spec.sign(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eip155_example() -> TxSpec {
        TxSpec {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Address::from_bytes([0x35; 20]),
            value: 1_000_000_000_000_000_000,
            data: vec![],
            chain_id: 1,
        }
    }

    #[test]
    fn test_signing_payload_matches_reference() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            tx.signing_hash().to_string(),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_signed_transaction_matches_reference() {
        let key = KeyPair::from_bytes(&[0x46; 32]).unwrap();
        assert_eq!(
            key.address().to_string(),
            "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"
        );

        let signed = eip155_example().sign(&key).unwrap();
        assert_eq!(
            signed.raw_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(signed.hash, keccak256(&signed.raw));
    }

    #[test]
    fn test_sender_recoverable_from_signing_hash() {
        let key = KeyPair::generate();
        let tx = TxSpec {
            nonce: 0,
            gas_price: 1,
            gas_limit: 200_000,
            to: Address::from_bytes([0x01; 20]),
            value: 0,
            data: vec![0x47, 0x83, 0xf0, 0xef],
            chain_id: 11_155_111,
        };

        let signed = tx.sign(&key).unwrap();
        let recovered = signed.signature.recover_prehash(&tx.signing_hash()).unwrap();
        assert_eq!(recovered, key.address());
    }

    #[test]
    fn test_chain_id_changes_signature_payload() {
        let mut tx = eip155_example();
        let mainnet = tx.signing_hash();
        tx.chain_id = 11_155_111;
        assert_ne!(mainnet, tx.signing_hash());
    }
}
