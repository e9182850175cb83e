//! AES-128-GCM keyed by a QKD bit string.
//!
//! ## Key derivation
//!
//! The binary-digit key is right-padded with `0` to a whole number of bytes,
//! packed most significant bit first, then zero-padded or truncated to
//! [`KEY_SIZE`] bytes. Both ends of a hop derive the same bytes from the same
//! string.
//!
//! ## Ciphertext format
//!
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)` with a fresh random nonce
//! per message.

use aes_gcm::{
    Aes128Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};

use crate::core::errors::CipherError;
use crate::core::utils::parse_bits;

/// Key size for AES-128 (16 bytes).
pub const KEY_SIZE: usize = 16;

/// Nonce size for AES-GCM (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Largest plaintext AES-GCM accepts under one nonce: `2^36 - 32` bytes.
pub const MAX_PLAINTEXT_LEN: u64 = (1 << 36) - 32;

/// Packs a binary-digit string into a [`KEY_SIZE`]-byte AES key.
///
/// # Errors
///
/// [`CipherError::InvalidKeyBits`] if `key_bits` is empty or contains anything
/// other than `0` and `1`.
pub fn bits_to_key(key_bits: &str) -> Result<[u8; KEY_SIZE], CipherError> {
    let bits = parse_bits(key_bits).ok_or(CipherError::InvalidKeyBits)?;

    let mut key = [0u8; KEY_SIZE];
    for (byte, chunk) in key.iter_mut().zip(bits.chunks(8)) {
        *byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)));
    }
    Ok(key)
}

fn check_length(len: u64) -> Result<(), CipherError> {
    if len > MAX_PLAINTEXT_LEN {
        return Err(CipherError::MessageTooLong(len));
    }
    Ok(())
}

/// Encrypts `plaintext` under the key derived from `key_bits`.
///
/// # Errors
///
/// - [`CipherError::InvalidKeyBits`] for a malformed key.
/// - [`CipherError::MessageTooLong`] past [`MAX_PLAINTEXT_LEN`] bytes.
pub fn encrypt(key_bits: &str, plaintext: &str) -> Result<Vec<u8>, CipherError> {
    let key = bits_to_key(key_bits)?;
    let len = plaintext.len() as u64;
    check_length(len)?;

    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&key));
    let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CipherError::MessageTooLong(len))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a payload produced by [`encrypt`].
///
/// # Errors
///
/// - [`CipherError::InvalidKeyBits`] for a malformed key.
/// - [`CipherError::Truncated`] if the payload cannot hold a nonce.
/// - [`CipherError::Integrity`] if authentication fails (wrong key, tampered
///   data).
/// - [`CipherError::InvalidUtf8`] if the authenticated plaintext is not text.
pub fn decrypt(key_bits: &str, payload: &[u8]) -> Result<String, CipherError> {
    let key = bits_to_key(key_bits)?;
    if payload.len() < NONCE_SIZE {
        return Err(CipherError::Truncated(payload.len()));
    }

    let (nonce, ciphertext) = payload.split_at(NONCE_SIZE);
    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::Integrity)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "1010101010101010";

    #[test]
    fn round_trip() {
        for message in ["hello world", "", "Hello Quantum World!", "~!@#$%^&*()_+ 0123456789"] {
            let ct = encrypt(KEY, message).unwrap();
            assert_eq!(ct.len(), NONCE_SIZE + message.len() + 16);
            assert_eq!(decrypt(KEY, &ct).unwrap(), message);
        }
    }

    #[test]
    fn round_trip_with_qkd_sized_keys() {
        let long_key: String = (0..128).map(|i| if i % 3 == 0 { '1' } else { '0' }).collect();
        for key in ["1", "0110011", long_key.as_str()] {
            let ct = encrypt(key, "relay me").unwrap();
            assert_eq!(decrypt(key, &ct).unwrap(), "relay me");
        }
    }

    #[test]
    fn key_packing() {
        let key = bits_to_key("1010101010101010").unwrap();
        assert_eq!(&key[..2], &[0xAA, 0xAA]);
        assert!(key[2..].iter().all(|&b| b == 0));

        // Partial byte padded on the right
        assert_eq!(bits_to_key("1").unwrap()[0], 0x80);

        // Truncated to 16 bytes
        let long: String = "1".repeat(200);
        assert_eq!(bits_to_key(&long).unwrap(), [0xFF; KEY_SIZE]);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert_eq!(bits_to_key(""), Err(CipherError::InvalidKeyBits));
        assert_eq!(encrypt("10201", "x"), Err(CipherError::InvalidKeyBits));
    }

    #[test]
    fn wrong_key_fails_integrity() {
        let ct = encrypt(KEY, "secret").unwrap();
        assert_eq!(decrypt("0101010101010101", &ct), Err(CipherError::Integrity));
    }

    #[test]
    fn tampering_fails_integrity() {
        let mut ct = encrypt(KEY, "secret").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert_eq!(decrypt(KEY, &ct), Err(CipherError::Integrity));
    }

    #[test]
    fn length_limit_is_not_an_integrity_failure() {
        assert_eq!(check_length(MAX_PLAINTEXT_LEN), Ok(()));
        assert_eq!(
            check_length(MAX_PLAINTEXT_LEN + 1),
            Err(CipherError::MessageTooLong(MAX_PLAINTEXT_LEN + 1))
        );
    }

    #[test]
    fn short_payload_is_truncated() {
        assert_eq!(decrypt(KEY, &[0u8; 5]), Err(CipherError::Truncated(5)));
    }

    #[test]
    fn nonces_are_fresh() {
        let a = encrypt(KEY, "same").unwrap();
        let b = encrypt(KEY, "same").unwrap();
        assert_ne!(a, b);
    }
}
