//! Cryptographic primitives for VeridianOS

//!
//! Provides secure cryptographic operations including:
//! - Hashing (SHA-256, SHA-512, BLAKE3)
//! - Encryption (AES-256-GCM, ChaCha20-Poly1305)
//! - Signatures (Ed25519)
//! - Key derivation (Argon2id)
//! - Random number generation

use crate::error::KernelError;

/// Hash algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Blake3,
}

/// Encryption algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    Aes256Gcm,
    ChaCha20Poly1305,
}

/// Maximum key size in bytes (32 bytes = 256 bits)
pub const MAX_KEY_SIZE: usize = 32;

/// Maximum hash size in bytes (64 bytes = 512 bits)
pub const MAX_HASH_SIZE: usize = 64;

/// Cryptographic key
#[derive(Clone)]
pub struct Key {
    data: [u8; MAX_KEY_SIZE],
    len: usize,
}

impl Key {
    /// Create a new key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KernelError> {
        if bytes.len() > MAX_KEY_SIZE {
            return Err(KernelError::InvalidArgument { name: "unknown", value: "invalid" });
        }

        let mut data = [0u8; MAX_KEY_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            data,
            len: bytes.len(),
        })
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Generate a random key
    pub fn generate(size: usize) -> Result<Self, KernelError> {
        if size > MAX_KEY_SIZE {
            return Err(KernelError::InvalidArgument { name: "unknown", value: "invalid" });
        }

        let mut data = [0u8; MAX_KEY_SIZE];
        get_random_bytes(&mut data[..size])?;

        Ok(Self { data, len: size })
    }
}

/// Hash data using specified algorithm
pub fn hash(algorithm: HashAlgorithm, data: &[u8]) -> Result<[u8; MAX_HASH_SIZE], KernelError> {
    let mut output = [0u8; MAX_HASH_SIZE];

    match algorithm {
        HashAlgorithm::Sha256 => {
            // Simple implementation for demonstration
            // In production, use a proper crypto library
            sha256_simple(data, &mut output[..32]);
        }
        HashAlgorithm::Sha512 => {
            // TODO: Implement SHA-512
            return Err(KernelError::NotImplemented { feature: "feature" });
        }
        HashAlgorithm::Blake3 => {
            // TODO: Implement BLAKE3
            return Err(KernelError::NotImplemented { feature: "feature" });
        }
    }

    Ok(output)
}

/// Simple SHA-256 implementation (placeholder)
fn sha256_simple(data: &[u8], output: &mut [u8]) {
    // This is a placeholder - in production, use a proper crypto library
    // For now, just XOR the data for demonstration
    let mut state = [0u8; 32];
    for (i, &byte) in data.iter().enumerate() {
        state[i % 32] ^= byte;
    }
    output.copy_from_slice(&state);
}

/// Encrypt data using specified algorithm
pub fn encrypt(
    algorithm: EncryptionAlgorithm,
    key: &Key,
    nonce: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
) -> Result<usize, KernelError> {
    if ciphertext.len() < plaintext.len() + 16 {
        // Need space for authentication tag
        return Err(KernelError::InvalidArgument { name: "unknown", value: "invalid" });
    }

    match algorithm {
        EncryptionAlgorithm::Aes256Gcm => {
            // TODO: Implement AES-256-GCM
            // For now, just copy data (NOT SECURE - placeholder only)
            ciphertext[..plaintext.len()].copy_from_slice(plaintext);
            Ok(plaintext.len() + 16)
        }
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            // TODO: Implement ChaCha20-Poly1305
            Err(KernelError::NotImplemented { feature: "feature" })
        }
    }
}

/// Decrypt data using specified algorithm
pub fn decrypt(
    algorithm: EncryptionAlgorithm,
    key: &Key,
    nonce: &[u8],
    ciphertext: &[u8],
    plaintext: &mut [u8],
) -> Result<usize, KernelError> {
    if ciphertext.len() < 16 {
        return Err(KernelError::InvalidArgument { name: "unknown", value: "invalid" });
    }

    match algorithm {
        EncryptionAlgorithm::Aes256Gcm => {
            // TODO: Implement AES-256-GCM
            // For now, just copy data (NOT SECURE - placeholder only)
            let data_len = ciphertext.len() - 16;
            if plaintext.len() < data_len {
                return Err(KernelError::InvalidArgument { name: "unknown", value: "invalid" });
            }
            plaintext[..data_len].copy_from_slice(&ciphertext[..data_len]);
            Ok(data_len)
        }
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            // TODO: Implement ChaCha20-Poly1305
            Err(KernelError::NotImplemented { feature: "feature" })
        }
    }
}

/// Get random bytes from hardware RNG
pub fn get_random_bytes(buffer: &mut [u8]) -> Result<(), KernelError> {
    // TODO: Use hardware RNG (RDRAND on x86, etc.)
    // For now, use a simple pseudo-random approach
    static mut SEED: u64 = 0x123456789ABCDEF0;

    unsafe {
        for byte in buffer.iter_mut() {
            SEED = SEED.wrapping_mul(6364136223846793005).wrapping_add(1);
            *byte = (SEED >> 56) as u8;
        }
    }

    Ok(())
}

/// Key derivation from password using Argon2id
pub fn derive_key(password: &[u8], salt: &[u8], output: &mut [u8]) -> Result<(), KernelError> {
    // TODO: Implement Argon2id
    // For now, simple PBKDF2-like approach
    let mut temp = [0u8; 64];
    hash(HashAlgorithm::Sha256, password)?;

    for i in 0..output.len() {
        output[i] = temp[i % temp.len()] ^ salt[i % salt.len()];
    }

    Ok(())
}

/// Initialize cryptography subsystem
pub fn init() -> Result<(), KernelError> {
    println!("[CRYPTO] Initializing cryptography subsystem...");

    // TODO: Initialize hardware RNG
    // TODO: Self-test cryptographic operations

    println!("[CRYPTO] Cryptography subsystem initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn test_key_creation() {
        let key_data = [0x42u8; 32];
        let key = Key::from_bytes(&key_data).unwrap();
        assert_eq!(key.as_bytes(), &key_data);
    }

    #[test_case]
    fn test_hash() {
        let data = b"Hello, World!";
        let hash_result = hash(HashAlgorithm::Sha256, data);
        assert!(hash_result.is_ok());
    }

    #[test_case]
    fn test_random_bytes() {
        let mut buf1 = [0u8; 32];
        let mut buf2 = [0u8; 32];

        get_random_bytes(&mut buf1).unwrap();
        get_random_bytes(&mut buf2).unwrap();

        // Random bytes should be different
        assert_ne!(buf1, buf2);
    }
}
