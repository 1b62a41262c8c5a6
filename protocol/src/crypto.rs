//! Cryptographic functions for the GNTP protocol
//!
//! Authentication derives a key from the shared password and a random
//! salt with a caller-selected digest; the same key doubles as cipher
//! key material when body encryption is enabled. Encryption is CBC with
//! PKCS#7 padding over one of three legacy ciphers, as the protocol
//! dictates.

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::Md5;
use rand::Rng;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::GrowlError;

/// Salt size for authentication (16 bytes)
pub const SALT_SIZE: usize = 16;

type DesCbcEnc = cbc::Encryptor<des::Des>;
type DesCbcDec = cbc::Decryptor<des::Des>;
type TdesCbcEnc = cbc::Encryptor<des::TdesEde3>;
type TdesCbcDec = cbc::Decryptor<des::TdesEde3>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;

/// Digest algorithm used for key derivation and the authentication hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Name as it appears in the info line's key info section.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha512 => "SHA512",
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Md5 => Md5::digest(data).to_vec(),
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Derived authentication material: the cipher key and its hex-encoded
/// verification hash.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub key: Vec<u8>,
    pub key_hash: String,
}

/// Derives key material as `key = digest(password || salt)` and
/// `key_hash = hexdigest(key)`.
pub fn derive_key(algorithm: HashAlgorithm, password: &str, salt: &[u8]) -> KeyMaterial {
    let mut basis = password.as_bytes().to_vec();
    basis.extend_from_slice(salt);

    let key = algorithm.digest(&basis);
    let key_hash = hex::encode(algorithm.digest(&key));

    KeyMaterial { key, key_hash }
}

/// Formats the info line's key info section:
/// `<DIGESTNAME>:<keyhashhex>.<salthex>`.
pub fn key_info(algorithm: HashAlgorithm, material: &KeyMaterial, salt: &[u8]) -> String {
    format!("{}:{}.{}", algorithm.name(), material.key_hash, hex::encode(salt))
}

/// GNTP body encryption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encryption {
    /// Plain bytes, info line token `NONE`
    #[default]
    None,
    /// DES-CBC
    Des,
    /// Three-key EDE3 DES-CBC
    TripleDes,
    /// AES-192-CBC
    Aes,
}

impl Encryption {
    /// Token used in the info line's encryption section.
    pub fn token(self) -> &'static str {
        match self {
            Encryption::None => "NONE",
            Encryption::Des => "DES",
            Encryption::TripleDes => "3DES",
            Encryption::Aes => "AES",
        }
    }

    /// Parses an info line token. Unknown tokens are an unsupported
    /// cipher, not a panic.
    pub fn from_token(token: &str) -> Result<Self, GrowlError> {
        match token {
            "NONE" => Ok(Encryption::None),
            "DES" => Ok(Encryption::Des),
            "3DES" => Ok(Encryption::TripleDes),
            "AES" => Ok(Encryption::Aes),
            other => Err(GrowlError::UnsupportedCipher(other.to_string())),
        }
    }

    /// Cipher key length in bytes. Derived keys longer than this are
    /// truncated, mirroring OpenSSL's behavior in older clients.
    pub fn key_len(self) -> usize {
        match self {
            Encryption::None => 0,
            Encryption::Des => 8,
            Encryption::TripleDes | Encryption::Aes => 24,
        }
    }

    pub fn iv_len(self) -> usize {
        match self {
            Encryption::None => 0,
            Encryption::Des | Encryption::TripleDes => 8,
            Encryption::Aes => 16,
        }
    }
}

/// Encrypts one buffer with PKCS#7 padding. `Encryption::None` passes
/// the plaintext through unchanged.
pub fn encrypt(
    mode: Encryption,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, GrowlError> {
    let key = cipher_key(mode, key)?;

    match mode {
        Encryption::None => Ok(plaintext.to_vec()),
        Encryption::Des => {
            let cipher = DesCbcEnc::new_from_slices(key, iv).map_err(|_| bad_iv(mode, iv))?;
            Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
        }
        Encryption::TripleDes => {
            let cipher = TdesCbcEnc::new_from_slices(key, iv).map_err(|_| bad_iv(mode, iv))?;
            Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
        }
        Encryption::Aes => {
            let cipher = Aes192CbcEnc::new_from_slices(key, iv).map_err(|_| bad_iv(mode, iv))?;
            Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
        }
    }
}

/// Decrypts one buffer and strips PKCS#7 padding.
pub fn decrypt(
    mode: Encryption,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, GrowlError> {
    let key = cipher_key(mode, key)?;

    match mode {
        Encryption::None => Ok(ciphertext.to_vec()),
        Encryption::Des => {
            let cipher = DesCbcDec::new_from_slices(key, iv).map_err(|_| bad_iv(mode, iv))?;
            cipher
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| GrowlError::DecryptionFailed)
        }
        Encryption::TripleDes => {
            let cipher = TdesCbcDec::new_from_slices(key, iv).map_err(|_| bad_iv(mode, iv))?;
            cipher
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| GrowlError::DecryptionFailed)
        }
        Encryption::Aes => {
            let cipher = Aes192CbcDec::new_from_slices(key, iv).map_err(|_| bad_iv(mode, iv))?;
            cipher
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| GrowlError::DecryptionFailed)
        }
    }
}

/// Truncates derived key material to the cipher's key length, rejecting
/// keys that are too short (an MD5-derived key cannot drive 3DES/AES).
fn cipher_key(mode: Encryption, key: &[u8]) -> Result<&[u8], GrowlError> {
    let expected = mode.key_len();
    if key.len() < expected {
        return Err(GrowlError::InvalidKeyLength {
            expected,
            got: key.len(),
        });
    }
    Ok(&key[..expected])
}

fn bad_iv(mode: Encryption, iv: &[u8]) -> GrowlError {
    GrowlError::InvalidKeyLength {
        expected: mode.iv_len(),
        got: iv.len(),
    }
}

/// Source of random salts and initialization vectors, injectable for
/// deterministic tests.
pub trait SaltSource {
    fn salt(&mut self) -> [u8; SALT_SIZE];
    fn iv(&mut self, len: usize) -> Vec<u8>;
}

/// Default salt source backed by the thread RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSalt;

impl SaltSource for RandomSalt {
    fn salt(&mut self) -> [u8; SALT_SIZE] {
        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill(&mut salt);
        salt
    }

    fn iv(&mut self, len: usize) -> Vec<u8> {
        let mut iv = vec![0u8; len];
        rand::thread_rng().fill(&mut iv[..]);
        iv
    }
}
