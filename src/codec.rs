use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand_core::OsRng;
use sha2::Sha256;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::{RelayError, Result};

const NONCE_LEN: usize = 12;
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Deterministic key derivation: HKDF-SHA256 over the shared secret with the
/// calendar date as the expand info. Same `(secret, date)` always yields the
/// same key, so both ends only need synchronized clocks, not a key exchange.
pub fn derive_key(secret: &str, date: &str) -> Result<Key> {
    let hk = Hkdf::<Sha256>::new(None, secret.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(date.as_bytes(), &mut okm)
        .map_err(|_| RelayError::Runtime("HKDF expand failed".to_string()))?;
    Ok(Key::from_slice(&okm).to_owned())
}

/// Symmetric codec for envelope payloads, keyed by the shared secret plus the
/// current calendar date. The key rotates at local midnight: yesterday's
/// ciphertexts stop decrypting today, which bounds the value of captured
/// traffic. Wire form is base64(nonce || ciphertext) so payloads stay UTF-8
/// text on the broker.
pub struct DayCodec {
    secret: String,
    cached: Mutex<Option<(String, Key)>>,
}

impl DayCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cached: Mutex::new(None),
        }
    }

    /// Local calendar date, falling back to UTC when the process cannot
    /// determine its local offset.
    pub fn today() -> Result<String> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        now.format(&DATE_FORMAT)
            .map_err(|e| RelayError::Runtime(e.to_string()))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.encrypt_with_date(plaintext, &Self::today()?)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        self.decrypt_with_date(ciphertext, &Self::today()?)
    }

    pub fn encrypt_with_date(&self, plaintext: &str, date: &str) -> Result<String> {
        let key = self.day_key(date)?;
        let cipher = ChaCha20Poly1305::new(&key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| RelayError::Runtime("encrypt failed".to_string()))?;
        let mut wire = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        wire.extend_from_slice(&nonce);
        wire.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(wire))
    }

    pub fn decrypt_with_date(&self, ciphertext: &str, date: &str) -> Result<String> {
        let wire = BASE64
            .decode(ciphertext.as_bytes())
            .map_err(|e| RelayError::Decode(e.to_string()))?;
        if wire.len() <= NONCE_LEN {
            return Err(RelayError::Decode("ciphertext too short".to_string()));
        }
        let (nonce, body) = wire.split_at(NONCE_LEN);
        let key = self.day_key(date)?;
        let cipher = ChaCha20Poly1305::new(&key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| RelayError::Decode("authentication failed".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| RelayError::Decode(e.to_string()))
    }

    // Memoized per calendar day; re-derived only when the date string changes.
    fn day_key(&self, date: &str) -> Result<Key> {
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((cached_date, key)) = cached.as_ref() {
            if cached_date == date {
                return Ok(key.to_owned());
            }
        }
        let key = derive_key(&self.secret, date)?;
        *cached = Some((date.to_string(), key));
        Ok(key)
    }
}
