use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use thiserror::Error;

use crate::common::security::random_hex;

/// RC4/MD5 key length accepted by every mainstream reader (standard handler R3).
const KEY_LENGTH_BITS: usize = 128;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("password must not be empty")]
    EmptyPassword,

    #[error("input is not a readable PDF: {0}")]
    InvalidPdf(String),

    #[error("input PDF is already encrypted")]
    AlreadyEncrypted,

    #[error("failed to encrypt PDF: {0}")]
    Encrypt(String),

    #[error("failed to serialize encrypted PDF: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("encryption task aborted: {0}")]
    Task(String),
}

pub fn permission_policy() -> Permissions {
    Permissions::PRINTABLE
        | Permissions::PRINTABLE_IN_HIGH_QUALITY
        | Permissions::FILLABLE
        | Permissions::COPYABLE_FOR_ACCESSIBILITY
}

/// Encrypts `pdf` so that `password` is required to open it. The owner
/// password is random, so `password` cannot lift the restrictions.
pub fn protect(pdf: &[u8], password: &str) -> Result<Vec<u8>, EncryptionError> {
    if password.is_empty() {
        return Err(EncryptionError::EmptyPassword);
    }

    let mut doc = Document::load_mem(pdf).map_err(|e| EncryptionError::InvalidPdf(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(EncryptionError::AlreadyEncrypted);
    }

    ensure_document_id(&mut doc);

    let owner_password = random_hex(16);
    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: &owner_password,
        user_password: password,
        key_length: KEY_LENGTH_BITS,
        permissions: permission_policy(),
    };
    let state = EncryptionState::try_from(version).map_err(|e| EncryptionError::Encrypt(e.to_string()))?;
    doc.encrypt(&state).map_err(|e| EncryptionError::Encrypt(e.to_string()))?;

    let mut out = Vec::with_capacity(pdf.len());
    doc.save_to(&mut out)?;
    Ok(out)
}

// The file key is derived from the first /ID entry; engines do not always write one.
fn ensure_document_id(doc: &mut Document) {
    if doc.trailer.get(b"ID").is_ok() {
        return;
    }
    let id = random_hex(16).into_bytes();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}
