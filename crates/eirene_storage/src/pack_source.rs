#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};

use eirene_kernel_contracts::pack::PackDocument;
use eirene_kernel_contracts::{ContractViolation, Validate};

use crate::builtin::builtin_pack_document;

/// Environment variable naming an on-disk pack document to load instead of
/// the builtin pack.
pub const PACK_PATH_ENV: &str = "EIRENE_CONTENT_PACK_PATH";

/// Path probed when `EIRENE_CONTENT_PACK_PATH` is unset.
pub const DEFAULT_PACK_PATH: &str = "content/pack.json";

#[derive(Debug)]
pub enum PackSourceError {
    Read { path: String, detail: String },
    Parse { path: String, detail: String },
    Contract(ContractViolation),
    Encode,
}

impl std::fmt::Display for PackSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, detail } => write!(f, "pack read failed at {path}: {detail}"),
            Self::Parse { path, detail } => write!(f, "pack parse failed at {path}: {detail}"),
            Self::Contract(v) => write!(f, "pack document rejected: {v:?}"),
            Self::Encode => write!(f, "pack document could not be encoded"),
        }
    }
}

impl std::error::Error for PackSourceError {}

impl From<ContractViolation> for PackSourceError {
    fn from(v: ContractViolation) -> Self {
        PackSourceError::Contract(v)
    }
}

/// Parses and contract-checks a raw pack document. `path_label` only feeds
/// error messages.
pub fn parse_pack_document(path_label: &str, raw: &str) -> Result<PackDocument, PackSourceError> {
    let doc: PackDocument = serde_json::from_str(raw).map_err(|e| PackSourceError::Parse {
        path: path_label.to_string(),
        detail: e.to_string(),
    })?;
    doc.validate()?;
    Ok(doc)
}

pub fn load_pack_document(path: &str) -> Result<PackDocument, PackSourceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| PackSourceError::Read {
        path: path.to_string(),
        detail: e.to_string(),
    })?;
    parse_pack_document(path, &raw)
}

/// Resolves the pack to run with: the file named by `EIRENE_CONTENT_PACK_PATH`,
/// else `content/pack.json` when present, else the builtin pack. A configured
/// pack that fails to load degrades to the builtin; the swallowed error is
/// returned alongside so hosts can surface it.
pub fn load_or_builtin() -> (PackDocument, Option<PackSourceError>) {
    let path = match std::env::var(PACK_PATH_ENV) {
        Ok(p) if !p.trim().is_empty() => p,
        _ => {
            if !std::path::Path::new(DEFAULT_PACK_PATH).exists() {
                return (builtin_pack_document(), None);
            }
            DEFAULT_PACK_PATH.to_string()
        }
    };
    match load_pack_document(&path) {
        Ok(doc) => (doc, None),
        Err(e) => (builtin_pack_document(), Some(e)),
    }
}

/// SHA-256 over the canonical JSON encoding of the document. Packs with the
/// same content fingerprint identically regardless of where they were loaded
/// from.
pub fn pack_fingerprint(doc: &PackDocument) -> Result<String, PackSourceError> {
    let bytes = serde_json::to_vec(doc).map_err(|_| PackSourceError::Encode)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    Ok(out)
}
