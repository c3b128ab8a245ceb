use {
    serde::{Deserialize, Serialize},
    sha1::Sha1,
    sha2::{Digest, Sha256},
    std::fmt::{self, Display, Formatter},
};

/// SHA-1 and SHA-256 over the DER encoding, uppercase hex.
///
/// Two records with equal SHA-256 fingerprints are the same entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub sha1:   String,
    pub sha256: String,
}

impl Fingerprint {
    pub fn of(der: &[u8]) -> Self {
        Self {
            sha1:   sha1_hex(der),
            sha256: sha256_hex(der),
        }
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.sha256)
    }
}

pub fn sha1_hex(der: &[u8]) -> String {
    hex::encode_upper(Sha1::digest(der))
}

pub fn sha256_hex(der: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(der))
}
