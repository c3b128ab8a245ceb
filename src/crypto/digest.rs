use {
    crate::asn1::DigestAlgorithmIdentifier,
    sha1::Sha1,
    sha2::{Digest, Sha224, Sha256, Sha384, Sha512},
};

impl DigestAlgorithmIdentifier {
    pub fn hash_bytes(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_hash_abc() {
        assert_eq!(
            DigestAlgorithmIdentifier::Sha1.hash_bytes(b"abc"),
            hex!("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(
            DigestAlgorithmIdentifier::Sha256.hash_bytes(b"abc"),
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_output_len() {
        for algo in [
            DigestAlgorithmIdentifier::Sha1,
            DigestAlgorithmIdentifier::Sha224,
            DigestAlgorithmIdentifier::Sha256,
            DigestAlgorithmIdentifier::Sha384,
            DigestAlgorithmIdentifier::Sha512,
        ] {
            assert_eq!(algo.hash_bytes(&[]).len(), algo.output_len());
        }
    }
}
