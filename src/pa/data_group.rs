use {
    crate::{
        asn1::{emrtd::LdsSecurityObject, DigestAlgorithmIdentifier},
        error::{ErrorCode, ValidationError},
    },
    num_enum::{IntoPrimitive, TryFromPrimitive},
    serde::{Serialize, Serializer},
    std::{
        collections::BTreeMap,
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
    subtle::ConstantTimeEq,
    thiserror::Error,
};

/// LDS data groups, ICAO 9303-10 4.7.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum DataGroupNumber {
    Dg1  = 1,
    Dg2  = 2,
    Dg3  = 3,
    Dg4  = 4,
    Dg5  = 5,
    Dg6  = 6,
    Dg7  = 7,
    Dg8  = 8,
    Dg9  = 9,
    Dg10 = 10,
    Dg11 = 11,
    Dg12 = 12,
    Dg13 = 13,
    Dg14 = 14,
    Dg15 = 15,
    Dg16 = 16,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Invalid data group {0:?}")]
pub struct InvalidDataGroup(pub String);

impl Display for DataGroupNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "DG{}", u8::from(*self))
    }
}

impl Serialize for DataGroupNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts `DG1`, `dg1` and `1`.
impl FromStr for DataGroupNumber {
    type Err = InvalidDataGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("DG")
            .or_else(|| s.strip_prefix("dg"))
            .unwrap_or(s);
        digits
            .parse::<u8>()
            .ok()
            .and_then(|n| Self::try_from(n).ok())
            .ok_or_else(|| InvalidDataGroup(s.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataGroupDetail {
    pub valid:         bool,
    /// Absent when the SOD has no hash for the group.
    pub expected_hash: Option<String>,
    pub actual_hash:   String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataGroupValidation {
    pub total_groups:   usize,
    pub valid_groups:   usize,
    pub invalid_groups: usize,
    pub details:        BTreeMap<DataGroupNumber, DataGroupDetail>,
}

/// Recomputes data group hashes and compares them with the SOD's.
///
/// DG1 carries the MRZ and is mandatory: without it the result always
/// contains `MISSING_DATA_GROUP`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataGroupHashVerifier;

impl DataGroupHashVerifier {
    pub fn verify(
        &self,
        lso: &LdsSecurityObject,
        algorithm: DigestAlgorithmIdentifier,
        groups: &BTreeMap<DataGroupNumber, Vec<u8>>,
    ) -> (DataGroupValidation, Vec<ValidationError>) {
        let mut validation = DataGroupValidation::default();
        let mut errors = Vec::new();

        if !groups.contains_key(&DataGroupNumber::Dg1) {
            errors.push(ValidationError::new(
                ErrorCode::MissingDataGroup,
                "DG1 is mandatory but was not presented",
            ));
        }

        for (&number, content) in groups {
            let actual = algorithm.hash_bytes(content);
            let expected = lso.hash_for(u64::from(u8::from(number)));
            let valid = expected.is_some_and(|expected| bool::from(actual.ct_eq(expected)));

            match expected {
                None => errors.push(ValidationError::new(
                    ErrorCode::DataGroupNotInSod,
                    format!("{number} has no hash in the SOD"),
                )),
                Some(_) if !valid => errors.push(ValidationError::new(
                    ErrorCode::HashMismatch,
                    format!("{number} hash mismatch"),
                )),
                Some(_) => {}
            }

            validation.total_groups += 1;
            if valid {
                validation.valid_groups += 1;
            } else {
                validation.invalid_groups += 1;
            }
            validation.details.insert(number, DataGroupDetail {
                valid,
                expected_hash: expected.map(hex::encode_upper),
                actual_hash: hex::encode_upper(actual),
            });
        }

        (validation, errors)
    }
}
