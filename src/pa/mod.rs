//! ePassport Passive Authentication, ICAO 9303-11 5.1.

mod data_group;
mod orchestrator;
mod result;

pub use self::{
    data_group::{
        DataGroupDetail, DataGroupHashVerifier, DataGroupNumber, DataGroupValidation,
        InvalidDataGroup,
    },
    orchestrator::{PaRequest, PassiveAuthenticator},
    result::{
        CertificateChainValidation, PaState, PaStatus, PassiveAuthenticationResult,
        SodSignatureValidation,
    },
};
