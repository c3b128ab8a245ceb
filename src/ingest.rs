//! Batch ingestion of PKD material.
//!
//! Items are parsed one by one. A bad item is recorded and skipped, never
//! aborting the batch. Duplicates (by SHA-256 fingerprint, within the batch
//! or already stored) are skipped before anything is written, and the
//! survivors are written with a single [`CertificateSink::save_all`].

use {
    crate::{
        config::Config,
        error::ParseError,
        pki::{
            Certificate, CertificateType, CmsError, CmsVerifier, MasterListExtractor,
            RevocationList,
        },
        ports::{CertificateRepository, CertificateSink, CrlSink},
    },
    anyhow::Result,
    serde::Serialize,
    std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicBool, AtomicU64, Ordering},
            Arc,
        },
        time::Instant,
    },
    thiserror::Error,
    tracing::{debug, error, info, warn},
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Master List rejected: {0}")]
    MasterList(#[from] CmsError),

    #[error("Malformed CRL: {0}")]
    Crl(#[from] ParseError),

    #[error("No stored certificate {0} verifies the CRL signature")]
    CrlIssuerNotFound(String),

    #[error("Repository failure: {0}")]
    Repository(#[from] anyhow::Error),
}

/// Cooperative cancellation, checked between items.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Running totals across batches. Share one instance between ingestors to
/// aggregate.
#[derive(Debug, Default)]
pub struct IngestStatistics {
    stored:       AtomicU64,
    duplicates:   AtomicU64,
    failed:       AtomicU64,
    crls:         AtomicU64,
    master_lists: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub certificates_stored: u64,
    pub duplicates_skipped:  u64,
    pub failed:              u64,
    pub crls_stored:         u64,
    pub master_lists_stored: u64,
}

impl IngestStatistics {
    fn record(&self, report: &BatchReport) {
        self.stored.fetch_add(report.success as u64, Ordering::Relaxed);
        self.duplicates.fetch_add(report.skipped as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            certificates_stored: self.stored.load(Ordering::Relaxed),
            duplicates_skipped:  self.duplicates.load(Ordering::Relaxed),
            failed:              self.failed.load(Ordering::Relaxed),
            crls_stored:         self.crls.load(Ordering::Relaxed),
            master_lists_stored: self.master_lists.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    /// Position of the item in the batch.
    pub index:   usize,
    pub message: String,
}

/// Outcome of one batch.
///
/// `success + skipped + failed == processed`, and `processed == total` unless
/// the batch was cancelled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total:        usize,
    pub processed:    usize,
    pub success:      usize,
    pub skipped:      usize,
    pub failed:       usize,
    pub cancelled:    bool,
    pub errors:       Vec<ItemError>,
    /// SHA-256 fingerprints of the certificates written.
    pub fingerprints: Vec<String>,
    pub duration_ms:  u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterListReport {
    pub country:        String,
    pub signer_subject: String,
    pub csca_count:     usize,
    /// Malformed `certList` entries.
    pub skipped:        usize,
    pub batch:          BatchReport,
}

/// Runs after a successful write, with the certificates written. A failing
/// hook is logged; the write stands.
pub type PostCommitHook<'a> = Box<dyn Fn(&[Certificate]) -> Result<()> + Send + Sync + 'a>;

pub struct CertificateIngestor<'a> {
    repository: &'a dyn CertificateRepository,
    sink:       &'a dyn CertificateSink,
    statistics: Arc<IngestStatistics>,
    hooks:      Vec<PostCommitHook<'a>>,
    cancel:     CancellationToken,
}

impl<'a> CertificateIngestor<'a> {
    pub fn new(repository: &'a dyn CertificateRepository, sink: &'a dyn CertificateSink) -> Self {
        Self {
            repository,
            sink,
            statistics: Arc::default(),
            hooks: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_statistics(mut self, statistics: Arc<IngestStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn on_commit(
        mut self,
        hook: impl Fn(&[Certificate]) -> Result<()> + Send + Sync + 'a,
    ) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn statistics(&self) -> &IngestStatistics {
        &self.statistics
    }

    /// Ingests DER certificates, CA certificates as CSCA, others as DSC.
    pub fn ingest<I>(&self, items: I) -> BatchReport
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        I::Item: AsRef<[u8]>,
    {
        self.run(items.into_iter().map(|der| Certificate::from_der(der.as_ref())))
    }

    /// Ingests DER certificates with a fixed type, e.g. non-conformant DSCs.
    pub fn ingest_as<I>(&self, items: I, certificate_type: CertificateType) -> BatchReport
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        I::Item: AsRef<[u8]>,
    {
        self.run(
            items
                .into_iter()
                .map(|der| Certificate::from_der_as(der.as_ref(), certificate_type)),
        )
    }

    /// Ingests already parsed certificates.
    pub fn ingest_certificates(&self, certificates: Vec<Certificate>) -> BatchReport {
        self.run(certificates.into_iter().map(Ok))
    }

    fn run(&self, items: impl ExactSizeIterator<Item = Result<Certificate, ParseError>>) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport {
            total: items.len(),
            ..BatchReport::default()
        };
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for (index, item) in items.enumerate() {
            if self.cancel.is_cancelled() {
                warn!(item = index, "Ingestion cancelled");
                report.cancelled = true;
                break;
            }
            report.processed += 1;

            let cert = match item {
                Ok(cert) => cert,
                Err(e) => {
                    warn!(item = index, error = %e, "Skipping unparseable certificate");
                    report.failed += 1;
                    report.errors.push(ItemError {
                        index,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let fingerprint = cert.fingerprint().sha256.clone();
            if !seen.insert(fingerprint.clone()) {
                debug!(item = index, %fingerprint, "Duplicate within batch");
                report.skipped += 1;
                continue;
            }
            match self.repository.exists_by_fingerprint(&fingerprint) {
                Ok(true) => {
                    debug!(item = index, %fingerprint, "Already stored");
                    report.skipped += 1;
                }
                Ok(false) => pending.push(cert),
                Err(e) => {
                    error!(item = index, %fingerprint, error = %e, "Fingerprint lookup failed");
                    report.failed += 1;
                    report.errors.push(ItemError {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.flush(&pending, &mut report);
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.statistics.record(&report);
        info!(
            total = report.total,
            success = report.success,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            "Certificate batch ingested"
        );
        report
    }

    fn flush(&self, pending: &[Certificate], report: &mut BatchReport) {
        if pending.is_empty() {
            return;
        }
        match self.sink.save_all(pending) {
            Ok(written) => {
                report.success += written.len();
                report.skipped += pending.len().saturating_sub(written.len());
                if written.len() < pending.len() {
                    debug!(
                        skipped = pending.len() - written.len(),
                        "Stored concurrently by another writer"
                    );
                }
                report
                    .fingerprints
                    .extend(written.iter().map(|cert| cert.fingerprint().sha256.clone()));
                if written.is_empty() {
                    return;
                }
                for hook in &self.hooks {
                    if let Err(e) = hook(&written) {
                        warn!(error = %e, "Post-commit hook failed");
                    }
                }
            }
            Err(e) => {
                error!(count = pending.len(), error = %e, "Saving certificates failed");
                report.failed += pending.len();
                report.errors.push(ItemError {
                    index:   report.processed,
                    message: format!("Saving {} certificates failed: {e}", pending.len()),
                });
            }
        }
    }

    /// Verifies a Master List against the stored CSCAs and ingests the CSCAs
    /// it carries.
    pub fn ingest_master_list(&self, der: &[u8], config: &Config) -> Result<MasterListReport, IngestError> {
        let anchors = self.repository.find_all_by_type(CertificateType::Csca)?;
        self.ingest_master_list_trusting(der, &anchors, config)
    }

    /// Like [`Self::ingest_master_list`] with explicit anchors, for
    /// bootstrapping an empty store.
    pub fn ingest_master_list_trusting(
        &self,
        der: &[u8],
        anchors: &[Certificate],
        config: &Config,
    ) -> Result<MasterListReport, IngestError> {
        let verified = MasterListExtractor::new(CmsVerifier::new(config.structure))
            .verify_and_extract(der, anchors)?;
        let csca_count = verified.csca_count();
        let batch = self.ingest_certificates(verified.certificates);
        self.statistics.master_lists.fetch_add(1, Ordering::Relaxed);
        Ok(MasterListReport {
            country: verified.country,
            signer_subject: verified.signer.subject_dn().to_owned(),
            csca_count,
            skipped: verified.skipped,
            batch,
        })
    }
}

/// Parses CRLs, optionally checks them against their issuing CSCA, and
/// stores them.
pub struct CrlIngestor<'a> {
    repository:       &'a dyn CertificateRepository,
    sink:             &'a dyn CrlSink,
    verify_signature: bool,
    statistics:       Arc<IngestStatistics>,
}

impl<'a> CrlIngestor<'a> {
    pub fn new(
        repository: &'a dyn CertificateRepository,
        sink: &'a dyn CrlSink,
        verify_signature: bool,
    ) -> Self {
        Self {
            repository,
            sink,
            verify_signature,
            statistics: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_statistics(mut self, statistics: Arc<IngestStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn ingest(&self, der: &[u8]) -> Result<RevocationList, IngestError> {
        let crl = RevocationList::from_der(der)?;
        if self.verify_signature {
            let issuers = self.repository.find_by_subject_dn(crl.issuer_dn())?;
            if !issuers.iter().any(|issuer| crl.verify_signature(issuer).is_ok()) {
                warn!(issuer = crl.issuer_dn(), "CRL signature not verified");
                return Err(IngestError::CrlIssuerNotFound(crl.issuer_dn().to_owned()));
            }
        }
        self.sink.save_crl(&crl)?;
        self.statistics.crls.fetch_add(1, Ordering::Relaxed);
        info!(
            issuer = crl.issuer_dn(),
            fingerprint = %crl.fingerprint(),
            revoked = crl.revoked_count(),
            "CRL stored"
        );
        Ok(crl)
    }
}
