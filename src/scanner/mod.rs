//! Probe engine and trait definitions

pub mod forms;
pub mod headers;
pub mod ports;
pub mod reflection;

use crate::error::{ProbeError, Result, VigilError};
use crate::history::ScanHistory;
use crate::http::{FetchedPage, HttpClient};
use crate::models::{
    FormFinding, HeaderFindings, PortFindings, ReflectionFindings, ScanConfig, ScanReport,
};
use crate::target::Target;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Trait that all probes implement
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// What the probe reports when it completes
    type Findings: Send + 'static;

    /// Returns the probe name, also used as its key in the error map
    fn name(&self) -> &'static str;

    /// Returns a description of what this probe checks
    fn description(&self) -> &'static str;

    /// Executes the probe against the shared scan context
    async fn run(&self, ctx: &ProbeContext) -> std::result::Result<Self::Findings, ProbeError>;
}

/// Result of one probe, failure included
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome<T> {
    Completed(T),
    Failed(ProbeError),
}

impl<T> ProbeOutcome<T> {
    pub fn succeeded(&self) -> bool {
        matches!(self, ProbeOutcome::Completed(_))
    }

    pub fn findings(&self) -> Option<&T> {
        match self {
            ProbeOutcome::Completed(findings) => Some(findings),
            ProbeOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            ProbeOutcome::Completed(_) => None,
            ProbeOutcome::Failed(e) => Some(e),
        }
    }
}

/// Read-only state shared by the probes of one scan
pub struct ProbeContext {
    pub target: Target,
    pub config: ScanConfig,
    pub client: HttpClient,
    page: OnceCell<std::result::Result<FetchedPage, ProbeError>>,
}

impl ProbeContext {
    pub fn new(target: Target, config: ScanConfig, client: HttpClient) -> Self {
        Self {
            target,
            config,
            client,
            page: OnceCell::new(),
        }
    }

    /// The target page, fetched once on first use and shared afterwards
    pub async fn page(&self) -> std::result::Result<&FetchedPage, ProbeError> {
        self.page
            .get_or_init(|| async {
                let page = self.client.fetch(self.target.as_str()).await;
                if let Err(ref e) = page {
                    warn!("Initial fetch of {} failed: {e}", self.target);
                }
                page
            })
            .await
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// Runs the four probes against a target and assembles the report
pub struct ScanEngine {
    config: ScanConfig,
    history: Option<Arc<dyn ScanHistory>>,
}

impl ScanEngine {
    /// Creates an engine that does not record history
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            history: None,
        }
    }

    /// Creates an engine that records every completed scan
    pub fn with_history(config: ScanConfig, history: Arc<dyn ScanHistory>) -> Self {
        Self {
            config,
            history: Some(history),
        }
    }

    /// Returns information about all probes
    pub fn list_probes() -> Vec<(&'static str, &'static str)> {
        vec![
            (headers::HeaderProbe.name(), headers::HeaderProbe.description()),
            (ports::PortProbe.name(), ports::PortProbe.description()),
            (forms::FormProbe.name(), forms::FormProbe.description()),
            (
                reflection::ReflectionProbe.name(),
                reflection::ReflectionProbe.description(),
            ),
        ]
    }

    /// Scans `raw_target`. Invalid input fails with [`VigilError::NothingToScan`].
    pub async fn run(&self, raw_target: &str) -> Result<ScanReport> {
        self.run_with_cancel(raw_target, CancellationToken::new())
            .await
    }

    /// Scans `raw_target`, stopping early once `cancel` fires.
    ///
    /// An unusable configuration is rejected before the target is looked at.
    /// A cancelled scan returns [`VigilError::Cancelled`] and is never recorded.
    pub async fn run_with_cancel(
        &self,
        raw_target: &str,
        cancel: CancellationToken,
    ) -> Result<ScanReport> {
        crate::config::validate(&self.config)?;

        let target = Target::parse(raw_target).inspect_err(|e| {
            warn!("Rejected target {raw_target:?}: {e}");
        })?;

        info!("Starting scan of {target}");
        let client = HttpClient::from_config(&self.config)?;
        let mut report = ScanReport::new(target.as_str());
        let ctx = Arc::new(ProbeContext::new(target, self.config.clone(), client.clone()));

        report.vulnerabilities_tested = true;

        let (header_outcome, port_outcome, form_outcome, reflection_outcome) = tokio::join!(
            run_isolated(headers::HeaderProbe, Arc::clone(&ctx), cancel.clone()),
            run_isolated(ports::PortProbe, Arc::clone(&ctx), cancel.clone()),
            run_isolated(forms::FormProbe, Arc::clone(&ctx), cancel.clone()),
            run_isolated(reflection::ReflectionProbe, Arc::clone(&ctx), cancel.clone()),
        );

        if cancel.is_cancelled() {
            warn!("Scan of {} cancelled", report.target);
            return Err(VigilError::Cancelled);
        }

        apply_headers(&mut report, header_outcome);
        apply_ports(&mut report, port_outcome);
        apply_forms(&mut report, form_outcome);
        apply_reflection(&mut report, reflection_outcome);
        report.total_requests = client.request_count();

        info!(
            "Scan of {} finished with {} probe error(s)",
            report.target,
            report.errors.len()
        );

        if let Some(history) = &self.history {
            let history = Arc::clone(history);
            let snapshot = report.clone();
            match tokio::task::spawn_blocking(move || history.record(&snapshot)).await {
                Ok(Ok(id)) => debug!("Scan recorded in history as #{id}"),
                Ok(Err(e)) => error!("Failed to record scan history: {e}"),
                Err(e) => error!("History task failed: {e}"),
            }
        }

        Ok(report)
    }
}

/// Runs one probe on its own task so that errors, panics and cancellation
/// stay local to it.
async fn run_isolated<P: Probe>(
    probe: P,
    ctx: Arc<ProbeContext>,
    cancel: CancellationToken,
) -> ProbeOutcome<P::Findings> {
    let name = probe.name();
    if cancel.is_cancelled() {
        return ProbeOutcome::Failed(ProbeError::Cancelled);
    }

    debug!("Executing probe: {name}");
    let task_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = task_cancel.cancelled() => Err(ProbeError::Cancelled),
            result = probe.run(&ctx) => result,
        }
    });

    match handle.await {
        Ok(Ok(_)) if cancel.is_cancelled() => ProbeOutcome::Failed(ProbeError::Cancelled),
        Ok(Ok(findings)) => {
            info!("Probe '{name}' completed");
            ProbeOutcome::Completed(findings)
        }
        Ok(Err(e)) => {
            warn!("Probe '{name}' failed: {e}");
            ProbeOutcome::Failed(e)
        }
        Err(e) => {
            error!("Probe '{name}' task panicked: {e}");
            ProbeOutcome::Failed(ProbeError::UnexpectedFault(e.to_string()))
        }
    }
}

fn record_error(report: &mut ScanReport, probe: &str, error: &ProbeError) {
    report.errors.insert(probe.to_string(), error.to_string());
}

fn apply_headers(report: &mut ScanReport, outcome: ProbeOutcome<HeaderFindings>) {
    match outcome {
        ProbeOutcome::Completed(findings) => {
            report.headers = findings;
            report.probes.headers = true;
        }
        ProbeOutcome::Failed(e) => {
            report.headers = HeaderFindings::undetermined();
            record_error(report, headers::HeaderProbe.name(), &e);
        }
    }
}

fn apply_ports(report: &mut ScanReport, outcome: ProbeOutcome<PortFindings>) {
    match outcome {
        ProbeOutcome::Completed(findings) => {
            report.ip_address = findings.ip_address;
            report.open_ports = findings.open_ports;
            report.probes.ports = true;
        }
        ProbeOutcome::Failed(e) => {
            report.open_ports.clear();
            record_error(report, ports::PortProbe.name(), &e);
        }
    }
}

fn apply_forms(report: &mut ScanReport, outcome: ProbeOutcome<Vec<FormFinding>>) {
    match outcome {
        ProbeOutcome::Completed(forms) => {
            report.sqli_test = !forms.is_empty();
            report.forms = forms;
            report.probes.forms = true;
        }
        ProbeOutcome::Failed(e) => {
            report.sqli_test = false;
            report.forms.clear();
            record_error(report, forms::FormProbe.name(), &e);
        }
    }
}

fn apply_reflection(report: &mut ScanReport, outcome: ProbeOutcome<ReflectionFindings>) {
    match outcome {
        ProbeOutcome::Completed(findings) => {
            report.xss_test = findings.reflection.is_some();
            report.reflections = findings.reflection.into_iter().collect();
            report.xss_detail = findings.detail;
            report.probes.reflection = true;
        }
        ProbeOutcome::Failed(e) => {
            report.xss_test = false;
            report.reflections.clear();
            report.xss_detail = format!("Not determined: {e}");
            record_error(report, reflection::ReflectionProbe.name(), &e);
        }
    }
}
