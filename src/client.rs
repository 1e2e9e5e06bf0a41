//! Job lifecycle client
//!
//! [`JobClient`] drives one search through submit → poll → download against the
//! service endpoint. All suspension happens between status checks, through the
//! injected [`Clock`], and can be cut short with a [`CancellationToken`] or a
//! configured deadline.

use crate::archive::ArchivePackager;
use crate::clock::{Clock, TokioClock};
use crate::config::ClientConfig;
use crate::error::{Error, Phase, Result};
use crate::request::RequestBuilder;
use crate::status::{FIELD_RID, FIELD_RTOE, StatusBlock};
use crate::types::{DownloadResult, JobHandle, JobRequest, JobState, OutputFormat, PollOutcome};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Status value reported while the search is queued or running
pub const STATUS_WAITING: &str = "WAITING";
/// Status value reported when the service has lost track of the request id
pub const STATUS_UNKNOWN: &str = "UNKNOWN";
/// Status value reported when the search has finished
pub const STATUS_READY: &str = "READY";
/// Status value reported when the search itself failed
pub const STATUS_FAILED: &str = "FAILED";

/// Classify one parsed status block
///
/// A hits indicator means the results are ready, whatever else the block says.
/// `UNKNOWN` and `FAILED` are terminal errors. A block with no status, or with a
/// status this client does not recognize, is [`PollOutcome::Unknown`].
pub fn classify(block: &StatusBlock, rid: &str) -> Result<PollOutcome> {
    if block.has_hits_indicator() {
        return Ok(PollOutcome::Ready);
    }

    match block.status() {
        Some(STATUS_WAITING) => Ok(PollOutcome::StillRunning),
        Some(STATUS_READY) => Ok(PollOutcome::Ready),
        Some(STATUS_UNKNOWN) => Err(Error::UnknownJob {
            rid: rid.to_string(),
            observed: block.clone(),
        }),
        Some(STATUS_FAILED) => Err(Error::JobFailed {
            rid: rid.to_string(),
            observed: block.clone(),
        }),
        Some(_) | None => Ok(PollOutcome::Unknown),
    }
}

/// Client for a single search job
///
/// Holds no session state besides the lifecycle [`JobState`]; the request id in
/// the [`JobHandle`] is the only correlation with the service. Use one client per
/// job. Independent clients can run concurrently.
pub struct JobClient {
    http: reqwest::Client,
    config: ClientConfig,
    clock: Arc<dyn Clock>,
    requests: RequestBuilder,
    state: JobState,
}

impl JobClient {
    /// Create a client using the tokio timer
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    /// Create a client with an explicit time source
    pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        let requests = RequestBuilder::new(config.endpoint.clone(), None);

        Ok(Self {
            http,
            config,
            clock,
            requests,
            state: JobState::default(),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit a search and return its handle
    ///
    /// Fails with [`Error::Protocol`] if the response lacks `RID` or `RTOE`.
    pub async fn submit(&mut self, request: &JobRequest) -> Result<JobHandle> {
        self.require(&[JobState::Submitting], "submit")?;

        self.requests = RequestBuilder::new(
            self.config.endpoint.clone(),
            request.credential().map(str::to_string),
        );

        let result = self.submit_inner(request).await;
        self.settle(&result, JobState::Submitted);
        result
    }

    async fn submit_inner(&self, request: &JobRequest) -> Result<JobHandle> {
        let mut params = vec![
            ("CMD", "Put"),
            ("PROGRAM", request.program().as_str()),
            ("DATABASE", request.database().as_str()),
            ("QUERY", request.query()),
        ];
        if request.megablast() {
            params.push(("MEGABLAST", "on"));
        }

        tracing::info!(
            endpoint = %self.requests.endpoint(),
            program = %request.program(),
            database = %request.database(),
            with_credential = self.requests.has_credential(),
            megablast = request.megablast(),
            query_bytes = request.query().len(),
            "Submitting search"
        );

        let body = self.fetch_text(Phase::Submit, &params).await?;
        let block = StatusBlock::parse(&body, Phase::Submit)?;

        let Some(rid) = block.get(FIELD_RID).map(str::to_string) else {
            return Err(missing_field(Phase::Submit, FIELD_RID, block));
        };
        let Some(rtoe) = block.get(FIELD_RTOE) else {
            return Err(missing_field(Phase::Submit, FIELD_RTOE, block));
        };
        let Ok(rtoe_secs) = rtoe.parse::<u64>() else {
            return Err(Error::Protocol {
                phase: Phase::Submit,
                reason: format!("{} '{}' is not a whole number of seconds", FIELD_RTOE, rtoe),
                observed: block,
            });
        };

        tracing::info!(
            rid = %rid,
            estimated_wait_secs = rtoe_secs,
            "Search submitted"
        );

        Ok(JobHandle::new(rid, Duration::from_secs(rtoe_secs)))
    }

    /// Poll until the job is ready
    ///
    /// Waits `poll.initial_delay` (cut short to fit `poll.deadline`) before the
    /// first check of a freshly submitted job, then checks every `poll.interval`.
    /// Returns [`PollOutcome::Ready`] once results are available. Fails with
    /// [`Error::UnknownJob`] or [`Error::JobFailed`] as soon as the service reports either, with
    /// [`Error::Cancelled`] when `cancel` fires, and with
    /// [`Error::DeadlineExceeded`] when the next wait would pass `poll.deadline`.
    pub async fn poll(
        &mut self,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        let first_poll = self.state == JobState::Submitted;
        self.require(&[JobState::Submitted, JobState::Polling], "poll")?;
        self.state = JobState::Polling;

        let result = self.poll_loop(handle, cancel, first_poll).await;
        self.settle(&result, JobState::Ready);
        result
    }

    async fn poll_loop(
        &self,
        handle: &JobHandle,
        cancel: &CancellationToken,
        first_poll: bool,
    ) -> Result<PollOutcome> {
        let rid = handle.request_id();
        let deadline = self.config.poll.deadline.map(|d| self.clock.now() + d);
        let interval = self.config.poll.interval;

        tracing::info!(
            rid = %rid,
            status_url = %self.requests.display_url(&poll_params(rid)),
            "Monitoring job status"
        );

        // Clamp the initial delay so at least one check runs before the deadline
        let initial_delay = match deadline {
            Some(deadline) => self
                .config
                .poll
                .initial_delay
                .min(deadline.saturating_duration_since(self.clock.now())),
            None => self.config.poll.initial_delay,
        };
        if first_poll && !initial_delay.is_zero() {
            self.pause(rid, initial_delay, deadline, cancel).await?;
        }

        let mut checks: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    rid: rid.to_string(),
                });
            }

            checks += 1;
            let (outcome, block) = self.check_status(rid).await?;
            match outcome {
                PollOutcome::Ready => {
                    tracing::info!(rid = %rid, checks, "Results ready");
                    return Ok(PollOutcome::Ready);
                }
                PollOutcome::StillRunning => {
                    tracing::info!(
                        rid = %rid,
                        checks,
                        next_poll_secs = interval.as_secs(),
                        "Nothing yet, waiting"
                    );
                }
                PollOutcome::Unknown => match block.status() {
                    Some(status) => tracing::warn!(
                        rid = %rid,
                        status,
                        next_poll_secs = interval.as_secs(),
                        "Unrecognized job status, retrying"
                    ),
                    None => tracing::warn!(
                        rid = %rid,
                        observed = %block,
                        next_poll_secs = interval.as_secs(),
                        "Status response has neither a status nor a hits indicator, retrying"
                    ),
                },
            }

            self.pause(rid, interval, deadline, cancel).await?;
        }
    }

    /// Perform a single status check without waiting
    pub async fn poll_once(&mut self, handle: &JobHandle) -> Result<PollOutcome> {
        self.require(&[JobState::Submitted, JobState::Polling], "poll")?;
        self.state = JobState::Polling;

        let result = self
            .check_status(handle.request_id())
            .await
            .map(|(outcome, _)| outcome);
        match &result {
            Ok(PollOutcome::Ready) => self.state = JobState::Ready,
            Ok(_) => {}
            Err(_) => self.state = JobState::Failed,
        }
        result
    }

    async fn check_status(&self, rid: &str) -> Result<(PollOutcome, StatusBlock)> {
        let body = self.fetch_text(Phase::Poll, &poll_params(rid)).await?;
        let block = StatusBlock::parse(&body, Phase::Poll)?;
        tracing::debug!(rid = %rid, observed = %block, "Status check");
        let outcome = classify(&block, rid)?;
        Ok((outcome, block))
    }

    /// Sleep for `delay` unless cancelled or the deadline would be passed
    async fn pause(
        &self,
        rid: &str,
        delay: Duration,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(deadline) = deadline {
            if self.clock.now() + delay > deadline {
                tracing::warn!(rid = %rid, "Poll deadline reached");
                return Err(Error::DeadlineExceeded {
                    rid: rid.to_string(),
                });
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(rid = %rid, "Polling cancelled");
                Err(Error::Cancelled { rid: rid.to_string() })
            }
            _ = self.clock.sleep(delay) => Ok(()),
        }
    }

    /// Download the results and extract them into `dest_path`
    ///
    /// The job must have been polled to [`PollOutcome::Ready`]. A response that is
    /// not a ZIP archive (e.g. an error page) fails with [`Error::Archive`].
    pub async fn download(
        &mut self,
        handle: &JobHandle,
        format: OutputFormat,
        dest_path: &Path,
    ) -> Result<DownloadResult> {
        self.require(&[JobState::Ready], "download")?;
        self.state = JobState::Downloading;

        let result = self.download_inner(handle, format, dest_path).await;
        self.settle(&result, JobState::Done);
        result
    }

    async fn download_inner(
        &self,
        handle: &JobHandle,
        format: OutputFormat,
        dest_path: &Path,
    ) -> Result<DownloadResult> {
        let rid = handle.request_id();
        let params = [("CMD", "Get"), ("FORMAT_TYPE", format.token()), ("RID", rid)];

        tracing::info!(rid = %rid, format = %format, ?dest_path, "Downloading results");

        let response = self.fetch(Phase::Download, &params).await?;
        let payload = response
            .bytes()
            .await
            .map_err(|e| Error::transport(Phase::Download, e))?;

        let destination = dest_path.to_path_buf();
        let extract_to = destination.clone();
        let files = tokio::task::spawn_blocking(move || {
            ArchivePackager::extract(&payload, &extract_to)
        })
        .await
        .map_err(|e| Error::archive(format!("extraction task failed: {}", e)))??;

        tracing::info!(rid = %rid, files = files.len(), "Done");

        Ok(DownloadResult { destination, files })
    }

    /// Submit, poll until ready, then download into `dest_path`
    pub async fn run(
        &mut self,
        request: &JobRequest,
        format: OutputFormat,
        dest_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult> {
        let handle = self.submit(request).await?;
        self.poll(&handle, cancel).await?;
        self.download(&handle, format, dest_path).await
    }

    async fn fetch(&self, phase: Phase, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = self.requests.build(params);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(phase, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport {
                phase,
                reason: format!("HTTP {} from {}", status, self.requests.display_url(params)),
                source: None,
            });
        }
        Ok(response)
    }

    async fn fetch_text(&self, phase: Phase, params: &[(&str, &str)]) -> Result<String> {
        self.fetch(phase, params)
            .await?
            .text()
            .await
            .map_err(|e| Error::transport(phase, e))
    }

    fn require(&self, allowed: &[JobState], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn settle<T>(&mut self, result: &Result<T>, on_success: JobState) {
        let next = if result.is_ok() {
            on_success
        } else {
            JobState::Failed
        };
        if self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "Job state change");
            self.state = next;
        }
    }
}

fn poll_params(rid: &str) -> [(&'static str, &str); 3] {
    [("CMD", "Get"), ("FORMAT_OBJECT", "SearchInfo"), ("RID", rid)]
}

fn missing_field(phase: Phase, field: &str, observed: StatusBlock) -> Error {
    Error::Protocol {
        phase,
        reason: format!("response has no {} field", field),
        observed,
    }
}
