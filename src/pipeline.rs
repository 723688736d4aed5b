//! PipelineOrchestrator: the polling loop.
//!
//! One [`Pipeline::tick`] is one pass through
//!
//! ```text
//! derive window ─► tracker ─► settle ─► stage 1 ─► per talker: rank, stage 2, enrich, publish ─► mark
//!       │             │                    │
//!       └── not ready ┴────────────────────┴── unavailable ─► short pause, try again
//! ```
//!
//! and [`Pipeline::run`] repeats it forever, sleeping [`Pipeline::pause_after`]
//! between passes. Everything runs on one task, one target at a time.

use std::time::Duration;

use toptalk_core::config::Config;
use toptalk_core::{
    Clock, EnrichedRecord, Error, NotReady, Result, SystemClock, TopTalkerRecord, Window,
    WindowClock, WindowId, WindowTracker,
};
use toptalk_feeds::{
    CommandSpec, Delivery, EnrichmentLookup, ExtractionAdapter, QueueStore, ResilientPublisher,
};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-cycle knobs, read once at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Talkers followed per window.
    pub top_n: usize,
    /// Detail lines published per talker.
    pub url_count: usize,
    pub ranking_prefix: String,
    pub detail_prefix: String,
    pub record_rankings: bool,
    /// Pause when there is no window to process.
    pub poll: Duration,
    /// Pause between deriving a new window and reading its logs.
    pub settle: Duration,
    /// Pause after a completed window.
    pub cycle: Duration,
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            top_n: cfg.ip.top,
            url_count: cfg.url.url,
            ranking_prefix: cfg.keys.ranking_prefix.clone(),
            detail_prefix: cfg.keys.detail_prefix.clone(),
            record_rankings: cfg.keys.record_rankings,
            poll: cfg.timing.poll(),
            settle: cfg.timing.settle(),
            cycle: cfg.timing.cycle(),
        }
    }

    fn ranking_key(&self, window: &WindowId) -> String {
        format!("{}{}", self.ranking_prefix, window)
    }

    fn detail_key(&self, window: &WindowId) -> String {
        format!("{}{}", self.detail_prefix, window)
    }
}

// ---------------------------------------------------------------------------
// Cycle outcomes
// ---------------------------------------------------------------------------

/// Counters for one processed window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub talkers: usize,
    pub published: usize,
    /// Writes that failed even after a reconnect.
    pub dropped: usize,
    /// Writes that needed a reconnect first.
    pub reconnects: usize,
    pub malformed: usize,
    /// Talkers whose detail search could not start or stayed silent.
    pub empty_targets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No boundary, or the window is already done.
    NotReady(NotReady),
    /// Stage 1 could not be started; the window stays unmarked.
    ExtractionUnavailable(WindowId),
    Completed { window: WindowId, report: CycleReport },
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<S, C = SystemClock> {
    clock: C,
    windows: WindowClock,
    tracker: WindowTracker,
    extractor: ExtractionAdapter,
    enrichment: EnrichmentLookup,
    publisher: ResilientPublisher<S>,
    settings: PipelineSettings,
}

impl<S: QueueStore> Pipeline<S, SystemClock> {
    /// Wire a pipeline from configuration around an unconnected `store`.
    pub fn from_config(cfg: &Config, store: S) -> Result<Self> {
        let windows = WindowClock::new(
            cfg.loglocation.request_log.clone(),
            cfg.loglocation.f5_log.clone(),
        )
        .with_skew(cfg.timing.detail_skew());
        let extractor = ExtractionAdapter::new(
            command_spec("commands.top_talkers", cfg.commands.top_talkers_argv()?)?,
            command_spec("commands.detail_search", cfg.commands.detail_search_argv()?)?,
        )
        .with_first_line_timeout(cfg.commands.first_line_timeout());
        let publisher = ResilientPublisher::new(store).with_retry_interval(cfg.timing.reconnect());

        Ok(Self::new(
            SystemClock,
            windows,
            extractor,
            EnrichmentLookup::from_config(cfg),
            publisher,
            PipelineSettings::from_config(cfg),
        ))
    }
}

fn command_spec(key: &str, argv: Vec<String>) -> Result<CommandSpec> {
    CommandSpec::from_argv(argv).ok_or_else(|| Error::ConfigMissing(format!("{key} is empty")))
}

impl<S: QueueStore, C: Clock> Pipeline<S, C> {
    pub fn new(
        clock: C,
        windows: WindowClock,
        extractor: ExtractionAdapter,
        enrichment: EnrichmentLookup,
        publisher: ResilientPublisher<S>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            clock,
            windows,
            tracker: WindowTracker::new(),
            extractor,
            enrichment,
            publisher,
            settings,
        }
    }

    pub fn tracker(&self) -> &WindowTracker {
        &self.tracker
    }

    pub fn publisher(&self) -> &ResilientPublisher<S> {
        &self.publisher
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Open the store connection, retrying until it answers.
    pub async fn connect(&mut self) {
        let attempts = self.publisher.connect().await;
        tracing::info!(
            endpoint = %self.publisher.store().endpoint(),
            attempts,
            enrichment = self.enrichment.strategy(),
            "pipeline connected"
        );
    }

    /// Run forever.
    pub async fn run(&mut self) {
        loop {
            let outcome = self.tick().await;
            tokio::time::sleep(self.pause_after(&outcome)).await;
        }
    }

    /// How long to wait before the next tick.
    pub fn pause_after(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Completed { .. } => self.settings.cycle,
            CycleOutcome::NotReady(_) | CycleOutcome::ExtractionUnavailable(_) => {
                self.settings.poll
            }
        }
    }

    /// One pass of the loop, without the trailing pause.
    pub async fn tick(&mut self) -> CycleOutcome {
        let window = match self.derive() {
            Ok(window) => window,
            Err(reason) => {
                tracing::trace!(%reason, "skipping cycle");
                return CycleOutcome::NotReady(reason);
            }
        };
        tracing::info!(window = %window.id, coarse = %window.coarse, detail = %window.detail, "new window");

        tokio::time::sleep(self.settings.settle).await;

        let top_n = self.settings.top_n;
        let mut talkers = match self
            .extractor
            .run_top_talkers(&window.coarse, &window.id, top_n)
        {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(window = %window.id, error = %err, "top-talker extraction unavailable");
                return CycleOutcome::ExtractionUnavailable(window.id);
            }
        };

        let mut report = CycleReport::default();
        loop {
            let talker = match talkers.next_record().await {
                Ok(Some(talker)) => talker,
                Ok(None) => break,
                Err(Error::MalformedRecord { line, reason }) => {
                    tracing::debug!(window = %window.id, %line, %reason, "skipping top-talker line");
                    report.malformed += 1;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(window = %window.id, error = %err, "top-talker extraction ended early");
                    break;
                }
            };
            report.talkers += 1;
            self.process_talker(&window, &talker, &mut report).await;
        }
        talkers.close().await;

        self.tracker.mark_processed(window.id.clone());
        tracing::info!(
            window = %window.id,
            talkers = report.talkers,
            published = report.published,
            dropped = report.dropped,
            malformed = report.malformed,
            empty_targets = report.empty_targets,
            "window complete"
        );
        CycleOutcome::Completed {
            window: window.id,
            report,
        }
    }

    fn derive(&self) -> std::result::Result<Window, NotReady> {
        let window = self.windows.window(self.clock.now())?;
        self.tracker.check(&window.id)?;
        Ok(window)
    }

    async fn process_talker(
        &mut self,
        window: &Window,
        talker: &TopTalkerRecord,
        report: &mut CycleReport,
    ) {
        if self.settings.record_rankings {
            let key = self.settings.ranking_key(&window.id);
            match self.publisher.record_rank(&key, talker).await {
                Ok(Delivery::Direct) => {}
                Ok(Delivery::AfterReconnect { .. }) => report.reconnects += 1,
                Err(err) => {
                    tracing::warn!(%key, address = %talker.address, error = %err, "ranking write dropped");
                    report.dropped += 1;
                }
            }
        }

        let mut details = match self.extractor.run_detail_search(
            &window.detail,
            &talker.address,
            self.settings.url_count,
        ) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(address = %talker.address, error = %err, "detail search unavailable");
                report.empty_targets += 1;
                return;
            }
        };

        let key = self.settings.detail_key(&window.id);
        loop {
            let detail = match details.next_record().await {
                Ok(Some(detail)) => detail,
                Ok(None) => break,
                Err(Error::MalformedRecord { line, reason }) => {
                    tracing::debug!(address = %talker.address, %line, %reason, "skipping detail line");
                    report.malformed += 1;
                    continue;
                }
                Err(err) => {
                    tracing::info!(address = %talker.address, error = %err, "no detail for target");
                    report.empty_targets += 1;
                    break;
                }
            };

            let decorations = self
                .enrichment
                .lookup(self.publisher.store_mut(), &detail)
                .await;
            let record = EnrichedRecord {
                talker: talker.clone(),
                detail,
                decorations,
            };
            match self.publisher.publish(&key, &record.payload()).await {
                Ok(Delivery::Direct) => report.published += 1,
                Ok(Delivery::AfterReconnect { .. }) => {
                    report.published += 1;
                    report.reconnects += 1;
                }
                Err(err) => {
                    tracing::warn!(%key, address = %talker.address, error = %err, "publish dropped");
                    report.dropped += 1;
                }
            }
        }
        details.close().await;
    }
}
