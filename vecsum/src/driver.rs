//! Runs the configured number of passes over one open [`DataSource`].

use std::time::Instant;

use hdrhistogram::Histogram;
use tracing::{debug, error, info, trace, warn};

use crate::{
    backend::ZeroCopyBackend,
    metrics::{MetricsStorage, GLOBAL_STORAGE},
    report::{self, LatencySummary, PassReport, RunReport},
    source::{self, ChunkRead, DataSource},
    Config, Error, Stopwatch, VectorSummer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configuring,
    /// Chunk and file size checked, source open.
    Opened,
    /// 0-based.
    Running { pass: u32 },
    Finished,
    Failed,
}

/// Drives one run. A driver runs once; create a new one for the next run.
pub struct Driver<'b, B> {
    config: Config,
    backend: &'b B,
    summer: VectorSummer,
    state: RunState,
}

impl<'b, B: ZeroCopyBackend> Driver<'b, B> {
    pub fn new(config: Config, backend: &'b B) -> Self {
        let summer = VectorSummer::new(config.sum_mode, config.skip_reduction);
        Self {
            config,
            backend,
            summer,
            state: RunState::Configuring,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn run(&mut self) -> Result<RunReport, Error> {
        self.run_with(|_| {})
    }

    /// Like [`Driver::run`], calling `on_pass` after each completed pass.
    ///
    /// The source is closed before this returns, on success and on failure.
    #[tracing::instrument(skip_all, fields(path = ?self.config.path, strategy = %self.config.strategy))]
    pub fn run_with(&mut self, mut on_pass: impl FnMut(&PassReport)) -> Result<RunReport, Error> {
        if self.state != RunState::Configuring {
            return Err(Error::Configuration(format!(
                "driver already ran, state is {:?}",
                self.state
            )));
        }
        let mut source = match self.open() {
            Ok(source) => source,
            Err(e) => return Err(self.fail(e)),
        };
        let result = self.run_passes(source.as_mut(), &mut on_pass);
        let closed = source.close();
        match (result, closed) {
            (Ok(report), Ok(())) => {
                self.transition(RunState::Finished);
                info!(
                    "finished {} passes. total sum = {}, {}",
                    report.passes.len(),
                    report.total_sum,
                    report.measurement
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(self.fail(e)),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("closing source after failed run: {close_err}");
                }
                Err(self.fail(e))
            }
        }
    }

    fn open(&mut self) -> Result<Box<dyn DataSource + 'b>, Error> {
        self.config.validate()?;
        let source = source::open(self.backend, &self.config)?;
        self.transition(RunState::Opened);
        Ok(source)
    }

    fn run_passes(
        &mut self,
        source: &mut dyn DataSource,
        on_pass: &mut dyn FnMut(&PassReport),
    ) -> Result<RunReport, Error> {
        let strategy = source.strategy();
        let mut latencies = report::make_latency_histogram();
        let mut passes = Vec::with_capacity(self.config.passes.get() as usize);

        let run_watch = Stopwatch::start();
        for pass in 0..self.config.passes.get() {
            self.transition(RunState::Running { pass });
            let report = self.run_pass(pass, source, &mut latencies)?;
            info!("finished {strategy} pass {pass}. sum = {}", report.sum);
            MetricsStorage::inc(&GLOBAL_STORAGE.passes_completed, 1);
            on_pass(&report);
            passes.push(report);
            source.rewind()?;
        }
        let chunks_read = passes.iter().map(|p| p.chunks).sum();
        let bytes_read = passes.iter().map(|p| p.measurement.bytes).sum();
        let measurement = run_watch.stop(bytes_read);

        Ok(RunReport {
            strategy,
            total_sum: passes.iter().map(|p| p.sum).sum(),
            chunks_read,
            measurement,
            chunk_latency: LatencySummary::from_histogram(&latencies),
            passes,
        })
    }

    fn run_pass(
        &self,
        pass: u32,
        source: &mut dyn DataSource,
        latencies: &mut Histogram<u64>,
    ) -> Result<PassReport, Error> {
        let summer = self.summer;
        let chunk_size = source.chunk_size() as u64;
        let mut sum = 0.0;
        let mut chunks = 0u64;

        let watch = Stopwatch::start();
        loop {
            let started = Instant::now();
            let read = source.next_chunk(&mut |chunk| {
                trace!(index = chunk.index(), len = chunk.len(), "reduce");
                sum += summer.sum(chunk.bytes());
            })?;
            match read {
                ChunkRead::Consumed => {
                    report::record_latency(latencies, started.elapsed());
                    chunks += 1;
                    MetricsStorage::inc(&GLOBAL_STORAGE.chunks_read, 1);
                    MetricsStorage::inc(&GLOBAL_STORAGE.bytes_read, chunk_size);
                }
                ChunkRead::Eof => break,
            }
        }
        let measurement = watch.stop(chunks * chunk_size);

        Ok(PassReport {
            pass,
            sum,
            chunks,
            measurement,
        })
    }

    fn transition(&mut self, to: RunState) {
        debug!(from = ?self.state, ?to, "state transition");
        self.state = to;
    }

    fn fail(&mut self, e: Error) -> Error {
        error!("run failed in state {:?}: {e}", self.state);
        self.transition(RunState::Failed);
        e
    }
}
