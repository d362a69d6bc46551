//! The ECG path: one pass per data-ready event reads a frame, filters channel 1 into the ring
//! buffer and every `analyze_every`th sample the spectrum of the buffer is computed.
//!
//! ```text
//!   WaitForEvent -> ReadFrame -> Decode -> Filter -> BufferInsert -> (Analyze) -> Idle
//! ```
//!
//! A failed transfer is reported to the caller, but never retried within the pass.

use crate::ads1292::{DeviceId, Frontend, RegisterMap};
use crate::ads1292::Delay;
use crate::display::{color, Display, Rect};
use crate::fir::FIR;
use crate::frame::{self, DecodedSample};
use crate::mailbox::DataReady;
use crate::plot;
use crate::retry::Retry;
use crate::ring::RingBuffer;
use crate::spectrum::{Analyzer, Fft, RealFft};
use crate::telemetry::{EcgAnalysisReport, EcgSampleReport};
use crate::config;

/// Transform length and ring capacity of the ECG path.
pub const ECG_N: usize = 1024;

pub const TRACE_AREA: Rect = Rect::new(50, 210, 250, 180);
pub const SPECTRUM_AREA: Rect = Rect::new(0, 400, 300, 80);
pub const SPECTRUM_STRIDE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcgConfig {
    /// Rate the front-end converts at [Hz].
    pub sample_rate_hz: f32,

    /// Analyze the buffer every this many accepted samples.
    pub analyze_every: u32,

    /// First bin considered in the peak search.
    pub start_bin: usize,

    /// Reject frames without a valid status preamble.
    pub validate_status: bool,
}

impl Default for EcgConfig {
    fn default() -> Self {
        EcgConfig {
            sample_rate_hz: RegisterMap::default().sample_rate(),
            analyze_every: config::ECG_ANALYZE_EVERY,
            start_bin: 1,
            validate_status: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum State {
    WaitForEvent,
    ReadFrame,
    Decode,
    Filter,
    BufferInsert,
    Analyze,
    Idle,
}

/// Output of one completed pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pass {
    pub sample: EcgSampleReport,
    pub analysis: Option<EcgAnalysisReport>,
}

pub struct EcgTask<F: Frontend, const N: usize = ECG_N> {
    frontend: F,
    config: EcgConfig,

    fir: FIR,
    ring: RingBuffer<N>,
    analyzer: Analyzer<N>,

    state: State,

    /// Frames read.
    frames: u32,

    /// Frames accepted into the ring buffer.
    samples: u32,

    /// Frames rejected for a bad status word.
    rejected: u32,

    analyses: u32,
    dropped_seen: u32,

    last_sample: Option<DecodedSample>,
    last_analysis: Option<EcgAnalysisReport>,
}

impl<F: Frontend, const N: usize> EcgTask<F, N>
where
    Fft: RealFft<N>,
{
    pub fn new(frontend: F, config: EcgConfig) -> EcgTask<F, N> {
        EcgTask {
            frontend,
            config,
            fir: FIR::new(),
            ring: RingBuffer::new(),
            analyzer: Analyzer::new(),
            state: State::WaitForEvent,
            frames: 0,
            samples: 0,
            rejected: 0,
            analyses: 0,
            dropped_seen: 0,
            last_sample: None,
            last_analysis: None,
        }
    }

    /// Reset, identify and configure the front-end with `map` and start conversion.
    pub fn start(
        &mut self,
        map: &RegisterMap,
        delay: &mut impl Delay,
    ) -> Result<DeviceId, F::Error> {
        defmt::info!("ecg: starting, {} samples per analysis..", self.config.analyze_every);

        let id = self
            .frontend
            .bring_up(map, Retry::probe(), Retry::verify(), delay)?;

        self.config.sample_rate_hz = map.sample_rate();
        defmt::info!("ecg: {:?} running at {} Hz", id, self.config.sample_rate_hz);

        Ok(id)
    }

    /// Run one pass if a data-ready event is pending. Returns `None` if there was no event or
    /// the frame was rejected.
    pub fn pass(
        &mut self,
        ready: &DataReady,
        delay: &mut impl Delay,
    ) -> Result<Option<Pass>, F::Error> {
        self.state = State::WaitForEvent;

        if !ready.take() {
            return Ok(None);
        }

        let dropped = ready.dropped();
        if dropped != self.dropped_seen {
            defmt::warn!("ecg: {} frames dropped", dropped.wrapping_sub(self.dropped_seen));
            self.dropped_seen = dropped;
        }

        self.state = State::ReadFrame;
        let raw = self.frontend.read_frame(delay)?;
        self.frames = self.frames.wrapping_add(1);

        self.state = State::Decode;
        let status = raw.status();
        if self.config.validate_status && !status.is_valid() {
            self.rejected = self.rejected.wrapping_add(1);
            defmt::warn!("ecg: rejected frame with status {:#x}", status.0);
            self.state = State::Idle;
            return Ok(None);
        }

        let s = raw.decode();
        defmt::trace!("ecg: {:?}", s);

        self.state = State::Filter;
        let filtered = self.fir.filter(s.ch1);

        self.state = State::BufferInsert;
        self.ring.insert(filtered);
        self.samples = self.samples.wrapping_add(1);
        self.last_sample = Some(s);

        let sample = EcgSampleReport {
            seq: self.samples,
            ch1: s.ch1,
            ch2: s.ch2,
            filtered,
            lead_off: status.lead_off(),
        };

        let analysis = if self.samples % self.config.analyze_every.max(1) == 0 {
            self.state = State::Analyze;
            Some(self.analyze(dropped))
        } else {
            None
        };

        self.state = State::Idle;

        Ok(Some(Pass { sample, analysis }))
    }

    fn analyze(&mut self, dropped: u32) -> EcgAnalysisReport {
        self.ring.snapshot_ordered(self.analyzer.input_mut());
        let r = self.analyzer.analyze(self.config.start_bin);

        let peak_to_peak = self.ring.window_peak_to_peak();
        self.analyses = self.analyses.wrapping_add(1);

        let report = EcgAnalysisReport {
            seq: self.analyses,
            peak_bin: r.peak_bin as u16,
            peak_hz: r.peak_frequency(self.config.sample_rate_hz),
            peak_magnitude: r.peak_magnitude,
            peak_to_peak,
            vpp: peak_to_peak as f32 * frame::VREF / frame::FULL_SCALE,
            dropped,
            rejected: self.rejected,
        };

        defmt::debug!(
            "ecg: analysis {}: peak {} Hz, {} V pp",
            report.seq,
            report.peak_hz,
            report.vpp
        );

        self.last_analysis = Some(report);
        report
    }

    /// Process data-ready events forever, handing every completed pass to `sink`.
    pub fn run(
        &mut self,
        ready: &DataReady,
        delay: &mut impl Delay,
        mut sink: impl FnMut(&Pass),
    ) -> ! {
        defmt::info!("ecg: entering main loop");

        loop {
            match self.pass(ready, delay) {
                Ok(Some(p)) => sink(&p),
                Ok(None) => {}
                Err(e) => defmt::error!("ecg: failed to read frame: {:?}", e),
            }

            delay.delay_ms(1u16);
        }
    }

    /// Draw the buffered trace, the last spectrum and the last readings.
    pub fn render<D: Display>(&self, d: &mut D) -> Result<(), D::Error> {
        d.fill_rect(TRACE_AREA, color::BLACK)?;
        d.fill_rect(SPECTRUM_AREA, color::BLACK)?;

        let (lo, hi) = self.ring.window_extrema();
        plot::trace(
            d,
            TRACE_AREA,
            N,
            self.ring.iter_ordered().map(|s| s as f32),
            lo as f32,
            hi as f32,
            color::GREEN,
        )?;

        plot::spectrum(
            d,
            SPECTRUM_AREA,
            self.analyzer.magnitudes(),
            SPECTRUM_STRIDE,
            color::YELLOW,
        )?;

        if let Some(s) = self.last_sample {
            plot::readout(d, TRACE_AREA.x, TRACE_AREA.y - 40, "V: ", s.voltage, 3, color::WHITE)?;
        }

        if let Some(a) = self.last_analysis {
            plot::readout(d, TRACE_AREA.x, TRACE_AREA.y - 20, "f: ", a.peak_hz, 2, color::WHITE)?;
            plot::readout(d, TRACE_AREA.x + 120, TRACE_AREA.y - 20, "Vpp: ", a.vpp, 3, color::WHITE)?;
        }

        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn analyses(&self) -> u32 {
        self.analyses
    }

    pub fn ring(&self) -> &RingBuffer<N> {
        &self.ring
    }

    pub fn config(&self) -> &EcgConfig {
        &self.config
    }

    pub fn frontend(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn last_analysis(&self) -> Option<&EcgAnalysisReport> {
        self.last_analysis.as_ref()
    }
}
