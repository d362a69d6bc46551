//! The bench path: a waveform is played on the DAC and the DMA-filled ADC buffer is analyzed on
//! a fixed period.

use embedded_hal::blocking::delay::DelayMs;

use crate::config;
use crate::display::{color, Display, Rect};
use crate::mode::ModeSelector;
use crate::plot;
use crate::spectrum::{Analyzer, Fft, RealFft};
use crate::telemetry::BenchReport;
use crate::waveform::{self, Mode};

/// Length of the DAC output table and of the ADC buffer.
pub const DAC_N: usize = 1024;

/// Transform length of the bench path: one ADC buffer after decimation.
pub const BENCH_N: usize = DAC_N / config::BENCH_DECIMATE;

/// Largest ADC code.
pub const ADC_MAX: u16 = 4095;

/// ADC reference voltage [V].
pub const ADC_VREF: f32 = 3.3;

pub const TRACE_AREA: Rect = Rect::new(0, 20, 300, 160);
pub const SPECTRUM_AREA: Rect = Rect::new(0, 300, 300, 120);
pub const SPECTRUM_STRIDE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchConfig {
    /// Rate the ADC buffer is filled at [Hz].
    pub adc_rate_hz: f32,

    /// Keep every this many ADC samples.
    pub decimate: usize,

    /// Periods of the waveform in the DAC table.
    pub wave_cycles: u32,

    pub period_ms: u16,

    /// First bin considered in the peak search.
    pub start_bin: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            adc_rate_hz: 10_000.,
            decimate: config::BENCH_DECIMATE,
            wave_cycles: config::BENCH_WAVE_CYCLES,
            period_ms: config::BENCH_PERIOD_MS,
            start_bin: 1,
        }
    }
}

impl BenchConfig {
    /// Sample rate after decimation [Hz].
    pub fn effective_rate(&self) -> f32 {
        self.adc_rate_hz / self.decimate.max(1) as f32
    }
}

/// The converter pair of the bench path.
pub trait Converters {
    /// The DMA-filled ADC buffer and the table played by the DAC.
    fn buffers(&mut self) -> (&[u16], &mut [u16]);
}

/// Peak-to-peak of ADC codes in volts.
pub fn peak_to_peak_volts(lo: u16, hi: u16) -> f32 {
    hi.saturating_sub(lo) as f32 * ADC_VREF / ADC_MAX as f32
}

pub struct BenchTask<const N: usize = BENCH_N> {
    config: BenchConfig,
    analyzer: Analyzer<N>,

    /// Decimated view of the ADC buffer from the last step.
    view: [u16; N],
    len: usize,

    seq: u32,
    mode: Mode,
    last: Option<BenchReport>,
}

impl<const N: usize> BenchTask<N>
where
    Fft: RealFft<N>,
{
    pub fn new(config: BenchConfig) -> BenchTask<N> {
        BenchTask {
            config,
            analyzer: Analyzer::new(),
            view: [0; N],
            len: 0,
            seq: 0,
            mode: Mode::default(),
            last: None,
        }
    }

    /// Regenerate the output table for `mode` and analyze the decimated input.
    pub fn step(&mut self, mode: Mode, adc: &[u16], dac: &mut [u16]) -> BenchReport {
        if mode != self.mode {
            defmt::info!("bench: switching to {:?}", mode);
            self.mode = mode;
        }

        waveform::regenerate(mode, self.config.wave_cycles, dac);

        self.view.fill(0);
        self.len = 0;
        for (v, s) in self
            .view
            .iter_mut()
            .zip(adc.iter().step_by(self.config.decimate.max(1)))
        {
            *v = *s;
            self.len += 1;
        }

        let (lo, hi) = self.view[..self.len]
            .iter()
            .fold(None, |e: Option<(u16, u16)>, s| match e {
                None => Some((*s, *s)),
                Some((lo, hi)) => Some((lo.min(*s), hi.max(*s))),
            })
            .unwrap_or((0, 0));

        // Remove the offset, otherwise the step into the zero padding leaks over the signal.
        let mean = if self.len > 0 {
            self.view[..self.len].iter().map(|s| *s as f32).sum::<f32>() / self.len as f32
        } else {
            0.0
        };
        self.analyzer
            .load(self.view[..self.len].iter().map(|s| *s as f32 - mean));
        let r = self.analyzer.analyze(self.config.start_bin);

        self.seq = self.seq.wrapping_add(1);
        let report = BenchReport {
            seq: self.seq,
            mode,
            peak_bin: r.peak_bin as u16,
            peak_hz: r.peak_frequency(self.config.effective_rate()),
            vpp: peak_to_peak_volts(lo, hi),
        };

        defmt::debug!(
            "bench: {:?}: peak {} Hz, {} V pp over {} samples",
            mode,
            report.peak_hz,
            report.vpp,
            self.len
        );

        self.last = Some(report);
        report
    }

    /// One period: read the mode and step on the converter buffers.
    pub fn tick(&mut self, modes: &ModeSelector, conv: &mut impl Converters) -> BenchReport {
        let mode = modes.load();
        let (adc, dac) = conv.buffers();
        self.step(mode, adc, dac)
    }

    /// Step forever on the configured period, handing every report to `sink`.
    pub fn run(
        &mut self,
        modes: &ModeSelector,
        conv: &mut impl Converters,
        delay: &mut impl DelayMs<u16>,
        mut sink: impl FnMut(&BenchReport),
    ) -> ! {
        defmt::info!("bench: entering main loop, period: {} ms", self.config.period_ms);

        loop {
            let r = self.tick(modes, conv);
            sink(&r);

            delay.delay_ms(self.config.period_ms);
        }
    }

    /// Draw the decimated input, its spectrum and the last readings.
    pub fn render<D: Display>(&self, d: &mut D) -> Result<(), D::Error> {
        d.fill_rect(TRACE_AREA, color::BLACK)?;
        d.fill_rect(SPECTRUM_AREA, color::BLACK)?;

        plot::trace(
            d,
            TRACE_AREA,
            self.len,
            self.view[..self.len].iter().map(|s| *s as f32),
            0.,
            ADC_MAX as f32,
            color::CYAN,
        )?;

        plot::spectrum(
            d,
            SPECTRUM_AREA,
            self.analyzer.magnitudes(),
            SPECTRUM_STRIDE,
            color::YELLOW,
        )?;

        if let Some(r) = self.last {
            let y = TRACE_AREA.bottom() + 10;
            d.draw_text(TRACE_AREA.x, y, r.mode.name(), color::WHITE)?;
            plot::readout(d, TRACE_AREA.x, y + 20, "f: ", r.peak_hz, 1, color::WHITE)?;
            plot::readout(d, TRACE_AREA.x + 120, y + 20, "Vpp: ", r.vpp, 2, color::WHITE)?;
        }

        Ok(())
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// The decimated samples of the last step.
    pub fn view(&self) -> &[u16] {
        &self.view[..self.len]
    }

    pub fn last(&self) -> Option<&BenchReport> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::Canvas;
    use approx::assert_abs_diff_eq;

    /// DAC output wired straight to the ADC input.
    struct Loopback {
        adc: [u16; DAC_N],
        dac: [u16; DAC_N],
    }

    impl Loopback {
        fn new() -> Loopback {
            Loopback {
                adc: [0; DAC_N],
                dac: [0; DAC_N],
            }
        }

        /// Let the ADC sample what the DAC played.
        fn settle(&mut self) {
            self.adc = self.dac;
        }
    }

    impl Converters for Loopback {
        fn buffers(&mut self) -> (&[u16], &mut [u16]) {
            (&self.adc[..], &mut self.dac[..])
        }
    }

    fn config() -> BenchConfig {
        BenchConfig {
            adc_rate_hz: 10_000.,
            decimate: 4,
            wave_cycles: 40,
            period_ms: 500,
            start_bin: 1,
        }
    }

    #[test]
    fn sine_loopback() {
        let modes = ModeSelector::new(Mode::Sine);
        let mut conv = Loopback::new();
        let mut task = BenchTask::<256>::new(config());

        task.tick(&modes, &mut conv);
        conv.settle();
        let r = task.tick(&modes, &mut conv);

        assert_eq!(r.mode, Mode::Sine);
        assert_eq!(task.view().len(), 256);

        // 40 periods in the 1024 samples, 256 kept.
        assert_eq!(r.peak_bin, 40);
        assert_abs_diff_eq!(r.peak_hz, 40. * 10_000. / 1024., epsilon = 1e-2);
        assert_abs_diff_eq!(r.vpp, 4094. * 3.3 / 4095., epsilon = 1e-3);
        assert_eq!(r.seq, 2);
    }

    #[test]
    fn default_configuration() {
        let modes = ModeSelector::new(Mode::Sine);
        let mut conv = Loopback::new();
        let mut task = BenchTask::<BENCH_N>::new(BenchConfig::default());
        let c = *task.config();

        task.tick(&modes, &mut conv);
        conv.settle();
        let r = task.tick(&modes, &mut conv);

        // The decimated buffer fills the transform, so every table period is one bin.
        assert_eq!(task.view().len(), BENCH_N);
        assert_eq!(r.peak_bin as u32, c.wave_cycles);
        assert_abs_diff_eq!(
            r.peak_hz,
            c.wave_cycles as f32 * c.adc_rate_hz / DAC_N as f32,
            epsilon = 1e-2
        );
    }

    #[test]
    fn zero_padded_transform() {
        let mut conv = Loopback::new();
        let mut task = BenchTask::<1024>::new(config());

        for mode in [Mode::Sine, Mode::Square, Mode::Triangle] {
            let modes = ModeSelector::new(mode);
            task.tick(&modes, &mut conv);
            conv.settle();
            let r = task.tick(&modes, &mut conv);

            assert_eq!(task.view().len(), 256);
            assert_eq!(r.peak_bin, 160, "{:?}", mode);
            assert_abs_diff_eq!(r.peak_hz, 40. * 10_000. / 1024., epsilon = 1e-2);
        }
    }

    #[test]
    fn follows_mode_selector() {
        let modes = ModeSelector::new(Mode::Sine);
        let mut conv = Loopback::new();
        let mut task = BenchTask::<256>::new(config());

        modes.store(Mode::Square);
        task.tick(&modes, &mut conv);
        assert!(conv.dac.iter().all(|v| *v == 0 || *v == waveform::DAC_MAX));

        conv.settle();
        let r = task.tick(&modes, &mut conv);
        assert_eq!(r.mode, Mode::Square);
        assert_eq!(r.peak_bin, 40);
        assert_abs_diff_eq!(r.vpp, 3.3, epsilon = 1e-4);
    }

    #[test]
    fn flat_input() {
        let mut task = BenchTask::<64>::new(config());
        let adc = [2048u16; 256];
        let mut dac = [0u16; 128];

        let r = task.step(Mode::Triangle, &adc, &mut dac);
        assert_eq!(r.vpp, 0.0);
        assert!(r.peak_hz.is_finite());
        assert_eq!(dac[0], 0);
    }

    #[test]
    fn short_adc_buffer() {
        let mut task = BenchTask::<64>::new(BenchConfig {
            decimate: 0,
            ..config()
        });
        let adc = [0u16, 4095, 0, 4095, 0];
        let mut dac = [0u16; 16];

        let r = task.step(Mode::Sine, &adc, &mut dac);
        assert_eq!(task.view(), [0, 4095, 0, 4095, 0]);
        assert_abs_diff_eq!(r.vpp, 3.3, epsilon = 1e-4);
        assert_eq!(task.config().effective_rate(), 10_000.);

        let r = task.step(Mode::Sine, &[], &mut dac);
        assert_eq!(r.vpp, 0.0);
        assert!(task.view().is_empty());
    }

    #[test]
    fn renders_readings() {
        let modes = ModeSelector::new(Mode::Triangle);
        let mut conv = Loopback::new();
        let mut task = BenchTask::<256>::new(config());

        let mut c = Canvas::default();
        task.render(&mut c).unwrap();
        assert_eq!(c.texts().count(), 0);

        task.tick(&modes, &mut conv);
        conv.settle();
        task.tick(&modes, &mut conv);

        let mut c = Canvas::default();
        task.render(&mut c).unwrap();

        assert!(c.texts().any(|t| t == "triangle"));
        assert_eq!(c.numbers().count(), 2);
        // 255 trace segments and 26 spectrum bars (128 bins, every 5th).
        assert_eq!(c.lines().count(), 255 + 26);
    }

    #[test]
    fn volts() {
        assert_abs_diff_eq!(peak_to_peak_volts(0, ADC_MAX), 3.3, epsilon = 1e-6);
        assert_eq!(peak_to_peak_volts(100, 50), 0.0);
    }
}
