//! Magnitude spectrum of a block of real samples, and the peak search on it.
//!
//! The forward transform is `microfft`'s in-place real FFT. Its output packs the real-valued
//! Nyquist term into the imaginary part of bin 0, so bin 0 only takes the real (DC) part.

use num_complex::Complex32;

/// Marker selecting the `microfft` real transform of a given length.
pub struct Fft;

pub trait RealFft<const N: usize> {
    /// Transform `input` in place, returning the `N / 2` complex bins.
    fn rfft(input: &mut [f32; N]) -> &mut [Complex32];
}

macro_rules! real_fft {
    ($($n:literal => $f:ident),*) => {
        $(
            impl RealFft<$n> for Fft {
                fn rfft(input: &mut [f32; $n]) -> &mut [Complex32] {
                    microfft::real::$f(input)
                }
            }
        )*
    };
}

real_fft!(
    64 => rfft_64,
    128 => rfft_128,
    256 => rfft_256,
    512 => rfft_512,
    1024 => rfft_1024,
    2048 => rfft_2048,
    4096 => rfft_4096
);

#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct Peak {
    pub bin: usize,
    pub magnitude: f32,
}

/// Result of one analysis, valid until the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumResult<'a> {
    /// `N / 2` magnitude bins.
    pub magnitudes: &'a [f32],
    pub peak_bin: usize,
    pub peak_magnitude: f32,
}

impl<'a> SpectrumResult<'a> {
    /// Transform length the result was computed with.
    pub fn transform_len(&self) -> usize {
        self.magnitudes.len() * 2
    }

    /// Frequency of the peak bin [Hz], `rate` being the effective sample rate of the input.
    pub fn peak_frequency(&self, rate: f32) -> f32 {
        frequency_of(self.peak_bin, rate, self.transform_len())
    }

    /// Divisor for scaling the magnitudes to a plot.
    pub fn display_scale(&self) -> f32 {
        display_scale(self.magnitudes.iter().fold(0.0, |m, v| v.max(m)))
    }
}

pub struct Analyzer<const N: usize> {
    input: [f32; N],

    /// Only the first `N / 2` entries are used. `[f32; N / 2]` can not be spelled for a generic
    /// `N` on stable, and a second length parameter would have to be threaded through every task.
    magnitudes: [f32; N],
}

impl<const N: usize> Analyzer<N>
where
    Fft: RealFft<N>,
{
    /// Number of usable bins.
    pub const BINS: usize = N / 2;

    pub const fn new() -> Analyzer<N> {
        Analyzer {
            input: [0.0; N],
            magnitudes: [0.0; N],
        }
    }

    /// The samples to transform. Destroyed by [`Analyzer::analyze`].
    pub fn input_mut(&mut self) -> &mut [f32; N] {
        &mut self.input
    }

    /// Fill the input from `samples`, oldest first. Missing samples are zero.
    pub fn load(&mut self, samples: impl Iterator<Item = f32>) {
        self.input.fill(0.0);

        for (i, s) in self.input.iter_mut().zip(samples) {
            *i = s;
        }
    }

    /// Transform the input and search for the peak from `start_bin`. A `start_bin` past the
    /// last bin is clamped to the last bin.
    pub fn analyze(&mut self, start_bin: usize) -> SpectrumResult<'_> {
        let out = <Fft as RealFft<N>>::rfft(&mut self.input);
        magnitudes(out, &mut self.magnitudes[..Self::BINS]);

        let mags = &self.magnitudes[..Self::BINS];
        let start = start_bin.min(Self::BINS - 1);
        let peak = find_peak(mags, start).unwrap_or(Peak {
            bin: start,
            magnitude: mags[start],
        });

        defmt::trace!("spectrum: peak at bin {} ({})", peak.bin, peak.magnitude);

        SpectrumResult {
            magnitudes: mags,
            peak_bin: peak.bin,
            peak_magnitude: peak.magnitude,
        }
    }

    /// Magnitudes of the last analysis.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes[..Self::BINS]
    }
}

impl<const N: usize> Default for Analyzer<N>
where
    Fft: RealFft<N>,
{
    fn default() -> Self {
        Analyzer::new()
    }
}

/// Magnitudes of the packed real transform output.
pub fn magnitudes(out: &[Complex32], mags: &mut [f32]) {
    for (i, (c, m)) in out.iter().zip(mags.iter_mut()).enumerate() {
        *m = if i == 0 {
            libm::fabsf(c.re)
        } else {
            libm::sqrtf(c.re * c.re + c.im * c.im)
        };
    }
}

/// Largest magnitude in `mags[start_bin..]`, the first one on ties. `None` if the range is empty.
pub fn find_peak(mags: &[f32], start_bin: usize) -> Option<Peak> {
    let mut peak: Option<Peak> = None;

    for (bin, m) in mags.iter().enumerate().skip(start_bin) {
        match peak {
            Some(p) if !(*m > p.magnitude) => {}
            _ => {
                peak = Some(Peak {
                    bin,
                    magnitude: *m,
                })
            }
        }
    }

    peak
}

/// Centre frequency of `bin` [Hz] for a transform of length `n` over samples at `rate` [Hz].
pub fn frequency_of(bin: usize, rate: f32, n: usize) -> f32 {
    if n == 0 {
        return 0.0;
    }

    bin as f32 * rate / n as f32
}

/// Divisor to scale a spectrum with maximum magnitude `max` to unit height.
pub fn display_scale(max: f32) -> f32 {
    if max == 0.0 || !max.is_finite() {
        1.0
    } else {
        max
    }
}
