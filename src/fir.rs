use heapless::Deque;

pub const NTAP: usize = 33;

/// Q15 low-pass coefficients (Hamming window), sum is exactly 1.0 in Q15.
const COEFFS: [i16; NTAP] = include!("ecg.coeff");
pub const FREQ: f32 = 500.0;
pub const CUTOFF: f32 = 40.0;
const Q: u32 = 15;

/// A running FIR filter with pre-computed fixed-point coefficients.
pub struct FIR {
    samples: Deque<i16, NTAP>,
}

impl FIR {
    pub fn new() -> FIR {
        let mut samples = Deque::new();

        while let Ok(_) = samples.push_back(0) {}

        FIR { samples }
    }

    /// Update filter with new sample value, apply filter and output current filtered value.
    pub fn filter(&mut self, v: i16) -> i16 {
        self.put(v);
        self.value()
    }

    fn put(&mut self, v: i16) {
        self.samples.pop_front();
        self.samples.push_back(v).ok();
    }

    fn value(&self) -> i16 {
        // Convolute filter with samples.
        let acc = self
            .samples
            .iter()
            .zip(&COEFFS)
            .fold(0i64, |a, (s, c)| a + (*s as i64 * *c as i64));

        (acc >> Q).clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }
}

impl Default for FIR {
    fn default() -> Self {
        FIR::new()
    }
}
