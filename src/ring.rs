//! Fixed capacity circular sample store. The newest sample overwrites the oldest one.

/// Ring of the last `N` samples with running extrema.
///
/// The running extrema start at zero and are only ever widened by incoming samples, they are
/// not shrunk when an extreme sample is overwritten. Use [`RingBuffer::window_extrema`] for the
/// extrema of the samples currently held.
pub struct RingBuffer<const N: usize> {
    data: [i16; N],

    /// Next slot to be written, always in `[0, N)`.
    write_index: usize,

    running_min: i16,
    running_max: i16,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> RingBuffer<N> {
        RingBuffer {
            data: [0; N],
            write_index: 0,
            running_min: 0,
            running_max: 0,
        }
    }

    pub fn insert(&mut self, sample: i16) {
        self.data[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % N;

        if sample > self.running_max {
            self.running_max = sample;
        }

        if sample < self.running_min {
            self.running_min = sample;
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn running_min(&self) -> i16 {
        self.running_min
    }

    pub fn running_max(&self) -> i16 {
        self.running_max
    }

    /// Difference between the running extrema.
    pub fn running_peak_to_peak(&self) -> u16 {
        (self.running_max as i32 - self.running_min as i32) as u16
    }

    /// Minimum and maximum over the samples currently held.
    pub fn window_extrema(&self) -> (i16, i16) {
        self.data
            .iter()
            .fold((i16::MAX, i16::MIN), |(lo, hi), s| (lo.min(*s), hi.max(*s)))
    }

    pub fn window_peak_to_peak(&self) -> u16 {
        let (lo, hi) = self.window_extrema();
        (hi as i32 - lo as i32) as u16
    }

    /// Raw storage in slot order (not chronological).
    pub fn as_slice(&self) -> &[i16] {
        &self.data
    }

    /// Samples from oldest to newest.
    pub fn iter_ordered(&self) -> impl Iterator<Item = i16> + '_ {
        let (newer, older) = self.data.split_at(self.write_index);
        older.iter().chain(newer.iter()).copied()
    }

    /// Copy the contents into `out` so that index 0 is the oldest sample.
    pub fn snapshot_ordered(&self, out: &mut [f32; N]) {
        for (o, s) in out.iter_mut().zip(self.iter_ordered()) {
            *o = s as f32;
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        RingBuffer::new()
    }
}
