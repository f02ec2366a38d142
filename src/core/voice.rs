use crate::core::oscillator::ramp_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Sounding,
    Releasing,
}

/// Linear fade to silence over the last `len` samples starting at `start`
#[derive(Debug, Clone, Copy)]
struct Release {
    start: usize,
    len: usize,
    from: f32,
}

impl Release {
    fn gain(&self, index: usize) -> f32 {
        ramp_value(self.from, 0.0, index - self.start, self.len)
    }
}

/// A rendered note held by the registry, consumed from the front by the mixer
#[derive(Debug, Clone)]
pub struct Voice {
    samples: Vec<f32>,
    cursor: usize,
    release: Option<Release>,
}

impl Voice {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            cursor: 0,
            release: None,
        }
    }

    pub fn state(&self) -> VoiceState {
        match self.release {
            Some(_) => VoiceState::Releasing,
            None => VoiceState::Sounding,
        }
    }

    fn gain(&self, index: usize) -> f32 {
        self.release.map_or(1.0, |r| r.gain(index))
    }

    /// Samples not yet handed to the mixer, with any release fade applied
    pub fn remaining_samples(&self) -> Vec<f32> {
        (self.cursor..self.samples.len())
            .map(|i| self.samples[i] * self.gain(i))
            .collect()
    }

    pub fn remaining_len(&self) -> usize {
        self.samples.len() - self.cursor
    }

    pub fn is_active(&self) -> bool {
        self.remaining_len() > 0
    }

    /// Cut the tail down to `fade_len` samples and fade it to silence.
    ///
    /// Constant time: the fade is applied as the mixer reads the tail. A
    /// second release fades from the gain the first one had reached.
    pub fn release(&mut self, fade_len: usize) {
        let keep = fade_len.min(self.remaining_len());
        let from = self.gain(self.cursor);
        self.samples.truncate(self.cursor + keep);
        self.release = Some(Release {
            start: self.cursor,
            len: keep,
            from,
        });
    }

    /// Add the next `out.len()` samples into `out` and advance past them.
    ///
    /// Returns false without mixing anything if the chunk holds non-finite samples.
    pub fn mix_into(&mut self, out: &mut [f32]) -> bool {
        let take = out.len().min(self.remaining_len());
        let chunk = &self.samples[self.cursor..self.cursor + take];
        if chunk.iter().any(|s| !s.is_finite()) {
            return false;
        }
        match self.release {
            None => {
                for (o, s) in out.iter_mut().zip(chunk) {
                    *o += *s;
                }
            }
            Some(release) => {
                for (k, (o, s)) in out.iter_mut().zip(chunk).enumerate() {
                    *o += *s * release.gain(self.cursor + k);
                }
            }
        }
        self.cursor = (self.cursor + out.len()).min(self.samples.len());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_advances_cursor() {
        let mut voice = Voice::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut out = [0.5; 2];
        assert!(voice.mix_into(&mut out));
        assert_eq!(out, [1.5, 2.5]);
        assert_eq!(voice.remaining_samples(), vec![3.0, 4.0, 5.0]);

        let mut out = [0.0; 4];
        assert!(voice.mix_into(&mut out));
        assert_eq!(out, [3.0, 4.0, 5.0, 0.0]);
        assert!(!voice.is_active());
    }

    #[test]
    fn test_release_truncates_and_ramps() {
        let mut voice = Voice::new(vec![1.0; 10]);
        let mut out = [0.0; 3];
        voice.mix_into(&mut out);
        voice.release(5);
        assert_eq!(voice.state(), VoiceState::Releasing);
        assert_eq!(voice.remaining_len(), 5);
        assert_eq!(voice.remaining_samples(), vec![1.0, 0.75, 0.5, 0.25, 0.0]);

        let mut out = [0.0; 6];
        voice.mix_into(&mut out);
        assert_eq!(out, [1.0, 0.75, 0.5, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_release_leaves_buffer_untouched() {
        let mut voice = Voice::new(vec![1.0; 1000]);
        voice.release(400);
        assert_eq!(voice.samples.len(), 400);
        assert!(voice.samples.iter().all(|s| *s == 1.0));
        assert_eq!(*voice.remaining_samples().last().unwrap(), 0.0);
    }

    #[test]
    fn test_second_release_continues_fade() {
        let mut voice = Voice::new(vec![1.0; 10]);
        voice.release(5);
        let mut out = [0.0; 2];
        voice.mix_into(&mut out);
        assert_eq!(out, [1.0, 0.75]);

        voice.release(5);
        assert_eq!(voice.remaining_samples(), vec![0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_release_longer_than_remaining() {
        let mut voice = Voice::new(vec![1.0; 4]);
        voice.release(100);
        assert_eq!(voice.remaining_len(), 4);
        assert_eq!(voice.remaining_samples()[3], 0.0);
    }

    #[test]
    fn test_corrupt_chunk_is_rejected() {
        let mut voice = Voice::new(vec![1.0, f32::NAN, 1.0]);
        let mut out = [0.0; 2];
        assert!(!voice.mix_into(&mut out));
        assert_eq!(out, [0.0, 0.0]);
    }
}
