/// Edge fade applied to every rendered note, in seconds
pub const EDGE_FADE_SECONDS: f64 = 0.005;

/// Number of samples in the edge fade at `sample_rate`
pub fn edge_fade_len(sample_rate: u32) -> usize {
    (EDGE_FADE_SECONDS * sample_rate as f64) as usize
}

/// Value `i` of an `n`-point linear ramp from `start` to `end`, endpoints included.
///
/// A single-point ramp yields `start`.
#[inline]
pub fn ramp_value(start: f32, end: f32, i: usize, n: usize) -> f32 {
    if n <= 1 {
        return start;
    }
    if i + 1 >= n {
        return end;
    }
    let step = (end - start) / (n - 1) as f32;
    start + step * i as f32
}

/// Exponential amplitude decay at time `t` seconds
#[inline]
pub fn decay_gain(decay: f32, t: f64) -> f64 {
    (-(decay as f64) * t).exp()
}

/// Fade the first and last `fade_len` samples in and out.
///
/// Buffers no longer than two fades are left untouched.
pub fn apply_edge_fades(samples: &mut [f32], fade_len: usize) {
    let len = samples.len();
    if fade_len == 0 || len <= 2 * fade_len {
        return;
    }
    for i in 0..fade_len {
        samples[i] *= ramp_value(0.0, 1.0, i, fade_len);
        samples[len - fade_len + i] *= ramp_value(1.0, 0.0, i, fade_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints() {
        assert_eq!(ramp_value(0.0, 1.0, 0, 5), 0.0);
        assert_eq!(ramp_value(0.0, 1.0, 4, 5), 1.0);
        assert_eq!(ramp_value(1.0, 0.0, 4, 5), 0.0);
        assert_eq!(ramp_value(1.0, 0.0, 0, 1), 1.0);
    }

    #[test]
    fn test_edge_fades() {
        let mut samples = vec![1.0; 10];
        apply_edge_fades(&mut samples, 3);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.5);
        assert_eq!(samples[2], 1.0);
        assert_eq!(samples[5], 1.0);
        assert_eq!(samples[7], 1.0);
        assert_eq!(samples[9], 0.0);
    }

    #[test]
    fn test_short_buffer_is_not_faded() {
        let mut samples = vec![1.0; 6];
        apply_edge_fades(&mut samples, 3);
        assert!(samples.iter().all(|s| *s == 1.0));

        let mut empty: Vec<f32> = Vec::new();
        apply_edge_fades(&mut empty, 3);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_fade_len() {
        assert_eq!(edge_fade_len(44100), 220);
        assert_eq!(edge_fade_len(48000), 240);
    }
}
