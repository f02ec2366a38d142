/// Largest absolute sample value
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |max, &sample| max.max(sample.abs()))
}

/// Scale samples so the peak sits at `target`; silence is left alone
pub fn normalize_samples(samples: &mut [f32], target: f32) {
    let max_abs = peak(samples);
    if max_abs > 0.0 {
        let gain = target / max_abs;
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }
}

/// Format a frequency value with appropriate unit suffix (Hz, kHz)
pub fn format_frequency(freq: f64) -> String {
    if freq >= 1000.0 {
        format!("{:.2} kHz", freq / 1000.0)
    } else {
        format!("{:.1} Hz", freq)
    }
}

/// Format a time value with appropriate unit suffix (ms, s)
pub fn format_time(time_in_seconds: f32) -> String {
    if time_in_seconds >= 1.0 {
        format!("{:.2} s", time_in_seconds)
    } else {
        format!("{:.0} ms", time_in_seconds * 1000.0)
    }
}

/// Calculate decibels from a linear amplitude value
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    // Avoid log of zero
    if amplitude <= 0.0 {
        -96.0
    } else {
        20.0 * amplitude.log10()
    }
}
