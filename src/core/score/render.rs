use log::info;
use std::path::Path;

use super::Score;
use crate::core::oscillator::buffer_len;
use crate::core::synth::Synth;
use crate::error::Result;

/// Render a score without an audio device.
///
/// Steps are triggered on a virtual clock that advances by pulling blocks of
/// at most `frames` samples from the mixer, exactly as the audio callback
/// would. After the last step the release tails are drained to silence.
pub fn render_score(score: &Score, synth: &Synth, frames: usize) -> Vec<f32> {
    let frames = frames.max(1);
    let rate = synth.sample_rate();
    let mut output = Vec::with_capacity(buffer_len(score.total_duration().as_secs_f32(), rate));
    let mut block = vec![0.0f32; frames];

    for event in score.events() {
        for note in event.notes() {
            synth.play_note(*note);
        }

        let mut left = buffer_len(event.duration.as_secs_f32(), rate);
        while left > 0 {
            let n = left.min(frames);
            synth.render(&mut block[..n]);
            output.extend_from_slice(&block[..n]);
            left -= n;
        }

        for note in event.notes() {
            synth.stop_note(*note);
        }
    }

    while synth.voice_count() > 0 {
        synth.render(&mut block);
        output.extend_from_slice(&block);
    }

    output
}

/// Write mono 32-bit float samples to a WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    info!(
        "Wrote {} ({:.2} s)",
        path.display(),
        samples.len() as f64 / sample_rate as f64
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synth::params::ParamSnapshot;

    const RATE: u32 = 8000;

    fn synth() -> Synth {
        Synth::new(
            RATE,
            ParamSnapshot { amplitude: 0.5, decay: 0.5, duration: 1.0, release: 0.1 },
        )
    }

    #[test]
    fn test_render_timeline() {
        let score = Score::from_json(
            r#"[{"notes":["A4"],"duration":0.25},{"note":"rest","duration":0.25}]"#,
        )
        .unwrap();
        let synth = synth();
        let samples = render_score(&score, &synth, 256);

        // 0.5 s of steps; the release tail fits inside the rest
        assert_eq!(samples.len(), 4000);
        assert_eq!(synth.voice_count(), 0);
        assert!(samples[100..1900].iter().any(|s| s.abs() > 0.1));
        assert!(samples[2000 + 800..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_render_drains_tail() {
        let score = Score::from_json(r#"[{"note":"C4","duration":0.1}]"#).unwrap();
        let synth = synth();
        let samples = render_score(&score, &synth, 128);
        // 800 samples of note then an 800 sample release, padded to a block
        assert!(samples.len() >= 1600);
        assert!(samples.len() < 1600 + 128);
        assert_eq!(synth.voice_count(), 0);
    }

    #[test]
    fn test_write_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav(&path, &[0.0, 0.5, -0.5], RATE).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, RATE);
        assert_eq!(reader.spec().channels, 1);
        let read: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0.0, 0.5, -0.5]);
    }
}
