use std::sync::atomic::Ordering;

impl super::Synth {
    /// Audio callback body: mix every active voice into `out`.
    ///
    /// `out` is zeroed first. Each voice contributes up to `out.len()` samples
    /// and advances by that many; exhausted voices leave the registry. A voice
    /// whose next chunk is corrupt is dropped without touching the mix.
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);

        let mut dropped = 0;
        {
            let mut voices = self.voices();
            voices.retain(|_, voice| {
                if !voice.mix_into(out) {
                    dropped += 1;
                    return false;
                }
                voice.is_active()
            });
        }

        if dropped > 0 {
            self.dropped_voices.fetch_add(dropped, Ordering::Relaxed);
        }
    }
}
