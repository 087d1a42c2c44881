use anyhow::{Context, Result};
use rodio::{buffer::SamplesBuffer, OutputStream, OutputStreamHandle, Sink};
use tracing::debug;

pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;

/// Plays synthesized voice samples. The output stream is opened lazily so
/// machines without an audio device can still run everything else.
#[derive(Default)]
pub struct VoicePlayer {
    output: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
}

impl VoicePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&OutputStreamHandle> {
        if self.output.is_none() {
            let output = OutputStream::try_default().context("failed to open audio output")?;
            self.output = Some(output);
        }
        self.output.as_ref().map(|(_, handle)| handle).context("audio output unavailable")
    }

    pub fn play_pcm(&mut self, samples: Vec<i16>) -> Result<()> {
        self.stop();
        debug!(samples = samples.len(), "playing voice sample");
        let sink = Sink::try_new(self.handle()?).context("failed to create audio sink")?;
        sink.append(SamplesBuffer::new(CHANNELS, SAMPLE_RATE, samples));
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().map(|sink| !sink.empty()).unwrap_or(false)
    }
}

/// Interprets raw bytes as little-endian 16-bit PCM. A trailing odd byte
/// is ignored.
pub fn pcm16le_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]])).collect()
}

pub fn duration_secs(sample_count: usize) -> f64 {
    sample_count as f64 / (SAMPLE_RATE as f64 * CHANNELS as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_pairs_become_samples() {
        let bytes = [0x00, 0x80, 0xff, 0x7f, 0x01, 0x00, 0x42];
        assert_eq!(pcm16le_to_samples(&bytes), vec![i16::MIN, i16::MAX, 1]);
        assert!(pcm16le_to_samples(&[]).is_empty());
    }

    #[test]
    fn duration_uses_mono_24khz() {
        assert_eq!(duration_secs(48_000), 2.0);
        assert!(!VoicePlayer::new().is_playing());
    }
}
