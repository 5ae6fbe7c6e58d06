//! Raw PCM decoding for synthesized vocal guides.
//!
//! The speech endpoint returns signed 16-bit little-endian samples with no
//! container. Samples are normalized by 32768, so values land in [-1, 1).

use crate::error::ClientError;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use std::time::Duration;

pub const VOCAL_SAMPLE_RATE: u32 = 24_000;
pub const VOCAL_CHANNELS: u16 = 1;

const BYTES_PER_SAMPLE: usize = 2;

/// Decoded, de-interleaved audio ready for the output device.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Frame-major samples, the layout rodio sources expect.
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let mut out = Vec::with_capacity(frames * self.channels.len());
        for frame in 0..frames {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }
}

/// Reinterprets `bytes` as interleaved s16le and splits it per channel.
///
/// Yields `floor(len / (2 * channels))` frames; trailing bytes are dropped.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> PcmBuffer {
    let channel_count = channels as usize;
    if channel_count == 0 {
        return PcmBuffer { sample_rate, channels: Vec::new() };
    }

    let frames = bytes.len() / (BYTES_PER_SAMPLE * channel_count);
    let mut out = vec![Vec::with_capacity(frames); channel_count];
    let usable = frames * channel_count * BYTES_PER_SAMPLE;

    for (index, chunk) in bytes[..usable].chunks_exact(BYTES_PER_SAMPLE).enumerate() {
        let raw = i16::from_le_bytes([chunk[0], chunk[1]]);
        out[index % channel_count].push(raw as f32 / 32768.0);
    }

    PcmBuffer { sample_rate, channels: out }
}

pub fn decode_base64_pcm(
    payload: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<PcmBuffer, ClientError> {
    let bytes = B64.decode(payload.trim())?;
    Ok(decode_pcm16(&bytes, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_mono_samples_exactly() {
        let raw = [0i16, 16384, -16384, i16::MAX, i16::MIN];
        let buffer = decode_pcm16(&encode(&raw), VOCAL_SAMPLE_RATE, 1);
        assert_eq!(buffer.frames(), raw.len());
        assert_eq!(buffer.channel_count(), 1);
        let channel = &buffer.channels[0];
        for (decoded, source) in channel.iter().zip(raw.iter()) {
            assert_eq!(*decoded, *source as f32 / 32768.0);
        }
        assert_eq!(channel[4], -1.0);
        assert!(channel[3] < 1.0);
    }

    #[test]
    fn splits_interleaved_stereo() {
        let raw = [100i16, -100, 200, -200, 300, -300];
        let buffer = decode_pcm16(&encode(&raw), 48_000, 2);
        assert_eq!(buffer.frames(), 3);
        for i in 0..3 {
            assert_eq!(buffer.channels[0][i], raw[i * 2] as f32 / 32768.0);
            assert_eq!(buffer.channels[1][i], raw[i * 2 + 1] as f32 / 32768.0);
        }
        let interleaved = buffer.interleaved();
        let expected: Vec<f32> = raw.iter().map(|s| *s as f32 / 32768.0).collect();
        assert_eq!(interleaved, expected);
    }

    #[test]
    fn drops_trailing_partial_frame() {
        let mut bytes = encode(&[1, 2, 3, 4]);
        bytes.push(0x7f);
        let mono = decode_pcm16(&bytes, VOCAL_SAMPLE_RATE, 1);
        assert_eq!(mono.frames(), 4);

        // 9 bytes over two channels: floor(9 / 4) = 2 frames.
        let stereo = decode_pcm16(&bytes, VOCAL_SAMPLE_RATE, 2);
        assert_eq!(stereo.frames(), 2);
        assert_eq!(stereo.channels[1][1], 4.0 / 32768.0);

        let tiny = decode_pcm16(&[0x01], VOCAL_SAMPLE_RATE, 1);
        assert_eq!(tiny.frames(), 0);
    }

    #[test]
    fn zero_channels_yields_empty_buffer() {
        let buffer = decode_pcm16(&encode(&[1, 2]), VOCAL_SAMPLE_RATE, 0);
        assert_eq!(buffer.frames(), 0);
        assert!(buffer.interleaved().is_empty());
    }

    #[test]
    fn decodes_base64_payload_and_reports_duration() {
        let raw = vec![0i16; VOCAL_SAMPLE_RATE as usize / 2];
        let payload = B64.encode(encode(&raw));
        let buffer = decode_base64_pcm(&payload, VOCAL_SAMPLE_RATE, VOCAL_CHANNELS).unwrap();
        assert_eq!(buffer.frames(), raw.len());
        assert_eq!(buffer.duration(), Duration::from_millis(500));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_base64_pcm("not base64!!", VOCAL_SAMPLE_RATE, 1).unwrap_err();
        assert!(matches!(err, ClientError::InvalidAudio(_)));
    }
}
