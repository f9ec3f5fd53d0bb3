use anyhow::{Context, Result, anyhow};
use hound::SampleFormat;
use log::debug;
use rubato::{Resampler, SincFixedIn, SincInterpolationType, WindowFunction};
use std::path::Path;

pub const WHISPER_SAMPLE_RATE: u32 = 16000;

pub struct DecodedAudio {
    /// Interleaved samples normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

/// Reads a WAV file and prepares it for inference: decode, downmix to mono,
/// resample to 16kHz.
pub fn load_mono_16khz(path: &Path) -> Result<Vec<f32>> {
    let decoded = read_wav(path)?;
    debug!(
        "Decoded {} samples, {}Hz, {} channels",
        decoded.samples.len(),
        decoded.sample_rate,
        decoded.channels
    );

    let mono = downmix_to_mono(&decoded.samples, decoded.channels);
    resample_to_16khz(mono, decoded.sample_rate)
}

pub fn read_wav(path: &Path) -> Result<DecodedAudio> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Int => {
            let max_amplitude = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_amplitude))
                .collect::<Result<Vec<f32>, _>>()
                .with_context(|| format!("Malformed WAV data in {}", path.display()))?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .with_context(|| format!("Malformed WAV data in {}", path.display()))?,
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels as usize,
    })
}

pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

pub fn resample_to_16khz(mono: Vec<f32>, sample_rate: u32) -> Result<Vec<f32>> {
    if sample_rate == WHISPER_SAMPLE_RATE {
        return Ok(mono);
    }

    let frames = mono.len();
    if frames == 0 {
        return Err(anyhow!("No audio frames to resample"));
    }

    debug!("Resampling {frames} frames from {sample_rate}Hz to {WHISPER_SAMPLE_RATE}Hz");

    let params = rubato::SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = WHISPER_SAMPLE_RATE as f64 / sample_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, 1)?;

    let mut output = resampler.process(&[mono], None)?;
    let resampled = output.remove(0);

    // The sinc filter delays its output; trim the leading delay and clamp
    // to the expected frame count.
    let delay = resampler.output_delay();
    let expected_frames = (frames as f64 * ratio) as usize;
    let end = (delay + expected_frames).min(resampled.len());

    Ok(resampled[delay..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_wav_i16(dir: &TempDir, name: &str, sample_rate: u32, frames: &[Vec<i16>]) -> PathBuf {
        let channels = frames.first().map(|f| f.len()).unwrap_or(1);
        let spec = hound::WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let path = dir.path().join(name);
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for frame in frames {
            for &sample in frame {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn reads_mono_i16_wav() {
        let tmp = TempDir::new().unwrap();
        let frames: Vec<Vec<i16>> = vec![vec![0], vec![i16::MAX], vec![i16::MIN / 2]];
        let path = write_wav_i16(&tmp, "mono.wav", 16000, &frames);

        let decoded = read_wav(&path).unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), 3);
        assert!(decoded.samples[0].abs() < 1e-6);
        assert!((decoded.samples[1] - 1.0).abs() < 1e-3);
        assert!((decoded.samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn reads_24_bit_wav() {
        let tmp = TempDir::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let path = tmp.path().join("deep.wav");
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &sample in &[0i32, 1 << 22, -(1 << 23)] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = read_wav(&path).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert!(decoded.samples[0].abs() < 1e-6);
        assert!((decoded.samples[1] - 0.5).abs() < 1e-3);
        assert!((decoded.samples[2] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn reads_float_wav() {
        let tmp = TempDir::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let path = tmp.path().join("float.wav");
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &sample in &[0.25f32, -0.75, 0.5] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = read_wav(&path).unwrap();
        assert_eq!(decoded.samples, vec![0.25, -0.75, 0.5]);
    }

    #[test]
    fn missing_file_surfaces_open_error() {
        let result = read_wav(Path::new("/nonexistent/audio.wav"));
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("Failed to open audio file"), "got: {err}");
    }

    #[test]
    fn downmix_averages_channels() {
        let interleaved = vec![0.5, -0.5, 1.0, 0.0];
        let mono = downmix_to_mono(&interleaved, 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn resample_is_identity_at_16khz() {
        let samples = vec![0.1f32; 16000];
        let out = resample_to_16khz(samples.clone(), 16000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn resample_doubles_8khz_input() {
        let sine: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin())
            .collect();
        let out = resample_to_16khz(sine, 8000).unwrap();

        // Allow slack for filter edges
        let expected = 16000usize;
        assert!(
            out.len() >= expected - 256 && out.len() <= expected,
            "unexpected length: {}",
            out.len()
        );
    }

    #[test]
    fn resample_rejects_empty_input() {
        assert!(resample_to_16khz(vec![], 44100).is_err());
    }
}
