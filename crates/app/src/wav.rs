use std::path::Path;

use beatdrop_core::{AudioTrack, BeatDropError, Result};

/// Decodes a WAV file into a track holding its first channel.
pub fn read_track(path: &Path) -> Result<AudioTrack> {
    let mut reader = hound::WavReader::open(path).map_err(|err| wav_error(path, err))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| wav_error(path, err))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|err| wav_error(path, err))?
        }
    };

    tracing::debug!(
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "decoded wav"
    );

    AudioTrack::from_interleaved(&samples, spec.channels, spec.sample_rate)
}

fn wav_error(path: &Path, err: hound::Error) -> BeatDropError {
    BeatDropError::msg(format!("failed to decode `{}`: {err}", path.display()))
}
