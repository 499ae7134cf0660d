//! 16-bit PCM WAV encoding and tolerant decoding.

use std::io::Cursor;

use crate::error::{Result, TtsError};
use crate::model::AudioBuffer;

const I16_MAX_F32: f32 = i16::MAX as f32;

/// Encode mono f32 samples as a 16-bit PCM WAV (RIFF) file in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    if sample_rate == 0 {
        return Err(TtsError::Encoding("sample rate must be positive".to_string()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    // WAV header (44 bytes) + 2 bytes per sample
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| TtsError::Encoding(e.to_string()))?;
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * I16_MAX_F32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| TtsError::Encoding(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| TtsError::Encoding(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

pub fn encode_buffer(audio: &AudioBuffer) -> Result<Vec<u8>> {
    encode_wav(&audio.samples, audio.sample_rate)
}

/// Decode any integer or float WAV into a mono buffer, averaging channels.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| TtsError::Encoding(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| TtsError::Encoding(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| TtsError::Encoding(e.to_string()))?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(AudioBuffer {
        samples,
        sample_rate: spec.sample_rate,
    })
}
