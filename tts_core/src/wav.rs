use std::io::Cursor;
use std::path::Path;

/// Sample rate of the PCM returned by the remote engine.
pub const REMOTE_SAMPLE_RATE: u32 = 24_000;

fn mono16(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Wrap little-endian 16-bit mono PCM in a RIFF/WAV container.
///
/// A trailing odd byte (half a sample) is dropped.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + pcm.len()));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, mono16(sample_rate))?;
        for frame in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([frame[0], frame[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Write f32 samples to `path` as a 16-bit WAV file, clamping to `[-1.0, 1.0]`.
pub fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let mut writer = hound::WavWriter::create(path, mono16(sample_rate))?;
    for &s in samples {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()
}
