//! PCM16 WAV finalization for captured samples.

/// Encode mono f32 PCM samples into a 16-bit PCM WAV file.
///
/// Samples are clamped to [-1.0, 1.0] before conversion. The output is a
/// complete, self-describing WAV container ready for multipart upload.
pub fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * 2;

    let mut out = Vec::with_capacity(44 + samples.len() * 2);

    // RIFF header.
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk: PCM, mono, 16 bits per sample.
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // audio format: PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // channels: mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data chunk.
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header_layout() {
        let wav = encode_wav_pcm16(&[0.0; 4], 16000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(wav.len(), 44 + 8);
    }

    #[test]
    fn test_wav_sizes() {
        let wav = encode_wav_pcm16(&[0.0; 100], 16000);
        let riff_size = u32::from_le_bytes(wav[4..8].try_into().unwrap());
        let data_size = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_size, 200);
        assert_eq!(riff_size, 36 + 200);
    }

    #[test]
    fn test_wav_format_fields() {
        let wav = encode_wav_pcm16(&[0.0], 16000);
        let format = u16::from_le_bytes(wav[20..22].try_into().unwrap());
        let channels = u16::from_le_bytes(wav[22..24].try_into().unwrap());
        let rate = u32::from_le_bytes(wav[24..28].try_into().unwrap());
        let bits = u16::from_le_bytes(wav[34..36].try_into().unwrap());
        assert_eq!(format, 1); // PCM
        assert_eq!(channels, 1);
        assert_eq!(rate, 16000);
        assert_eq!(bits, 16);
    }

    #[test]
    fn test_sample_conversion_and_clamping() {
        let wav = encode_wav_pcm16(&[1.0, -1.0, 0.0, 2.0], 16000);
        let s0 = i16::from_le_bytes(wav[44..46].try_into().unwrap());
        let s1 = i16::from_le_bytes(wav[46..48].try_into().unwrap());
        let s2 = i16::from_le_bytes(wav[48..50].try_into().unwrap());
        let s3 = i16::from_le_bytes(wav[50..52].try_into().unwrap());
        assert_eq!(s0, i16::MAX);
        assert_eq!(s1, -i16::MAX);
        assert_eq!(s2, 0);
        // Out-of-range input is clamped, not wrapped.
        assert_eq!(s3, i16::MAX);
    }

    #[test]
    fn test_empty_input_is_header_only() {
        let wav = encode_wav_pcm16(&[], 16000);
        assert_eq!(wav.len(), 44);
        let data_size = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_size, 0);
    }
}
