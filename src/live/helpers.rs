//! Helper functions for the live session module

use base64::Engine;

/// Generate a random WebSocket key
pub(super) fn generate_ws_key() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut key = [0u8; 16];
    rng.fill(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}

/// Encode PCM16 samples as little-endian base64 for `input_audio_buffer.append`
pub(super) fn encode_pcm16(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|&s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_key_is_16_bytes() {
        let key = generate_ws_key();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(key)
            .unwrap();
        assert_eq!(decoded.len(), 16);
    }

    #[test]
    fn test_encode_pcm16_little_endian() {
        let encoded = encode_pcm16(&[1, -2]);
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(decoded, vec![0x01, 0x00, 0xFE, 0xFF]);
    }
}
