//! base64url helpers for commit envelopes.
//!
//! Output is always unpadded. Input is accepted with or without padding since
//! clients disagree on which form a JWS segment should take.

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes bytes as unpadded base64url.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

/// Decodes a base64url string, padded or not.
pub fn decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_LENIENT.decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_accepts_padded_and_unpadded_input() {
        assert_eq!(decode("YQ").unwrap(), b"a");
        assert_eq!(decode("YQ==").unwrap(), b"a");
    }

    #[test]
    fn it_never_pads_output() {
        assert_eq!(encode(b"a"), "YQ");
    }

    #[test]
    fn it_uses_the_url_safe_alphabet() {
        assert_eq!(encode([0xfb, 0xff]), "-_8");
        assert!(decode("+/8").is_err());
    }
}
