//! PKCS#7 padding

use crate::{CryptoError, CryptoResult};

/// Largest block size whose padding length fits in one byte
pub const MAX_PADDING_BLOCK_SIZE: usize = u8::MAX as usize;

fn check_block_size(block_size: usize) -> CryptoResult<()> {
    if (1..=MAX_PADDING_BLOCK_SIZE).contains(&block_size) {
        Ok(())
    } else {
        Err(CryptoError::InvalidLength)
    }
}

/// Pad `data` up to the next multiple of `block_size`.
///
/// Always appends at least one byte: input that is already block aligned
/// gets a full block of padding. `block_size` must be in `1..=255`.
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> CryptoResult<Vec<u8>> {
    check_block_size(block_size)?;

    let padding = block_size - data.len() % block_size;
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding, padding as u8);
    Ok(padded)
}

/// Strip PKCS#7 padding from `data`.
pub fn pkcs7_unpad(data: &[u8], block_size: usize) -> CryptoResult<&[u8]> {
    check_block_size(block_size)?;
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(CryptoError::InvalidLength);
    }

    let padding = data[data.len() - 1] as usize;
    if padding == 0 || padding > block_size {
        return Err(CryptoError::InvalidPadding);
    }

    // Inspect every padding byte so the failure position is not observable
    let mismatch = data[data.len() - padding..]
        .iter()
        .fold(0u8, |acc, &byte| acc | (byte ^ padding as u8));
    if mismatch != 0 {
        return Err(CryptoError::InvalidPadding);
    }

    Ok(&data[..data.len() - padding])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_unpad_roundtrip() {
        for block_size in [1, 8, 16, 255] {
            for len in 0..40 {
                let data: Vec<u8> = (0..len as u8).collect();
                let padded = pkcs7_pad(&data, block_size).unwrap();
                assert_eq!(padded.len() % block_size, 0);
                assert!(padded.len() > data.len());
                assert_eq!(pkcs7_unpad(&padded, block_size).unwrap(), &data[..]);
            }
        }
    }

    #[test]
    fn test_aligned_input_gets_full_block() {
        let padded = pkcs7_pad(&[1u8; 8], 8).unwrap();
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded[8..], &[8u8; 8]);
    }

    #[test]
    fn test_unpad_rejects_bad_lengths() {
        assert!(matches!(pkcs7_unpad(&[], 8), Err(CryptoError::InvalidLength)));
        assert!(matches!(
            pkcs7_unpad(&[1u8; 7], 8),
            Err(CryptoError::InvalidLength)
        ));
    }

    #[test]
    fn test_unpad_rejects_bad_padding() {
        // zero padding byte
        let mut block = [0u8; 8];
        assert!(matches!(
            pkcs7_unpad(&block, 8),
            Err(CryptoError::InvalidPadding)
        ));

        // claimed padding larger than the block
        block[7] = 9;
        assert!(matches!(
            pkcs7_unpad(&block, 8),
            Err(CryptoError::InvalidPadding)
        ));

        // inconsistent padding bytes
        let block = [0, 0, 0, 0, 0, 3, 2, 3];
        assert!(matches!(
            pkcs7_unpad(&block, 8),
            Err(CryptoError::InvalidPadding)
        ));
    }

    #[test]
    fn test_block_size_out_of_range_is_rejected() {
        for block_size in [0, MAX_PADDING_BLOCK_SIZE + 1] {
            assert!(matches!(
                pkcs7_pad(&[7u8; 256], block_size),
                Err(CryptoError::InvalidLength)
            ));
            assert!(matches!(
                pkcs7_unpad(&[1u8; 8], block_size),
                Err(CryptoError::InvalidLength)
            ));
        }
    }

    #[test]
    fn test_largest_block_size_roundtrip() {
        let data = [7u8; 255];
        let padded = pkcs7_pad(&data, MAX_PADDING_BLOCK_SIZE).unwrap();
        assert_eq!(padded.len(), 510);
        assert_eq!(padded[509], 255);
        assert_eq!(pkcs7_unpad(&padded, MAX_PADDING_BLOCK_SIZE).unwrap(), &data[..]);
    }
}
