//! PNG pHYs chunk construction and extraction
//!
//! Embeds a physical pixel density into a PNG byte buffer without touching
//! the decoded pixel content. The pHYs chunk is spliced in directly after the
//! IHDR chunk, which sits at a fixed offset for every conforming PNG.

use super::crc::crc32;
use super::{dpi_to_pixels_per_meter, pixels_per_meter_to_dpi};
use crate::error::{PixeliftError, Result};

/// Canonical 8-byte PNG signature
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Offset of the first byte after IHDR: signature (8) + length (4) +
/// type (4) + IHDR payload (13) + CRC (4)
const AFTER_IHDR_OFFSET: usize = 33;

/// pHYs unit specifier for meters
const UNIT_METERS: u8 = 1;

/// Build the 21-byte pHYs chunk for the given pixels-per-meter value
fn build_phys_chunk(pixels_per_meter: u32) -> [u8; 21] {
    let mut chunk = [0u8; 21];
    chunk[0..4].copy_from_slice(&9u32.to_be_bytes());
    chunk[4..8].copy_from_slice(b"pHYs");
    chunk[8..12].copy_from_slice(&pixels_per_meter.to_be_bytes());
    chunk[12..16].copy_from_slice(&pixels_per_meter.to_be_bytes());
    chunk[16] = UNIT_METERS;
    // CRC covers the chunk type and payload, not the length field
    let crc = crc32(&chunk[4..17]);
    chunk[17..21].copy_from_slice(&crc.to_be_bytes());
    chunk
}

/// Locate an existing pHYs chunk, returning the offset of its length field
fn find_phys_chunk(data: &[u8]) -> Option<usize> {
    let mut offset = 8usize;
    while offset + 8 <= data.len() {
        let length = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;
        let chunk_type = &data[offset + 4..offset + 8];
        if chunk_type == b"IEND" {
            return None;
        }
        if chunk_type == b"pHYs" {
            return Some(offset);
        }
        // length + type + payload + CRC
        offset += 12 + length;
    }
    None
}

/// Splice a pHYs chunk carrying the given DPI into a PNG buffer
///
/// An existing pHYs chunk is replaced in place so repeated tagging never
/// duplicates it; otherwise the chunk is inserted immediately after IHDR so
/// it precedes IDAT as the PNG specification requires. The pixel data is
/// untouched.
///
/// # Errors
///
/// Returns [`PixeliftError::InvalidFormat`] when the buffer does not start
/// with the PNG signature.
pub fn write_png_dpi(data: &[u8], dpi: u32) -> Result<Vec<u8>> {
    if data.len() < AFTER_IHDR_OFFSET || data[0..8] != PNG_SIGNATURE {
        return Err(PixeliftError::invalid_format(
            "buffer does not start with a PNG signature",
        ));
    }

    let chunk = build_phys_chunk(dpi_to_pixels_per_meter(dpi));

    let (splice_at, replaced_len) = match find_phys_chunk(data) {
        Some(offset) => {
            let declared = u32::from_be_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]) as usize;
            (offset, 12 + declared)
        },
        None => (AFTER_IHDR_OFFSET, 0),
    };

    let mut out = Vec::with_capacity(data.len() + chunk.len());
    out.extend_from_slice(&data[..splice_at]);
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&data[splice_at + replaced_len..]);

    log::debug!(
        "embedded pHYs chunk: {} dpi ({} px/m)",
        dpi,
        dpi_to_pixels_per_meter(dpi)
    );
    Ok(out)
}

/// Read the DPI encoded in a PNG buffer's pHYs chunk, if any
///
/// Walks the chunk list from the first chunk after the signature, skipping
/// each chunk by its declared length. Returns `None` when no pHYs chunk with
/// a meter unit is present; a missing chunk is not an error.
///
/// # Errors
///
/// Returns [`PixeliftError::InvalidFormat`] when the buffer does not start
/// with the PNG signature.
pub fn read_png_dpi(data: &[u8]) -> Result<Option<u32>> {
    if data.len() < 8 || data[0..8] != PNG_SIGNATURE {
        return Err(PixeliftError::invalid_format(
            "buffer does not start with a PNG signature",
        ));
    }

    let mut offset = 8usize;
    while offset + 8 <= data.len() {
        let length = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;
        let chunk_type = &data[offset + 4..offset + 8];

        if chunk_type == b"IEND" {
            break;
        }

        if chunk_type == b"pHYs" && offset + 8 + 9 <= data.len() {
            let ppm_x = u32::from_be_bytes([
                data[offset + 8],
                data[offset + 9],
                data[offset + 10],
                data[offset + 11],
            ]);
            let unit = data[offset + 16];
            if unit == UNIT_METERS {
                return Ok(Some(pixels_per_meter_to_dpi(ppm_x)));
            }
        }

        // length + type + payload + CRC
        offset += 12 + length;
    }

    Ok(None)
}
