//! JFIF APP0 segment construction for JPEG buffers
//!
//! Embeds a dots-per-inch density into a JPEG byte stream. An existing JFIF
//! segment is replaced so repeated tagging never accumulates segments; when
//! none exists, a fresh 18-byte segment is inserted directly after SOI.

use crate::error::{PixeliftError, Result};

/// Start-of-image marker
const SOI: [u8; 2] = [0xFF, 0xD8];

/// JFIF density unit: dots per inch
const UNIT_DPI: u8 = 1;

/// Length of the JFIF APP0 segment we emit (marker + length + payload)
const JFIF_SEGMENT_LEN: usize = 18;

/// Build the 18-byte JFIF APP0 segment for the given density
fn build_jfif_segment(dpi: u16) -> [u8; JFIF_SEGMENT_LEN] {
    let mut segment = [0u8; JFIF_SEGMENT_LEN];
    segment[0..2].copy_from_slice(&[0xFF, 0xE0]);
    segment[2..4].copy_from_slice(&16u16.to_be_bytes());
    segment[4..9].copy_from_slice(b"JFIF\0");
    segment[9] = 1; // version major
    segment[10] = 2; // version minor
    segment[11] = UNIT_DPI;
    segment[12..14].copy_from_slice(&dpi.to_be_bytes());
    segment[14..16].copy_from_slice(&dpi.to_be_bytes());
    // bytes 16..18 stay zero: no thumbnail
    segment
}

/// Whether this marker is a standalone marker without a length field
fn is_standalone(marker: u8) -> bool {
    // RST0-RST7, SOI, EOI, TEM
    (0xD0..=0xD9).contains(&marker) || marker == 0x01
}

/// Locate an existing JFIF APP0 segment, returning (offset, total length)
fn find_jfif_segment(data: &[u8]) -> Option<(usize, usize)> {
    let mut offset = 2usize;
    while offset + 4 <= data.len() {
        if data[offset] != 0xFF {
            // Lost marker alignment; stop scanning rather than guess
            return None;
        }
        let marker = data[offset + 1];

        // Entropy-coded data follows SOS; no segments after that point
        if marker == 0xDA {
            return None;
        }
        if is_standalone(marker) {
            offset += 2;
            continue;
        }

        let length = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
        if marker == 0xE0
            && offset + 9 <= data.len()
            && &data[offset + 4..offset + 9] == b"JFIF\0"
        {
            return Some((offset, 2 + length));
        }
        offset += 2 + length;
    }
    None
}

/// Embed a dots-per-inch density into a JPEG buffer
///
/// Replaces an existing JFIF APP0 segment in place, or inserts one directly
/// after the start-of-image marker. Re-invoking the writer on an already
/// tagged buffer updates the density without growing the segment count.
///
/// # Errors
///
/// Returns [`PixeliftError::InvalidFormat`] when the start-of-image marker is
/// absent.
pub fn write_jpeg_dpi(data: &[u8], dpi: u32) -> Result<Vec<u8>> {
    if data.len() < 2 || data[0..2] != SOI {
        return Err(PixeliftError::invalid_format(
            "buffer does not start with a JPEG SOI marker",
        ));
    }

    let density = u16::try_from(dpi)
        .map_err(|_| PixeliftError::invalid_config(format!("DPI {dpi} exceeds JFIF range")))?;
    let segment = build_jfif_segment(density);

    let (insert_at, remove_len) = match find_jfif_segment(data) {
        Some((offset, length)) => (offset, length),
        None => (2, 0),
    };

    let mut out = Vec::with_capacity(data.len() + segment.len() - remove_len);
    out.extend_from_slice(&data[..insert_at]);
    out.extend_from_slice(&segment);
    out.extend_from_slice(&data[insert_at + remove_len..]);

    log::debug!("embedded JFIF density segment: {density} dpi");
    Ok(out)
}
