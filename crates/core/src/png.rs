//! PNG screenshot encoder for the packed framebuffer.
//!
//! Emits 8-bit-per-channel RGB PNGs straight from the synthesizer's
//! `0x00RRGGBB` pixel buffer. The IDAT payload is zlib-compressed with
//! `miniz_oxide`; at 640×480 a raw screenshot would be close to a megabyte.

/// Encode a packed `0x00RRGGBB` pixel buffer as a PNG image.
///
/// `pixels` must hold `width * height` entries in row-major order.
pub fn encode_png(width: u32, height: u32, pixels: &[u32]) -> Vec<u8> {
    // Filtered scanlines: one filter byte (0 = None) then RGB triplets.
    let row_bytes = width as usize * 3 + 1;
    let mut raw = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        raw.push(0);
        for x in 0..width as usize {
            let px = pixels[y * width as usize + x];
            raw.push((px >> 16) as u8);
            raw.push((px >> 8) as u8);
            raw.push(px as u8);
        }
    }
    let idat = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);

    let mut png = Vec::with_capacity(idat.len() + 64);
    png.extend_from_slice(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(2); // color type: RGB
    ihdr.push(0); // compression
    ihdr.push(0); // filter
    ihdr.push(0); // interlace
    write_chunk(&mut png, b"IHDR", &ihdr);
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    png
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    let crc = crc32(chunk_type, data);
    out.extend_from_slice(&crc.to_be_bytes());
}

// CRC-32 over chunk type + data (PNG/zlib polynomial)
fn crc32(chunk_type: &[u8], data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFFFFFF;
    for &b in chunk_type.iter().chain(data.iter()) {
        crc ^= b as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
        }
    }
    crc ^ 0xFFFFFFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_and_ihdr() {
        let png = encode_png(2, 1, &[0xFF0000, 0x0000FF]);
        assert_eq!(&png[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        // First chunk: length 13, type IHDR
        assert_eq!(&png[8..12], &13u32.to_be_bytes());
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(&png[16..20], &2u32.to_be_bytes()); // width
        assert_eq!(&png[20..24], &1u32.to_be_bytes()); // height
        assert_eq!(png[24], 8); // bit depth
        assert_eq!(png[25], 2); // RGB
    }

    #[test]
    fn test_ends_with_iend() {
        let png = encode_png(4, 4, &[0u32; 16]);
        let tail = &png[png.len() - 12..];
        assert_eq!(&tail[0..4], &0u32.to_be_bytes());
        assert_eq!(&tail[4..8], b"IEND");
    }

    #[test]
    fn test_idat_roundtrips_through_inflate() {
        let pixels = [0x112233u32, 0x445566, 0x778899, 0xAABBCC];
        let png = encode_png(2, 2, &pixels);
        // Locate the IDAT chunk and decompress its payload.
        let idat_pos = png.windows(4).position(|w| w == b"IDAT").unwrap();
        let len = u32::from_be_bytes(png[idat_pos - 4..idat_pos].try_into().unwrap()) as usize;
        let payload = &png[idat_pos + 4..idat_pos + 4 + len];
        let raw = miniz_oxide::inflate::decompress_to_vec_zlib(payload).unwrap();
        // Two rows: filter byte + 2 RGB triplets each
        assert_eq!(raw.len(), 2 * (1 + 6));
        assert_eq!(&raw[1..4], &[0x11, 0x22, 0x33]);
        assert_eq!(&raw[8..11], &[0x77, 0x88, 0x99]);
    }
}
