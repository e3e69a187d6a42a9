//! Minimal WBMP (Wireless Bitmap, type 0) codec.
//!
//! The `image` crate ships no WBMP support, so reading and writing is done
//! here. Type 0 is the only level defined by the WAP specification: a
//! two-byte header (type 0, fix-header 0), width and height as uintvar
//! values, then one bit per pixel, rows padded to a byte boundary, MSB
//! first, 1 = white.

use std::io::{self, Read, Write};

use image::GrayImage;

/// Pixels at or above this luminance become white bits. Midpoint of the
/// 8-bit range; recorded as an open design parameter in DESIGN.md.
pub const BINARY_THRESHOLD: u8 = 128;

/// Encode a strictly binary raster (every pixel 0 or 255).
///
/// Fails with `InvalidInput` when a pixel is neither pure black nor pure
/// white, so the caller can fall back to [`encode_gray`].
pub fn encode_binary<W: Write>(writer: &mut W, img: &GrayImage) -> io::Result<()> {
    for pixel in img.pixels() {
        if pixel[0] != 0 && pixel[0] != 255 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("non-binary pixel value {} in WBMP input", pixel[0]),
            ));
        }
    }
    encode_gray(writer, img)
}

/// Encode any grayscale raster, thresholding at [`BINARY_THRESHOLD`].
pub fn encode_gray<W: Write>(writer: &mut W, img: &GrayImage) -> io::Result<()> {
    let (width, height) = img.dimensions();

    writer.write_all(&[0x00, 0x00])?;
    write_uintvar(writer, width)?;
    write_uintvar(writer, height)?;

    let row_bytes = width.div_ceil(8) as usize;
    let mut row = vec![0u8; row_bytes];
    for y in 0..height {
        row.fill(0);
        for x in 0..width {
            if img.get_pixel(x, y)[0] >= BINARY_THRESHOLD {
                row[(x / 8) as usize] |= 0x80 >> (x % 8);
            }
        }
        writer.write_all(&row)?;
    }
    Ok(())
}

/// Decode a type-0 WBMP stream into an 8-bit grayscale raster
/// (0 for black bits, 255 for white bits).
pub fn decode<R: Read>(reader: &mut R) -> io::Result<GrayImage> {
    let mut header = [0u8; 2];
    reader.read_exact(&mut header)?;
    if header != [0x00, 0x00] {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a type-0 WBMP stream",
        ));
    }

    let width = read_uintvar(reader)?;
    let height = read_uintvar(reader)?;
    if width == 0 || height == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid WBMP dimensions {width}x{height}"),
        ));
    }

    let row_bytes = width.div_ceil(8) as usize;
    let mut img = GrayImage::new(width, height);
    let mut row = vec![0u8; row_bytes];
    for y in 0..height {
        reader.read_exact(&mut row)?;
        for x in 0..width {
            let bit = row[(x / 8) as usize] & (0x80 >> (x % 8));
            img.put_pixel(x, y, image::Luma([if bit != 0 { 255 } else { 0 }]));
        }
    }
    Ok(img)
}

/// Cheap content sniff for the decode path: type byte 0, fix header 0,
/// and a uintvar sequence that parses to non-zero dimensions.
pub fn sniff(bytes: &[u8]) -> bool {
    if bytes.len() < 4 || bytes[0] != 0x00 || bytes[1] != 0x00 {
        return false;
    }
    let mut cursor = io::Cursor::new(&bytes[2..]);
    matches!(
        (read_uintvar(&mut cursor), read_uintvar(&mut cursor)),
        (Ok(w), Ok(h)) if w > 0 && h > 0
    )
}

fn write_uintvar<W: Write>(writer: &mut W, mut value: u32) -> io::Result<()> {
    let mut bytes = [0u8; 5];
    let mut n = 0;
    loop {
        bytes[n] = (value & 0x7f) as u8;
        value >>= 7;
        n += 1;
        if value == 0 {
            break;
        }
    }
    // Continuation bit on all but the last septet, emitted most significant first.
    for i in (0..n).rev() {
        let mut byte = bytes[i];
        if i > 0 {
            byte |= 0x80;
        }
        writer.write_all(&[byte])?;
    }
    Ok(())
}

fn read_uintvar<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut value: u32 = 0;
    for _ in 0..5 {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        value = (value << 7) | u32::from(byte[0] & 0x7f);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "uintvar longer than 5 bytes",
    ))
}
