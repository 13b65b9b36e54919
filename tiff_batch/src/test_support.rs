//! Fixtures shared by the unit tests of this crate.

use crate::codec::{Compression, Page, PixelBuffer, PixelLayout, Samples, TiffCodec, WriteSeek};
use crate::errors::CodecError;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};

/// (width, height, interleaved RGB8 samples) of a smooth gradient.
pub fn gradient_rgb8(width: u32, height: u32) -> (u32, u32, Vec<u8>) {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push((x * 4 % 256) as u8);
            data.push((y * 4 % 256) as u8);
            data.push(((x + y) % 256) as u8);
        }
    }
    (width, height, data)
}

/// Encodes RGB8 pages without compression, one IFD per page.
pub fn uncompressed_tiff(pages: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out).unwrap();
        for (w, h, data) in pages {
            encoder
                .write_image::<colortype::RGB8>(*w, *h, data)
                .unwrap();
        }
    }
    out.into_inner()
}

pub fn write_uncompressed_tiff(path: &Path, width: u32, height: u32) -> Vec<u8> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let bytes = uncompressed_tiff(&[gradient_rgb8(width, height)]);
    fs::write(path, &bytes).unwrap();
    bytes
}

/// Hand-assembled little-endian single-strip TIFF, for layouts the encoder
/// cannot produce (sub-byte gray, palette). `strip` is stored uncompressed.
pub fn raw_strip_tiff(
    width: u32,
    height: u32,
    bits: u16,
    photometric: u16,
    color_map: Option<&[u16]>,
    strip: &[u8],
) -> Vec<u8> {
    const SHORT: u16 = 3;
    const LONG: u16 = 4;

    let entry_count = if color_map.is_some() { 10 } else { 9 };
    let strip_offset = 8 + 2 + 12 * entry_count + 4;
    let map_offset = (strip_offset + strip.len() as u32 + 1) & !1;

    let mut entries: Vec<(u16, u16, u32, u32)> = vec![
        (256, LONG, 1, width),
        (257, LONG, 1, height),
        (258, SHORT, 1, u32::from(bits)),
        (259, SHORT, 1, 1),
        (262, SHORT, 1, u32::from(photometric)),
        (273, LONG, 1, strip_offset),
        (277, SHORT, 1, 1),
        (278, LONG, 1, height),
        (279, LONG, 1, strip.len() as u32),
    ];
    if let Some(map) = color_map {
        entries.push((320, SHORT, map.len() as u32, map_offset));
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, kind, count, value) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        if kind == SHORT && count == 1 {
            out.extend_from_slice(&(value as u16).to_le_bytes());
            out.extend_from_slice(&[0, 0]);
        } else {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(out.len() as u32, strip_offset);

    out.extend_from_slice(strip);
    if let Some(map) = color_map {
        out.resize(map_offset as usize, 0);
        for v in map {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

/// Treats any input as a 1x1 gray page whose value is the input length and
/// encodes it as exactly `output_len` bytes. Makes size accounting exact.
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeCodec {
    pub output_len: usize,
}

impl TiffCodec for FixedSizeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
        let page = Page::new(
            1,
            1,
            PixelLayout::Gray,
            Samples::U64(vec![bytes.len() as u64]),
        )?;
        PixelBuffer::new(vec![page])
    }

    fn encode(
        &self,
        _pixels: PixelBuffer,
        _compression: Compression,
        sink: &mut dyn WriteSeek,
    ) -> Result<(), CodecError> {
        sink.write_all(&vec![0xAB; self.output_len])
            .map_err(|e| CodecError::Unsupported(e.to_string()))
    }
}

/// Decodes anything, writes a partial payload, then fails the encode.
#[derive(Debug, Clone, Copy)]
pub struct FailingEncodeCodec;

impl TiffCodec for FailingEncodeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
        FixedSizeCodec { output_len: 0 }.decode(bytes)
    }

    fn encode(
        &self,
        _pixels: PixelBuffer,
        _compression: Compression,
        sink: &mut dyn WriteSeek,
    ) -> Result<(), CodecError> {
        let _ = sink.write_all(b"II*\0partial");
        let _ = sink.flush();
        Err(CodecError::Unsupported("simulated encoder crash".to_string()))
    }
}
