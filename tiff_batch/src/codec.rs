//! TIFF Codec Module
//!
//! The pipeline only talks to [`TiffCodec`]. [`DeflateTiffCodec`] is the real
//! implementation on top of the `tiff` crate:
//! - decodes every page of the input (multi-page files keep all pages)
//! - widens 1, 2 and 4-bit gray to 8-bit gray
//! - re-encodes each page with deflate at the requested level
//! - switches to BigTIFF when the raw payload would overflow 32-bit offsets
//!
//! Only the raster itself survives a round trip. Resolution and ICC tags are
//! not carried over. Palette-color files are rejected per file.

use crate::errors::CodecError;
use std::io::{Cursor, Seek, Write};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::compression::DeflateLevel as TiffDeflateLevel;
use tiff::encoder::{colortype, Compression as TiffCompression, TiffEncoder, TiffKind};
use tiff::tags::{PhotometricInterpretation, Tag};
use tiff::ColorType;

/// Raw payload size above which output is written as BigTIFF.
const BIGTIFF_THRESHOLD: usize = 0xF000_0000;

/// Sink the encoder writes into. TIFF needs to seek back to patch offsets.
pub trait WriteSeek: Write + Seek {}

impl<T: Write + Seek> WriteSeek for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeflateLevel {
    Fast,
    #[default]
    Balanced,
    Best,
}

impl From<DeflateLevel> for TiffDeflateLevel {
    fn from(level: DeflateLevel) -> Self {
        match level {
            DeflateLevel::Fast => TiffDeflateLevel::Fast,
            DeflateLevel::Balanced => TiffDeflateLevel::Balanced,
            DeflateLevel::Best => TiffDeflateLevel::Best,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Deflate(DeflateLevel),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Deflate(DeflateLevel::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Gray,
    Rgb,
    Rgba,
    Cmyk,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba | PixelLayout::Cmyk => 4,
        }
    }

    fn from_color(color: ColorType) -> Result<(Self, u8), CodecError> {
        match color {
            ColorType::Gray(bits) => Ok((PixelLayout::Gray, bits)),
            ColorType::RGB(bits) => Ok((PixelLayout::Rgb, bits)),
            ColorType::RGBA(bits) => Ok((PixelLayout::Rgba, bits)),
            ColorType::CMYK(bits) => Ok((PixelLayout::Cmyk, bits)),
            other => Err(CodecError::Unsupported(format!("{:?}", other))),
        }
    }
}

/// Interleaved samples of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::U32(v) => v.len(),
            Samples::U64(v) => v.len(),
            Samples::F32(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bits_per_sample(&self) -> u8 {
        match self {
            Samples::U8(_) => 8,
            Samples::U16(_) => 16,
            Samples::U32(_) | Samples::F32(_) => 32,
            Samples::U64(_) | Samples::F64(_) => 64,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.len() * usize::from(self.bits_per_sample() / 8)
    }

    fn from_decoded(decoded: DecodingResult, color: ColorType, bits: u8) -> Result<Self, CodecError> {
        let samples = match decoded {
            DecodingResult::U8(v) => Samples::U8(v),
            DecodingResult::U16(v) => Samples::U16(v),
            DecodingResult::U32(v) => Samples::U32(v),
            DecodingResult::U64(v) => Samples::U64(v),
            DecodingResult::F32(v) => Samples::F32(v),
            DecodingResult::F64(v) => Samples::F64(v),
            _ => {
                return Err(CodecError::Unsupported(format!(
                    "{:?} with signed samples",
                    color
                )))
            }
        };
        if samples.bits_per_sample() != bits {
            return Err(CodecError::Unsupported(format!("{:?}", color)));
        }
        Ok(samples)
    }
}

/// Expands MSB-first packed gray rows (each row padded to a whole byte) to one
/// byte per pixel, scaling the full range of `bits` onto 0..=255.
fn unpack_gray(packed: &[u8], width: u32, height: u32, bits: u8) -> Result<Vec<u8>, CodecError> {
    if !matches!(bits, 1 | 2 | 4) {
        return Err(CodecError::Unsupported(format!("Gray({})", bits)));
    }
    let (width, height, bits) = (width as usize, height as usize, usize::from(bits));
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let stride = (width * bits).div_ceil(8);
    if packed.len() < stride * height {
        return Err(CodecError::Unsupported(format!(
            "packed gray data has {} bytes, expected {}",
            packed.len(),
            stride * height
        )));
    }

    let max = (1u16 << bits) - 1;
    let mut out = Vec::with_capacity(width * height);
    for row in packed.chunks_exact(stride).take(height) {
        for x in 0..width {
            let bit = x * bits;
            let shift = 8 - bits - bit % 8;
            let value = u16::from(row[bit / 8] >> shift) & max;
            out.push((value * 255 / max) as u8);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    width: u32,
    height: u32,
    layout: PixelLayout,
    samples: Samples,
}

impl Page {
    pub fn new(
        width: u32,
        height: u32,
        layout: PixelLayout,
        samples: Samples,
    ) -> Result<Self, CodecError> {
        let expected = width as usize * height as usize * layout.channels();
        if samples.len() != expected {
            return Err(CodecError::Unsupported(format!(
                "{:?} page {}x{} has {} samples, expected {}",
                layout,
                width,
                height,
                samples.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }
}

/// Decoded raster of one file, one entry per TIFF page.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pages: Vec<Page>,
}

impl PixelBuffer {
    pub fn new(pages: Vec<Page>) -> Result<Self, CodecError> {
        if pages.is_empty() {
            return Err(CodecError::NoPages);
        }
        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn raw_len(&self) -> usize {
        self.pages.iter().map(|p| p.samples.byte_len()).sum()
    }
}

/// Decode/encode collaborator used by every worker.
pub trait TiffCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError>;

    fn encode(
        &self,
        pixels: PixelBuffer,
        compression: Compression,
        sink: &mut dyn WriteSeek,
    ) -> Result<(), CodecError>;
}

/// Decodes with unlimited buffer sizes and re-encodes with deflate.
///
/// A single IFD field larger than 1 MiB (roughly 260k strip offsets) still
/// fails to open, since the first directory is parsed before limits can be
/// lifted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateTiffCodec;

impl TiffCodec for DeflateTiffCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
        let mut decoder = Decoder::new(Cursor::new(bytes))?.with_limits(Limits::unlimited());
        // The constructor parsed the first IFD under default limits; parse it
        // again so its strip tables are read without them.
        decoder.seek_to_image(0)?;
        let mut pages = Vec::new();

        loop {
            let photometric = decoder.find_tag_unsigned::<u16>(Tag::PhotometricInterpretation)?;
            if photometric == Some(PhotometricInterpretation::RGBPalette.to_u16()) {
                return Err(CodecError::Unsupported("palette-color image".to_string()));
            }

            let (width, height) = decoder.dimensions()?;
            let color = decoder.colortype()?;
            let (layout, bits) = PixelLayout::from_color(color)?;
            let samples = match (layout, decoder.read_image()?) {
                (PixelLayout::Gray, DecodingResult::U8(packed)) if bits < 8 => {
                    Samples::U8(unpack_gray(&packed, width, height, bits)?)
                }
                (_, decoded) => Samples::from_decoded(decoded, color, bits)?,
            };
            pages.push(Page::new(width, height, layout, samples)?);

            if !decoder.more_images() {
                break;
            }
            decoder.next_image()?;
        }

        PixelBuffer::new(pages)
    }

    fn encode(
        &self,
        pixels: PixelBuffer,
        compression: Compression,
        sink: &mut dyn WriteSeek,
    ) -> Result<(), CodecError> {
        let Compression::Deflate(level) = compression;
        let deflate = TiffCompression::Deflate(level.into());

        if pixels.raw_len() > BIGTIFF_THRESHOLD {
            let mut encoder = TiffEncoder::new_big(sink)?.with_compression(deflate);
            write_pages(&mut encoder, &pixels)
        } else {
            let mut encoder = TiffEncoder::new(sink)?.with_compression(deflate);
            write_pages(&mut encoder, &pixels)
        }
    }
}

fn write_pages<W: Write + Seek, K: TiffKind>(
    encoder: &mut TiffEncoder<W, K>,
    pixels: &PixelBuffer,
) -> Result<(), CodecError> {
    for page in pixels.pages() {
        write_page(encoder, page)?;
    }
    Ok(())
}

fn write_page<W: Write + Seek, K: TiffKind>(
    encoder: &mut TiffEncoder<W, K>,
    page: &Page,
) -> Result<(), CodecError> {
    let (w, h) = (page.width, page.height);

    // Locals are captured at the definition site.
    macro_rules! write_as {
        ($color:ty, $data:expr) => {
            encoder.write_image::<$color>(w, h, $data)?
        };
    }

    use PixelLayout::*;
    match (page.layout, &page.samples) {
        (Gray, Samples::U8(d)) => write_as!(colortype::Gray8, d),
        (Gray, Samples::U16(d)) => write_as!(colortype::Gray16, d),
        (Gray, Samples::U32(d)) => write_as!(colortype::Gray32, d),
        (Gray, Samples::U64(d)) => write_as!(colortype::Gray64, d),
        (Gray, Samples::F32(d)) => write_as!(colortype::Gray32Float, d),
        (Gray, Samples::F64(d)) => write_as!(colortype::Gray64Float, d),

        (Rgb, Samples::U8(d)) => write_as!(colortype::RGB8, d),
        (Rgb, Samples::U16(d)) => write_as!(colortype::RGB16, d),
        (Rgb, Samples::U32(d)) => write_as!(colortype::RGB32, d),
        (Rgb, Samples::U64(d)) => write_as!(colortype::RGB64, d),
        (Rgb, Samples::F32(d)) => write_as!(colortype::RGB32Float, d),
        (Rgb, Samples::F64(d)) => write_as!(colortype::RGB64Float, d),

        (Rgba, Samples::U8(d)) => write_as!(colortype::RGBA8, d),
        (Rgba, Samples::U16(d)) => write_as!(colortype::RGBA16, d),
        (Rgba, Samples::U32(d)) => write_as!(colortype::RGBA32, d),
        (Rgba, Samples::U64(d)) => write_as!(colortype::RGBA64, d),
        (Rgba, Samples::F32(d)) => write_as!(colortype::RGBA32Float, d),
        (Rgba, Samples::F64(d)) => write_as!(colortype::RGBA64Float, d),

        (Cmyk, Samples::U8(d)) => write_as!(colortype::CMYK8, d),
        (Cmyk, Samples::U16(d)) => write_as!(colortype::CMYK16, d),
        (Cmyk, Samples::U32(d)) => write_as!(colortype::CMYK32, d),
        (Cmyk, Samples::U64(d)) => write_as!(colortype::CMYK64, d),
        (Cmyk, Samples::F32(d)) => write_as!(colortype::CMYK32Float, d),
        (Cmyk, Samples::F64(d)) => write_as!(colortype::CMYK64Float, d),
    }
    Ok(())
}
