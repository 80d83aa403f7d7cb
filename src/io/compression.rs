//! Transparent compression for CSV inputs and metadata outputs.
//!
//! Codecs are matched by file extension first and, for readers, by magic
//! bytes when the extension is not recognized. Built-in codecs:
//! - **Gzip** (`.gz`) via `flate2` (feature `compression-gzip`)
//! - **Zstd** (`.zst`) via `zstd` (feature `compression-zstd`)
//!
//! With neither feature enabled the auto-detect functions only add buffering.
//!
//! ```no_run
//! use ironbow::io::compression::{auto_detect_reader, auto_detect_writer};
//! use std::fs::File;
//! # fn main() -> anyhow::Result<()> {
//! let input = auto_detect_reader(File::open("docs.csv.gz")?, "docs.csv.gz")?;
//! let output = auto_detect_writer(File::create("meta.csv.zst")?, "meta.csv.zst")?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A compression format that can wrap readers and writers.
pub trait CompressionCodec: Send + Sync {
    /// Short codec name used in error context.
    fn name(&self) -> &str;

    /// Lowercase extensions including the leading dot.
    fn extensions(&self) -> &[&str];

    /// Leading signature of a compressed stream, if the format has one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>>;
}

/// Codecs compiled into this build.
#[must_use]
pub fn builtin_codecs() -> Vec<&'static dyn CompressionCodec> {
    #[allow(unused_mut)]
    let mut codecs: Vec<&'static dyn CompressionCodec> = Vec::new();
    #[cfg(feature = "compression-gzip")]
    codecs.push(&GzipCodec);
    #[cfg(feature = "compression-zstd")]
    codecs.push(&ZstdCodec);
    codecs
}

/// Codec whose extension ends `path`, case-insensitively.
pub fn detect_from_extension(path: impl AsRef<Path>) -> Option<&'static dyn CompressionCodec> {
    let lowered = path.as_ref().to_string_lossy().to_lowercase();
    builtin_codecs()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| lowered.ends_with(ext)))
}

/// Codec whose signature starts the buffered stream. Does not consume input.
fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<&'static dyn CompressionCodec> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    builtin_codecs()
        .into_iter()
        .find(|codec| codec.magic_bytes().is_some_and(|magic| buf.starts_with(magic)))
}

/// Wrap `reader` in a decompressor chosen by `path_hint`'s extension, falling
/// back to magic bytes, or return it buffered as-is.
///
/// # Errors
/// Fails if the chosen codec cannot initialize its decoder.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(&path_hint) {
        return codec
            .wrap_reader_dyn(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buf_reader = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buf_reader) {
        return codec
            .wrap_reader_dyn(Box::new(buf_reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }
    Ok(Box::new(buf_reader))
}

/// Wrap `writer` in a compressor chosen by `path_hint`'s extension, or
/// return it buffered as-is.
///
/// # Errors
/// Fails if the chosen codec cannot initialize its encoder.
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Write>> {
    if let Some(codec) = detect_from_extension(&path_hint) {
        return codec
            .wrap_writer_dyn(Box::new(writer))
            .with_context(|| format!("wrap writer with {} codec", codec.name()));
    }
    Ok(Box::new(BufWriter::new(writer)))
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write>) -> std::io::Result<Box<dyn Write>> {
        zstd::stream::write::Encoder::new(writer, 3)
            .map(|e| Box::new(e.auto_finish()) as Box<dyn Write>)
    }
}
