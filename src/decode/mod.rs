//! Decoder capability used by the background worker
//!
//! The actual symbology detection lives outside this crate; anything that can
//! turn a raw image into an optional [`CodeResult`] plugs in through the
//! [`Decoder`] trait.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::{to_luminance, PixelFormat};

/// A successfully decoded code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeResult {
    pub text: String,
    pub format: Symbology,
}

impl CodeResult {
    pub fn new(text: impl Into<String>, format: Symbology) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

/// Code symbologies a decoder may recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    Rss14,
    RssExpanded,
    UpcA,
    UpcE,
}

impl Symbology {
    pub fn name(self) -> &'static str {
        match self {
            Symbology::Aztec => "AZTEC",
            Symbology::Codabar => "CODABAR",
            Symbology::Code39 => "CODE_39",
            Symbology::Code93 => "CODE_93",
            Symbology::Code128 => "CODE_128",
            Symbology::DataMatrix => "DATA_MATRIX",
            Symbology::Ean8 => "EAN_8",
            Symbology::Ean13 => "EAN_13",
            Symbology::Itf => "ITF",
            Symbology::MaxiCode => "MAXICODE",
            Symbology::Pdf417 => "PDF_417",
            Symbology::QrCode => "QR_CODE",
            Symbology::Rss14 => "RSS_14",
            Symbology::RssExpanded => "RSS_EXPANDED",
            Symbology::UpcA => "UPC_A",
            Symbology::UpcE => "UPC_E",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoder settings, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Symbologies to report; anything else is treated as no result
    pub formats: Vec<Symbology>,
    pub try_harder: bool,
    pub auto_rotate: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            formats: vec![Symbology::QrCode],
            try_harder: true,
            auto_rotate: false,
        }
    }
}

impl DecoderOptions {
    pub fn accepts(&self, format: Symbology) -> bool {
        self.formats.contains(&format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer holds {actual} bytes, expected at least {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("row stride {stride} is shorter than a {row}-byte row")]
    Stride { stride: usize, row: usize },

    #[error("jpeg decode failed: {0}")]
    Jpeg(String),

    #[error("{0}")]
    Other(String),
}

/// Extracts a machine-readable code from one image.
///
/// Called only from the decode worker thread. `Ok(None)` means the image held
/// no recognizable code.
pub trait Decoder: Send {
    /// Apply reader settings. Called once, before the first `decode`.
    fn configure(&mut self, _options: &DecoderOptions) {}

    fn decode(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        hint: PixelFormat,
    ) -> Result<Option<CodeResult>, DecodeError>;
}

impl<F> Decoder for F
where
    F: FnMut(&[u8], u32, u32, PixelFormat) -> Result<Option<CodeResult>, DecodeError> + Send,
{
    fn decode(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        hint: PixelFormat,
    ) -> Result<Option<CodeResult>, DecodeError> {
        self(data, width, height, hint)
    }
}

/// Feeds a grayscale-only decoder from any camera format
pub struct LumaDecoder<D> {
    inner: D,
}

impl<D: Decoder> LumaDecoder<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: Decoder> Decoder for LumaDecoder<D> {
    fn configure(&mut self, options: &DecoderOptions) {
        self.inner.configure(options);
    }

    fn decode(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        hint: PixelFormat,
    ) -> Result<Option<CodeResult>, DecodeError> {
        let plane = to_luminance(data, width, height, hint)?;
        self.inner
            .decode(&plane.data, plane.width, plane.height, PixelFormat::Gray8)
    }
}
