use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Image formats the converter reads and writes.
///
/// `Jpg` and `Jpeg` are distinct members: they share a codec but map to
/// different MIME strings (see [`SupportedFormat::mime_type`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedFormat {
    Jpg,
    Jpeg,
    Gif,
    Png,
}

impl SupportedFormat {
    /// All members, in the order used for messages and SQL filters.
    pub const ALL: [SupportedFormat; 4] = [
        SupportedFormat::Jpg,
        SupportedFormat::Jpeg,
        SupportedFormat::Gif,
        SupportedFormat::Png,
    ];

    /// File extension, without the leading dot.
    pub fn as_str(self) -> &'static str {
        match self {
            SupportedFormat::Jpg => "jpg",
            SupportedFormat::Jpeg => "jpeg",
            SupportedFormat::Gif => "gif",
            SupportedFormat::Png => "png",
        }
    }

    /// MIME type recorded against attachments of this format.
    ///
    /// `jpg` maps to the non-standard `image/jpg`. Existing records carry that
    /// value and the source check compares MIME strings exactly, so it must
    /// not be normalized to `image/jpeg`.
    pub fn mime_type(self) -> &'static str {
        match self {
            SupportedFormat::Jpg => "image/jpg",
            SupportedFormat::Jpeg => "image/jpeg",
            SupportedFormat::Gif => "image/gif",
            SupportedFormat::Png => "image/png",
        }
    }

    /// Exact, case-sensitive lookup by extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == extension)
    }

    pub fn is_jpeg_family(self) -> bool {
        matches!(self, SupportedFormat::Jpg | SupportedFormat::Jpeg)
    }

    /// Comma separated list of every extension, e.g. for CLI error messages.
    pub fn extension_list() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Every MIME value of the map, in canonical order.
    pub fn all_mime_types() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.mime_type()).collect()
    }
}

/// MIME lookup for an untyped extension. `None` outside the supported set.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    SupportedFormat::from_extension(extension).map(SupportedFormat::mime_type)
}

impl FromStr for SupportedFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| anyhow::anyhow!("Unsupported image format: {}", s))
    }
}

impl Display for SupportedFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
