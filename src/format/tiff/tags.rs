//! Tag ids, field types and the enumerated values the converter reads.
//!
//! Field types cover TIFF 6.0 plus BigTIFF's LONG8, since every tag of an
//! instrument file is carried through compression. Only the tags the
//! converter interprets are named; the rest pass through by numeric id.

/// Declares a `#[repr(u16)]` enum together with its `from_u16` lookup.
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal),* $(,)? }
    ) => {
        $(#[$meta])*
        #[repr(u16)]
        pub enum $name { $($(#[$vmeta])* $variant = $code),* }

        impl $name {
            pub fn from_u16(value: u16) -> Option<Self> {
                match value {
                    $($code => Some($name::$variant),)*
                    _ => None,
                }
            }

            #[inline]
            pub const fn as_u16(self) -> u16 {
                self as u16
            }
        }
    };
}

// =============================================================================
// FieldType
// =============================================================================

coded_enum! {
    /// Encoding of the values of one IFD entry.
    ///
    /// The IFD pointer types (13, 18) are left out on purpose: their values
    /// point into the source file and mean nothing after a rewrite.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum FieldType {
        Byte = 1,
        /// NUL-terminated text
        Ascii = 2,
        Short = 3,
        Long = 4,
        /// Pair of LONGs, numerator first
        Rational = 5,
        SByte = 6,
        Undefined = 7,
        SShort = 8,
        SLong = 9,
        /// Pair of SLONGs
        SRational = 10,
        Float = 11,
        Double = 12,
        /// BigTIFF only
        Long8 = 16,
    }
}

impl FieldType {
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        use FieldType::*;
        match self {
            Byte | Ascii | SByte | Undefined => 1,
            Short | SShort => 2,
            Long | SLong | Float => 4,
            Rational | SRational | Double | Long8 => 8,
        }
    }

    /// Whether `count` values fit in the entry's own value field.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let field = if is_bigtiff { 8 } else { 4 };
        (self.size_in_bytes() as u64).saturating_mul(count) <= field
    }
}

// =============================================================================
// TiffTag
// =============================================================================

/// Declares the named tags: id, name and prescribed field type.
macro_rules! named_tags {
    ($($variant:ident = $code:literal : $ty:ident),* $(,)?) => {
        coded_enum! {
            /// Tags the converter interprets.
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum TiffTag { $($variant = $code),* }
        }

        impl TiffTag {
            /// Name used in error messages.
            pub const fn name(self) -> &'static str {
                match self {
                    $(TiffTag::$variant => stringify!($variant),)*
                }
            }

            /// Field type TIFF 6.0 prescribes for the tag. Sidecars without a
            /// field type table fall back to it.
            pub const fn default_field_type(self) -> FieldType {
                match self {
                    $(TiffTag::$variant => FieldType::$ty,)*
                }
            }
        }
    };
}

named_tags! {
    // Layout
    ImageWidth = 256: Long,
    ImageLength = 257: Long,
    BitsPerSample = 258: Short,
    Compression = 259: Short,
    PhotometricInterpretation = 262: Short,
    SamplesPerPixel = 277: Short,
    PlanarConfiguration = 284: Short,
    ExtraSamples = 338: Short,
    SampleFormat = 339: Short,

    // Strips
    StripOffsets = 273: Long,
    RowsPerStrip = 278: Long,
    StripByteCounts = 279: Long,

    // Tiles are detected and rejected, never decoded
    TileWidth = 322: Long,
    TileOffsets = 324: Long,

    // Descriptive
    ImageDescription = 270: Ascii,
    XResolution = 282: Rational,
    YResolution = 283: Rational,
    ResolutionUnit = 296: Short,
    Software = 305: Ascii,
    DateTime = 306: Ascii,
    // 3 * 2^bits SHORTs: all reds, then greens, then blues
    ColorMap = 320: Short,
}

// =============================================================================
// Enumerated tag values
// =============================================================================

coded_enum! {
    /// Compression schemes seen in the wild. Instruments write uncompressed
    /// strips and nothing else is decoded; the rest are only named so the
    /// rejection message can say what was found.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Compression {
        None = 1,
        Lzw = 5,
        Jpeg = 7,
        Deflate = 8,
        PackBits = 32773,
    }
}

impl Compression {
    #[inline]
    pub const fn is_supported(self) -> bool {
        matches!(self, Compression::None)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::PackBits => "PackBits",
        }
    }
}

coded_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Photometric {
        WhiteIsZero = 0,
        BlackIsZero = 1,
        Rgb = 2,
        /// Indices into the ColorMap tag
        Palette = 3,
    }
}

// =============================================================================
// Tests
// =============================================================================
