//! Per-resource flags and type tags carried in directory entries

use std::fmt;

/// Resource flags (top byte of the size word)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceFlags {
    /// Raw flag value
    pub value: u8,
}

impl ResourceFlags {
    /// No special flags
    pub const NONE: u8 = 0x00;

    /// Stored compressed (not supported for reading by this crate)
    pub const COMPRESSED: u8 = 0x01;

    /// Compound resource with an internal reference table
    pub const COMPOUND: u8 = 0x02;

    /// Reserved
    pub const RESERVED: u8 = 0x04;

    /// Load into memory as soon as the container is opened
    pub const LOAD_ON_OPEN: u8 = 0x08;

    /// Never evicted once loaded
    pub const NO_DROP: u8 = 0x10;

    /// Create flags from a raw value
    pub const fn new(value: u8) -> Self {
        Self { value }
    }

    /// Check if flag is set
    pub const fn has(&self, flag: u8) -> bool {
        (self.value & flag) != 0
    }

    /// Set flag
    pub fn set(&mut self, flag: u8) {
        self.value |= flag;
    }

    /// Clear flag
    pub fn clear(&mut self, flag: u8) {
        self.value &= !flag;
    }

    /// Whether the resource is loaded at open time
    pub const fn load_on_open(&self) -> bool {
        self.has(Self::LOAD_ON_OPEN)
    }

    /// Whether the stored bytes are compressed
    pub const fn is_compressed(&self) -> bool {
        self.has(Self::COMPRESSED)
    }
}

impl From<u8> for ResourceFlags {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ResourceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::COMPRESSED, "compressed"),
            (Self::COMPOUND, "compound"),
            (Self::RESERVED, "reserved"),
            (Self::LOAD_ON_OPEN, "load-on-open"),
            (Self::NO_DROP, "no-drop"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.has(*bit))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", set.join("|"))
        }
    }
}

/// Resource type tag (top byte of the stored-size word)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    /// Untyped data
    #[default]
    Unknown,
    /// String table
    String,
    /// Bitmap image
    Image,
    /// Font
    Font,
    /// Animation
    Anim,
    /// Palette
    Palette,
    /// Shading table
    ShadeTable,
    /// Digitized sound
    Voc,
    /// Vector shape
    Shape,
    /// Picture
    Pict,
    /// Extern table for compiled scripts
    B2Extern,
    /// Relocation table for compiled scripts
    B2Reloc,
    /// Compiled script code
    B2Code,
    /// Compiled script header
    B2Header,
    /// Reserved for compiled scripts
    B2Reserved,
    /// 3D object
    Obj3d,
    /// Stencil
    Stencil,
    /// Movie
    Movie,
    /// Rectangle list
    Rect,
    /// Tag not known to this crate, preserved verbatim
    Other(u8),
}

impl From<u8> for ResourceType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::String,
            2 => Self::Image,
            3 => Self::Font,
            4 => Self::Anim,
            5 => Self::Palette,
            6 => Self::ShadeTable,
            7 => Self::Voc,
            8 => Self::Shape,
            9 => Self::Pict,
            10 => Self::B2Extern,
            11 => Self::B2Reloc,
            12 => Self::B2Code,
            13 => Self::B2Header,
            14 => Self::B2Reserved,
            15 => Self::Obj3d,
            16 => Self::Stencil,
            17 => Self::Movie,
            18 => Self::Rect,
            other => Self::Other(other),
        }
    }
}

impl From<ResourceType> for u8 {
    fn from(value: ResourceType) -> Self {
        match value {
            ResourceType::Unknown => 0,
            ResourceType::String => 1,
            ResourceType::Image => 2,
            ResourceType::Font => 3,
            ResourceType::Anim => 4,
            ResourceType::Palette => 5,
            ResourceType::ShadeTable => 6,
            ResourceType::Voc => 7,
            ResourceType::Shape => 8,
            ResourceType::Pict => 9,
            ResourceType::B2Extern => 10,
            ResourceType::B2Reloc => 11,
            ResourceType::B2Code => 12,
            ResourceType::B2Header => 13,
            ResourceType::B2Reserved => 14,
            ResourceType::Obj3d => 15,
            ResourceType::Stencil => 16,
            ResourceType::Movie => 17,
            ResourceType::Rect => 18,
            ResourceType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "type-{raw}"),
            known => write!(f, "{}", format!("{known:?}").to_lowercase()),
        }
    }
}
