//! Closed keyword sets recognized in bindless source, each backed by a static
//! lookup table.

use std::fmt;

use serde::{Deserialize, Serialize};

pub trait Vocabulary: Copy + PartialEq + 'static {
    /// every accepted spelling; the first spelling of a value is its canonical one
    const KEYWORDS: &'static [(&'static str, Self)];

    fn from_keyword(word: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == word)
            .map(|(_, value)| *value)
    }

    fn keyword(self) -> &'static str {
        Self::KEYWORDS
            .iter()
            .find(|(_, value)| *value == self)
            .map(|(keyword, _)| *keyword)
            .unwrap_or("?")
    }
}

macro_rules! display_keyword {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.keyword())
                }
            }
        )*
    };
}

display_keyword!(
    ResourceKind,
    PrimitiveType,
    AttributeKind,
    PropertyDefault,
    TextureFilter,
    TextureAddressMode,
    SamplerBorder,
    InputClassification,
    InputElementFormat,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ConstantBuffer,
    StructuredBuffer,
    RWStructuredBuffer,
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
}

impl Vocabulary for ResourceKind {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("ConstantBuffer", Self::ConstantBuffer),
        ("StructuredBuffer", Self::StructuredBuffer),
        ("RWStructuredBuffer", Self::RWStructuredBuffer),
        ("Texture1D", Self::Texture1D),
        ("Texture1DArray", Self::Texture1DArray),
        ("Texture2D", Self::Texture2D),
        ("Texture2DArray", Self::Texture2DArray),
        ("Texture3D", Self::Texture3D),
        ("TextureCube", Self::TextureCube),
        ("TextureCubeArray", Self::TextureCubeArray),
    ];
}

/// Scalar type of a struct member; `Struct` covers every non-primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveType {
    Struct,
    Bool,
    Int,
    UInt,
    DWord,
    Half,
    Float,
    Double,
    UInt64,
    Int64,
    Float16,
    UInt16,
    Int16,
}

impl PrimitiveType {
    /// size in bytes of a single scalar
    pub fn width(self) -> u32 {
        match self {
            Self::Struct => 0,
            Self::Bool | Self::Int | Self::UInt | Self::DWord | Self::Float => 4,
            Self::Half | Self::Float16 | Self::UInt16 | Self::Int16 => 2,
            Self::Double | Self::UInt64 | Self::Int64 => 8,
        }
    }
}

impl Vocabulary for PrimitiveType {
    // ordered so that the first spelling prefixing a type name is the longest one
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("uint64_t", Self::UInt64),
        ("uint64", Self::UInt64),
        ("uint16_t", Self::UInt16),
        ("uint16", Self::UInt16),
        ("uint", Self::UInt),
        ("int64_t", Self::Int64),
        ("int64", Self::Int64),
        ("int16_t", Self::Int16),
        ("int16", Self::Int16),
        ("int", Self::Int),
        ("float16_t", Self::Float16),
        ("float16", Self::Float16),
        ("float", Self::Float),
        ("double", Self::Double),
        ("dword", Self::DWord),
        ("half", Self::Half),
        ("bool", Self::Bool),
        ("struct", Self::Struct),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKind {
    Vertex,
    Pixel,
    Constants,
    InputLayout,
    Property,
    BindGroup,
}

impl Vocabulary for AttributeKind {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("vertex", Self::Vertex),
        ("pixel", Self::Pixel),
        ("constants", Self::Constants),
        ("ialayout", Self::InputLayout),
        ("property", Self::Property),
        ("bindgroup", Self::BindGroup),
    ];
}

/// Fallback texture bound to a material property before one is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyDefault {
    White,
    Normal,
    Mask,
}

impl Vocabulary for PropertyDefault {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("White", Self::White),
        ("Normal", Self::Normal),
        ("Mask", Self::Mask),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextureFilter {
    Point,
    MinMagPointMipLinear,
    MinPointMagLinearMipPoint,
    MinPointMagMipLinear,
    MinLinearMagMipPoint,
    MinLinearMagPointMipLinear,
    MinMagLinearMipPoint,
    Linear,
    MinMagAnisotropicMipPoint,
}

impl Vocabulary for TextureFilter {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("Point", Self::Point),
        ("MinMagPointMipLinear", Self::MinMagPointMipLinear),
        ("MinPointMagLinearMipPoint", Self::MinPointMagLinearMipPoint),
        ("MinPointMagMipLinear", Self::MinPointMagMipLinear),
        ("MinLinearMagMipPoint", Self::MinLinearMagMipPoint),
        ("MinLinearMagPointMipLinear", Self::MinLinearMagPointMipLinear),
        ("MinMagLinearMipPoint", Self::MinMagLinearMipPoint),
        ("Linear", Self::Linear),
        ("MinMagAnisotropicMipPoint", Self::MinMagAnisotropicMipPoint),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextureAddressMode {
    Repeat,
    Mirror,
    ClampToEdge,
    ClampToBorder,
}

impl Vocabulary for TextureAddressMode {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("Repeat", Self::Repeat),
        ("Mirror", Self::Mirror),
        ("ClampToEdge", Self::ClampToEdge),
        ("ClampToBorder", Self::ClampToBorder),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SamplerBorder {
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
    OpaqueBlackUInt,
    OpaqueWhiteUInt,
}

impl Vocabulary for SamplerBorder {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("TransparentBlack", Self::TransparentBlack),
        ("OpaqueBlack", Self::OpaqueBlack),
        ("OpaqueWhite", Self::OpaqueWhite),
        ("OpaqueBlackUInt", Self::OpaqueBlackUInt),
        ("OpaqueWhiteUInt", Self::OpaqueWhiteUInt),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputClassification {
    #[default]
    Vertex,
    Instance,
}

impl Vocabulary for InputClassification {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("Vertex", Self::Vertex),
        ("Instance", Self::Instance),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputElementFormat {
    Padding,
    Float1,
    Float2,
    Float3,
    Float4,
    UInt1,
    UInt2,
    UInt3,
    UInt4,
    Byte4,
}

impl InputElementFormat {
    pub fn size_in_bytes(self) -> u32 {
        match self {
            Self::Padding => 0,
            Self::Float1 | Self::UInt1 | Self::Byte4 => 4,
            Self::Float2 | Self::UInt2 => 8,
            Self::Float3 | Self::UInt3 => 12,
            Self::Float4 | Self::UInt4 => 16,
        }
    }
}

impl Vocabulary for InputElementFormat {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("Padding", Self::Padding),
        ("Float1", Self::Float1),
        ("Float2", Self::Float2),
        ("Float3", Self::Float3),
        ("Float4", Self::Float4),
        ("UInt1", Self::UInt1),
        ("UInt2", Self::UInt2),
        ("UInt3", Self::UInt3),
        ("UInt4", Self::UInt4),
        ("Byte4", Self::Byte4),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_resolve_both_ways() {
        assert_eq!(
            ResourceKind::from_keyword("Texture2DArray"),
            Some(ResourceKind::Texture2DArray)
        );
        assert_eq!(ResourceKind::from_keyword("texture2d"), None);
        assert_eq!(ResourceKind::TextureCubeArray.keyword(), "TextureCubeArray");
        assert_eq!(AttributeKind::InputLayout.to_string(), "ialayout");
        assert_eq!(PrimitiveType::UInt64.keyword(), "uint64_t");
        // `matrix` is a shape of float, decoded by the struct parser
        assert_eq!(PrimitiveType::from_keyword("matrix"), None);
    }

    #[test]
    fn primitive_widths() {
        assert_eq!(PrimitiveType::Struct.width(), 0);
        assert_eq!(PrimitiveType::Float.width(), 4);
        assert_eq!(PrimitiveType::Half.width(), 2);
        assert_eq!(PrimitiveType::Int64.width(), 8);
    }
}
