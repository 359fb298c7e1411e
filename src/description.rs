use ash::vk;
use serde::{Deserialize, Serialize};

use crate::model::{
    ConstantsLayout, ImmutableSampler, InputClassification, InputElementFormat, InputLayoutElement,
    ParseResult, PropertyAttribute, ResourceKind, SamplerBorder, TextureAddressMode, TextureFilter,
};

/// Everything a renderer needs to build the pipeline for a transpiled shader,
/// written next to the generated HLSL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescription {
    pub source_file_name: String,
    pub path: Option<String>,
    pub vertex_entry_point: Option<String>,
    pub pixel_entry_point: Option<String>,
    pub bind_groups: Vec<String>,
    pub resources: Vec<ResourceDescription>,
    pub constants: Vec<ConstantsDescription>,
    pub immutable_samplers: Vec<ImmutableSampler>,
    pub input_layout: Vec<InputLayoutElement>,
    /// total size in bytes of all user constants
    pub constants_size: u32,
    pub constants_layout: Option<ConstantsLayout>,
}

/// A resource reached through the index table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescription {
    pub name: String,
    pub bind_group: String,
    pub index: u32,
    pub signature: String,
    pub kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub property: Option<PropertyAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantsDescription {
    pub name: String,
    pub struct_name: String,
    pub size: u32,
}

impl PipelineDescription {
    pub fn from_parse_result(source_file_name: &str, result: &ParseResult) -> Self {
        let resources = result
            .resources()
            .map(|variable| ResourceDescription {
                name: variable.name.clone(),
                bind_group: variable.bind_group.to_string(),
                index: variable.index.unwrap_or_default(),
                signature: variable.signature.clone(),
                kind: variable.kind,
                property: variable.property().cloned(),
            })
            .collect();

        let constants = result
            .user_constants()
            .filter_map(|variable| {
                let definition = result.constants_struct(variable)?;
                Some(ConstantsDescription {
                    name: variable.name.clone(),
                    struct_name: definition.name.clone(),
                    size: definition.size_in_bytes(),
                })
            })
            .collect();

        Self {
            source_file_name: source_file_name.to_string(),
            path: result.path.clone(),
            vertex_entry_point: result.entry_point_vertex.clone(),
            pixel_entry_point: result.entry_point_pixel.clone(),
            bind_groups: result.bind_groups.iter().map(ToString::to_string).collect(),
            resources,
            constants,
            immutable_samplers: result.immutable_samplers.clone(),
            input_layout: result.input_layout.clone(),
            constants_size: result.constants_size,
            constants_layout: result.constants_layout,
        }
    }

    /// Push constant ranges matching the blocks marked `[[vk::push_constant]]`
    /// in the generated source.
    pub fn push_constant_ranges(&self) -> Vec<vk::PushConstantRange> {
        let size = match self.constants_layout {
            Some(ConstantsLayout::Combined {
                index_table_size,
                user_constants_size,
            }) => index_table_size + user_constants_size,
            Some(ConstantsLayout::Split {
                user_constants_size, ..
            }) => user_constants_size,
            None => 0,
        };
        if size == 0 {
            return Vec::new();
        }
        vec![
            vk::PushConstantRange::default()
                .stage_flags(vk::ShaderStageFlags::ALL_GRAPHICS)
                .offset(0)
                .size(size),
        ]
    }

    /// Attribute descriptions in declaration order. Elements without an
    /// explicit offset follow the previous element.
    pub fn vertex_attribute_descriptions(&self) -> Vec<vk::VertexInputAttributeDescription> {
        let mut next_offset = 0;
        let mut location = 0;
        let mut descriptions = Vec::new();
        for element in &self.input_layout {
            let offset = element.offset.unwrap_or(next_offset);
            next_offset = offset + element.format.size_in_bytes();
            if element.format == InputElementFormat::Padding {
                continue;
            }
            descriptions.push(element.to_vk(location, offset));
            location += 1;
        }
        descriptions
    }
}

impl ImmutableSampler {
    pub fn to_vk(&self) -> vk::SamplerCreateInfo<'static> {
        let (min_filter, mag_filter, mipmap_mode) = self.filter.to_vk();
        vk::SamplerCreateInfo::default()
            .min_filter(min_filter)
            .mag_filter(mag_filter)
            .mipmap_mode(mipmap_mode)
            .address_mode_u(self.address_mode_u.to_vk())
            .address_mode_v(self.address_mode_v.to_vk())
            .address_mode_w(self.address_mode_w.to_vk())
            .anisotropy_enable(self.filter == TextureFilter::MinMagAnisotropicMipPoint)
            .max_anisotropy(self.max_anisotropy as f32)
            .mip_lod_bias(self.mip_lod_bias)
            .min_lod(self.min_lod)
            .max_lod(self.max_lod)
            .border_color(self.border.to_vk())
    }
}

impl TextureFilter {
    /// (min, mag, mipmap)
    pub fn to_vk(self) -> (vk::Filter, vk::Filter, vk::SamplerMipmapMode) {
        use vk::Filter as F;
        use vk::SamplerMipmapMode as M;
        match self {
            Self::Point => (F::NEAREST, F::NEAREST, M::NEAREST),
            Self::MinMagPointMipLinear => (F::NEAREST, F::NEAREST, M::LINEAR),
            Self::MinPointMagLinearMipPoint => (F::NEAREST, F::LINEAR, M::NEAREST),
            Self::MinPointMagMipLinear => (F::NEAREST, F::LINEAR, M::LINEAR),
            Self::MinLinearMagMipPoint => (F::LINEAR, F::NEAREST, M::NEAREST),
            Self::MinLinearMagPointMipLinear => (F::LINEAR, F::NEAREST, M::LINEAR),
            Self::MinMagLinearMipPoint | Self::MinMagAnisotropicMipPoint => {
                (F::LINEAR, F::LINEAR, M::NEAREST)
            }
            Self::Linear => (F::LINEAR, F::LINEAR, M::LINEAR),
        }
    }
}

impl TextureAddressMode {
    pub fn to_vk(self) -> vk::SamplerAddressMode {
        match self {
            Self::Repeat => vk::SamplerAddressMode::REPEAT,
            Self::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
            Self::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            Self::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        }
    }
}

impl SamplerBorder {
    pub fn to_vk(self) -> vk::BorderColor {
        match self {
            Self::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
            Self::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
            Self::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
            Self::OpaqueBlackUInt => vk::BorderColor::INT_OPAQUE_BLACK,
            Self::OpaqueWhiteUInt => vk::BorderColor::INT_OPAQUE_WHITE,
        }
    }
}

impl InputElementFormat {
    pub fn to_vk(self) -> vk::Format {
        match self {
            Self::Padding => vk::Format::UNDEFINED,
            Self::Float1 => vk::Format::R32_SFLOAT,
            Self::Float2 => vk::Format::R32G32_SFLOAT,
            Self::Float3 => vk::Format::R32G32B32_SFLOAT,
            Self::Float4 => vk::Format::R32G32B32A32_SFLOAT,
            Self::UInt1 => vk::Format::R32_UINT,
            Self::UInt2 => vk::Format::R32G32_UINT,
            Self::UInt3 => vk::Format::R32G32B32_UINT,
            Self::UInt4 => vk::Format::R32G32B32A32_UINT,
            Self::Byte4 => vk::Format::R8G8B8A8_UNORM,
        }
    }
}

impl InputClassification {
    pub fn to_vk(self) -> vk::VertexInputRate {
        match self {
            Self::Vertex => vk::VertexInputRate::VERTEX,
            Self::Instance => vk::VertexInputRate::INSTANCE,
        }
    }
}

impl InputLayoutElement {
    pub fn to_vk(&self, location: u32, offset: u32) -> vk::VertexInputAttributeDescription {
        vk::VertexInputAttributeDescription::default()
            .location(location)
            .binding(self.slot.unwrap_or(0))
            .format(self.format.to_vk())
            .offset(offset)
    }
}
