use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::SourceLocation;

pub mod vocabulary;
pub use vocabulary::{
    InputClassification, InputElementFormat, PrimitiveType, PropertyDefault, ResourceKind,
    SamplerBorder, TextureAddressMode, TextureFilter, Vocabulary,
};

pub const DEFAULT_BIND_GROUP: &str = "__Default";

/// Named partition of bindless resources.
///
/// The default group orders before every other group, the rest order by
/// plain byte comparison of their names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindGroup(String);

impl BindGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_BIND_GROUP
    }
}

impl Default for BindGroup {
    fn default() -> Self {
        Self::new(DEFAULT_BIND_GROUP)
    }
}

impl Ord for BindGroup {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_default(), other.is_default()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for BindGroup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BindGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sorted set of declared bind groups, always containing the default group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindGroups(BTreeSet<BindGroup>);

impl BindGroups {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&BindGroup::new(name))
    }

    /// Returns false if the group was already declared.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(BindGroup::new(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BindGroup> {
        self.0.iter()
    }
}

impl Default for BindGroups {
    fn default() -> Self {
        Self(BTreeSet::from([BindGroup::default()]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAttribute {
    pub name: String,
    pub default: Option<PropertyDefault>,
}

/// Attributes stored on a resource after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VariableAttribute {
    Constants,
    Property(PropertyAttribute),
}

/// A bindless resource declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub kind: ResourceKind,
    /// declared type text, ie `Texture2D<float4>`
    pub signature: String,
    /// generic argument of the declared type
    pub element_type: Option<String>,
    pub name: String,
    pub bind_group: BindGroup,
    /// slot in the generated index table; `None` for user constants once
    /// indices are assigned
    pub index: Option<u32>,
    pub attributes: Vec<VariableAttribute>,
    pub location: SourceLocation,
}

impl Variable {
    pub fn is_constants(&self) -> bool {
        self.kind == ResourceKind::ConstantBuffer
            && self
                .attributes
                .iter()
                .any(|attribute| matches!(attribute, VariableAttribute::Constants))
    }

    pub fn property(&self) -> Option<&PropertyAttribute> {
        self.attributes.iter().find_map(|attribute| match attribute {
            VariableAttribute::Property(property) => Some(property),
            VariableAttribute::Constants => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    /// byte range of the text between the braces; `None` for functions
    /// declared in legacy includes
    pub body: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub ty: PrimitiveType,
    pub rows: u32,
    pub columns: u32,
    pub array_length: Option<u32>,
    pub name: String,
    /// the member declaration as written, without the trailing `;`
    pub declaration: String,
}

impl StructField {
    pub fn size_in_bytes(&self) -> u32 {
        self.ty.width() * self.rows * self.columns * self.array_length.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<StructField>,
    /// byte range of the whole definition; `None` for legacy includes
    pub span: Option<Range<usize>>,
}

impl Struct {
    pub fn size_in_bytes(&self) -> u32 {
        self.fields.iter().map(StructField::size_in_bytes).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmutableSampler {
    pub name: String,
    /// sampler register, assigned in declaration order
    pub index: u32,
    pub filter: TextureFilter,
    pub address_mode_u: TextureAddressMode,
    pub address_mode_v: TextureAddressMode,
    pub address_mode_w: TextureAddressMode,
    pub max_anisotropy: u32,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border: SamplerBorder,
}

impl ImmutableSampler {
    pub fn with_filter(filter: TextureFilter) -> Self {
        Self {
            name: String::new(),
            index: 0,
            filter,
            address_mode_u: TextureAddressMode::Repeat,
            address_mode_v: TextureAddressMode::Repeat,
            address_mode_w: TextureAddressMode::Repeat,
            max_anisotropy: 1,
            mip_lod_bias: 1.0,
            min_lod: 0.0,
            max_lod: f32::MAX,
            border: SamplerBorder::TransparentBlack,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLayoutElement {
    pub name: String,
    pub offset: Option<u32>,
    pub slot: Option<u32>,
    pub class: InputClassification,
    pub format: InputElementFormat,
}

/// Where the user constants live relative to the resource index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConstantsLayout {
    /// user constants are embedded in the push constant block at b0
    Combined {
        index_table_size: u32,
        user_constants_size: u32,
    },
    /// the index table stays at b0 and user constants move to b1
    Split {
        index_table_size: u32,
        user_constants_size: u32,
    },
}

impl ConstantsLayout {
    pub fn is_combined(&self) -> bool {
        matches!(self, Self::Combined { .. })
    }
}

/// Everything collected from one source file, plus the rewritten output.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
    pub structs: HashMap<String, Struct>,
    pub immutable_samplers: Vec<ImmutableSampler>,
    pub input_layout: Vec<InputLayoutElement>,
    pub bind_groups: BindGroups,
    pub path: Option<String>,
    pub entry_point_vertex: Option<String>,
    pub entry_point_pixel: Option<String>,
    /// total size in bytes of all user constants
    pub constants_size: u32,
    pub constants_layout: Option<ConstantsLayout>,
    pub output_source: String,
}

impl ParseResult {
    /// variables that occupy a slot in the index table
    pub fn resources(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|variable| !variable.is_constants())
    }

    pub fn user_constants(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|variable| variable.is_constants())
    }

    /// The struct backing a user constants variable, if it was declared.
    pub fn constants_struct(&self, variable: &Variable) -> Option<&Struct> {
        variable
            .element_type
            .as_ref()
            .and_then(|name| self.structs.get(name))
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    /// A graphics pipeline needs both entry points and a content path.
    pub fn require_pipeline_inputs(&self) -> anyhow::Result<()> {
        let missing: Vec<&str> = [
            ("vertex entry point", self.entry_point_vertex.is_none()),
            ("pixel entry point", self.entry_point_pixel.is_none()),
            ("#pragma path", self.path.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, is_missing)| is_missing.then_some(name))
        .collect();

        if !missing.is_empty() {
            anyhow::bail!("shader is missing {}", missing.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind_group_sorts_first() {
        let mut groups = BindGroups::default();
        assert!(groups.insert("Material"));
        assert!(groups.insert("Alpha"));
        assert!(groups.insert("_underscore"));
        assert!(!groups.insert(DEFAULT_BIND_GROUP));

        let names: Vec<&str> = groups.iter().map(BindGroup::name).collect();
        assert_eq!(names, ["__Default", "Alpha", "Material", "_underscore"]);
    }

    #[test]
    fn struct_size_multiplies_shape_and_array_length() {
        let field = |ty, rows, columns, array_length| StructField {
            ty,
            rows,
            columns,
            array_length,
            name: String::new(),
            declaration: String::new(),
        };
        let definition = Struct {
            name: "Params".to_string(),
            fields: vec![
                field(PrimitiveType::Float, 4, 4, None),
                field(PrimitiveType::Half, 2, 1, None),
                field(PrimitiveType::UInt, 1, 1, Some(3)),
                field(PrimitiveType::Struct, 1, 1, None),
            ],
            span: None,
        };
        assert_eq!(definition.size_in_bytes(), 64 + 4 + 12);
    }

    #[test]
    fn require_pipeline_inputs_lists_what_is_missing() {
        let mut result = ParseResult {
            entry_point_vertex: Some("VertexMain".to_string()),
            ..Default::default()
        };
        let error = result.require_pipeline_inputs().unwrap_err();
        assert_eq!(
            error.to_string(),
            "shader is missing pixel entry point, #pragma path"
        );

        result.entry_point_pixel = Some("PixelMain".to_string());
        result.path = Some("shaders/lit".to_string());
        assert!(result.require_pipeline_inputs().is_ok());
    }
}
