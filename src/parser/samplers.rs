use crate::error::{KeywordPosition, ParseError, ParseErrorKind, SourceLocation};
use crate::model::{
    ImmutableSampler, ParseResult, SamplerBorder, TextureAddressMode, TextureFilter, Vocabulary,
};
use crate::scanner::Quoted;

use super::UnitParser;

/// Named starting points for `SamplerState name : preset { ... };`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerPreset {
    Default,
    DefaultLinear,
    DefaultPoint,
}

impl Vocabulary for SamplerPreset {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("default", Self::Default),
        ("defaultLinear", Self::DefaultLinear),
        ("defaultPoint", Self::DefaultPoint),
    ];
}

impl SamplerPreset {
    pub fn sampler(self) -> ImmutableSampler {
        match self {
            Self::Default | Self::DefaultLinear => ImmutableSampler::with_filter(TextureFilter::Linear),
            Self::DefaultPoint => ImmutableSampler::with_filter(TextureFilter::Point),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SamplerField {
    Filter,
    AddressModeU,
    AddressModeV,
    AddressModeW,
    MaxAnisotropy,
    MipLodBias,
    MinLod,
    MaxLod,
    Border,
}

impl Vocabulary for SamplerField {
    const KEYWORDS: &'static [(&'static str, Self)] = &[
        ("Filter", Self::Filter),
        ("AddressModeU", Self::AddressModeU),
        ("AddressModeV", Self::AddressModeV),
        ("AddressModeW", Self::AddressModeW),
        ("MaxAnisotropy", Self::MaxAnisotropy),
        ("MaxAnistropy", Self::MaxAnisotropy),
        ("MipLODBias", Self::MipLodBias),
        ("MinLOD", Self::MinLod),
        ("MaxLOD", Self::MaxLod),
        ("Border", Self::Border),
    ];
}

const MAX_ANISOTROPY: u32 = 16;

impl<'a> UnitParser<'a> {
    /// `SamplerState name : preset [{ ... }];` or `SamplerState name { ... };`
    /// become immutable samplers. Anything else, such as an explicit
    /// `: register(sN)`, is left for the native compiler.
    pub(super) fn parse_sampler_state(
        &mut self,
        result: &mut ParseResult,
        start: usize,
    ) -> Result<(), ParseError> {
        let mut probe = self.cursor.clone();
        probe.skip_inline_whitespace();
        let name = probe.read_identifier();
        probe.skip_trivia();

        let mut sampler = match (name.is_empty(), probe.peek()) {
            (false, Some(b':')) => {
                probe.bump();
                probe.skip_trivia();
                let preset_location = probe.location();
                let preset = probe.read_identifier();
                if preset == "register" {
                    self.declaration_position = false;
                    return Ok(());
                }
                match SamplerPreset::from_keyword(preset) {
                    Some(preset) => preset.sampler(),
                    None => {
                        return Err(self.error(
                            preset_location,
                            ParseErrorKind::UnknownKeyword {
                                word: preset.to_string(),
                                position: KeywordPosition::SamplerPreset,
                            },
                        ));
                    }
                }
            }
            (false, Some(b'{')) => SamplerPreset::Default.sampler(),
            _ => {
                self.declaration_position = false;
                return Ok(());
            }
        };

        self.cursor = probe;
        self.cursor.skip_trivia();
        if self.cursor.peek() == Some(b'{') {
            self.parse_sampler_block(&mut sampler)?;
        }
        self.cursor.skip_inline_whitespace();
        self.cursor.eat(b';');

        sampler.name = name.to_string();
        sampler.index = result.immutable_samplers.len() as u32;
        result.immutable_samplers.push(sampler);

        self.blank(start..self.cursor.pos());
        self.declaration_position = true;
        Ok(())
    }

    fn parse_sampler_block(&mut self, sampler: &mut ImmutableSampler) -> Result<(), ParseError> {
        self.cursor.bump();
        loop {
            self.cursor.skip_trivia();
            match self.cursor.peek() {
                None => return Err(self.expected("'}' closing the sampler")),
                Some(b'}') => {
                    self.cursor.bump();
                    return Ok(());
                }
                Some(_) => {}
            }

            let location = self.cursor.location();
            let word = self.cursor.read_identifier();
            if word.is_empty() {
                return Err(self.expected("a sampler field name"));
            }
            let Some(field) = SamplerField::from_keyword(word) else {
                return Err(self.error(
                    location,
                    ParseErrorKind::UnknownKeyword {
                        word: word.to_string(),
                        position: KeywordPosition::SamplerField,
                    },
                ));
            };

            self.cursor.skip_trivia();
            if !self.cursor.eat(b'=') {
                return Err(self.error(location, ParseErrorKind::MissingSamplerValue(word.to_string())));
            }
            self.cursor.skip_trivia();
            let value_location = self.cursor.location();
            let value = match self.cursor.read_value() {
                Quoted::Text(value) => value,
                Quoted::Missing | Quoted::Unterminated => return Err(self.expected("a sampler field value")),
            };
            self.apply_sampler_field(sampler, field, word, value, value_location)?;

            self.cursor.skip_trivia();
            if !self.cursor.eat(b',') && self.cursor.peek() != Some(b'}') {
                return Err(self.expected("',' or '}'"));
            }
        }
    }

    fn apply_sampler_field(
        &self,
        sampler: &mut ImmutableSampler,
        field: SamplerField,
        name: &str,
        value: &str,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        let invalid = || {
            self.error(
                location,
                ParseErrorKind::InvalidValue {
                    name: name.to_string(),
                    value: value.to_string(),
                },
            )
        };
        let keyword = |word: &str| {
            self.error(
                location,
                ParseErrorKind::UnknownKeyword {
                    word: word.to_string(),
                    position: KeywordPosition::EnumValue,
                },
            )
        };
        // bias and LOD clamps never go below zero
        let lod = || -> Result<f32, ParseError> {
            value
                .trim_end_matches(['f', 'F'])
                .parse::<f32>()
                .map(|lod| lod.max(0.0))
                .map_err(|_| invalid())
        };

        match field {
            SamplerField::Filter => {
                sampler.filter = TextureFilter::from_keyword(value).ok_or_else(|| keyword(value))?;
            }
            SamplerField::AddressModeU => {
                sampler.address_mode_u = TextureAddressMode::from_keyword(value).ok_or_else(|| keyword(value))?;
            }
            SamplerField::AddressModeV => {
                sampler.address_mode_v = TextureAddressMode::from_keyword(value).ok_or_else(|| keyword(value))?;
            }
            SamplerField::AddressModeW => {
                sampler.address_mode_w = TextureAddressMode::from_keyword(value).ok_or_else(|| keyword(value))?;
            }
            SamplerField::Border => {
                sampler.border = SamplerBorder::from_keyword(value).ok_or_else(|| keyword(value))?;
            }
            SamplerField::MaxAnisotropy => {
                let anisotropy: u32 = value.parse().map_err(|_| invalid())?;
                sampler.max_anisotropy = anisotropy.min(MAX_ANISOTROPY);
            }
            SamplerField::MipLodBias => sampler.mip_lod_bias = lod()?,
            SamplerField::MinLod => sampler.min_lod = lod()?,
            SamplerField::MaxLod => sampler.max_lod = lod()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::includes::MemoryIncludes;
    use crate::parser::parse_source_with;

    fn parse(source: &str) -> Result<ParseResult, ParseError> {
        parse_source_with("test.hlsl", source, &MemoryIncludes::new())
    }

    #[test]
    fn presets() {
        let result = parse("SamplerState a : default;\nSamplerState b : defaultPoint;\nSamplerState c : defaultLinear;\n").unwrap();
        let samplers = &result.immutable_samplers;
        assert_eq!(samplers.len(), 3);
        assert_eq!(samplers[0].filter, TextureFilter::Linear);
        assert_eq!(samplers[1].filter, TextureFilter::Point);
        assert_eq!(samplers[2].filter, TextureFilter::Linear);
        assert_eq!(samplers[1].index, 1);
        assert_eq!(samplers[0].max_anisotropy, 1);
        assert_eq!(samplers[0].mip_lod_bias, 1.0);
        assert_eq!(samplers[0].max_lod, f32::MAX);
        assert_eq!(samplers[0].address_mode_w, TextureAddressMode::Repeat);
    }

    #[test]
    fn block_overrides_preset_fields() {
        let source = r#"
SamplerState shadow : defaultPoint
{
    Filter = MinMagAnisotropicMipPoint,
    AddressModeU = "ClampToBorder",
    AddressModeV = ClampToEdge,
    MaxAnistropy = 32,
    MipLODBias = -0.5f,
    MaxLOD = 4.0,
    Border = OpaqueWhite
};
SamplerState plain { MinLOD = 2 };
SamplerState clamped { MipLODBias = -2.0, MinLOD = -1, MaxLOD = -3f };
"#;
        let result = parse(source).unwrap();
        let shadow = &result.immutable_samplers[0];
        assert_eq!(shadow.name, "shadow");
        assert_eq!(shadow.filter, TextureFilter::MinMagAnisotropicMipPoint);
        assert_eq!(shadow.address_mode_u, TextureAddressMode::ClampToBorder);
        assert_eq!(shadow.address_mode_v, TextureAddressMode::ClampToEdge);
        assert_eq!(shadow.address_mode_w, TextureAddressMode::Repeat);
        assert_eq!(shadow.max_anisotropy, 16);
        assert_eq!(shadow.mip_lod_bias, 0.0);
        assert_eq!(shadow.max_lod, 4.0);
        assert_eq!(shadow.border, SamplerBorder::OpaqueWhite);

        let plain = &result.immutable_samplers[1];
        assert_eq!(plain.filter, TextureFilter::Linear);
        assert_eq!(plain.min_lod, 2.0);
        assert_eq!(plain.index, 1);

        let clamped = &result.immutable_samplers[2];
        assert_eq!(clamped.mip_lod_bias, 0.0);
        assert_eq!(clamped.min_lod, 0.0);
        assert_eq!(clamped.max_lod, 0.0);

        assert!(result.output_source.contains("SamplerState shadow : register(s0);"));
        assert!(result.output_source.contains("SamplerState plain : register(s1);"));
        assert!(!result.output_source.contains("ClampToEdge"));
    }

    #[test]
    fn explicit_registers_are_left_alone() {
        let source = "SamplerState native : register(s4);\n";
        let result = parse(source).unwrap();
        assert!(result.immutable_samplers.is_empty());
        assert_eq!(result.output_source, source);
    }

    #[test]
    fn sampler_errors() {
        let kind = |source: &str| parse(source).unwrap_err().kind;
        assert_eq!(
            kind("SamplerState s : bilinear;"),
            ParseErrorKind::UnknownKeyword {
                word: "bilinear".to_string(),
                position: KeywordPosition::SamplerPreset
            }
        );
        assert_eq!(
            kind("SamplerState s { Filter Linear };"),
            ParseErrorKind::MissingSamplerValue("Filter".to_string())
        );
        assert_eq!(
            kind("SamplerState s { MinLOD = low };"),
            ParseErrorKind::InvalidValue {
                name: "MinLOD".to_string(),
                value: "low".to_string()
            }
        );
        assert_eq!(
            kind("SamplerState s { Wrap = Repeat };"),
            ParseErrorKind::UnknownKeyword {
                word: "Wrap".to_string(),
                position: KeywordPosition::SamplerField
            }
        );
        assert_eq!(
            kind("SamplerState s { Filter = Linear"),
            ParseErrorKind::UnexpectedEof {
                expected: "',' or '}'"
            }
        );
    }
}
