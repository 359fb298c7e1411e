use std::collections::VecDeque;

use crate::error::{KeywordPosition, ParseError, ParseErrorKind, SourceLocation, SourceSpan, TargetKind};
use crate::model::vocabulary::AttributeKind;
use crate::model::{
    BindGroup, InputClassification, InputElementFormat, InputLayoutElement, ParseResult,
    PropertyAttribute, PropertyDefault, ResourceKind, Vocabulary,
};
use crate::scanner::Quoted;

use super::UnitParser;

/// A parsed `[...]` attribute waiting for the declaration it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Vertex,
    Pixel,
    Constants,
    InputLayout(InputLayoutElement),
    Property(PropertyAttribute),
    BindGroup(BindGroup),
}

impl Attribute {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Vertex => AttributeKind::Vertex,
            Self::Pixel => AttributeKind::Pixel,
            Self::Constants => AttributeKind::Constants,
            Self::InputLayout(_) => AttributeKind::InputLayout,
            Self::Property(_) => AttributeKind::Property,
            Self::BindGroup(_) => AttributeKind::BindGroup,
        }
    }
}

#[derive(Debug, Default)]
pub struct PendingAttributes {
    queue: VecDeque<(Attribute, SourceSpan)>,
}

impl PendingAttributes {
    pub fn push(&mut self, attribute: Attribute, span: SourceSpan) {
        self.queue.push_back((attribute, span));
    }

    pub fn pop_front(&mut self) -> Option<(Attribute, SourceSpan)> {
        self.queue.pop_front()
    }

    pub fn first_span(&self) -> Option<SourceSpan> {
        self.queue.front().map(|(_, span)| *span)
    }

    pub fn kinds(&self) -> Vec<AttributeKind> {
        self.queue.iter().map(|(attribute, _)| attribute.kind()).collect()
    }
}

/// When an attribute may be attached to a declaration.
#[derive(Debug, Clone, Copy)]
enum Rule {
    Never,
    Always,
    OnResource(ResourceKind),
    VertexUnset,
    PixelUnset,
    /// the function was already marked as the vertex entry point
    IsVertexEntry,
}

// attribute, rule on resources, rule on functions
const COMPATIBILITY: &[(AttributeKind, Rule, Rule)] = &[
    (AttributeKind::Vertex, Rule::Never, Rule::VertexUnset),
    (AttributeKind::Pixel, Rule::Never, Rule::PixelUnset),
    (AttributeKind::Constants, Rule::OnResource(ResourceKind::ConstantBuffer), Rule::Never),
    (AttributeKind::InputLayout, Rule::Never, Rule::IsVertexEntry),
    (AttributeKind::Property, Rule::OnResource(ResourceKind::Texture2D), Rule::Never),
    (AttributeKind::BindGroup, Rule::Always, Rule::Never),
];

fn is_compatible(attribute: AttributeKind, target: TargetKind, name: &str, result: &ParseResult) -> bool {
    let Some(&(_, on_resource, on_function)) = COMPATIBILITY.iter().find(|(kind, ..)| *kind == attribute)
    else {
        return false;
    };
    let rule = match target {
        TargetKind::Resource(_) => on_resource,
        TargetKind::Function => on_function,
    };
    match rule {
        Rule::Never => false,
        Rule::Always => true,
        Rule::OnResource(kind) => target == TargetKind::Resource(kind),
        Rule::VertexUnset => result.entry_point_vertex.is_none(),
        Rule::PixelUnset => result.entry_point_pixel.is_none(),
        Rule::IsVertexEntry => result.entry_point_vertex.as_deref() == Some(name),
    }
}

/// `Key=Value` pairs of an attribute in written order.
#[derive(Debug, Default)]
struct Arguments<'a> {
    values: Vec<(&'a str, &'a str, SourceLocation)>,
}

impl<'a> Arguments<'a> {
    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.values
            .iter()
            .find(|(name, ..)| *name == key)
            .map(|(_, value, _)| *value)
    }
}

impl<'a> UnitParser<'a> {
    pub(super) fn check_attribute(
        &self,
        attribute: &Attribute,
        target: TargetKind,
        name: &str,
        result: &ParseResult,
        span: SourceSpan,
    ) -> Result<(), ParseError> {
        let kind = attribute.kind();
        if is_compatible(kind, target, name, result) {
            Ok(())
        } else {
            Err(self.error_in(
                span,
                ParseErrorKind::InvalidAttribute {
                    attribute: kind,
                    target,
                },
            ))
        }
    }

    /// Parses `[name]` or `[name(Key=Value, ...)]`, blanks it and queues it
    /// for the next declaration.
    pub(super) fn parse_attribute(&mut self, result: &ParseResult) -> Result<(), ParseError> {
        let start = self.cursor.pos();
        let location = self.cursor.location();
        self.cursor.bump();
        self.cursor.skip_inline_whitespace();

        let word_location = self.cursor.location();
        let word = self.cursor.read_identifier();
        let Some(kind) = AttributeKind::from_keyword(word) else {
            if word.is_empty() {
                return Err(self.expected("an attribute name"));
            }
            return Err(self.error(
                word_location,
                ParseErrorKind::UnknownKeyword {
                    word: word.to_string(),
                    position: KeywordPosition::Attribute,
                },
            ));
        };

        self.cursor.skip_inline_whitespace();
        let arguments = if self.cursor.peek() == Some(b'(') {
            self.parse_arguments()?
        } else {
            Arguments::default()
        };

        let attribute = match kind {
            AttributeKind::Vertex | AttributeKind::Pixel | AttributeKind::Constants => {
                if !arguments.is_empty() {
                    return Err(self.error(location, ParseErrorKind::UnexpectedArguments(kind)));
                }
                match kind {
                    AttributeKind::Vertex => Attribute::Vertex,
                    AttributeKind::Pixel => Attribute::Pixel,
                    _ => Attribute::Constants,
                }
            }
            AttributeKind::InputLayout => Attribute::InputLayout(self.input_layout_element(&arguments, location)?),
            AttributeKind::Property => Attribute::Property(self.property_attribute(&arguments, location)?),
            AttributeKind::BindGroup => {
                let group = BindGroup::new(arguments.get("Group").unwrap_or(crate::model::DEFAULT_BIND_GROUP));
                self.check_argument_names(&arguments, &["Group"])?;
                if !group.is_default() && !result.bind_groups.contains(group.name()) {
                    return Err(self.error(
                        location,
                        ParseErrorKind::UndeclaredBindGroup(group.name().to_string()),
                    ));
                }
                Attribute::BindGroup(group)
            }
        };

        self.cursor.skip_inline_whitespace();
        if !self.cursor.eat(b']') {
            return Err(self.expected("']'"));
        }

        let span = SourceSpan::between(location, self.cursor.location());
        self.blank(start..self.cursor.pos());
        // resources already default to this group
        if !matches!(&attribute, Attribute::BindGroup(group) if group.is_default()) {
            self.pending.push(attribute, span);
        }
        self.declaration_position = true;
        Ok(())
    }

    fn parse_arguments(&mut self) -> Result<Arguments<'a>, ParseError> {
        let mut arguments = Arguments::default();
        self.cursor.bump();
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat(b')') {
                return Ok(arguments);
            }

            let location = self.cursor.location();
            let key = self.cursor.read_identifier();
            if key.is_empty() {
                return Err(self.expected("an argument name"));
            }
            if arguments.get(key).is_some() {
                return Err(self.error(location, ParseErrorKind::DuplicateArgument(key.to_string())));
            }

            self.cursor.skip_whitespace();
            if !self.cursor.eat(b'=') {
                return Err(self.expected("'='"));
            }
            self.cursor.skip_whitespace();
            let value = match self.cursor.read_value() {
                Quoted::Text(value) => value,
                Quoted::Missing | Quoted::Unterminated => return Err(self.expected("an argument value")),
            };
            arguments.values.push((key, value, location));

            self.cursor.skip_whitespace();
            if !self.cursor.eat(b',') && self.cursor.peek() != Some(b')') {
                return Err(self.expected("',' or ')'"));
            }
        }
    }

    fn check_argument_names(&self, arguments: &Arguments<'_>, known: &[&str]) -> Result<(), ParseError> {
        match arguments.values.iter().find(|(key, ..)| !known.contains(key)) {
            Some((key, _, location)) => Err(self.error(
                *location,
                ParseErrorKind::UnknownKeyword {
                    word: key.to_string(),
                    position: KeywordPosition::AttributeArgument,
                },
            )),
            None => Ok(()),
        }
    }

    fn argument_enum<T: Vocabulary>(&self, arguments: &Arguments<'_>, key: &str) -> Result<Option<T>, ParseError> {
        let Some((_, value, location)) = arguments.values.iter().find(|(name, ..)| *name == key) else {
            return Ok(None);
        };
        T::from_keyword(value).map(Some).ok_or_else(|| {
            self.error(
                *location,
                ParseErrorKind::UnknownKeyword {
                    word: value.to_string(),
                    position: KeywordPosition::EnumValue,
                },
            )
        })
    }

    fn argument_u32(&self, arguments: &Arguments<'_>, key: &str) -> Result<Option<u32>, ParseError> {
        let Some((_, value, location)) = arguments.values.iter().find(|(name, ..)| *name == key) else {
            return Ok(None);
        };
        value.parse().map(Some).map_err(|_| {
            self.error(
                *location,
                ParseErrorKind::InvalidValue {
                    name: key.to_string(),
                    value: value.to_string(),
                },
            )
        })
    }

    fn input_layout_element(
        &self,
        arguments: &Arguments<'_>,
        location: SourceLocation,
    ) -> Result<InputLayoutElement, ParseError> {
        self.check_argument_names(arguments, &["Name", "Offset", "Slot", "Class", "Format"])?;
        let missing = |argument| {
            self.error(
                location,
                ParseErrorKind::MissingArgument {
                    attribute: AttributeKind::InputLayout,
                    argument,
                },
            )
        };

        Ok(InputLayoutElement {
            name: arguments.get("Name").ok_or_else(|| missing("Name"))?.to_string(),
            offset: self.argument_u32(arguments, "Offset")?,
            slot: self.argument_u32(arguments, "Slot")?,
            class: self
                .argument_enum(arguments, "Class")?
                .unwrap_or(InputClassification::Vertex),
            format: self
                .argument_enum::<InputElementFormat>(arguments, "Format")?
                .ok_or_else(|| missing("Format"))?,
        })
    }

    fn property_attribute(
        &self,
        arguments: &Arguments<'_>,
        location: SourceLocation,
    ) -> Result<PropertyAttribute, ParseError> {
        self.check_argument_names(arguments, &["Name", "Default"])?;
        let name = arguments.get("Name").ok_or_else(|| {
            self.error(
                location,
                ParseErrorKind::MissingArgument {
                    attribute: AttributeKind::Property,
                    argument: "Name",
                },
            )
        })?;
        Ok(PropertyAttribute {
            name: name.to_string(),
            default: self.argument_enum::<PropertyDefault>(arguments, "Default")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::includes::MemoryIncludes;
    use crate::parser::parse_source_with;

    fn parse_error(source: &str) -> ParseErrorKind {
        match parse_source_with("test.hlsl", source, &MemoryIncludes::new()) {
            Ok(_) => panic!("expected a parse error"),
            Err(error) => error.kind,
        }
    }

    #[test]
    fn compatibility_table() {
        let mut result = ParseResult::default();
        let texture = TargetKind::Resource(ResourceKind::Texture2D);
        let constant_buffer = TargetKind::Resource(ResourceKind::ConstantBuffer);

        assert!(is_compatible(AttributeKind::Property, texture, "t", &result));
        assert!(!is_compatible(AttributeKind::Property, constant_buffer, "c", &result));
        assert!(is_compatible(AttributeKind::Constants, constant_buffer, "c", &result));
        assert!(is_compatible(AttributeKind::BindGroup, texture, "t", &result));
        assert!(!is_compatible(AttributeKind::BindGroup, TargetKind::Function, "f", &result));

        assert!(is_compatible(AttributeKind::Vertex, TargetKind::Function, "main", &result));
        assert!(!is_compatible(AttributeKind::InputLayout, TargetKind::Function, "main", &result));
        result.entry_point_vertex = Some("main".to_string());
        assert!(!is_compatible(AttributeKind::Vertex, TargetKind::Function, "main", &result));
        assert!(is_compatible(AttributeKind::InputLayout, TargetKind::Function, "main", &result));
        assert!(!is_compatible(AttributeKind::InputLayout, TargetKind::Function, "other", &result));
    }

    #[test]
    fn arguments_are_validated() {
        assert_eq!(
            parse_error("[vertex(Stage=1)] float4 A() { return 0; }"),
            ParseErrorKind::UnexpectedArguments(AttributeKind::Vertex)
        );
        assert_eq!(
            parse_error("[ialayout(Format=Float3)] float4 A() { return 0; }"),
            ParseErrorKind::MissingArgument {
                attribute: AttributeKind::InputLayout,
                argument: "Name"
            }
        );
        assert_eq!(
            parse_error("[ialayout(Name=A, Format=Float5)] float4 A() { return 0; }"),
            ParseErrorKind::UnknownKeyword {
                word: "Float5".to_string(),
                position: KeywordPosition::EnumValue
            }
        );
        assert_eq!(
            parse_error("[ialayout(Name=A, Format=Float3, Offset=x)] float4 A() { return 0; }"),
            ParseErrorKind::InvalidValue {
                name: "Offset".to_string(),
                value: "x".to_string()
            }
        );
        assert_eq!(
            parse_error("[property(Name=A, Name=B)] Texture2D t;"),
            ParseErrorKind::DuplicateArgument("Name".to_string())
        );
        assert_eq!(
            parse_error("[property(Label=A)] Texture2D t;"),
            ParseErrorKind::UnknownKeyword {
                word: "Label".to_string(),
                position: KeywordPosition::AttributeArgument
            }
        );
    }

    #[test]
    fn empty_argument_list_is_allowed() {
        let result = parse_source_with("test.hlsl", "[constants()] ConstantBuffer<float4> c;", &MemoryIncludes::new());
        assert!(result.is_ok());
    }

    #[test]
    fn default_bind_group_attaches_to_nothing() {
        let source = "[bindgroup(Group=\"__Default\")]\n[pixel] float4 Main() : SV_Target { return 0; }\n[bindgroup]\n";
        let result = parse_source_with("test.hlsl", source, &MemoryIncludes::new()).unwrap();
        assert_eq!(result.entry_point_pixel.as_deref(), Some("Main"));
        assert!(!result.output_source.contains("bindgroup"));

        assert_eq!(
            parse_error("#pragma bindgroup \"Frame\"\n[bindgroup(Group=Frame)] float4 Main() { return 0; }"),
            ParseErrorKind::InvalidAttribute {
                attribute: AttributeKind::BindGroup,
                target: TargetKind::Function
            }
        );
    }

    #[test]
    fn unclosed_attribute() {
        assert_eq!(
            parse_error("[vertex"),
            ParseErrorKind::UnexpectedEof { expected: "']'" }
        );
    }
}
