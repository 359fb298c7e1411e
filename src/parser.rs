//! Parses bindless HLSL, collecting resources, samplers, structs and entry
//! points, then hands the collected edits to [`crate::codegen`] to produce
//! plain HLSL.

use std::path::PathBuf;

use log::*;

use crate::codegen::{self, EditList};
use crate::error::{ParseError, ParseErrorKind, SourceLocation, SourceSpan, TargetKind};
use crate::includes::{IncludeProvider, SearchPathIncludes};
use crate::model::{Function, ParseResult, ResourceKind, Variable, VariableAttribute, Vocabulary};
use crate::scanner::{Cursor, Quoted, is_identifier_continue, is_identifier_start};

mod attributes;
mod samplers;
mod structs;

use attributes::{Attribute, PendingAttributes};

pub use samplers::SamplerPreset;
pub use structs::decode_primitive;

/// Nesting limit for legacy `#include` directives.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Parses a root source file, resolving legacy includes against the source
/// directories first and the content directories after.
pub fn parse_source(
    file_name: &str,
    source: &str,
    source_dirs: &[PathBuf],
    content_dirs: &[PathBuf],
) -> Result<ParseResult, ParseError> {
    let includes = SearchPathIncludes::new(source_dirs.iter().chain(content_dirs).cloned());
    parse_source_with(file_name, source, &includes)
}

pub fn parse_source_with(
    file_name: &str,
    source: &str,
    includes: &dyn IncludeProvider,
) -> Result<ParseResult, ParseError> {
    let mut result = ParseResult::default();
    let mut edits = EditList::new();

    UnitParser::new(file_name, source, includes, Some(&mut edits), 0).run(&mut result)?;
    codegen::generate_bindless_source(&mut result, file_name, source, edits)?;

    debug!(
        "parsed {file_name}: {} resources, {} samplers, {} functions, {} structs, {} bytes of user constants",
        result.resources().count(),
        result.immutable_samplers.len(),
        result.functions.len(),
        result.structs.len(),
        result.constants_size,
    );

    Ok(result)
}

/// Scans one file. The root file owns the edit list; included files only
/// contribute declarations.
struct UnitParser<'a> {
    file_name: &'a str,
    cursor: Cursor<'a>,
    includes: &'a dyn IncludeProvider,
    edits: Option<&'a mut EditList>,
    depth: usize,
    pending: PendingAttributes,
    /// whether a `[` here starts an attribute rather than an array subscript
    declaration_position: bool,
}

impl<'a> UnitParser<'a> {
    fn new(
        file_name: &'a str,
        source: &'a str,
        includes: &'a dyn IncludeProvider,
        edits: Option<&'a mut EditList>,
        depth: usize,
    ) -> Self {
        Self {
            file_name,
            cursor: Cursor::new(source),
            includes,
            edits,
            depth,
            pending: PendingAttributes::default(),
            declaration_position: true,
        }
    }

    fn is_root(&self) -> bool {
        self.edits.is_some()
    }

    fn run(mut self, result: &mut ParseResult) -> Result<(), ParseError> {
        while let Some(byte) = self.cursor.peek() {
            match byte {
                b'/' if self.cursor.at_comment() => {
                    self.cursor.skip_comment();
                }
                b'"' => {
                    self.cursor.skip_string_literal();
                    self.declaration_position = false;
                }
                b'#' => {
                    self.parse_directive(result)?;
                    self.declaration_position = true;
                }
                b'[' if self.declaration_position => self.parse_attribute(result)?,
                byte if is_identifier_start(byte) => self.parse_identifier(result)?,
                byte => {
                    self.cursor.bump();
                    if !byte.is_ascii_whitespace() {
                        self.declaration_position = matches!(byte, b';' | b'{' | b'}' | b']');
                    }
                }
            }
        }

        if let Some(span) = self.pending.first_span() {
            return Err(self.error_in(span, ParseErrorKind::UnresolvedAttributes(self.pending.kinds())));
        }
        Ok(())
    }

    fn error(&self, location: SourceLocation, kind: ParseErrorKind) -> ParseError {
        self.error_in(SourceSpan::point(location), kind)
    }

    fn error_in(&self, span: SourceSpan, kind: ParseErrorKind) -> ParseError {
        ParseError {
            file: self.file_name.to_string(),
            span,
            kind,
        }
    }

    fn expected(&self, expected: &'static str) -> ParseError {
        let kind = if self.cursor.is_eof() {
            ParseErrorKind::UnexpectedEof { expected }
        } else {
            ParseErrorKind::Expected { expected }
        };
        self.error(self.cursor.location(), kind)
    }

    /// Replaces source text with spaces in the root file's output.
    fn blank(&mut self, range: std::ops::Range<usize>) {
        if let Some(edits) = self.edits.as_deref_mut() {
            edits.blank(range);
        }
    }

    /// Blanks from `start` to the end of the current line and moves past it.
    fn blank_rest_of_line(&mut self, start: usize) {
        let end = self.cursor.line_end();
        self.blank(start..end);
        self.cursor.advance_to(end);
    }

    /// Blanks a declaration through its terminating `;`, or to the end of the
    /// line when it has none, so a following declaration on the same line is
    /// still parsed.
    fn blank_declaration(&mut self, start: usize) {
        while let Some(byte) = self.cursor.peek() {
            if byte == b'\n' {
                break;
            }
            self.cursor.bump();
            if byte == b';' {
                break;
            }
        }
        self.blank(start..self.cursor.pos());
    }

    fn read_string(&mut self, expected: &'static str) -> Result<&'a str, ParseError> {
        self.cursor.skip_inline_whitespace();
        match self.cursor.read_quoted() {
            Quoted::Text(text) => Ok(text),
            Quoted::Missing | Quoted::Unterminated => Err(self.expected(expected)),
        }
    }

    fn parse_directive(&mut self, result: &mut ParseResult) -> Result<(), ParseError> {
        let start = self.cursor.pos();
        let location = self.cursor.location();
        self.cursor.bump();
        self.cursor.skip_inline_whitespace();

        match self.cursor.read_identifier() {
            "include" => self.parse_include(result, location),
            "pragma" => self.parse_pragma(result, start, location),
            _ => {
                self.cursor.skip_line();
                Ok(())
            }
        }
    }

    fn parse_pragma(
        &mut self,
        result: &mut ParseResult,
        start: usize,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        self.cursor.skip_inline_whitespace();
        match self.cursor.read_identifier() {
            "path" => {
                if !self.is_root() {
                    return Err(self.error(location, ParseErrorKind::PathOutsideSource));
                }
                if let Some(path) = &result.path {
                    return Err(self.error(location, ParseErrorKind::PathAlreadySet(path.clone())));
                }
                let path = self.read_string("a quoted content path")?;
                result.path = Some(path.to_string());
                self.blank_rest_of_line(start);
            }
            "bindgroup" => {
                let name = self.read_string("a quoted bind group name")?;
                if !result.bind_groups.insert(name) {
                    return Err(self.error(location, ParseErrorKind::DuplicateBindGroup(name.to_string())));
                }
                self.blank_rest_of_line(start);
            }
            // left for the native compiler and the metadata preprocessor
            _ => self.cursor.skip_line(),
        }
        Ok(())
    }

    /// Legacy includes are left in the output for the native compiler; only
    /// their declarations are collected.
    fn parse_include(&mut self, result: &mut ParseResult, location: SourceLocation) -> Result<(), ParseError> {
        let path = self.read_string("a quoted include path")?;
        self.cursor.skip_line();

        warn!(
            "{}({location}): legacy #include \"{path}\", declarations are collected but the include is not rewritten",
            self.file_name
        );

        if self.depth + 1 > MAX_INCLUDE_DEPTH {
            return Err(self.error(
                location,
                ParseErrorKind::IncludeDepthExceeded {
                    path: path.to_string(),
                    limit: MAX_INCLUDE_DEPTH,
                },
            ));
        }

        let file = self
            .includes
            .load(path)
            .map_err(|err| {
                self.error(
                    location,
                    ParseErrorKind::Io {
                        path: path.to_string(),
                        message: err.to_string(),
                    },
                )
            })?
            .ok_or_else(|| self.error(location, ParseErrorKind::IncludeNotFound(path.to_string())))?;

        UnitParser::new(&file.name, &file.source, self.includes, None, self.depth + 1).run(result)
    }

    fn parse_identifier(&mut self, result: &mut ParseResult) -> Result<(), ParseError> {
        let start = self.cursor.pos();
        let location = self.cursor.location();
        let word = self.cursor.read_identifier();

        if let Some(kind) = ResourceKind::from_keyword(word) {
            return self.parse_resource(result, kind, start, location);
        }

        match word {
            "SamplerState" => self.parse_sampler_state(result, start),
            "struct" => self.parse_struct(result, start, location),
            _ => match self.function_body_start(start) {
                Some(body) => self.parse_function(result, word, location, body),
                None => {
                    self.declaration_position = false;
                    Ok(())
                }
            },
        }
    }

    fn parse_resource(
        &mut self,
        result: &mut ParseResult,
        kind: ResourceKind,
        start: usize,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        let mut signature = kind.keyword().to_string();
        let mut element_type = None;

        self.cursor.skip_inline_whitespace();
        if self.cursor.eat(b'<') {
            self.cursor.skip_inline_whitespace();
            let element = self.cursor.read_identifier();
            if element.is_empty() {
                return Err(self.expected("a generic element type"));
            }
            self.cursor.skip_inline_whitespace();
            if !self.cursor.eat(b'>') {
                return Err(self.expected("'>'"));
            }
            signature = format!("{signature}<{element}>");
            element_type = Some(element.to_string());
            self.cursor.skip_inline_whitespace();
        }

        let name = self.cursor.read_identifier();
        if name.is_empty() {
            return Err(self.expected("a resource name"));
        }

        let mut bind_group = Default::default();
        let mut attributes = Vec::new();
        while let Some((attribute, span)) = self.pending.pop_front() {
            self.check_attribute(&attribute, TargetKind::Resource(kind), name, result, span)?;
            match attribute {
                Attribute::BindGroup(group) => bind_group = group,
                Attribute::Constants => attributes.push(VariableAttribute::Constants),
                Attribute::Property(property) => attributes.push(VariableAttribute::Property(property)),
                Attribute::Vertex | Attribute::Pixel | Attribute::InputLayout(_) => {}
            }
        }

        let index = result.variables.len() as u32;
        result.variables.push(Variable {
            kind,
            signature,
            element_type,
            name: name.to_string(),
            bind_group,
            index: Some(index),
            attributes,
            location,
        });

        self.blank_declaration(start);
        self.declaration_position = true;
        Ok(())
    }

    /// Finds `<return type> <name>(...) [: SEMANTIC] {` around the identifier
    /// just read, returning a cursor positioned on the opening brace.
    fn function_body_start(&self, name_start: usize) -> Option<Cursor<'a>> {
        let bytes = self.cursor.source().as_bytes();
        let before = bytes[..name_start]
            .iter()
            .rev()
            .find(|byte| !byte.is_ascii_whitespace());
        let has_whitespace = name_start > 0 && bytes[name_start - 1].is_ascii_whitespace();
        if !has_whitespace || !before.is_some_and(|byte| is_identifier_continue(*byte)) {
            return None;
        }

        let mut probe = self.cursor.clone();
        probe.skip_trivia();
        if !probe.eat(b'(') {
            return None;
        }
        let mut depth = 1usize;
        while depth > 0 {
            if probe.skip_comment() {
                continue;
            }
            match probe.bump()? {
                b'(' => depth += 1,
                b')' => depth -= 1,
                b';' | b'{' | b'}' => return None,
                _ => {}
            }
        }

        probe.skip_trivia();
        if probe.eat(b':') {
            probe.skip_trivia();
            probe.read_identifier();
            probe.skip_trivia();
        }
        (probe.peek() == Some(b'{')).then_some(probe)
    }

    fn parse_function(
        &mut self,
        result: &mut ParseResult,
        name: &str,
        location: SourceLocation,
        body: Cursor<'a>,
    ) -> Result<(), ParseError> {
        while let Some((attribute, span)) = self.pending.pop_front() {
            self.check_attribute(&attribute, TargetKind::Function, name, result, span)?;
            match attribute {
                Attribute::Vertex => result.entry_point_vertex = Some(name.to_string()),
                Attribute::Pixel => result.entry_point_pixel = Some(name.to_string()),
                Attribute::InputLayout(element) => result.input_layout.push(element),
                Attribute::Constants | Attribute::Property(_) | Attribute::BindGroup(_) => {}
            }
        }

        self.cursor = body;
        self.cursor.bump();
        let body_start = self.cursor.pos();
        let mut depth = 1usize;
        loop {
            match self.cursor.peek() {
                None => {
                    return Err(self.error(
                        location,
                        ParseErrorKind::UnexpectedEof {
                            expected: "'}' closing the function body",
                        },
                    ));
                }
                Some(b'/') if self.cursor.at_comment() => {
                    self.cursor.skip_comment();
                }
                Some(b'"') => self.cursor.skip_string_literal(),
                Some(b'{') => {
                    depth += 1;
                    self.cursor.bump();
                }
                Some(b'}') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    self.cursor.bump();
                }
                Some(_) => {
                    self.cursor.bump();
                }
            }
        }
        let body_end = self.cursor.pos();
        self.cursor.bump();

        result.functions.push(Function {
            name: name.to_string(),
            body: self.is_root().then_some(body_start..body_end),
        });
        self.declaration_position = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::includes::MemoryIncludes;
    use crate::model::{BindGroup, ConstantsLayout, DEFAULT_BIND_GROUP};

    fn parse(source: &str) -> Result<ParseResult, ParseError> {
        parse_source_with("test.hlsl", source, &MemoryIncludes::new())
    }

    fn kind_of(result: Result<ParseResult, ParseError>) -> ParseErrorKind {
        match result {
            Ok(_) => panic!("expected a parse error"),
            Err(error) => error.kind,
        }
    }

    #[test]
    fn two_textures_get_sorted_indices() {
        let result = parse("Texture2D otherTex;\nTexture2D myTex;\n").unwrap();

        let names: Vec<(&str, Option<u32>)> = result
            .variables
            .iter()
            .map(|variable| (variable.name.as_str(), variable.index))
            .collect();
        assert_eq!(names, [("myTex", Some(0)), ("otherTex", Some(1))]);
        assert!(result.variables.iter().all(|variable| variable.bind_group.is_default()));
        assert_eq!(
            result.constants_layout,
            Some(ConstantsLayout::Combined {
                index_table_size: 8,
                user_constants_size: 0
            })
        );

        insta::assert_snapshot!(result.output_source, @r"
struct __BINDLESS_GENERATED
{
    uint IDX_myTex; //__Default:0
    uint IDX_otherTex; //__Default:1
};
#ifdef __spirv__
[[vk::push_constant]]
#endif
ConstantBuffer<__BINDLESS_GENERATED> __BINDLESS_CB : register(b0);
#line 1
");
    }

    #[test]
    fn declarations_are_blanked_in_place() {
        let source = "Texture2D<float4> tex : register(t0);\nfloat4 x;\n";
        let result = parse(source).unwrap();
        let body = result.output_source.rsplit("#line 1\n").next().unwrap();
        assert_eq!(body, format!("{}\nfloat4 x;\n", " ".repeat(37)));
        assert_eq!(result.variables[0].signature, "Texture2D<float4>");
        assert_eq!(result.variables[0].element_type.as_deref(), Some("float4"));
    }

    #[test]
    fn declarations_sharing_a_line_are_all_recorded() {
        let source = "Texture2D a; Texture2D b;\nfloat4 Main() : SV_Target { return a.Load(0) + b.Load(0); }\n";
        let result = parse(source).unwrap();

        let names: Vec<&str> = result.variables.iter().map(|variable| variable.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let body = &result.output_source[result.functions[0].body.clone().unwrap()];
        assert!(body.contains("Texture2D b = (Texture2D)ResourceDescriptorHeap[__BINDLESS_CB.IDX_b];"));
        let line = result.output_source.rsplit("#line 1\n").next().unwrap();
        assert!(line.starts_with(&format!("{}\n", " ".repeat(25))));
    }

    #[test]
    fn resources_are_sorted_by_group_then_name() {
        let source = r#"
#pragma bindgroup "Material"
#pragma bindgroup "Frame"
[bindgroup(Group="Material")] Texture2D albedo;
Texture2D zeta;
[bindgroup(Group=Frame)] StructuredBuffer<float4> lights;
Texture2D alpha;
[bindgroup(Group="Material")] Texture2D normal;
"#;
        let result = parse(source).unwrap();
        let order: Vec<(&str, &str, Option<u32>)> = result
            .variables
            .iter()
            .map(|variable| (variable.bind_group.name(), variable.name.as_str(), variable.index))
            .collect();
        assert_eq!(
            order,
            [
                (DEFAULT_BIND_GROUP, "alpha", Some(0)),
                (DEFAULT_BIND_GROUP, "zeta", Some(1)),
                ("Frame", "lights", Some(2)),
                ("Material", "albedo", Some(3)),
                ("Material", "normal", Some(4)),
            ]
        );
        assert!(result.output_source.contains("uint IDX_lights; //Frame:2"));
    }

    #[test]
    fn indices_do_not_depend_on_declaration_order() {
        let declarations = ["Texture2D c;", "Texture2D a;", "StructuredBuffer<uint> b;", "Texture3D d;"];
        let forward = parse(&declarations.join("\n")).unwrap();
        let reversed: Vec<&str> = declarations.iter().rev().copied().collect();
        let backward = parse(&reversed.join("\n")).unwrap();

        let indices = |result: &ParseResult| -> Vec<(String, Option<u32>)> {
            result
                .variables
                .iter()
                .map(|variable| (variable.name.clone(), variable.index))
                .collect()
        };
        assert_eq!(indices(&forward), indices(&backward));
        let mut slots: Vec<u32> = forward.variables.iter().filter_map(|variable| variable.index).collect();
        slots.sort();
        assert_eq!(slots, [0, 1, 2, 3]);
    }

    #[test]
    fn parsing_is_deterministic() {
        let source = r#"
#pragma bindgroup "Material"
struct Params { float4 Color; float Strength; };
[constants] ConstantBuffer<Params> Consts;
[bindgroup(Group="Material")] Texture2D b;
Texture2D a;
SamplerState s : default;
float4 Shade(float2 uv) { return a.Sample(s, uv) + b.Sample(s, uv) * Consts.Color; }
"#;
        let first = parse(source).unwrap();
        let second = parse(source).unwrap();
        assert_eq!(first.output_source, second.output_source);
        assert_eq!(first.variables, second.variables);
    }

    #[test]
    fn duplicate_bind_group_is_an_error() {
        let error = parse("#pragma bindgroup \"A\"\n#pragma bindgroup \"A\"\n").unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::DuplicateBindGroup("A".to_string()));
        assert_eq!(error.span, SourceSpan::point(SourceLocation::new(2, 1)));
    }

    #[test]
    fn undeclared_bind_group_is_an_error() {
        let kind = kind_of(parse("[bindgroup(Group=\"Missing\")] Texture2D tex;"));
        assert_eq!(kind, ParseErrorKind::UndeclaredBindGroup("Missing".to_string()));
    }

    #[test]
    fn explicit_default_group_needs_no_declaration() {
        let result = parse("[bindgroup(Group=\"__Default\")] Texture2D tex;").unwrap();
        assert_eq!(result.variables[0].bind_group, BindGroup::default());
    }

    #[test]
    fn path_pragma_is_recorded_once() {
        let result = parse("#pragma path \"shaders/lit\"\n").unwrap();
        assert_eq!(result.path.as_deref(), Some("shaders/lit"));
        assert!(!result.output_source.contains("pragma"));

        let kind = kind_of(parse("#pragma path \"a\"\n#pragma path \"b\"\n"));
        assert_eq!(kind, ParseErrorKind::PathAlreadySet("a".to_string()));
    }

    #[test]
    fn other_pragmas_and_directives_are_untouched() {
        let source = "#pragma pack_matrix(row_major)\n#define SCALE \\\n    2.0\n";
        let result = parse(source).unwrap();
        assert_eq!(result.output_source, source);
    }

    #[test]
    fn entry_points_and_input_layout() {
        let source = r#"
[vertex]
[ialayout(Name=POSITION, Format=Float3)]
[ialayout(Name="TEXCOORD", Format=Float2, Offset=12, Slot=0, Class=Vertex)]
float4 VertexMain(float3 position : POSITION) : SV_Position
{
    return float4(position, 1.0);
}

[pixel]
float4 PixelMain() : SV_Target { return 1; }
"#;
        let result = parse(source).unwrap();
        assert_eq!(result.entry_point_vertex.as_deref(), Some("VertexMain"));
        assert_eq!(result.entry_point_pixel.as_deref(), Some("PixelMain"));
        assert_eq!(result.input_layout.len(), 2);
        assert_eq!(result.input_layout[1].offset, Some(12));
        assert_eq!(result.functions.len(), 2);
        assert!(!result.output_source.contains('['));
    }

    #[test]
    fn vertex_attribute_twice_is_invalid() {
        let source = "[vertex] float4 A() { return 0; }\n[vertex] float4 B() { return 0; }\n";
        let kind = kind_of(parse(source));
        assert_eq!(
            kind,
            ParseErrorKind::InvalidAttribute {
                attribute: crate::model::vocabulary::AttributeKind::Vertex,
                target: TargetKind::Function,
            }
        );
    }

    #[test]
    fn input_layout_requires_the_vertex_entry_point() {
        let source = "[ialayout(Name=POSITION, Format=Float3)] float4 A() { return 0; }\n";
        assert!(matches!(
            kind_of(parse(source)),
            ParseErrorKind::InvalidAttribute { .. }
        ));
    }

    #[test]
    fn attribute_targets_are_checked() {
        let property_on_buffer = "[property(Name=Albedo)] StructuredBuffer<float4> data;";
        assert_eq!(
            kind_of(parse(property_on_buffer)),
            ParseErrorKind::InvalidAttribute {
                attribute: crate::model::vocabulary::AttributeKind::Property,
                target: TargetKind::Resource(ResourceKind::StructuredBuffer),
            }
        );

        let constants_on_texture = "[constants] Texture2D tex;";
        assert!(matches!(
            kind_of(parse(constants_on_texture)),
            ParseErrorKind::InvalidAttribute { .. }
        ));

        let vertex_on_resource = "[vertex] Texture2D tex;";
        assert!(matches!(
            kind_of(parse(vertex_on_resource)),
            ParseErrorKind::InvalidAttribute { .. }
        ));
    }

    #[test]
    fn property_attribute_is_stored() {
        let result = parse("[property(Name=\"Albedo\", Default=Normal)] Texture2D<float4> albedo;").unwrap();
        let property = result.variables[0].property().unwrap();
        assert_eq!(property.name, "Albedo");
        assert_eq!(property.default, Some(crate::model::PropertyDefault::Normal));
    }

    #[test]
    fn unresolved_attributes_at_end_of_file() {
        let kind = kind_of(parse("Texture2D tex;\n[vertex]\n"));
        assert_eq!(
            kind,
            ParseErrorKind::UnresolvedAttributes(vec![crate::model::vocabulary::AttributeKind::Vertex])
        );
    }

    #[test]
    fn array_subscripts_are_not_attributes() {
        let source = "static const float weights[3] = { 0.25, 0.5, 0.25 };\nfloat Get(uint i) { return weights[i]; }\n";
        let result = parse(source).unwrap();
        assert_eq!(result.output_source, source);
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        assert!(matches!(
            kind_of(parse("[numthreads(8, 8, 1)] void Main() {}")),
            ParseErrorKind::UnknownKeyword { .. }
        ));
    }

    #[test]
    fn prototypes_are_not_functions() {
        let result = parse("float4 Shade(float2 uv);\nfloat4 Shade(float2 uv) { return 0; }\n").unwrap();
        assert_eq!(result.functions.len(), 1);
    }

    #[test]
    fn resources_are_injected_into_functions_that_use_them() {
        let source = "Texture2D<float4> albedo;\nTexture2D<float4> albedoMask;\nfloat4 Shade(float2 uv) { return albedo.Load(int3(uv, 0)); }\nfloat4 Other() { return 0; }\n";
        let result = parse(source).unwrap();

        let injected = " Texture2D<float4> albedo = (Texture2D<float4>)ResourceDescriptorHeap[__BINDLESS_CB.IDX_albedo]; ";
        assert!(result.output_source.contains(&format!("{{{injected} return albedo")));
        assert!(!result.output_source.contains("ResourceDescriptorHeap[__BINDLESS_CB.IDX_albedoMask]"));

        let shade = &result.functions[0];
        let body = shade.body.clone().unwrap();
        assert!(result.output_source[body].starts_with(injected));
        let other = result.functions[1].body.clone().unwrap();
        assert_eq!(&result.output_source[other], " return 0; ");
    }

    #[test]
    fn strings_and_comments_are_skipped() {
        let source = "// Texture2D commented;\n/* [vertex] */\nstatic const string name = \"Texture2D quoted;\";\n";
        let result = parse(source).unwrap();
        assert!(result.variables.is_empty());
        assert_eq!(result.output_source, source);
    }

    #[test]
    fn unterminated_function_body() {
        assert!(matches!(
            kind_of(parse("float4 Main() { return 0;")),
            ParseErrorKind::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn include_declarations_are_collected() {
        let includes = MemoryIncludes::new()
            .with_file("common.hlsli", "#pragma bindgroup \"Shared\"\nstruct Light { float4 Color; };\n#include \"nested.hlsli\"\n")
            .with_file("nested.hlsli", "[pixel] float4 PixelMain() : SV_Target { return 0; }\n");
        let source = "#include \"common.hlsli\"\n[bindgroup(Group=Shared)] StructuredBuffer<Light> lights;\n";
        let result = parse_source_with("test.hlsl", source, &includes).unwrap();

        assert!(result.bind_groups.contains("Shared"));
        assert_eq!(result.structs["Light"].span, None);
        assert_eq!(result.entry_point_pixel.as_deref(), Some("PixelMain"));
        assert_eq!(result.functions[0].body, None);
        assert!(result.output_source.contains("#include \"common.hlsli\"\n"));
    }

    #[test]
    fn missing_include_is_an_error() {
        let kind = kind_of(parse("#include \"missing.hlsli\"\n"));
        assert_eq!(kind, ParseErrorKind::IncludeNotFound("missing.hlsli".to_string()));
    }

    #[test]
    fn path_pragma_inside_include_is_an_error() {
        let includes = MemoryIncludes::new().with_file("a.hlsli", "#pragma path \"x\"\n");
        let error = parse_source_with("test.hlsl", "#include \"a.hlsli\"\n", &includes).unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::PathOutsideSource);
        assert_eq!(error.file, "a.hlsli");
    }

    #[test]
    fn recursive_include_hits_the_depth_limit() {
        let includes = MemoryIncludes::new().with_file("self.hlsli", "#include \"self.hlsli\"\n");
        let error = parse_source_with("test.hlsl", "#include \"self.hlsli\"\n", &includes).unwrap_err();
        assert_eq!(
            error.kind,
            ParseErrorKind::IncludeDepthExceeded {
                path: "self.hlsli".to_string(),
                limit: MAX_INCLUDE_DEPTH
            }
        );
    }
}
