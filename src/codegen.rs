//! Turns a parsed bindless source into plain HLSL: a generated preamble with
//! the resource index table, user constants and samplers, and resource
//! lookups injected at the top of every function that uses them.

use std::collections::HashSet;

use askama::Template;

use crate::error::{ParseError, ParseErrorKind, SourceLocation, SourceSpan};
use crate::model::{ConstantsLayout, ParseResult, Struct};

mod edits;
pub use edits::{Edit, EditList};

/// Bytes of push constant space shared by the index table and user constants.
pub const PUSH_CONSTANT_BUDGET: u32 = 128;
/// Size of one resource slot in the index table.
pub const INDEX_SLOT_SIZE: u32 = 4;

pub const BINDLESS_BUFFER: &str = "__BINDLESS_CB";
pub const USER_CONSTANTS_BUFFER: &str = "__USER_CONSTANTS_CB";

#[derive(Template)]
#[template(path = "bindless_preamble.hlsl.askama", escape = "none")]
struct BindlessPreamble {
    struct_defs: Vec<StructDefinition>,
    user_constant_fields: Vec<UserConstantField>,
    has_resources: bool,
    embeds_user_constants: bool,
    index_slots: Vec<IndexSlot>,
    bindless_push_constant: bool,
    user_constants_buffer: bool,
    defines: Vec<Define>,
    samplers: Vec<SamplerRegister>,
}

struct StructDefinition {
    name: String,
    members: Vec<String>,
}

struct UserConstantField {
    type_name: String,
    variable_name: String,
}

struct IndexSlot {
    name: String,
    bind_group: String,
    index: u32,
}

struct Define {
    name: String,
    value: String,
}

struct SamplerRegister {
    name: String,
    index: u32,
}

/// User constants gathered from `[constants]` buffers, in declaration order.
struct UserConstants {
    struct_defs: Vec<StructDefinition>,
    fields: Vec<UserConstantField>,
    size: u32,
}

/// Runs after the root file is scanned: sorts resources and assigns their
/// slots, renders the preamble, injects resource lookups and applies every
/// edit to produce [`ParseResult::output_source`].
pub(crate) fn generate_bindless_source(
    result: &mut ParseResult,
    file_name: &str,
    source: &str,
    mut edits: EditList,
) -> Result<(), ParseError> {
    let user_constants = collect_user_constants(result, file_name, &mut edits)?;
    result.constants_size = user_constants.size;

    assign_indices(result);

    let index_table_size = result.resources().count() as u32 * INDEX_SLOT_SIZE;
    result.constants_layout = (!result.variables.is_empty()).then(|| {
        if index_table_size + user_constants.size <= PUSH_CONSTANT_BUDGET {
            ConstantsLayout::Combined {
                index_table_size,
                user_constants_size: user_constants.size,
            }
        } else {
            ConstantsLayout::Split {
                index_table_size,
                user_constants_size: user_constants.size,
            }
        }
    });

    if let Some(preamble) = render_preamble(result, user_constants, file_name)? {
        edits.insert(0, preamble);
    }
    inject_resource_lookups(result, source, &mut edits);

    result.output_source = edits.apply(source);
    for function in &mut result.functions {
        if let Some(body) = &mut function.body {
            *body = edits.map_start(body.start)..edits.map_end(body.end);
        }
    }
    for definition in result.structs.values_mut() {
        if let Some(span) = &mut definition.span {
            *span = edits.map_start(span.start)..edits.map_end(span.end);
        }
    }
    Ok(())
}

/// Collects `[constants] ConstantBuffer<T>` variables whose struct is known,
/// blanking each struct's original definition so the preamble copy is the
/// only one.
fn collect_user_constants(
    result: &ParseResult,
    file_name: &str,
    edits: &mut EditList,
) -> Result<UserConstants, ParseError> {
    let mut constants = UserConstants {
        struct_defs: Vec::new(),
        fields: Vec::new(),
        size: 0,
    };
    let mut emitted = HashSet::new();

    for variable in result.user_constants() {
        let Some(definition) = result.constants_struct(variable) else {
            continue;
        };
        // the preamble copy would collide with the definition the include still provides
        if definition.span.is_none() {
            return Err(ParseError {
                file: file_name.to_string(),
                span: SourceSpan::point(variable.location),
                kind: ParseErrorKind::ConstantsStructInInclude(definition.name.clone()),
            });
        }

        let size = constants.size + definition.size_in_bytes();
        if size > PUSH_CONSTANT_BUDGET {
            return Err(ParseError {
                file: file_name.to_string(),
                span: SourceSpan::point(variable.location),
                kind: ParseErrorKind::ConstantsOverflow {
                    size,
                    budget: PUSH_CONSTANT_BUDGET,
                },
            });
        }
        constants.size = size;

        if emitted.insert(definition.name.as_str()) {
            constants.struct_defs.push(StructDefinition::from(definition));
            if let Some(span) = &definition.span {
                edits.blank(span.clone());
            }
        }
        constants.fields.push(UserConstantField {
            type_name: definition.name.clone(),
            variable_name: variable.name.clone(),
        });
    }

    Ok(constants)
}

impl From<&Struct> for StructDefinition {
    fn from(definition: &Struct) -> Self {
        Self {
            name: definition.name.clone(),
            members: definition
                .fields
                .iter()
                .map(|field| field.declaration.clone())
                .collect(),
        }
    }
}

/// Orders variables by bind group, then name, and numbers the resources.
/// User constants take no slot.
fn assign_indices(result: &mut ParseResult) {
    result.variables.sort_by(|a, b| {
        a.bind_group
            .cmp(&b.bind_group)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut next = 0;
    for variable in &mut result.variables {
        variable.index = if variable.is_constants() {
            None
        } else {
            next += 1;
            Some(next - 1)
        };
    }
}

fn render_preamble(
    result: &ParseResult,
    user_constants: UserConstants,
    file_name: &str,
) -> Result<Option<String>, ParseError> {
    if result.variables.is_empty() && result.immutable_samplers.is_empty() {
        return Ok(None);
    }

    let combined = result
        .constants_layout
        .is_some_and(|layout| layout.is_combined());
    let has_user_constants = !user_constants.fields.is_empty();

    let preamble = BindlessPreamble {
        defines: constant_defines(&user_constants.fields, combined),
        struct_defs: user_constants.struct_defs,
        user_constant_fields: user_constants.fields,
        has_resources: !result.variables.is_empty(),
        embeds_user_constants: combined && has_user_constants,
        index_slots: result
            .resources()
            .map(|variable| IndexSlot {
                name: variable.name.clone(),
                bind_group: variable.bind_group.to_string(),
                index: variable.index.unwrap_or_default(),
            })
            .collect(),
        bindless_push_constant: combined,
        user_constants_buffer: !combined && has_user_constants,
        samplers: result
            .immutable_samplers
            .iter()
            .map(|sampler| SamplerRegister {
                name: sampler.name.clone(),
                index: sampler.index,
            })
            .collect(),
    };

    let rendered = preamble.render().map_err(|err| ParseError {
        file: file_name.to_string(),
        span: SourceSpan::point(SourceLocation::new(1, 1)),
        kind: ParseErrorKind::Template(err.to_string()),
    })?;

    let mut text = rendered.trim_matches('\n').to_string();
    text.push('\n');
    Ok(Some(text))
}

/// One macro per constants variable, so shader code keeps writing
/// `Consts.Member` against the declared name.
fn constant_defines(fields: &[UserConstantField], combined: bool) -> Vec<Define> {
    let root = if combined {
        format!("{BINDLESS_BUFFER}.USER_ConstantsData")
    } else {
        USER_CONSTANTS_BUFFER.to_string()
    };

    fields
        .iter()
        .map(|field| Define {
            name: field.variable_name.clone(),
            value: format!("{root}.USER_{}", field.variable_name),
        })
        .collect()
}

/// Declares a local for every resource a function body mentions, reading the
/// descriptor through its slot in the index table.
fn inject_resource_lookups(result: &ParseResult, source: &str, edits: &mut EditList) {
    for function in &result.functions {
        let Some(body) = &function.body else {
            continue;
        };
        let Some(text) = source.get(body.clone()) else {
            continue;
        };

        let mut lookups = String::new();
        for variable in result.resources() {
            if !contains_word(text, &variable.name) {
                continue;
            }
            if lookups.is_empty() {
                lookups.push(' ');
            }
            lookups.push_str(&format!(
                "{signature} {name} = ({signature})ResourceDescriptorHeap[{BINDLESS_BUFFER}.IDX_{name}]; ",
                signature = variable.signature,
                name = variable.name,
            ));
        }

        if !lookups.is_empty() {
            edits.insert(body.start, lookups);
        }
    }
}

/// Whole-word search, so `albedo` does not match inside `albedoMask`.
fn contains_word(text: &str, word: &str) -> bool {
    let bytes = text.as_bytes();
    let is_word = |pos: Option<&u8>| pos.is_some_and(|byte| byte.is_ascii_alphanumeric() || *byte == b'_');
    text.match_indices(word).any(|(at, _)| {
        let before = at.checked_sub(1).and_then(|pos| bytes.get(pos));
        let after = bytes.get(at + word.len());
        !is_word(before) && !is_word(after)
    })
}
