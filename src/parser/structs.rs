use crate::error::{ParseError, ParseErrorKind, SourceLocation};
use crate::model::{ParseResult, PrimitiveType, Struct, StructField, Vocabulary};

use super::UnitParser;

const MEMBER_MODIFIERS: &[&str] = &[
    "row_major",
    "column_major",
    "linear",
    "centroid",
    "nointerpolation",
    "noperspective",
    "sample",
    "precise",
    "const",
    "static",
    "uniform",
];

/// Decodes a primitive type name such as `float`, `uint2` or `half3x3` into
/// its scalar type and shape. Returns `None` for anything that is not a
/// primitive.
pub fn decode_primitive(word: &str) -> Option<(PrimitiveType, u32, u32)> {
    if word == "matrix" {
        return Some((PrimitiveType::Float, 4, 4));
    }
    PrimitiveType::KEYWORDS
        .iter()
        .filter(|(_, ty)| *ty != PrimitiveType::Struct)
        .find_map(|(spelling, ty)| {
            let shape = word.strip_prefix(spelling)?;
            let (rows, columns) = decode_shape(shape)?;
            Some((*ty, rows, columns))
        })
}

/// `""`, `"N"` or `"NxM"` with dimensions between 1 and 4.
fn decode_shape(shape: &str) -> Option<(u32, u32)> {
    let dimension = |text: &str| text.parse::<u32>().ok().filter(|n| (1..=4).contains(n));
    match shape.split_once('x') {
        _ if shape.is_empty() => Some((1, 1)),
        Some((rows, columns)) => Some((dimension(rows)?, dimension(columns)?)),
        None => Some((dimension(shape)?, 1)),
    }
}

impl<'a> UnitParser<'a> {
    /// Records `struct Name { ... };` with the byte range of the whole
    /// definition. Forward declarations and `struct Name value;` pass through.
    pub(super) fn parse_struct(
        &mut self,
        result: &mut ParseResult,
        start: usize,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        self.cursor.skip_trivia();
        let name = self.cursor.read_identifier();
        self.cursor.skip_trivia();
        if !self.cursor.eat(b'{') {
            self.declaration_position = false;
            return Ok(());
        }

        let mut fields = Vec::new();
        loop {
            self.cursor.skip_trivia();
            match self.cursor.peek() {
                None => return Err(self.expected("'}' closing the struct")),
                Some(b'}') => {
                    self.cursor.bump();
                    break;
                }
                Some(_) => {
                    if let Some(field) = self.parse_struct_member()? {
                        fields.push(field);
                    }
                }
            }
        }

        let mut probe = self.cursor.clone();
        probe.skip_inline_whitespace();
        if probe.eat(b';') {
            self.cursor = probe;
        }

        let name = match name {
            "" => format!("Struct{}", result.structs.len()),
            name => name.to_string(),
        };
        if result.structs.contains_key(&name) {
            return Err(self.error(location, ParseErrorKind::DuplicateStruct(name)));
        }
        let span = self.is_root().then_some(start..self.cursor.pos());
        result.structs.insert(name.clone(), Struct { name, fields, span });

        self.declaration_position = true;
        Ok(())
    }

    /// `[modifiers] type[RxC] name[[N]] [: SEMANTIC];`
    ///
    /// Member functions are skipped and yield `None`.
    fn parse_struct_member(&mut self) -> Result<Option<StructField>, ParseError> {
        let start = self.cursor.pos();

        let mut type_name = self.read_member_word("a struct member type")?;
        while MEMBER_MODIFIERS.contains(&type_name) {
            self.cursor.skip_trivia();
            type_name = self.read_member_word("a struct member type")?;
        }
        self.cursor.skip_trivia();

        let (ty, rows, columns) = if self.cursor.peek() == Some(b'<') {
            self.parse_generic_type(type_name)?
        } else {
            decode_primitive(type_name).unwrap_or((PrimitiveType::Struct, 1, 1))
        };

        self.cursor.skip_trivia();
        let name = self.read_member_word("a struct member name")?;
        self.cursor.skip_trivia();

        if self.cursor.peek() == Some(b'(') {
            self.skip_member_function()?;
            return Ok(None);
        }

        let array_length = if self.cursor.eat(b'[') {
            self.cursor.skip_trivia();
            let length_location = self.cursor.location();
            let length = self.cursor.read_value_token();
            let Some(length) = length.parse::<u32>().ok() else {
                return Err(self.error(
                    length_location,
                    ParseErrorKind::InvalidValue {
                        name: format!("{name}[]"),
                        value: length.to_string(),
                    },
                ));
            };
            self.cursor.skip_trivia();
            if !self.cursor.eat(b']') {
                return Err(self.expected("']'"));
            }
            Some(length)
        } else {
            None
        };

        // semantics, packoffset and the like run up to the ';'
        loop {
            match self.cursor.peek() {
                Some(b';') => break,
                None | Some(b'}') => return Err(self.expected("';' after the struct member")),
                Some(_) => {
                    self.cursor.bump();
                }
            }
        }
        let declaration = self.cursor.slice(start..self.cursor.pos()).trim_end().to_string();
        self.cursor.bump();

        Ok(Some(StructField {
            ty,
            rows,
            columns,
            array_length,
            name: name.to_string(),
            declaration,
        }))
    }

    fn read_member_word(&mut self, expected: &'static str) -> Result<&'a str, ParseError> {
        match self.cursor.read_identifier() {
            "" => Err(self.expected(expected)),
            word => Ok(word),
        }
    }

    /// `matrix<T, R, C>` resolves to its scalar type and shape, any other
    /// generic member type counts as a struct.
    fn parse_generic_type(&mut self, type_name: &str) -> Result<(PrimitiveType, u32, u32), ParseError> {
        let open = self.cursor.pos();
        let mut depth = 0usize;
        loop {
            match self.cursor.bump() {
                None => return Err(self.expected("'>'")),
                Some(b'<') => depth += 1,
                Some(b'>') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
            }
        }
        if type_name != "matrix" {
            return Ok((PrimitiveType::Struct, 1, 1));
        }

        let arguments = self.cursor.slice(open + 1..self.cursor.pos() - 1);
        let parts: Vec<&str> = arguments.split(',').map(str::trim).collect();
        let decoded = match parts.as_slice() {
            [scalar, rows, columns] => decode_primitive(scalar)
                .filter(|(_, r, c)| (*r, *c) == (1, 1))
                .zip(decode_shape(rows).filter(|(_, c)| *c == 1))
                .zip(decode_shape(columns).filter(|(_, c)| *c == 1))
                .map(|(((ty, _, _), (rows, _)), (columns, _))| (ty, rows, columns)),
            _ => None,
        };
        decoded.ok_or_else(|| {
            self.error(
                self.cursor.location(),
                ParseErrorKind::InvalidValue {
                    name: "matrix".to_string(),
                    value: format!("<{arguments}>"),
                },
            )
        })
    }

    fn skip_member_function(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.cursor.bump() {
                None => return Err(self.expected("')'")),
                Some(b'(') => depth += 1,
                Some(b')') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
            }
        }
        self.cursor.skip_trivia();
        if self.cursor.eat(b';') {
            return Ok(());
        }
        if self.cursor.peek() != Some(b'{') {
            return Err(self.expected("a member function body"));
        }
        let mut depth = 0usize;
        loop {
            if self.cursor.skip_comment() {
                continue;
            }
            match self.cursor.bump() {
                None => return Err(self.expected("'}' closing the member function")),
                Some(b'{') => depth += 1,
                Some(b'}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
        }
    }
}
