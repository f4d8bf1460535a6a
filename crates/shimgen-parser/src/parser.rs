//! Parser implementation for C header declarations.
//!
//! Grammar (informal):
//!
//! ```text
//! header          = { defined_content } ;
//! defined_content = macro_block | directive | closing_brace | linkage_open
//!                 | typedef | tagged_definition | function | variable ;
//! macro_block     = ( "#if" | "#ifdef" | "#ifndef" ) LINE { defined_content } "#endif" LINE ;
//! directive       = "#define" NAME [ "(" names ")" ] LINE | "#include" PATH
//!                 | ( "#else" | "#elif" | "#error" | "#pragma" | "#undef" | ... ) LINE ;
//! function        = head "(" [ param_list ] ")" ( ";" | body ) ;
//! head            = { WORD | "*" } ;
//! param_list      = "void" | param [ "," param_list ] | "..." ;
//! ```
//!
//! Preprocessor content is recognized structurally and never expanded or
//! evaluated. Every branch of a conditional block contributes declarations.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::char,
    error::ErrorKind,
    IResult, Parser,
};
use shimgen_ast::{
    Declaration, EnumDef, EnumVariant, Field, Function, Header, Include, Macro, MacroBlock,
    Parameter, Position, Signature, Statement, StructDef, Tag, Typedef, TypedefTarget, TypeSpec,
};

/// Parse error type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// No alternative matched at `position`.
    Syntax {
        position: Position,
        /// The alternatives that were attempted.
        expected: Vec<&'static str>,
    },
    /// An `#if`/`#ifdef`/`#ifndef` reached end of input without `#endif`.
    UnterminatedMacroBlock {
        open_position: Position,
        directive: String,
    },
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseError::Syntax { position, expected } => {
                write!(f, "{}: parse error, expected {}", position, expected.join(" or "))
            }
            ParseError::UnterminatedMacroBlock {
                open_position,
                directive,
            } => write!(
                f,
                "{}: unterminated #{} block (no matching #endif)",
                open_position, directive
            ),
        }
    }
}

impl core::error::Error for ParseError {}

/// Why a sub-parser failed.
#[derive(Clone, Debug, PartialEq)]
enum Reason {
    Expected(&'static str),
    Alternatives(&'static [&'static str]),
    Unterminated(String),
    Nom(ErrorKind),
}

/// nom error carrying the remaining input and a reason.
#[derive(Clone, Debug, PartialEq)]
struct HeaderError<'a> {
    input: &'a str,
    reason: Reason,
}

impl<'a> nom::error::ParseError<&'a str> for HeaderError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self {
            input,
            reason: Reason::Nom(kind),
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> HeaderError<'a> {
    fn into_parse_error(self, source: &str) -> ParseError {
        let position = Position::locate(source, self.input);
        match self.reason {
            Reason::Unterminated(directive) => ParseError::UnterminatedMacroBlock {
                open_position: position,
                directive,
            },
            Reason::Expected(what) => ParseError::Syntax {
                position,
                expected: vec![what],
            },
            Reason::Alternatives(list) => ParseError::Syntax {
                position,
                expected: list.to_vec(),
            },
            Reason::Nom(kind) => ParseError::Syntax {
                position,
                expected: vec![match kind {
                    ErrorKind::Char => "punctuation",
                    ErrorKind::Tag => "keyword",
                    ErrorKind::TakeWhile1 => "identifier",
                    _ => "declaration",
                }],
            },
        }
    }
}

type PResult<'a, T> = IResult<&'a str, T, HeaderError<'a>>;

fn expected<'a>(input: &'a str, what: &'static str) -> nom::Err<HeaderError<'a>> {
    nom::Err::Error(HeaderError {
        input,
        reason: Reason::Expected(what),
    })
}

/// Alternatives tried for each `defined_content` item, in order.
const CONTENT_ALTERNATIVES: &[&str] = &[
    "preprocessor directive",
    "closing brace",
    "linkage block",
    "typedef",
    "struct or enum definition",
    "function declaration",
    "variable declaration",
];

const DIRECTIVES: &[&str] = &[
    "#if", "#ifdef", "#ifndef", "#define", "#include", "#else", "#elif", "#error", "#pragma",
    "#undef",
];

/// Directives consumed as a bare line.
const LINE_DIRECTIVES: &[&str] = &["else", "elif", "error", "warning", "pragma", "undef", "line"];

/// Words that only ever spell primitive types.
const PRIMITIVE_WORDS: &[&str] = &["void", "char", "short", "int", "long", "float", "double", "_Bool"];

/// Qualifiers with no effect on the boundary.
const IGNORED_QUALIFIERS: &[&str] = &[
    "volatile", "restrict", "__restrict", "__restrict__", "register", "auto",
];

/// Storage/inline keywords, kept as annotations.
const STORAGE_WORDS: &[&str] = &["extern", "static", "inline", "__inline", "__inline__"];

/// Parse a C header into its declarations.
pub fn parse_header(source: &str) -> Result<Header, ParseError> {
    let parser = HeaderParser { source };
    let mut declarations = Vec::new();
    let mut rest = skip_ws(source);
    while !rest.is_empty() {
        match parser.defined_content(rest) {
            Ok((next, decl)) => {
                declarations.push(decl);
                rest = skip_ws(next);
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(e.into_parse_error(source));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(ParseError::Syntax {
                    position: Position::locate(source, rest),
                    expected: CONTENT_ALTERNATIVES.to_vec(),
                });
            }
        }
    }
    Ok(Header::new(declarations))
}

/// Skip whitespace and comments.
///
/// ```text
/// LINE_COMMENT   ::= '//' [^\n]*
/// BLOCK_COMMENT  ::= '/*' .* '*/'
/// ```
fn skip_ws(input: &str) -> &str {
    let mut rest = input;
    loop {
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() && !rest.starts_with("//") && !rest.starts_with("/*") {
            break;
        }
        rest = trimmed;

        if rest.starts_with("//") {
            rest = match rest.find('\n') {
                Some(pos) => &rest[pos + 1..],
                None => "",
            };
            continue;
        }

        if rest.starts_with("/*") {
            rest = match rest.find("*/") {
                Some(pos) => &rest[pos + 2..],
                None => "",
            };
            continue;
        }
    }
    rest
}

/// Skip spaces and tabs, but not newlines.
fn skip_spaces(input: &str) -> &str {
    input.trim_start_matches([' ', '\t'])
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> PResult<'_, &str> {
    if !input.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(expected(input, "identifier"));
    }
    take_while1(is_ident_char).parse(input)
}

/// Match a whole word.
fn keyword<'a>(input: &'a str, word: &'static str) -> PResult<'a, &'a str> {
    let (rest, matched) = tag(word).parse(input)?;
    if rest.starts_with(is_ident_char) {
        return Err(expected(input, word));
    }
    Ok((rest, matched))
}

/// Match one punctuation character after optional whitespace.
fn punct<'a>(input: &'a str, c: char, what: &'static str) -> PResult<'a, char> {
    let input = skip_ws(input);
    char(c).parse(input).map_err(|_: nom::Err<HeaderError<'a>>| expected(input, what))
}

/// Read a logical preprocessor line, joining backslash continuations.
///
/// Comments are dropped. A block comment opened on the line runs to its `*/`,
/// even when that sits on a later physical line.
fn logical_line(input: &str) -> (&str, String) {
    let mut text = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        let after = &rest[c.len_utf8()..];
        if c == '\n' {
            return (after, text.trim().to_string());
        }
        if let Some(q) = quote {
            text.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            rest = after;
            continue;
        }
        rest = match c {
            '\\' if after.starts_with('\n') || after.starts_with("\r\n") => {
                text.push(' ');
                after
                    .strip_prefix("\r\n")
                    .or_else(|| after.strip_prefix('\n'))
                    .unwrap_or(after)
            }
            '"' | '\'' => {
                quote = Some(c);
                text.push(c);
                after
            }
            '/' if after.starts_with('/') => after.find('\n').map_or("", |nl| &after[nl..]),
            '/' if after.starts_with('*') => match after[1..].find("*/") {
                Some(end) => {
                    text.push(' ');
                    &after[end + 3..]
                }
                None => "",
            },
            '\r' if after.starts_with('\n') => after,
            _ => {
                text.push(c);
                after
            }
        };
    }
    (rest, text.trim().to_string())
}

/// Skip a balanced `open ... close` group starting at `input`.
///
/// String and character literals and comments inside the group are skipped.
fn skip_balanced(input: &str, open: char, close: char) -> PResult<'_, &str> {
    let (mut rest, _) = char(open).parse(input)?;
    let mut depth = 1usize;
    while depth > 0 {
        let after_ws = skip_ws(rest);
        let mut chars = after_ws.chars();
        let Some(c) = chars.next() else {
            return Err(expected(input, "closing bracket"));
        };
        rest = match c {
            '"' | '\'' => skip_literal(after_ws, c)?,
            _ if c == open => {
                depth += 1;
                chars.as_str()
            }
            _ if c == close => {
                depth -= 1;
                chars.as_str()
            }
            _ => chars.as_str(),
        };
    }
    Ok((rest, &input[..input.len() - rest.len()]))
}

/// Skip a string or character literal opened by `quote`.
fn skip_literal(input: &str, quote: char) -> Result<&str, nom::Err<HeaderError<'_>>> {
    let mut chars = input[quote.len_utf8()..].char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return Ok(&input[quote.len_utf8() + i + c.len_utf8()..]);
        }
    }
    Err(expected(input, "closing quote"))
}

/// Skip to and past the next `;` at bracket depth 0.
fn skip_statement(input: &str) -> PResult<'_, ()> {
    let mut rest = input;
    loop {
        rest = skip_ws(rest);
        let mut chars = rest.chars();
        match chars.next() {
            None => return Err(expected(input, "';'")),
            Some(';') => return Ok((chars.as_str(), ())),
            Some('{') => rest = skip_balanced(rest, '{', '}')?.0,
            Some('(') => rest = skip_balanced(rest, '(', ')')?.0,
            Some('[') => rest = skip_balanced(rest, '[', ']')?.0,
            Some(q @ ('"' | '\'')) => rest = skip_literal(rest, q)?,
            Some('}') => return Err(expected(rest, "';'")),
            Some(_) => rest = chars.as_str(),
        }
    }
}

/// Capture raw text up to the next `,` or `}` at depth 0, skipping comments.
fn raw_value(input: &str) -> (&str, String) {
    let mut text = String::new();
    let mut depth = 0usize;
    let mut rest = input;
    loop {
        let after_ws = skip_ws(rest);
        if after_ws.len() != rest.len() && !text.is_empty() {
            text.push(' ');
        }
        rest = after_ws;
        let mut chars = rest.chars();
        let Some(c) = chars.next() else { break };
        match c {
            ',' | '}' if depth == 0 => break,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        text.push(c);
        rest = chars.as_str();
    }
    (rest, text.trim().to_string())
}

/// Optional `[N]` suffix; `[]` yields an empty extent.
fn array_suffix(input: &str) -> PResult<'_, Option<String>> {
    let trimmed = skip_ws(input);
    if !trimmed.starts_with('[') {
        return Ok((input, None));
    }
    let (rest, group) = skip_balanced(trimmed, '[', ']')?;
    let inner = group[1..group.len() - 1].trim();
    Ok((rest, Some(inner.to_string())))
}

/// Words and pointer markers in front of a declarator.
#[derive(Debug)]
struct Head<'a> {
    words: Vec<&'a str>,
    stars: usize,
}

fn head(input: &str) -> PResult<'_, Head<'_>> {
    let mut words = Vec::new();
    let mut stars = 0;
    let mut rest = input;
    loop {
        let trimmed = skip_ws(rest);
        if let Some(after) = trimmed.strip_prefix('*') {
            stars += 1;
            rest = after;
            continue;
        }
        match identifier(trimmed) {
            Ok((after, word)) => {
                words.push(word);
                rest = after;
            }
            Err(_) => {
                rest = trimmed;
                break;
            }
        }
    }
    if words.is_empty() {
        return Err(expected(input, "type"));
    }
    Ok((rest, Head { words, stars }))
}

/// A head split into type, annotations and declarator name.
#[derive(Debug)]
struct Split<'a> {
    spec: TypeSpec,
    annotations: Vec<String>,
    name: Option<&'a str>,
}

/// Normalize primitive keyword sequences: `short int` → `short`, etc.
fn normalize_primitive(words: &[&str], is_signed: bool) -> String {
    let joined = words.join(" ");
    let name = match joined.as_str() {
        "" => "int",
        "short int" => "short",
        "long int" => "long",
        "long long int" => "long long",
        other => other,
    };
    if is_signed && name == "char" {
        "signed char".to_string()
    } else {
        name.to_string()
    }
}

/// Split head words into a type, leading annotations and an optional name.
///
/// The last word is the declarator name when something else already spells a
/// type; among remaining plain identifiers the last one is the type and the
/// rest are annotations such as `RLAPI`.
fn split_head<'a>(words: &[&'a str]) -> Option<Split<'a>> {
    let mut is_const = false;
    let mut is_unsigned = false;
    let mut is_signed = false;
    let mut tag: Option<(Tag, &str)> = None;
    let mut primitive: Vec<&str> = Vec::new();
    let mut plain: Vec<(usize, &'a str)> = Vec::new();
    let mut storage: Vec<(usize, &'a str)> = Vec::new();

    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        match word {
            "const" => is_const = true,
            "unsigned" => is_unsigned = true,
            "signed" => is_signed = true,
            "struct" | "union" | "enum" => {
                let kind = match word {
                    "struct" => Tag::Struct,
                    "union" => Tag::Union,
                    _ => Tag::Enum,
                };
                i += 1;
                let name = *words.get(i)?;
                tag = Some((kind, name));
            }
            w if PRIMITIVE_WORDS.contains(&w) => primitive.push(w),
            w if IGNORED_QUALIFIERS.contains(&w) => {}
            w if STORAGE_WORDS.contains(&w) => storage.push((i, w)),
            w => plain.push((i, w)),
        }
        i += 1;
    }

    if words.is_empty() {
        return None;
    }
    let keyword_base = tag.is_some() || !primitive.is_empty() || is_unsigned || is_signed;
    let last_index = words.len() - 1;
    let name = match plain.last() {
        Some(&(idx, word)) if idx == last_index && (keyword_base || plain.len() >= 2) => {
            plain.pop();
            Some(word)
        }
        _ => None,
    };

    let mut spec = if let Some((kind, tag_name)) = tag {
        TypeSpec::named(tag_name).with_tag(kind)
    } else if keyword_base {
        TypeSpec::named(&normalize_primitive(&primitive, is_signed))
    } else {
        let (_, base) = plain.pop()?;
        TypeSpec::named(base)
    };
    spec.is_const = is_const;
    spec.is_unsigned = is_unsigned;

    let mut annotated: Vec<(usize, &str)> = storage.into_iter().chain(plain).collect();
    annotated.sort_by_key(|(idx, _)| *idx);
    let annotations = annotated.into_iter().map(|(_, w)| w.to_string()).collect();

    Some(Split {
        spec,
        annotations,
        name,
    })
}

/// Whether the input continues with `( *`, i.e. a function-pointer declarator.
fn at_function_pointer(input: &str) -> bool {
    let trimmed = skip_ws(input);
    match trimmed.strip_prefix('(') {
        Some(after) => skip_ws(after).starts_with('*'),
        None => false,
    }
}

/// Parse `( * [name] ) ( params )` after a return-type head.
fn function_pointer<'a>(
    input: &'a str,
    head: &Head<'a>,
    return_type: TypeSpec,
) -> PResult<'a, (Option<&'a str>, Signature)> {
    let (rest, _) = punct(input, '(', "'('")?;
    let (rest, _) = punct(rest, '*', "'*'")?;
    let trimmed = skip_ws(rest);
    let (rest, name) = match identifier(trimmed) {
        Ok((rest, name)) => (rest, Some(name)),
        Err(_) => (trimmed, None),
    };
    let (rest, _) = punct(rest, ')', "')'")?;
    let (rest, _) = punct(rest, '(', "'('")?;
    let (rest, (params, is_variadic)) = param_list(rest)?;
    let (rest, _) = punct(rest, ')', "')'")?;
    Ok((
        rest,
        (
            name,
            Signature {
                return_type,
                return_pointer_depth: head.stars,
                params,
                is_variadic,
            },
        ),
    ))
}

/// Parse a parameter list up to (not including) the closing `)`.
///
/// The right-recursive `param [ "," rest ]` grammar is flattened into an
/// ordered list here.
fn param_list(input: &str) -> PResult<'_, (Vec<Parameter>, bool)> {
    let trimmed = skip_ws(input);
    if trimmed.starts_with(')') {
        return Ok((trimmed, (Vec::new(), false)));
    }
    if let Ok((rest, _)) = keyword(trimmed, "void") {
        if skip_ws(rest).starts_with(')') {
            return Ok((skip_ws(rest), (Vec::new(), false)));
        }
    }

    let mut params = Vec::new();
    let mut is_variadic = false;
    let mut current = trimmed;
    loop {
        let trimmed = skip_ws(current);
        if let Some(rest) = trimmed.strip_prefix("...") {
            is_variadic = true;
            current = skip_ws(rest);
            break;
        }
        let (rest, param) = parameter(trimmed, params.len())?;
        params.push(param);
        let rest = skip_ws(rest);
        if let Some(after) = rest.strip_prefix(',') {
            current = after;
            continue;
        }
        current = rest;
        break;
    }
    Ok((current, (params, is_variadic)))
}

/// Parse one parameter. Unnamed parameters are named `arg{index}`.
fn parameter(input: &str, index: usize) -> PResult<'_, Parameter> {
    let (rest, head) = head(input)?;
    let split = split_head(&head.words).ok_or_else(|| expected(input, "parameter"))?;

    if at_function_pointer(rest) {
        let (rest, (name, sig)) = function_pointer(rest, &head, split.spec.clone())?;
        let name = name.map_or_else(|| format!("arg{}", index), |n| n.to_string());
        let mut param = Parameter::new(split.spec, 0, &name);
        param.function_pointer = Some(Box::new(sig));
        return Ok((rest, param));
    }

    let (rest, array_len) = array_suffix(rest)?;
    let name = split
        .name
        .map_or_else(|| format!("arg{}", index), |n| n.to_string());
    let mut param = Parameter::new(split.spec, head.stars, &name);
    param.array_len = array_len;
    Ok((rest, param))
}

/// Parse `{ fields }` of a struct or union.
fn field_list(input: &str) -> PResult<'_, Vec<Field>> {
    let (mut rest, _) = punct(input, '{', "'{'")?;
    let mut fields = Vec::new();
    loop {
        rest = skip_ws(rest);
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((after, fields));
        }
        let (after, mut line) = field_line(rest)?;
        fields.append(&mut line);
        rest = after;
    }
}

/// Parse one field declaration, which may declare several fields.
fn field_line(input: &str) -> PResult<'_, Vec<Field>> {
    let (rest, first) = head(input)?;
    let split = split_head(&first.words).ok_or_else(|| expected(input, "field"))?;

    if at_function_pointer(rest) {
        let (rest, (name, sig)) = function_pointer(rest, &first, split.spec.clone())?;
        let name = name.ok_or_else(|| expected(input, "field name"))?;
        let (rest, _) = punct(rest, ';', "';'")?;
        let mut field = Field::new(split.spec, 0, name);
        field.function_pointer = Some(Box::new(sig));
        return Ok((rest, vec![field]));
    }

    let name = split.name.ok_or_else(|| expected(rest, "field name"))?;
    let mut fields = Vec::new();
    let mut declarator = (first.stars, name);
    let mut rest = rest;
    loop {
        let (after, array_len) = array_suffix(rest)?;
        let (after, bit_width) = match punct(after, ':', "':'") {
            Ok((after, _)) => {
                let (after, width) = raw_value_until_field_end(after);
                (after, Some(width))
            }
            Err(_) => (after, None),
        };
        let mut field = Field::new(split.spec.clone(), declarator.0, declarator.1);
        field.array_len = array_len;
        field.bit_width = bit_width;
        fields.push(field);

        let after = skip_ws(after);
        if let Some(next) = after.strip_prefix(';') {
            return Ok((next, fields));
        }
        let (after, _) = punct(after, ',', "',' or ';'")?;
        let mut stars = 0;
        let mut cursor = skip_ws(after);
        while let Some(next) = cursor.strip_prefix('*') {
            stars += 1;
            cursor = skip_ws(next);
        }
        let (after, name) = identifier(cursor)?;
        declarator = (stars, name);
        rest = after;
    }
}

/// Bit-field widths end at `;` or `,`.
fn raw_value_until_field_end(input: &str) -> (&str, String) {
    let trimmed = skip_ws(input);
    let end = trimmed.find([';', ',']).unwrap_or(trimmed.len());
    (&trimmed[end..], trimmed[..end].trim().to_string())
}

/// Parse `{ A = 1, B, ... }` of an enum.
fn variant_list(input: &str) -> PResult<'_, Vec<EnumVariant>> {
    let (mut rest, _) = punct(input, '{', "'{'")?;
    let mut variants = Vec::new();
    loop {
        rest = skip_ws(rest);
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((after, variants));
        }
        let (after, name) = identifier(rest)?;
        let after = skip_ws(after);
        let (after, value) = match after.strip_prefix('=') {
            Some(value_start) => {
                let (after, value) = raw_value(value_start);
                (after, Some(value))
            }
            None => (after, None),
        };
        variants.push(EnumVariant {
            name: name.to_string(),
            value,
        });
        let after = skip_ws(after);
        rest = match after.strip_prefix(',') {
            Some(next) => next,
            None if after.starts_with('}') => after,
            None => return Err(expected(after, "',' or '}'")),
        };
    }
}

/// A struct/union/enum keyword, optional tag and body.
enum TaggedBody<'a> {
    Struct {
        is_union: bool,
        tag: Option<&'a str>,
        fields: Vec<Field>,
    },
    Enum {
        tag: Option<&'a str>,
        variants: Vec<EnumVariant>,
    },
}

/// Parse `struct [Tag] { ... }`, `union [Tag] { ... }` or `enum [Tag] { ... }`.
fn tagged_body(input: &str) -> PResult<'_, TaggedBody<'_>> {
    let (rest, word) = identifier(input)?;
    let kind = match word {
        "struct" => Tag::Struct,
        "union" => Tag::Union,
        "enum" => Tag::Enum,
        _ => return Err(expected(input, "struct, union or enum")),
    };
    let trimmed = skip_ws(rest);
    let (rest, tag) = match identifier(trimmed) {
        Ok((rest, name)) => (rest, Some(name)),
        Err(_) => (trimmed, None),
    };
    if !skip_ws(rest).starts_with('{') {
        return Err(expected(rest, "'{'"));
    }
    match kind {
        Tag::Enum => {
            let (rest, variants) = variant_list(rest)?;
            Ok((rest, TaggedBody::Enum { tag, variants }))
        }
        _ => {
            let (rest, fields) = field_list(rest)?;
            Ok((
                rest,
                TaggedBody::Struct {
                    is_union: kind == Tag::Union,
                    tag,
                    fields,
                },
            ))
        }
    }
}

/// Parser state: the full source, for positions.
struct HeaderParser<'s> {
    source: &'s str,
}

type ContentParser<'s> = fn(&HeaderParser<'s>, &'s str) -> PResult<'s, Declaration>;

impl<'s> HeaderParser<'s> {
    fn position(&self, at: &str) -> Position {
        Position::locate(self.source, at)
    }

    /// Parse one item of header or block content.
    fn defined_content(&self, input: &'s str) -> PResult<'s, Declaration> {
        if input.starts_with('#') {
            return self.directive(input);
        }

        let alternatives: [ContentParser<'s>; 6] = [
            Self::closing_brace,
            Self::linkage_open,
            Self::typedef,
            Self::tagged_definition,
            Self::function,
            Self::variable,
        ];
        let mut furthest = input;
        for alternative in alternatives {
            match alternative(self, input) {
                Ok(ok) => return Ok(ok),
                Err(nom::Err::Error(e)) => {
                    if e.input.len() < furthest.len() {
                        furthest = e.input;
                    }
                }
                Err(other) => return Err(other),
            }
        }
        Err(nom::Err::Error(HeaderError {
            input: furthest,
            reason: Reason::Alternatives(CONTENT_ALTERNATIVES),
        }))
    }

    /// Parse a preprocessor directive or conditional block.
    fn directive(&self, input: &'s str) -> PResult<'s, Declaration> {
        let (rest, _) = char('#').parse(input)?;
        let rest = skip_spaces(rest);
        let (rest, word) = identifier(rest).map_err(|_| {
            nom::Err::Error(HeaderError {
                input,
                reason: Reason::Alternatives(DIRECTIVES),
            })
        })?;
        match word {
            "if" | "ifdef" | "ifndef" => self.macro_block(input, word, rest),
            "define" => define(rest),
            "include" => include(rest),
            w if LINE_DIRECTIVES.contains(&w) => {
                let (rest, text) = logical_line(rest);
                Ok((
                    rest,
                    Declaration::Macro(Macro::Directive {
                        keyword: w.to_string(),
                        text,
                    }),
                ))
            }
            _ => Err(nom::Err::Error(HeaderError {
                input,
                reason: Reason::Alternatives(DIRECTIVES),
            })),
        }
    }

    /// Parse a conditional block through its matching `#endif`.
    ///
    /// Reaching end of input first is a failure pointing at the opener.
    fn macro_block(
        &self,
        open: &'s str,
        directive: &str,
        input: &'s str,
    ) -> PResult<'s, Declaration> {
        let (mut rest, condition) = logical_line(input);
        let mut body = Vec::new();
        loop {
            rest = skip_ws(rest);
            if rest.is_empty() {
                return Err(nom::Err::Failure(HeaderError {
                    input: open,
                    reason: Reason::Unterminated(directive.to_string()),
                }));
            }
            if let Some(after) = endif(rest) {
                let block = MacroBlock {
                    directive: directive.to_string(),
                    condition,
                    body,
                    position: self.position(open),
                };
                return Ok((after, Declaration::Macro(Macro::Block(block))));
            }
            let (after, decl) = self.defined_content(rest)?;
            body.push(decl);
            rest = after;
        }
    }

    /// `}` closing an `extern "C" {` block.
    fn closing_brace(&self, input: &'s str) -> PResult<'s, Declaration> {
        let (rest, _) = char('}').parse(input)?;
        Ok((rest, Declaration::Statement(Statement::ClosingBrace)))
    }

    /// `extern "C" {`
    fn linkage_open(&self, input: &'s str) -> PResult<'s, Declaration> {
        let (rest, _) = keyword(input, "extern")?;
        let rest = skip_ws(rest);
        if !rest.starts_with('"') {
            return Err(expected(rest, "linkage string"));
        }
        let after = skip_literal(rest, '"')?;
        let abi = rest[1..rest.len() - after.len() - 1].to_string();
        let (rest, _) = punct(after, '{', "'{'")?;
        Ok((rest, Declaration::Statement(Statement::LinkageOpen { abi })))
    }

    /// Any `typedef`.
    fn typedef(&self, input: &'s str) -> PResult<'s, Declaration> {
        let (rest, _) = keyword(input, "typedef")?;
        let rest = skip_ws(rest);

        if let Ok((after, body)) = tagged_body(rest) {
            let (after, name) = identifier(skip_ws(after))?;
            let (after, _) = punct(after, ';', "';'")?;
            let decl = match body {
                TaggedBody::Struct { is_union, tag, fields } => Declaration::StructDef(StructDef {
                    name: name.to_string(),
                    tag: tag.map(ToString::to_string),
                    fields,
                    is_union,
                    is_typedef: true,
                    position: self.position(input),
                }),
                TaggedBody::Enum { tag, variants } => Declaration::EnumDef(EnumDef {
                    name: Some(name.to_string()),
                    tag: tag.map(ToString::to_string),
                    variants,
                }),
            };
            return Ok((after, decl));
        }

        let (after, head) = head(rest)?;
        let split = split_head(&head.words).ok_or_else(|| expected(rest, "typedef"))?;
        if at_function_pointer(after) {
            let (after, (name, sig)) = function_pointer(after, &head, split.spec)?;
            let name = name.ok_or_else(|| expected(after, "typedef name"))?;
            let (after, _) = punct(after, ';', "';'")?;
            return Ok((
                after,
                Declaration::Typedef(Typedef {
                    name: name.to_string(),
                    target: TypedefTarget::FunctionPointer(sig),
                }),
            ));
        }

        let name = split.name.ok_or_else(|| expected(after, "typedef name"))?;
        let (after, array_len) = array_suffix(after)?;
        let (after, _) = punct(after, ';', "';'")?;
        Ok((
            after,
            Declaration::Typedef(Typedef {
                name: name.to_string(),
                target: TypedefTarget::Type {
                    ty: split.spec,
                    pointer_depth: head.stars,
                    array_len,
                },
            }),
        ))
    }

    /// `struct Tag { ... };`, `enum { ... };` or a forward `struct Tag;`.
    fn tagged_definition(&self, input: &'s str) -> PResult<'s, Declaration> {
        if let Ok((rest, body)) = tagged_body(input) {
            // Trailing declarators (`struct X { ... } x;`) are not tracked.
            let (rest, _) = skip_statement(rest)?;
            let decl = match body {
                TaggedBody::Struct { is_union, tag, fields } => {
                    let name = tag.ok_or_else(|| expected(input, "struct tag"))?;
                    Declaration::StructDef(StructDef {
                        name: name.to_string(),
                        tag: Some(name.to_string()),
                        fields,
                        is_union,
                        is_typedef: false,
                        position: self.position(input),
                    })
                }
                TaggedBody::Enum { tag, variants } => Declaration::EnumDef(EnumDef {
                    name: None,
                    tag: tag.map(ToString::to_string),
                    variants,
                }),
            };
            return Ok((rest, decl));
        }

        let (rest, head) = head(input)?;
        let split = split_head(&head.words).ok_or_else(|| expected(input, "struct tag"))?;
        if split.spec.tag.is_none() || split.name.is_some() || head.stars > 0 {
            return Err(expected(input, "struct or enum definition"));
        }
        let (rest, _) = punct(rest, ';', "';'")?;
        Ok((
            rest,
            Declaration::Statement(Statement::ForwardDeclaration { ty: split.spec }),
        ))
    }

    /// A function declaration, or an inline definition whose body is skipped.
    fn function(&self, input: &'s str) -> PResult<'s, Declaration> {
        let (rest, head) = head(input)?;
        let split = split_head(&head.words).ok_or_else(|| expected(input, "return type"))?;
        let name = split.name.ok_or_else(|| expected(rest, "function name"))?;
        let (rest, _) = punct(rest, '(', "'('")?;
        let (rest, (params, is_variadic)) = param_list(rest)?;
        let (rest, _) = punct(rest, ')', "')'")?;

        let rest = skip_ws(rest);
        let (rest, has_body) = if let Some(after) = rest.strip_prefix(';') {
            (after, false)
        } else if rest.starts_with('{') {
            (skip_balanced(rest, '{', '}')?.0, true)
        } else {
            return Err(expected(rest, "';' or function body"));
        };

        Ok((
            rest,
            Declaration::Function(Function {
                name: name.to_string(),
                annotations: split.annotations,
                signature: Signature {
                    return_type: split.spec,
                    return_pointer_depth: head.stars,
                    params,
                    is_variadic,
                },
                has_body,
                position: self.position(input),
            }),
        ))
    }

    /// A variable or enum-variable declaration; any initializer is skipped.
    fn variable(&self, input: &'s str) -> PResult<'s, Declaration> {
        let (rest, head) = head(input)?;
        let split = split_head(&head.words).ok_or_else(|| expected(input, "type"))?;
        let name = split.name.ok_or_else(|| expected(rest, "variable name"))?;
        let after = skip_ws(rest);
        if !after.starts_with(['[', '=', ';', ',']) {
            return Err(expected(after, "';'"));
        }
        let (rest, _) = skip_statement(after)?;
        Ok((
            rest,
            Declaration::Statement(Statement::Variable {
                ty: split.spec,
                pointer_depth: head.stars,
                name: name.to_string(),
            }),
        ))
    }
}

/// Match `#endif` and the rest of its line.
fn endif(input: &str) -> Option<&str> {
    let rest = input.strip_prefix('#')?;
    let rest = skip_spaces(rest);
    let (rest, _) = keyword(rest, "endif").ok()?;
    let (rest, _) = logical_line(rest);
    Some(rest)
}

/// `#define NAME body` or `#define NAME(params) body`.
fn define(input: &str) -> PResult<'_, Declaration> {
    let rest = skip_spaces(input);
    let (rest, name) = identifier(rest)?;
    let (rest, params) = if rest.starts_with('(') {
        let (after, group) = skip_balanced(rest, '(', ')')?;
        let inner = &group[1..group.len() - 1];
        let params = inner
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect();
        (after, Some(params))
    } else {
        (rest, None)
    };
    let (rest, body) = logical_line(rest);
    Ok((
        rest,
        Declaration::Macro(Macro::Define {
            name: name.to_string(),
            params,
            body,
        }),
    ))
}

/// `#include <path>` or `#include "path"`.
fn include(input: &str) -> PResult<'_, Declaration> {
    let rest = skip_spaces(input);
    let (close, system) = match rest.chars().next() {
        Some('<') => ('>', true),
        Some('"') => ('"', false),
        _ => return Err(expected(rest, "include path")),
    };
    let body = &rest[1..];
    let end = body
        .find(close)
        .ok_or_else(|| expected(rest, "include path"))?;
    let path = body[..end].to_string();
    let (rest, _) = logical_line(&body[end + 1..]);
    Ok((rest, Declaration::Include(Include { path, system })))
}
