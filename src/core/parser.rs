//! SF-002: Schema and config parsing.
//!
//! Parses directive-annotated SDL into a `SchemaModel` and checks structural
//! constraints only:
//! - Identifiers are well-formed and not `__`-reserved
//! - Type names unique, field / enum value names unique per type
//! - Every named type reference resolves
//! - Directive arguments match any `directive` definition in the same text
//!
//! Directive semantics are left to the validate stage.

use super::error::SchemaParseError;
use super::types::*;
use indexmap::IndexMap;
use std::path::Path;

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    BlockStr(String),
    Punct(char),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Name(n) => format!("'{}'", n),
            Self::Int(i) => format!("number {}", i),
            Self::Float(x) => format!("number {}", x),
            Self::Str(_) | Self::BlockStr(_) => "string".to_string(),
            Self::Punct(c) => format!("'{}'", c),
            Self::Eof => "end of input".to_string(),
        }
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_ignored(&mut self) {
        while let Some(&c) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' | ',' | '\u{feff}' => {
                    self.bump();
                }
                '#' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, Location)>, SchemaParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ignored();
            let loc = self.location();
            let Some(&c) = self.chars.peek() else {
                tokens.push((Token::Eof, loc));
                return Ok(tokens);
            };
            let token = match c {
                '{' | '}' | '(' | ')' | '[' | ']' | ':' | '!' | '@' | '=' | '&' | '|' => {
                    self.bump();
                    Token::Punct(c)
                }
                '"' => self.string(loc)?,
                '-' | '0'..='9' => self.number(loc)?,
                c if c == '_' || c.is_ascii_alphabetic() => {
                    let mut name = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c == '_' || c.is_ascii_alphanumeric() {
                            name.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    Token::Name(name)
                }
                other => {
                    return Err(SchemaParseError::at(
                        loc,
                        format!("unexpected character '{}'", other),
                    ))
                }
            };
            tokens.push((token, loc));
        }
    }

    fn number(&mut self, loc: Location) -> Result<Token, SchemaParseError> {
        let mut text = String::new();
        let mut is_float = false;
        if self.chars.peek() == Some(&'-') {
            text.push('-');
            self.bump();
        }
        while let Some(&c) = self.chars.peek() {
            match c {
                '0'..='9' => text.push(c),
                '.' | 'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                }
                '+' | '-' if text.ends_with(['e', 'E']) => text.push(c),
                _ => break,
            }
            self.bump();
        }
        if let Some(&c) = self.chars.peek() {
            if c == '_' || c.is_ascii_alphabetic() {
                return Err(SchemaParseError::at(
                    loc,
                    format!("invalid number literal '{}{}'", text, c),
                ));
            }
        }
        let invalid = || SchemaParseError::at(loc, format!("invalid number literal '{}'", text));
        if is_float {
            text.parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Token::Float)
                .ok_or_else(invalid)
        } else {
            text.parse::<i64>().map(Token::Int).map_err(|_| invalid())
        }
    }

    fn string(&mut self, loc: Location) -> Result<Token, SchemaParseError> {
        self.bump();
        // Block string: """..."""
        if self.chars.peek() == Some(&'"') {
            self.bump();
            if self.chars.peek() == Some(&'"') {
                self.bump();
                return self.block_string(loc);
            }
            return Ok(Token::Str(String::new()));
        }
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(SchemaParseError::at(loc, "unterminated string"));
                }
                Some('"') => return Ok(Token::Str(value)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('u') => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match self.bump() {
                                    Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                                    _ => {
                                        return Err(SchemaParseError::at(
                                            loc,
                                            "invalid unicode escape",
                                        ))
                                    }
                                }
                            }
                            u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| {
                                    SchemaParseError::at(loc, "invalid unicode escape")
                                })?
                        }
                        other => {
                            return Err(SchemaParseError::at(
                                loc,
                                format!("invalid escape sequence '\\{}'", other.unwrap_or(' ')),
                            ))
                        }
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn block_string(&mut self, loc: Location) -> Result<Token, SchemaParseError> {
        let mut raw = String::new();
        let mut quotes = 0;
        loop {
            match self.bump() {
                None => return Err(SchemaParseError::at(loc, "unterminated block string")),
                Some('"') => {
                    quotes += 1;
                    if quotes == 3 {
                        return Ok(Token::BlockStr(dedent(&raw)));
                    }
                }
                Some(c) => {
                    for _ in 0..quotes {
                        raw.push('"');
                    }
                    quotes = 0;
                    raw.push(c);
                }
            }
        }
    }
}

/// Strip common indentation and blank leading/trailing lines.
fn dedent(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l))
        .min()
        .unwrap_or(0);
    let mut out: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 || leading_whitespace(l) < indent {
                l.trim().to_string()
            } else {
                l[indent..].trim_end().to_string()
            }
        })
        .collect();
    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Byte length of the leading run of spaces and tabs.
fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<(Token, Location)>,
    pos: usize,
}

type PResult<T> = Result<T, SchemaParseError>;

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn loc(&self) -> Location {
        self.tokens[self.pos].1
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_punct(&self, c: char) -> bool {
        *self.peek() == Token::Punct(c)
    }

    fn at_name(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Name(n) if n == name)
    }

    fn unexpected<T>(&self, expected: &str) -> PResult<T> {
        Err(SchemaParseError::at(
            self.loc(),
            format!("expected {}, found {}", expected, self.peek().describe()),
        ))
    }

    fn expect_punct(&mut self, c: char) -> PResult<()> {
        if self.at_punct(c) {
            self.advance();
            Ok(())
        } else {
            self.unexpected(&format!("'{}'", c))
        }
    }

    fn expect_name(&mut self) -> PResult<(String, Location)> {
        let loc = self.loc();
        match self.peek() {
            Token::Name(n) => {
                let n = n.clone();
                self.advance();
                Ok((n, loc))
            }
            _ => self.unexpected("a name"),
        }
    }

    /// A name that may be declared (types, fields, arguments, enum values).
    fn expect_definable_name(&mut self) -> PResult<(String, Location)> {
        let (name, loc) = self.expect_name()?;
        if name.starts_with("__") {
            return Err(SchemaParseError::at(
                loc,
                format!("name '{}' is reserved (starts with '__')", name),
            ));
        }
        Ok((name, loc))
    }

    fn description(&mut self) -> Option<String> {
        match self.peek() {
            Token::Str(s) | Token::BlockStr(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        }
    }

    fn document(&mut self) -> PResult<SchemaModel> {
        let mut model = SchemaModel::new();
        while *self.peek() != Token::Eof {
            let description = self.description();
            let loc = self.loc();
            let (keyword, _) = self.expect_name()?;
            match keyword.as_str() {
                "type" => self.object_like(&mut model, TypeKind::Object, description)?,
                "interface" => {
                    self.object_like(&mut model, TypeKind::Interface, description)?
                }
                "input" => self.input_type(&mut model, description)?,
                "enum" => self.enum_type(&mut model, description)?,
                "scalar" => {
                    let (name, name_loc) = self.expect_definable_name()?;
                    let mut ty = TypeDef::new(&name, TypeKind::Scalar);
                    ty.description = description;
                    ty.directives = self.directives()?;
                    ty.location = name_loc;
                    insert_type(&mut model, ty)?;
                }
                "directive" => self.directive_def(&mut model, description)?,
                "schema" | "extend" | "union" => {
                    return Err(SchemaParseError::at(
                        loc,
                        format!("'{}' definitions are not supported", keyword),
                    ))
                }
                other => {
                    return Err(SchemaParseError::at(
                        loc,
                        format!("expected a definition, found '{}'", other),
                    ))
                }
            }
        }
        Ok(model)
    }

    fn object_like(
        &mut self,
        model: &mut SchemaModel,
        kind: TypeKind,
        description: Option<String>,
    ) -> PResult<()> {
        let (name, name_loc) = self.expect_definable_name()?;
        let mut ty = TypeDef::new(&name, kind);
        ty.description = description;
        ty.location = name_loc;
        if self.at_name("implements") {
            self.advance();
            if self.at_punct('&') {
                self.advance();
            }
            loop {
                let (iface, iface_loc) = self.expect_name()?;
                if ty.interfaces.contains(&iface) {
                    return Err(SchemaParseError::at(
                        iface_loc,
                        format!("interface '{}' listed twice on '{}'", iface, name),
                    ));
                }
                ty.interfaces.push(iface);
                if self.at_punct('&') {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        ty.directives = self.directives()?;
        if self.at_punct('{') {
            self.advance();
            while !self.at_punct('}') {
                let field = self.field_def()?;
                if ty.fields.contains_key(&field.name) {
                    return Err(SchemaParseError::at(
                        field.location,
                        format!("duplicate field '{}' on type '{}'", field.name, name),
                    ));
                }
                ty.fields.insert(field.name.clone(), field);
            }
            self.advance();
        }
        insert_type(model, ty)
    }

    fn field_def(&mut self) -> PResult<FieldDef> {
        let description = self.description();
        let (name, loc) = self.expect_definable_name()?;
        let arguments = if self.at_punct('(') {
            self.argument_defs()?
        } else {
            Vec::new()
        };
        self.expect_punct(':')?;
        let type_ref = self.type_ref()?;
        let directives = self.directives()?;
        Ok(FieldDef {
            name,
            description,
            arguments,
            type_ref,
            default_value: None,
            directives,
            location: loc,
        })
    }

    fn argument_defs(&mut self) -> PResult<Vec<InputValueDef>> {
        self.expect_punct('(')?;
        let mut args: Vec<InputValueDef> = Vec::new();
        while !self.at_punct(')') {
            let (arg, loc) = self.input_value_def()?;
            if args.iter().any(|a| a.name == arg.name) {
                return Err(SchemaParseError::at(
                    loc,
                    format!("duplicate argument '{}'", arg.name),
                ));
            }
            args.push(arg);
        }
        self.advance();
        if args.is_empty() {
            return self.unexpected("at least one argument");
        }
        Ok(args)
    }

    fn input_value_def(&mut self) -> PResult<(InputValueDef, Location)> {
        let description = self.description();
        let (name, loc) = self.expect_definable_name()?;
        self.expect_punct(':')?;
        let type_ref = self.type_ref()?;
        let default_value = if self.at_punct('=') {
            self.advance();
            Some(self.value()?)
        } else {
            None
        };
        let directives = self.directives()?;
        Ok((
            InputValueDef {
                name,
                description,
                type_ref,
                default_value,
                directives,
            },
            loc,
        ))
    }

    fn input_type(
        &mut self,
        model: &mut SchemaModel,
        description: Option<String>,
    ) -> PResult<()> {
        let (name, name_loc) = self.expect_definable_name()?;
        let mut ty = TypeDef::new(&name, TypeKind::Input);
        ty.description = description;
        ty.location = name_loc;
        ty.directives = self.directives()?;
        if self.at_punct('{') {
            self.advance();
            while !self.at_punct('}') {
                let (value, loc) = self.input_value_def()?;
                if ty.fields.contains_key(&value.name) {
                    return Err(SchemaParseError::at(
                        loc,
                        format!("duplicate field '{}' on input '{}'", value.name, name),
                    ));
                }
                let field = FieldDef {
                    name: value.name.clone(),
                    description: value.description,
                    arguments: Vec::new(),
                    type_ref: value.type_ref,
                    default_value: value.default_value,
                    directives: value.directives,
                    location: loc,
                };
                ty.fields.insert(field.name.clone(), field);
            }
            self.advance();
        }
        insert_type(model, ty)
    }

    fn enum_type(
        &mut self,
        model: &mut SchemaModel,
        description: Option<String>,
    ) -> PResult<()> {
        let (name, name_loc) = self.expect_definable_name()?;
        let mut ty = TypeDef::new(&name, TypeKind::Enum);
        ty.description = description;
        ty.location = name_loc;
        ty.directives = self.directives()?;
        self.expect_punct('{')?;
        while !self.at_punct('}') {
            let description = self.description();
            let (value, loc) = self.expect_definable_name()?;
            if matches!(value.as_str(), "true" | "false" | "null") {
                return Err(SchemaParseError::at(
                    loc,
                    format!("'{}' cannot be an enum value", value),
                ));
            }
            if ty.enum_values.iter().any(|v| v.name == value) {
                return Err(SchemaParseError::at(
                    loc,
                    format!("duplicate enum value '{}' on '{}'", value, name),
                ));
            }
            let directives = self.directives()?;
            ty.enum_values.push(EnumValueDef {
                name: value,
                description,
                directives,
                location: loc,
            });
        }
        self.advance();
        if ty.enum_values.is_empty() {
            return Err(SchemaParseError::at(
                name_loc,
                format!("enum '{}' has no values", name),
            ));
        }
        insert_type(model, ty)
    }

    fn directive_def(
        &mut self,
        model: &mut SchemaModel,
        description: Option<String>,
    ) -> PResult<()> {
        self.expect_punct('@')?;
        let (name, name_loc) = self.expect_definable_name()?;
        let arguments = if self.at_punct('(') {
            self.argument_defs()?
        } else {
            Vec::new()
        };
        let repeatable = if self.at_name("repeatable") {
            self.advance();
            true
        } else {
            false
        };
        if !self.at_name("on") {
            return self.unexpected("'on'");
        }
        self.advance();
        if self.at_punct('|') {
            self.advance();
        }
        let mut locations = Vec::new();
        loop {
            let (loc_name, loc) = self.expect_name()?;
            let location = DirectiveLocation::from_sdl(&loc_name).ok_or_else(|| {
                SchemaParseError::at(loc, format!("unknown directive location '{}'", loc_name))
            })?;
            locations.push(location);
            if self.at_punct('|') {
                self.advance();
            } else {
                break;
            }
        }
        if model.directive_defs.contains_key(&name) {
            return Err(SchemaParseError::at(
                name_loc,
                format!("directive '@{}' is defined more than once", name),
            ));
        }
        model.directive_defs.insert(
            name.clone(),
            SdlDirectiveDef {
                name,
                description,
                arguments,
                repeatable,
                locations,
                location: name_loc,
            },
        );
        Ok(())
    }

    fn type_ref(&mut self) -> PResult<TypeRef> {
        let inner = if self.at_punct('[') {
            self.advance();
            let item = self.type_ref()?;
            self.expect_punct(']')?;
            TypeRef::List(Box::new(item))
        } else {
            let (name, _) = self.expect_name()?;
            TypeRef::Named(name)
        };
        if self.at_punct('!') {
            self.advance();
            Ok(TypeRef::NonNull(Box::new(inner)))
        } else {
            Ok(inner)
        }
    }

    fn directives(&mut self) -> PResult<Vec<DirectiveInstance>> {
        let mut out = Vec::new();
        while self.at_punct('@') {
            let loc = self.loc();
            self.advance();
            let (name, _) = self.expect_name()?;
            let mut arguments = IndexMap::new();
            if self.at_punct('(') {
                self.advance();
                while !self.at_punct(')') {
                    let (arg, arg_loc) = self.expect_name()?;
                    self.expect_punct(':')?;
                    let value = self.value()?;
                    if arguments.insert(arg.clone(), value).is_some() {
                        return Err(SchemaParseError::at(
                            arg_loc,
                            format!("duplicate argument '{}' on @{}", arg, name),
                        ));
                    }
                }
                self.advance();
            }
            out.push(DirectiveInstance {
                name,
                arguments,
                location: loc,
            });
        }
        Ok(out)
    }

    fn value(&mut self) -> PResult<Value> {
        let loc = self.loc();
        match self.advance() {
            Token::Int(i) => Ok(Value::Int(i)),
            Token::Float(x) => Ok(Value::Float(x)),
            Token::Str(s) | Token::BlockStr(s) => Ok(Value::String(s)),
            Token::Name(n) => Ok(match n.as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                "null" => Value::Null,
                _ => Value::Enum(n),
            }),
            Token::Punct('[') => {
                let mut items = Vec::new();
                while !self.at_punct(']') {
                    if *self.peek() == Token::Eof {
                        return self.unexpected("']'");
                    }
                    items.push(self.value()?);
                }
                self.advance();
                Ok(Value::List(items))
            }
            Token::Punct('{') => {
                let mut fields = IndexMap::new();
                while !self.at_punct('}') {
                    let (key, key_loc) = self.expect_name()?;
                    self.expect_punct(':')?;
                    let value = self.value()?;
                    if fields.insert(key.clone(), value).is_some() {
                        return Err(SchemaParseError::at(
                            key_loc,
                            format!("duplicate object field '{}'", key),
                        ));
                    }
                }
                self.advance();
                Ok(Value::Object(fields))
            }
            other => Err(SchemaParseError::at(
                loc,
                format!("expected a value, found {}", other.describe()),
            )),
        }
    }
}

fn insert_type(model: &mut SchemaModel, ty: TypeDef) -> PResult<()> {
    if BUILTIN_SCALARS.contains(&ty.name.as_str()) || model.types.contains_key(&ty.name) {
        return Err(SchemaParseError::at(
            ty.location,
            format!("duplicate type '{}'", ty.name),
        ));
    }
    model.types.insert(ty.name.clone(), ty);
    Ok(())
}

// ============================================================================
// Structural checks
// ============================================================================

fn check_type_ref(model: &SchemaModel, type_ref: &TypeRef, loc: Location) -> PResult<()> {
    let name = type_ref.base_name();
    if model.is_known_type(name) {
        Ok(())
    } else {
        Err(SchemaParseError::at(loc, format!("unknown type '{}'", name)))
    }
}

fn check_references(model: &SchemaModel) -> PResult<()> {
    for ty in model.types.values() {
        for iface in &ty.interfaces {
            match model.get_type(iface) {
                Some(t) if t.kind == TypeKind::Interface => {}
                Some(_) => {
                    return Err(SchemaParseError::at(
                        ty.location,
                        format!("'{}' implements '{}', which is not an interface", ty.name, iface),
                    ))
                }
                None => {
                    return Err(SchemaParseError::at(
                        ty.location,
                        format!("'{}' implements unknown interface '{}'", ty.name, iface),
                    ))
                }
            }
        }
        for field in ty.fields.values() {
            check_type_ref(model, &field.type_ref, field.location)?;
            for arg in &field.arguments {
                check_type_ref(model, &arg.type_ref, field.location)?;
            }
        }
    }
    for def in model.directive_defs.values() {
        for arg in &def.arguments {
            check_type_ref(model, &arg.type_ref, def.location)?;
        }
    }
    Ok(())
}

/// Kind-check directive argument literals against SDL-declared definitions.
fn check_declared_directives(model: &SchemaModel) -> PResult<()> {
    let shapes: IndexMap<&str, DirectiveDefinition> = model
        .directive_defs
        .iter()
        .map(|(name, def)| (name.as_str(), def.shape(model)))
        .collect();
    for use_ in model.directive_uses() {
        let Some(shape) = shapes.get(use_.name()) else {
            continue;
        };
        let loc = use_.directive.location;
        for (arg, value) in &use_.directive.arguments {
            let Some(arg_shape) = shape.argument(arg) else {
                return Err(SchemaParseError::at(
                    loc,
                    format!("unknown argument '{}' on @{}", arg, shape.name),
                ));
            };
            if !arg_shape.kind.accepts(value) {
                return Err(SchemaParseError::at(
                    loc,
                    format!(
                        "argument '{}' on @{} expects {}, found {}",
                        arg,
                        shape.name,
                        arg_shape.kind,
                        value.kind_name()
                    ),
                ));
            }
        }
        for arg_shape in shape.arguments.iter().filter(|a| a.required) {
            if use_.directive.argument(&arg_shape.name).is_none() {
                return Err(SchemaParseError::at(
                    loc,
                    format!(
                        "missing required argument '{}' on @{}",
                        arg_shape.name, shape.name
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Parse schema text into a model.
pub fn parse_schema(text: &str) -> Result<SchemaModel, SchemaParseError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let model = parser.document()?;
    check_references(&model)?;
    check_declared_directives(&model)?;
    Ok(model)
}

// ============================================================================
// Compile config
// ============================================================================

/// Parse an sdlforge.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<CompileConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse an sdlforge.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<CompileConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a config against the registered plugin ids. Returns a list of
/// problems (empty = valid).
pub fn validate_config(config: &CompileConfig, registered: &[&str]) -> Vec<String> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "version must be \"1.0\", got \"{}\"",
            config.version
        ));
    }

    if config.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }

    for (i, plugin) in config.plugins.iter().enumerate() {
        if !registered.contains(&plugin.as_str()) {
            errors.push(format!("unknown plugin '{}'", plugin));
        }
        if config.plugins[..i].contains(plugin) {
            errors.push(format!("plugin '{}' listed more than once", plugin));
        }
    }

    errors
}
