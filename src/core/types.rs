//! SF-001: Schema model, directive values, compile config, and output types.
//!
//! The schema model is plain owned data: types own their fields, fields own
//! their directive instances. Directive targets are never stored as pointers;
//! `SchemaModel::directive_uses` computes `(directive, target)` pairs on demand.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plugin identifiers are plain strings (e.g. `"persist"`).
pub type PluginId = String;

/// Scalars every schema can reference without declaring them.
pub const BUILTIN_SCALARS: &[&str] = &["ID", "String", "Int", "Float", "Boolean"];

/// Directives understood by every GraphQL runtime; never reported as unsupported.
pub const BUILTIN_DIRECTIVES: &[&str] = &["deprecated", "specifiedBy", "include", "skip"];

// ============================================================================
// Source locations
// ============================================================================

/// 1-based line/column position in the schema text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ============================================================================
// Schema model
// ============================================================================

/// Kind of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Interface,
    Input,
    Enum,
    Scalar,
}

impl TypeKind {
    /// SDL keyword introducing this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Object => "type",
            Self::Interface => "interface",
            Self::Input => "input",
            Self::Enum => "enum",
            Self::Scalar => "scalar",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Interface => write!(f, "interface"),
            Self::Input => write!(f, "input"),
            Self::Enum => write!(f, "enum"),
            Self::Scalar => write!(f, "scalar"),
        }
    }
}

/// A reference to a type: named, list-wrapped, or non-null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: &str) -> Self {
        Self::Named(name.to_string())
    }

    pub fn non_null(self) -> Self {
        match self {
            Self::NonNull(_) => self,
            other => Self::NonNull(Box::new(other)),
        }
    }

    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// Strip an outer non-null wrapper, if any.
    pub fn nullable(&self) -> Self {
        match self {
            Self::NonNull(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }

    /// Innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(n) => n,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
            Self::Named(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{}", n),
            Self::List(inner) => write!(f, "[{}]", inner),
            Self::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// Literal value used in directive arguments and defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// String or enum symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Self::String(s) => write!(f, "{}", quote(s)),
            Self::Enum(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Quote a string as a GraphQL string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// A directive applied to a type, field, or enum value.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveInstance {
    pub name: String,
    /// Arguments in source order
    pub arguments: IndexMap<String, Value>,
    pub location: Location,
}

impl DirectiveInstance {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: IndexMap::new(),
            location: Location::default(),
        }
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).filter(|v| **v != Value::Null)
    }
}

/// Field argument or input field.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub type_ref: TypeRef,
    pub default_value: Option<Value>,
    pub directives: Vec<DirectiveInstance>,
}

impl InputValueDef {
    pub fn new(name: &str, type_ref: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            type_ref,
            default_value: None,
            directives: Vec::new(),
        }
    }
}

/// A field of an object, interface, or input type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDef>,
    pub type_ref: TypeRef,
    /// Only meaningful on input types
    pub default_value: Option<Value>,
    pub directives: Vec<DirectiveInstance>,
    pub location: Location,
}

impl FieldDef {
    pub fn new(name: &str, type_ref: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            arguments: Vec::new(),
            type_ref,
            default_value: None,
            directives: Vec::new(),
            location: Location::default(),
        }
    }

    pub fn with_argument(mut self, arg: InputValueDef) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn with_directive(mut self, directive: DirectiveInstance) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.iter().any(|d| d.name == name)
    }
}

/// A value of an enum type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<DirectiveInstance>,
    pub location: Location,
}

/// A named type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    pub interfaces: Vec<String>,
    pub directives: Vec<DirectiveInstance>,
    /// Fields keyed by name (order-preserving, names unique)
    pub fields: IndexMap<String, FieldDef>,
    pub enum_values: Vec<EnumValueDef>,
    pub location: Location,
}

impl TypeDef {
    pub fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: None,
            interfaces: Vec::new(),
            directives: Vec::new(),
            fields: IndexMap::new(),
            enum_values: Vec::new(),
            location: Location::default(),
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn with_directive(mut self, directive: DirectiveInstance) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.iter().any(|d| d.name == name)
    }

    /// Add a field. Fails if a field with the same name already exists.
    pub fn add_field(&mut self, field: FieldDef) -> Result<(), String> {
        if self.fields.contains_key(&field.name) {
            return Err(format!(
                "field '{}' already exists on type '{}'",
                field.name, self.name
            ));
        }
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }
}

/// Where a directive sits in the schema. Non-owning: names only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectiveTarget {
    Type(String),
    Field(FieldRef),
    EnumValue { type_name: String, value: String },
    Argument { field: FieldRef, argument: String },
}

impl DirectiveTarget {
    /// Owning type name.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Type(t) => t,
            Self::Field(f) => &f.type_name,
            Self::EnumValue { type_name, .. } => type_name,
            Self::Argument { field, .. } => &field.type_name,
        }
    }
}

impl fmt::Display for DirectiveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(t) => write!(f, "{}", t),
            Self::Field(field) => write!(f, "{}", field),
            Self::EnumValue { type_name, value } => write!(f, "{}.{}", type_name, value),
            Self::Argument { field, argument } => write!(f, "{}({}:)", field, argument),
        }
    }
}

/// A directive instance paired with the node it decorates.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveUse<'a> {
    pub directive: &'a DirectiveInstance,
    pub target: &'a TypeDef,
    pub field: Option<&'a FieldDef>,
    pub enum_value: Option<&'a EnumValueDef>,
    /// Set for directives on a field argument; `field` is the owning field
    pub argument: Option<&'a InputValueDef>,
}

impl DirectiveUse<'_> {
    pub fn name(&self) -> &str {
        &self.directive.name
    }

    /// True when the directive decorates a field itself, not one of its arguments.
    pub fn on_field(&self) -> bool {
        self.field.is_some() && self.argument.is_none()
    }

    pub fn target(&self) -> DirectiveTarget {
        if let (Some(field), Some(argument)) = (self.field, self.argument) {
            DirectiveTarget::Argument {
                field: FieldRef::new(&self.target.name, &field.name),
                argument: argument.name.clone(),
            }
        } else if let Some(field) = self.field {
            DirectiveTarget::Field(FieldRef::new(&self.target.name, &field.name))
        } else if let Some(value) = self.enum_value {
            DirectiveTarget::EnumValue {
                type_name: self.target.name.clone(),
                value: value.name.clone(),
            }
        } else {
            DirectiveTarget::Type(self.target.name.clone())
        }
    }

    /// Schema location of the decorated node's kind.
    pub fn location_kind(&self) -> DirectiveLocation {
        if self.argument.is_some() {
            DirectiveLocation::ArgumentDefinition
        } else if self.field.is_some() {
            if self.target.kind == TypeKind::Input {
                DirectiveLocation::InputFieldDefinition
            } else {
                DirectiveLocation::FieldDefinition
            }
        } else if self.enum_value.is_some() {
            DirectiveLocation::EnumValue
        } else {
            match self.target.kind {
                TypeKind::Object => DirectiveLocation::Object,
                TypeKind::Interface => DirectiveLocation::Interface,
                TypeKind::Input => DirectiveLocation::InputObject,
                TypeKind::Enum => DirectiveLocation::Enum,
                TypeKind::Scalar => DirectiveLocation::Scalar,
            }
        }
    }
}

/// Directive declared in the schema text itself (`directive @x(...) on ...`).
#[derive(Debug, Clone, PartialEq)]
pub struct SdlDirectiveDef {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDef>,
    pub repeatable: bool,
    pub locations: Vec<DirectiveLocation>,
    pub location: Location,
}

/// The whole schema: ordered type definitions plus declared directives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    pub types: IndexMap<String, TypeDef>,
    pub directive_defs: IndexMap<String, SdlDirectiveDef>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn get_type_mut(&mut self, name: &str) -> Option<&mut TypeDef> {
        self.types.get_mut(name)
    }

    pub fn field(&self, field: &FieldRef) -> Option<&FieldDef> {
        self.types
            .get(&field.type_name)
            .and_then(|t| t.fields.get(&field.field_name))
    }

    pub fn contains_field(&self, field: &FieldRef) -> bool {
        self.field(field).is_some()
    }

    /// Whether `name` is a declared type or a built-in scalar.
    pub fn is_known_type(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name) || self.types.contains_key(name)
    }

    /// Whether `name` resolves to a scalar or enum (leaf) type.
    pub fn is_leaf_type(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name)
            || self
                .types
                .get(name)
                .is_some_and(|t| matches!(t.kind, TypeKind::Scalar | TypeKind::Enum))
    }

    /// Add a new type. Fails if the name is taken.
    pub fn add_type(&mut self, ty: TypeDef) -> Result<(), String> {
        if self.is_known_type(&ty.name) {
            return Err(format!("type '{}' already exists", ty.name));
        }
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    /// Return the named type, creating an empty one of `kind` if absent.
    /// Fails if the existing type has a different kind.
    pub fn ensure_type(&mut self, name: &str, kind: TypeKind) -> Result<&mut TypeDef, String> {
        if BUILTIN_SCALARS.contains(&name) {
            return Err(format!("'{}' is a built-in scalar", name));
        }
        let ty = self
            .types
            .entry(name.to_string())
            .or_insert_with(|| TypeDef::new(name, kind));
        if ty.kind != kind {
            return Err(format!(
                "type '{}' exists as {} (expected {})",
                name, ty.kind, kind
            ));
        }
        Ok(ty)
    }

    /// Every directive instance in the schema, in document order.
    pub fn directive_uses(&self) -> Vec<DirectiveUse<'_>> {
        let mut uses = Vec::new();
        for ty in self.types.values() {
            for d in &ty.directives {
                uses.push(DirectiveUse {
                    directive: d,
                    target: ty,
                    field: None,
                    enum_value: None,
                    argument: None,
                });
            }
            for field in ty.fields.values() {
                for d in &field.directives {
                    uses.push(DirectiveUse {
                        directive: d,
                        target: ty,
                        field: Some(field),
                        enum_value: None,
                        argument: None,
                    });
                }
                for argument in &field.arguments {
                    for d in &argument.directives {
                        uses.push(DirectiveUse {
                            directive: d,
                            target: ty,
                            field: Some(field),
                            enum_value: None,
                            argument: Some(argument),
                        });
                    }
                }
            }
            for value in &ty.enum_values {
                for d in &value.directives {
                    uses.push(DirectiveUse {
                        directive: d,
                        target: ty,
                        field: None,
                        enum_value: Some(value),
                        argument: None,
                    });
                }
            }
        }
        uses
    }

    /// Directive instances with the given name, in document order.
    pub fn uses_of(&self, directive: &str) -> Vec<DirectiveUse<'_>> {
        self.directive_uses()
            .into_iter()
            .filter(|u| u.directive.name == directive)
            .collect()
    }
}

/// Reference to a field by owning type and field name. Displays as `Type.field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub type_name: String,
    pub field_name: String,
}

impl FieldRef {
    pub fn new(type_name: &str, field_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

// ============================================================================
// Directive shapes
// ============================================================================

/// Schema location a directive may be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveLocation {
    Object,
    Interface,
    InputObject,
    Enum,
    Scalar,
    FieldDefinition,
    InputFieldDefinition,
    ArgumentDefinition,
    EnumValue,
    /// Executable locations (QUERY, FIELD, ...); accepted but never matched
    Executable,
}

impl DirectiveLocation {
    pub fn from_sdl(name: &str) -> Option<Self> {
        match name {
            "OBJECT" => Some(Self::Object),
            "INTERFACE" => Some(Self::Interface),
            "INPUT_OBJECT" => Some(Self::InputObject),
            "ENUM" => Some(Self::Enum),
            "SCALAR" => Some(Self::Scalar),
            "FIELD_DEFINITION" => Some(Self::FieldDefinition),
            "INPUT_FIELD_DEFINITION" => Some(Self::InputFieldDefinition),
            "ARGUMENT_DEFINITION" => Some(Self::ArgumentDefinition),
            "ENUM_VALUE" => Some(Self::EnumValue),
            "QUERY" | "MUTATION" | "SUBSCRIPTION" | "FIELD" | "FRAGMENT_DEFINITION"
            | "FRAGMENT_SPREAD" | "INLINE_FRAGMENT" | "VARIABLE_DEFINITION" | "SCHEMA"
            | "UNION" => Some(Self::Executable),
            _ => None,
        }
    }
}

impl fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::InputObject => "INPUT_OBJECT",
            Self::Enum => "ENUM",
            Self::Scalar => "SCALAR",
            Self::FieldDefinition => "FIELD_DEFINITION",
            Self::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
            Self::ArgumentDefinition => "ARGUMENT_DEFINITION",
            Self::EnumValue => "ENUM_VALUE",
            Self::Executable => "EXECUTABLE",
        };
        write!(f, "{}", s)
    }
}

/// Expected kind of a directive argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
    Float,
    Boolean,
    /// Enum symbol; an empty list accepts any symbol
    Enum(Vec<String>),
    List(Box<ValueKind>),
    Object,
    Any,
}

impl ValueKind {
    /// Whether a (non-null) value has this kind. Single values coerce to
    /// one-element lists, ints coerce to floats.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (_, Value::Null) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Int, Value::Int(_)) => true,
            (Self::Float, Value::Float(_) | Value::Int(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Enum(symbols), Value::Enum(s)) => {
                symbols.is_empty() || symbols.iter().any(|sym| sym == s)
            }
            (Self::Object, Value::Object(_)) => true,
            (Self::List(inner), Value::List(items)) => items.iter().all(|i| inner.accepts(i)),
            (Self::List(inner), single) => inner.accepts(single),
            _ => false,
        }
    }

    /// Derive the kind of an SDL-declared argument type.
    pub fn from_type_ref(type_ref: &TypeRef, model: &SchemaModel) -> Self {
        match type_ref {
            TypeRef::NonNull(inner) => Self::from_type_ref(inner, model),
            TypeRef::List(inner) => Self::List(Box::new(Self::from_type_ref(inner, model))),
            TypeRef::Named(name) => match name.as_str() {
                "String" | "ID" => Self::String,
                "Int" => Self::Int,
                "Float" => Self::Float,
                "Boolean" => Self::Boolean,
                other => match model.get_type(other) {
                    Some(t) if t.kind == TypeKind::Enum => {
                        Self::Enum(t.enum_values.iter().map(|v| v.name.clone()).collect())
                    }
                    Some(t) if t.kind == TypeKind::Input => Self::Object,
                    _ => Self::Any,
                },
            },
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Enum(symbols) if symbols.is_empty() => write!(f, "enum"),
            Self::Enum(symbols) => write!(f, "one of {}", symbols.join("|")),
            Self::List(inner) => write!(f, "list of {}", inner),
            Self::Object => write!(f, "object"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Declared shape of one directive argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgShape {
    pub name: String,
    pub kind: ValueKind,
    pub required: bool,
}

/// Declared shape of a directive: arguments, locations, repeatability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDefinition {
    pub name: String,
    pub arguments: Vec<ArgShape>,
    pub locations: Vec<DirectiveLocation>,
    pub repeatable: bool,
}

impl DirectiveDefinition {
    pub fn new(name: &str, locations: &[DirectiveLocation]) -> Self {
        Self {
            name: name.to_string(),
            arguments: Vec::new(),
            locations: locations.to_vec(),
            repeatable: false,
        }
    }

    pub fn arg(mut self, name: &str, kind: ValueKind) -> Self {
        self.arguments.push(ArgShape {
            name: name.to_string(),
            kind,
            required: false,
        });
        self
    }

    pub fn required_arg(mut self, name: &str, kind: ValueKind) -> Self {
        self.arguments.push(ArgShape {
            name: name.to_string(),
            kind,
            required: true,
        });
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn argument(&self, name: &str) -> Option<&ArgShape> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

impl SdlDirectiveDef {
    /// Convert to a shape, resolving argument kinds against the model.
    pub fn shape(&self, model: &SchemaModel) -> DirectiveDefinition {
        DirectiveDefinition {
            name: self.name.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|a| ArgShape {
                    name: a.name.clone(),
                    kind: ValueKind::from_type_ref(&a.type_ref, model),
                    required: a.type_ref.is_non_null() && a.default_value.is_none(),
                })
                .collect(),
            locations: self.locations.clone(),
            repeatable: self.repeatable,
        }
    }
}

// ============================================================================
// Infrastructure graph
// ============================================================================

/// A single infrastructure resource definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfraResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties")]
    pub properties: IndexMap<String, serde_json::Value>,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl InfraResource {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties: IndexMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn depends_on(mut self, id: &str) -> Self {
        if !self.depends_on.iter().any(|d| d == id) {
            self.depends_on.push(id.to_string());
        }
        self
    }
}

/// A resource plus the plugin that contributed it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributedResource {
    pub resource: InfraResource,
    pub plugin: PluginId,
}

/// Logical resource id → definition. Keys unique, insertion order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfraGraph {
    resources: IndexMap<String, ContributedResource>,
}

impl InfraGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource. Re-inserting an identical definition is a no-op;
    /// a differing definition under the same id returns the existing owner.
    pub fn insert(
        &mut self,
        id: &str,
        resource: InfraResource,
        plugin: &str,
    ) -> Result<(), PluginId> {
        if let Some(existing) = self.resources.get(id) {
            if existing.resource == resource {
                return Ok(());
            }
            return Err(existing.plugin.clone());
        }
        self.resources.insert(
            id.to_string(),
            ContributedResource {
                resource,
                plugin: plugin.to_string(),
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ContributedResource> {
        self.resources.get(id)
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContributedResource)> {
        self.resources.iter()
    }
}

// ============================================================================
// Resolver pipelines
// ============================================================================

/// Execution slot of a resolver stage. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    Init,
    PreAuth,
    Auth,
    PostAuth,
    PreDataLoad,
    DataLoad,
    PostDataLoad,
    Finish,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::PreAuth => "preAuth",
            Self::Auth => "auth",
            Self::PostAuth => "postAuth",
            Self::PreDataLoad => "preDataLoad",
            Self::DataLoad => "dataLoad",
            Self::PostDataLoad => "postDataLoad",
            Self::Finish => "finish",
        };
        write!(f, "{}", s)
    }
}

/// A resolver pipeline stage as built by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub name: String,
    pub slot: Slot,
    /// Runs before the next stage (request mapping)
    pub before: String,
    /// Runs after the next stage returns (response mapping)
    pub after: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    pub commutative: bool,
}

impl Stage {
    pub fn new(name: &str, slot: Slot) -> Self {
        Self {
            name: name.to_string(),
            slot,
            before: String::new(),
            after: String::new(),
            data_source: None,
            commutative: false,
        }
    }

    pub fn before(mut self, template: impl Into<String>) -> Self {
        self.before = template.into();
        self
    }

    pub fn after(mut self, template: impl Into<String>) -> Self {
        self.after = template.into();
        self
    }

    pub fn data_source(mut self, id: &str) -> Self {
        self.data_source = Some(id.to_string());
        self
    }

    pub fn commutative(mut self) -> Self {
        self.commutative = true;
        self
    }
}

/// A stage tagged with the plugin that attached it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageContribution {
    pub plugin: PluginId,
    #[serde(flatten)]
    pub stage: Stage,
}

/// The composed, linear execution chain for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverPipeline {
    pub field: FieldRef,
    pub stages: Vec<StageContribution>,
}

impl ResolverPipeline {
    /// No contributions: the runtime's default field behavior applies.
    pub fn is_passthrough(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn data_sources(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter_map(|s| s.stage.data_source.as_deref())
            .collect()
    }
}

/// Generated operation a data source serves for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    Delete,
    Search,
}

impl Operation {
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Get | Self::List | Self::Search)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Search => "search",
        };
        write!(f, "{}", s)
    }
}

/// A field bound to a data source for a given type and operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBinding {
    pub operation: Operation,
    pub field: FieldRef,
    pub data_source: String,
    pub plugin: PluginId,
}

/// Checks deferred until every plugin has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The field's composed pipeline must load from some data source.
    FieldHasDataSource(FieldRef),
    /// Some plugin must have bound a data source to the type.
    TypeHasDataSource(String),
}

/// A requirement plus the plugin that deferred it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredCheck {
    pub plugin: PluginId,
    pub requirement: Requirement,
}

// ============================================================================
// Compile configuration
// ============================================================================

/// Compile configuration (`sdlforge.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Schema version (must be "1.0")
    #[serde(default = "default_version")]
    pub version: String,

    /// Project name (stamped into the infrastructure document)
    #[serde(default = "default_name")]
    pub name: String,

    /// Schema file, relative to the config file
    #[serde(default)]
    pub schema: Option<String>,

    /// Plugins to activate; empty activates every registered plugin
    #[serde(default)]
    pub plugins: Vec<PluginId>,

    /// Unknown directives are errors instead of warnings
    #[serde(default)]
    pub strict_mode: bool,

    /// Feature flags read by plugins
    #[serde(default)]
    pub feature_flags: IndexMap<String, FlagValue>,

    /// Compile policy
    #[serde(default)]
    pub policy: Policy,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: default_name(),
            schema: None,
            plugins: Vec::new(),
            strict_mode: false,
            feature_flags: IndexMap::new(),
            policy: Policy::default(),
        }
    }
}

impl CompileConfig {
    pub fn strict(mut self) -> Self {
        self.strict_mode = true;
        self
    }

    pub fn with_plugins(mut self, plugins: &[&str]) -> Self {
        self.plugins = plugins.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_flag(mut self, name: &str, value: FlagValue) -> Self {
        self.feature_flags.insert(name.to_string(), value);
        self
    }

    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.feature_flags.get(name)
    }

    pub fn flag_str(&self, name: &str) -> Option<&str> {
        match self.flag(name) {
            Some(FlagValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn flag_bool(&self, name: &str, default: bool) -> bool {
        match self.flag(name) {
            Some(FlagValue::Bool(b)) => *b,
            _ => default,
        }
    }

    /// Whether a plugin is activated by this config.
    pub fn activates(&self, plugin: &str) -> bool {
        self.plugins.is_empty() || self.plugins.iter().any(|p| p == plugin)
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_name() -> String {
    "schema".to_string()
}

/// Feature flag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Compile policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Run the read-only validate stage on worker threads
    #[serde(default)]
    pub parallel_validate: bool,

    /// Infrastructure document format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Remove plugin-owned directives from the rewritten schema
    #[serde(default = "default_true")]
    pub strip_owned_directives: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            parallel_validate: false,
            output_format: OutputFormat::default(),
            strip_owned_directives: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Rendered document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

// ============================================================================
// Compile stages
// ============================================================================

/// Orchestrator stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompileStage {
    Parse,
    Setup,
    Validate,
    TransformSchema,
    TransformResolvers,
    Finalize,
    Synthesize,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parse => "parse",
            Self::Setup => "setup",
            Self::Validate => "validate",
            Self::TransformSchema => "transform_schema",
            Self::TransformResolvers => "transform_resolvers",
            Self::Finalize => "finalize",
            Self::Synthesize => "synthesize",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Tests
// ============================================================================
