//! SF-009: Schema printer. Renders the final model back to SDL.
//!
//! Output is a pure function of the model: types in model order, fields in
//! field order, two-space indent, one blank line between definitions.
//! Directives whose name is in `strip` are omitted.

use super::types::*;

/// Print the whole schema.
pub fn print_schema(model: &SchemaModel, strip: &[&str]) -> String {
    let mut blocks = Vec::new();
    for def in model.directive_defs.values() {
        blocks.push(print_directive_def(def));
    }
    for ty in model.types.values() {
        blocks.push(print_type(ty, strip));
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn print_description(out: &mut String, description: &Option<String>, indent: &str) {
    let Some(text) = description else {
        return;
    };
    if text.contains('\n') {
        out.push_str(indent);
        out.push_str("\"\"\"\n");
        for line in text.lines() {
            if !line.is_empty() {
                out.push_str(indent);
                out.push_str(&line.replace("\"\"\"", "\\\"\"\""));
            }
            out.push('\n');
        }
        out.push_str(indent);
        out.push_str("\"\"\"\n");
    } else {
        out.push_str(indent);
        out.push_str(&quote(text));
        out.push('\n');
    }
}

fn print_directives(directives: &[DirectiveInstance], strip: &[&str]) -> String {
    let mut out = String::new();
    for d in directives.iter().filter(|d| !strip.contains(&d.name.as_str())) {
        out.push_str(" @");
        out.push_str(&d.name);
        if !d.arguments.is_empty() {
            let args: Vec<String> = d
                .arguments
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            out.push_str(&format!("({})", args.join(", ")));
        }
    }
    out
}

fn print_input_value(arg: &InputValueDef, strip: &[&str]) -> String {
    let mut s = String::new();
    match &arg.description {
        Some(text) if !text.contains('\n') => {
            s.push_str(&quote(text));
            s.push(' ');
        }
        description => print_description(&mut s, description, ""),
    }
    s.push_str(&format!("{}: {}", arg.name, arg.type_ref));
    if let Some(default) = &arg.default_value {
        s.push_str(&format!(" = {}", default));
    }
    s.push_str(&print_directives(&arg.directives, strip));
    s
}

fn print_arguments(args: &[InputValueDef], strip: &[&str]) -> String {
    if args.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = args.iter().map(|a| print_input_value(a, strip)).collect();
    format!("({})", parts.join(", "))
}

fn print_type(ty: &TypeDef, strip: &[&str]) -> String {
    let mut out = String::new();
    print_description(&mut out, &ty.description, "");
    out.push_str(ty.kind.keyword());
    out.push(' ');
    out.push_str(&ty.name);
    if !ty.interfaces.is_empty() {
        out.push_str(" implements ");
        out.push_str(&ty.interfaces.join(" & "));
    }
    out.push_str(&print_directives(&ty.directives, strip));

    match ty.kind {
        TypeKind::Scalar => {}
        TypeKind::Enum => {
            out.push_str(" {\n");
            for value in &ty.enum_values {
                print_description(&mut out, &value.description, "  ");
                out.push_str("  ");
                out.push_str(&value.name);
                out.push_str(&print_directives(&value.directives, strip));
                out.push('\n');
            }
            out.push('}');
        }
        TypeKind::Object | TypeKind::Interface | TypeKind::Input => {
            out.push_str(" {\n");
            for field in ty.fields.values() {
                print_description(&mut out, &field.description, "  ");
                out.push_str("  ");
                out.push_str(&field.name);
                out.push_str(&print_arguments(&field.arguments, strip));
                out.push_str(": ");
                out.push_str(&field.type_ref.to_string());
                if let Some(default) = &field.default_value {
                    out.push_str(&format!(" = {}", default));
                }
                out.push_str(&print_directives(&field.directives, strip));
                out.push('\n');
            }
            out.push('}');
        }
    }
    out
}

fn print_directive_def(def: &SdlDirectiveDef) -> String {
    let mut out = String::new();
    print_description(&mut out, &def.description, "");
    out.push_str("directive @");
    out.push_str(&def.name);
    out.push_str(&print_arguments(&def.arguments, &[]));
    if def.repeatable {
        out.push_str(" repeatable");
    }
    let locations: Vec<String> = def.locations.iter().map(|l| l.to_string()).collect();
    out.push_str(" on ");
    out.push_str(&locations.join(" | "));
    out
}
