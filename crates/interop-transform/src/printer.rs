//! Compact text views of the declaration tree, for tests and logs.
//!
//! These are debugging spellings, not a target-language renderer.

use std::fmt::Write;

use crate::{CodeAttribute, CodeUnit, MethodDecl, TypeBody, TypeDecl};

/// `Name(In Int32,Out IntPtr) As Int32`
pub fn signature(method: &MethodDecl) -> String {
    let params: Vec<String> = method
        .params
        .iter()
        .map(|p| format!("{} {}", p.direction.as_str(), p.ty))
        .collect();
    format!("{}({}) As {}", method.name, params.join(","), method.return_type)
}

/// One type, its attributes and its members, one per line.
pub fn print_type(decl: &TypeDecl) -> String {
    let mut out = String::new();
    write_attributes(&mut out, "", &decl.attributes);

    match &decl.body {
        TypeBody::Struct { fields } => {
            let _ = writeln!(out, "struct {}", decl.name);
            for field in fields {
                write_attributes(&mut out, "  ", &field.attributes);
                let _ = writeln!(out, "  {} {}", field.ty, field.name);
            }
        }
        TypeBody::Enum {
            underlying,
            members,
        } => {
            match underlying {
                Some(ty) => {
                    let _ = writeln!(out, "enum {} : {ty}", decl.name);
                }
                None => {
                    let _ = writeln!(out, "enum {}", decl.name);
                }
            }
            for member in members {
                let _ = writeln!(out, "  {} = {}", member.name, member.value.literal);
            }
        }
        TypeBody::Delegate(sig) => {
            let _ = writeln!(out, "delegate {}", signature(sig));
        }
        TypeBody::Class { fields, methods } => {
            let _ = writeln!(out, "class {}", decl.name);
            for field in fields {
                let constness = if field.is_const { "const " } else { "" };
                match &field.initializer {
                    Some(init) => {
                        let _ = writeln!(out, "  {constness}{} {} = {init}", field.ty, field.name);
                    }
                    None => {
                        let _ = writeln!(out, "  {constness}{} {}", field.ty, field.name);
                    }
                }
            }
            for method in methods {
                write_attributes(&mut out, "  ", &method.attributes);
                let _ = writeln!(out, "  {}", signature(method));
            }
        }
    }
    out
}

/// Every type in emission order, separated by blank lines.
pub fn print_unit(unit: &CodeUnit) -> String {
    unit.iter().map(print_type).collect::<Vec<_>>().join("\n")
}

fn write_attributes(out: &mut String, indent: &str, attributes: &[CodeAttribute]) {
    for attribute in attributes {
        let _ = writeln!(out, "{indent}[{attribute}]");
    }
}
