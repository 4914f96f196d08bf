//! The `/xml` diagnostic dump: a summary of the parsed program written
//! with quick-xml's serde support.

use std::path::Path;

use serde::Serialize;

use blue_common::SourceMap;
use blue_parser::ast::{Member, Namespace, Program, TypeItem};

#[derive(Serialize)]
#[serde(rename = "program")]
struct ProgramDump {
    #[serde(rename = "file")]
    files: Vec<FileDump>,
}

#[derive(Serialize)]
struct FileDump {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "type")]
    types: Vec<TypeDump>,
}

#[derive(Serialize)]
struct TypeDump {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@kind")]
    kind: String,
    #[serde(rename = "member")]
    members: Vec<MemberDump>,
}

#[derive(Serialize)]
struct MemberDump {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@kind")]
    kind: String,
}

pub fn write_dump(
    path: &Path,
    program: &Program,
    sources: &SourceMap,
) -> Result<(), anyhow::Error> {
    let dump = build_dump(program, sources);
    let xml = quick_xml::se::to_string(&dump)?;
    std::fs::write(path, xml)?;
    Ok(())
}

fn build_dump(program: &Program, sources: &SourceMap) -> ProgramDump {
    let mut files = Vec::new();
    for (i, file) in program.files.iter().enumerate() {
        let name = sources
            .iter()
            .nth(i)
            .map(|(_, f)| f.name.clone())
            .unwrap_or_default();
        let mut types = Vec::new();
        collect_ns(file, &mut types);
        files.push(FileDump { name, types });
    }
    ProgramDump { files }
}

fn collect_ns(ns: &Namespace, out: &mut Vec<TypeDump>) {
    for nested in &ns.namespaces {
        collect_ns(nested, out);
    }
    for item in &ns.types {
        collect_item(item, out);
    }
}

fn collect_item(item: &TypeItem, out: &mut Vec<TypeDump>) {
    match item {
        TypeItem::Type(decl) => {
            let mut members = Vec::new();
            for member in &decl.members {
                match member {
                    Member::Field(f) => members.push(MemberDump {
                        name: f.name.clone(),
                        kind: "field".to_string(),
                    }),
                    Member::Method(m) => members.push(MemberDump {
                        name: m.name.clone(),
                        kind: if m.is_ctor { "ctor" } else { "method" }.to_string(),
                    }),
                    Member::Property(p) => members.push(MemberDump {
                        name: p.name.clone(),
                        kind: "property".to_string(),
                    }),
                    Member::Event(e) => members.push(MemberDump {
                        name: e.name.clone(),
                        kind: "event".to_string(),
                    }),
                    Member::Nested(nested) => collect_item(nested, out),
                }
            }
            out.push(TypeDump {
                name: decl.name.clone(),
                kind: format!("{:?}", decl.kind).to_lowercase(),
                members,
            });
        }
        TypeItem::Enum(decl) => out.push(TypeDump {
            name: decl.name.clone(),
            kind: "enum".to_string(),
            members: decl
                .members
                .iter()
                .map(|m| MemberDump {
                    name: m.name.clone(),
                    kind: "literal".to_string(),
                })
                .collect(),
        }),
        TypeItem::Delegate(decl) => out.push(TypeDump {
            name: decl.name.clone(),
            kind: "delegate".to_string(),
            members: Vec::new(),
        }),
    }
}
