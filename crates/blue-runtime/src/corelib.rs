//! Built-in metadata for the minimal standard-library surface the
//! language depends on (`System.Object`, `System.String`, `System.Console`
//! and friends), exposed through `MetadataLoader` under the assembly name
//! `mscorlib`. Keeps the pipeline and its tests hermetic: no real runtime
//! is consulted.

use rustc_hash::FxHashMap;

use crate::backend::BackendError;
use crate::metadata::{
    AssemblyRef, ImportedGenre, ImportedMember, ImportedMethod, ImportedTypeInfo, MetadataLoader,
};

pub const CORELIB_NAME: &str = "mscorlib";

const OBJECT: &str = "System.Object";
const STRING: &str = "System.String";
const INT32: &str = "System.Int32";
const BOOL: &str = "System.Boolean";
const CHAR: &str = "System.Char";

pub struct CoreLib {
    types: Vec<ImportedTypeInfo>,
    members: FxHashMap<String, Vec<ImportedMember>>,
}

fn method(name: &str, ret: Option<&str>, params: &[&str]) -> ImportedMember {
    ImportedMember::Method(ImportedMethod {
        name: name.to_string(),
        is_static: false,
        is_virtual: false,
        is_ctor: false,
        is_special_name: false,
        ret: ret.map(str::to_string),
        params: params.iter().map(|p| p.to_string()).collect(),
    })
}

fn virtual_method(name: &str, ret: Option<&str>, params: &[&str]) -> ImportedMember {
    match method(name, ret, params) {
        ImportedMember::Method(mut m) => {
            m.is_virtual = true;
            ImportedMember::Method(m)
        }
        other => other,
    }
}

fn static_method(name: &str, ret: Option<&str>, params: &[&str]) -> ImportedMember {
    match method(name, ret, params) {
        ImportedMember::Method(mut m) => {
            m.is_static = true;
            ImportedMember::Method(m)
        }
        other => other,
    }
}

fn accessor(name: &str, ret: Option<&str>, params: &[&str], is_static: bool) -> ImportedMember {
    match method(name, ret, params) {
        ImportedMember::Method(mut m) => {
            m.is_special_name = true;
            m.is_static = is_static;
            ImportedMember::Method(m)
        }
        other => other,
    }
}

fn ctor(params: &[&str]) -> ImportedMember {
    ImportedMember::Method(ImportedMethod {
        name: ".ctor".to_string(),
        is_static: false,
        is_virtual: false,
        is_ctor: true,
        is_special_name: true,
        ret: None,
        params: params.iter().map(|p| p.to_string()).collect(),
    })
}

fn property(name: &str, ty: &str) -> ImportedMember {
    ImportedMember::Property {
        name: name.to_string(),
        ty: ty.to_string(),
        is_static: false,
        has_getter: true,
        has_setter: false,
        index_params: Vec::new(),
    }
}

impl CoreLib {
    #[must_use]
    pub fn new() -> Self {
        let mut lib = CoreLib {
            types: Vec::new(),
            members: FxHashMap::default(),
        };
        lib.populate();
        lib
    }

    fn class(&mut self, full_name: &str, super_name: Option<&str>, members: Vec<ImportedMember>) {
        self.add(full_name, ImportedGenre::Class, super_name, members);
    }

    fn value(&mut self, full_name: &str, members: Vec<ImportedMember>) {
        self.add(
            full_name,
            ImportedGenre::Struct,
            Some("System.ValueType"),
            members,
        );
    }

    fn interface(&mut self, full_name: &str, members: Vec<ImportedMember>) {
        self.add(full_name, ImportedGenre::Interface, None, members);
    }

    fn add(
        &mut self,
        full_name: &str,
        genre: ImportedGenre,
        super_name: Option<&str>,
        members: Vec<ImportedMember>,
    ) {
        self.types.push(ImportedTypeInfo {
            full_name: full_name.to_string(),
            genre,
            super_full_name: super_name.map(str::to_string),
            interfaces: Vec::new(),
            is_abstract: matches!(genre, ImportedGenre::Interface),
            is_sealed: false,
        });
        self.members.insert(full_name.to_string(), members);
    }

    fn populate(&mut self) {
        self.class(
            OBJECT,
            None,
            vec![
                ctor(&[]),
                virtual_method("ToString", Some(STRING), &[]),
                virtual_method("Equals", Some(BOOL), &[OBJECT]),
                virtual_method("GetHashCode", Some(INT32), &[]),
                method("GetType", Some("System.Type"), &[]),
            ],
        );
        self.class(
            STRING,
            Some(OBJECT),
            vec![
                accessor("get_Length", Some(INT32), &[], false),
                property("Length", INT32),
                accessor("get_Chars", Some(CHAR), &[INT32], false),
                static_method("Concat", Some(STRING), &[STRING, STRING]),
                static_method("Concat", Some(STRING), &[OBJECT, OBJECT]),
                accessor("op_Equality", Some(BOOL), &[STRING, STRING], true),
                accessor("op_Inequality", Some(BOOL), &[STRING, STRING], true),
            ],
        );
        self.class("System.ValueType", Some(OBJECT), vec![]);
        self.class("System.Enum", Some("System.ValueType"), vec![]);
        self.class(
            "System.Array",
            Some(OBJECT),
            vec![
                accessor("get_Length", Some(INT32), &[], false),
                property("Length", INT32),
            ],
        );
        self.class(
            "System.Exception",
            Some(OBJECT),
            vec![
                ctor(&[]),
                ctor(&[STRING]),
                accessor("get_Message", Some(STRING), &[], false),
                property("Message", STRING),
            ],
        );
        self.class(
            "System.Type",
            Some(OBJECT),
            vec![static_method(
                "GetTypeFromHandle",
                Some("System.Type"),
                &["System.RuntimeTypeHandle"],
            )],
        );
        self.class(
            "System.Delegate",
            Some(OBJECT),
            vec![
                static_method(
                    "Combine",
                    Some("System.Delegate"),
                    &["System.Delegate", "System.Delegate"],
                ),
                static_method(
                    "Remove",
                    Some("System.Delegate"),
                    &["System.Delegate", "System.Delegate"],
                ),
            ],
        );
        self.class("System.MulticastDelegate", Some("System.Delegate"), vec![]);
        self.class(
            "System.Console",
            Some(OBJECT),
            vec![
                static_method("WriteLine", None, &[]),
                static_method("WriteLine", None, &[STRING]),
                static_method("WriteLine", None, &[INT32]),
                static_method("WriteLine", None, &[CHAR]),
                static_method("WriteLine", None, &[BOOL]),
                static_method("WriteLine", None, &[OBJECT]),
                static_method("Write", None, &[STRING]),
                static_method("Write", None, &[INT32]),
                static_method("ReadLine", Some(STRING), &[]),
            ],
        );
        self.value(
            INT32,
            vec![
                static_method("Parse", Some(INT32), &[STRING]),
                virtual_method("ToString", Some(STRING), &[]),
                ImportedMember::Field {
                    name: "MaxValue".to_string(),
                    ty: INT32.to_string(),
                    is_static: true,
                    is_readonly: false,
                    literal: Some(i32::MAX),
                },
                ImportedMember::Field {
                    name: "MinValue".to_string(),
                    ty: INT32.to_string(),
                    is_static: true,
                    is_readonly: false,
                    literal: Some(i32::MIN),
                },
            ],
        );
        self.value(CHAR, vec![virtual_method("ToString", Some(STRING), &[])]);
        self.value(BOOL, vec![]);
        self.value("System.Void", vec![]);
        self.value("System.RuntimeTypeHandle", vec![]);
        self.value("System.IntPtr", vec![]);
        self.interface(
            "System.Collections.IEnumerator",
            vec![
                virtual_method("MoveNext", Some(BOOL), &[]),
                method("Reset", None, &[]),
                accessor("get_Current", Some(OBJECT), &[], false),
                property("Current", OBJECT),
            ],
        );
        self.interface(
            "System.Collections.IEnumerable",
            vec![virtual_method(
                "GetEnumerator",
                Some("System.Collections.IEnumerator"),
                &[],
            )],
        );
    }
}

impl Default for CoreLib {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataLoader for CoreLib {
    fn load_assembly(&mut self, name: &str) -> Result<AssemblyRef, BackendError> {
        if name == CORELIB_NAME {
            Ok(AssemblyRef(0))
        } else {
            Err(BackendError::AssemblyLoad(name.to_string()))
        }
    }

    fn public_types(&self, _asm: AssemblyRef) -> Vec<ImportedTypeInfo> {
        self.types.clone()
    }

    fn type_members(&self, _asm: AssemblyRef, full_name: &str) -> Option<Vec<ImportedMember>> {
        self.members.get(full_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corelib_loads_only_itself() {
        let mut lib = CoreLib::new();
        assert!(lib.load_assembly(CORELIB_NAME).is_ok());
        assert!(matches!(
            lib.load_assembly("NotALibrary"),
            Err(BackendError::AssemblyLoad(_))
        ));
    }

    #[test]
    fn console_has_writeline_overloads() {
        let lib = CoreLib::new();
        let members = lib
            .type_members(AssemblyRef(0), "System.Console")
            .expect("System.Console");
        let write_lines = members
            .iter()
            .filter(|m| matches!(m, ImportedMember::Method(m) if m.name == "WriteLine"))
            .count();
        assert!(write_lines >= 4);
    }

    #[test]
    fn value_types_sit_under_value_type() {
        let lib = CoreLib::new();
        let int32 = lib
            .public_types(AssemblyRef(0))
            .into_iter()
            .find(|t| t.full_name == INT32)
            .expect("Int32");
        assert_eq!(int32.genre, ImportedGenre::Struct);
        assert_eq!(int32.super_full_name.as_deref(), Some("System.ValueType"));
    }
}
