//! Parser integration tests: source text in, AST shape out.

use blue_common::FileId;
use blue_parser::Parser;
use blue_parser::ast::{
    ExprKind, Member, Modifiers, Namespace, SectionIdGen, Stmt, StmtKind, TypeItem, TypeKind,
    TypeRefKind,
};

fn parse_ok(text: &str) -> Namespace {
    let mut sections = SectionIdGen::new();
    let result = Parser::parse_file(FileId::from_raw(0), text, &[], &mut sections);
    assert!(
        !result.failed,
        "parse failed: {:?}",
        result.diags.iter().map(|d| &d.message).collect::<Vec<_>>()
    );
    result.file
}

fn parse_err(text: &str) -> Vec<blue_common::Diagnostic> {
    let mut sections = SectionIdGen::new();
    let result = Parser::parse_file(FileId::from_raw(0), text, &[], &mut sections);
    assert!(result.failed, "expected a parse failure");
    result.diags
}

fn first_type(ns: &Namespace) -> &TypeItem {
    ns.types
        .first()
        .or_else(|| ns.namespaces.first().and_then(|n| n.types.first()))
        .expect("no types parsed")
}

fn body_of<'a>(item: &'a TypeItem, name: &str) -> &'a [Stmt] {
    let TypeItem::Type(decl) = item else {
        panic!("not a class")
    };
    for member in &decl.members {
        if let Member::Method(m) = member {
            if m.name == name {
                return &m.body.as_ref().expect("no body").stmts;
            }
        }
    }
    panic!("no method {name}")
}

#[test]
fn hello_world_shape() {
    let ns = parse_ok(
        r#"class P {
            static void Main() {
                System.Console.WriteLine("hi");
            }
        }"#,
    );
    let item = first_type(&ns);
    let TypeItem::Type(decl) = item else {
        panic!()
    };
    assert_eq!(decl.kind, TypeKind::Class);
    assert_eq!(decl.name, "P");
    let stmts = body_of(item, "Main");
    assert_eq!(stmts.len(), 1);
    let StmtKind::Expr(call) = &stmts[0].kind else {
        panic!("expected an expression statement")
    };
    assert!(matches!(call.kind, ExprKind::Call(_)));
}

#[test]
fn namespaces_nest_and_carry_usings() {
    let ns = parse_ok(
        "using System;\nnamespace A.B {\n using System;\n namespace C { class X {} }\n class Y {}\n}",
    );
    assert_eq!(ns.usings.len(), 1);
    assert_eq!(ns.usings[0].path, vec!["System"]);
    assert_eq!(ns.namespaces.len(), 1);
    let ab = &ns.namespaces[0];
    assert_eq!(ab.name, vec!["A", "B"]);
    assert_eq!(ab.usings.len(), 1);
    assert_eq!(ab.namespaces[0].name, vec!["C"]);
    assert_eq!(ab.types.len(), 1);
}

#[test]
fn ctor_chain_becomes_leading_statement() {
    let ns = parse_ok("class C { C(int x) : base() { } }");
    let stmts = body_of(first_type(&ns), "C");
    assert!(matches!(stmts[0].kind, StmtKind::CtorChain(_)));
}

#[test]
fn local_declaration_with_named_type() {
    let ns = parse_ok("class C { void M() { Foo.Bar x = null; x = null; } }");
    let stmts = body_of(first_type(&ns), "M");
    assert!(matches!(stmts[0].kind, StmtKind::LocalDecl(_)));
    assert!(matches!(stmts[1].kind, StmtKind::Expr(_)));
}

#[test]
fn array_declaration_and_rank_tokens() {
    let ns = parse_ok("class C { void M() { int[] a = new int[3]; Foo[] b; } }");
    let stmts = body_of(first_type(&ns), "M");
    let StmtKind::LocalDecl(decl) = &stmts[0].kind else {
        panic!()
    };
    assert!(matches!(decl.ty.kind, TypeRefKind::Array { rank: 1, .. }));
    assert!(matches!(stmts[1].kind, StmtKind::LocalDecl(_)));
}

#[test]
fn cast_versus_parenthesized() {
    let ns = parse_ok("class C { void M(object o) { int a = (int)o; int b = (a) - 1; } }");
    let stmts = body_of(first_type(&ns), "M");
    let StmtKind::LocalDecl(d0) = &stmts[0].kind else {
        panic!()
    };
    assert!(matches!(
        d0.vars[0].init.as_ref().unwrap().kind,
        ExprKind::Cast(_)
    ));
    let StmtKind::LocalDecl(d1) = &stmts[1].kind else {
        panic!()
    };
    assert!(matches!(
        d1.vars[0].init.as_ref().unwrap().kind,
        ExprKind::Binary(_)
    ));
}

#[test]
fn labels_and_goto() {
    let ns = parse_ok("class C { void M() { top: M(); goto top; } }");
    let stmts = body_of(first_type(&ns), "M");
    assert!(matches!(stmts[0].kind, StmtKind::Label { .. }));
    assert!(matches!(stmts[1].kind, StmtKind::Goto { .. }));
}

#[test]
fn properties_indexers_events_operators() {
    let ns = parse_ok(
        "class C {
            int n;
            public int Count { get { return n; } set { n = value; } }
            public int this[int i] { get { return i; } }
            public event Handler Changed;
            public static C operator+(C a, C b) { return a; }
        }",
    );
    let TypeItem::Type(decl) = first_type(&ns) else {
        panic!()
    };
    let mut saw_prop = false;
    let mut saw_indexer = false;
    let mut saw_event = false;
    let mut saw_op = false;
    for m in &decl.members {
        match m {
            Member::Property(p) if p.name == "Count" => saw_prop = true,
            Member::Property(p) if p.name == "Item" => {
                saw_indexer = true;
                assert_eq!(p.params.len(), 1);
            }
            Member::Event(_) => saw_event = true,
            Member::Method(m) if m.name == "op_Addition" => {
                saw_op = true;
                assert!(m.is_special);
            }
            _ => {}
        }
    }
    assert!(saw_prop && saw_indexer && saw_event && saw_op);
}

#[test]
fn switch_and_foreach_surface() {
    let ns = parse_ok(
        "class C { int M(int[] a) {
            int s = 0;
            foreach (int x in a) { s += x; }
            switch (s) { case 0: return 1; case 1: case 2: break; default: s = 9; break; }
            return s;
        } }",
    );
    let stmts = body_of(first_type(&ns), "M");
    assert!(matches!(stmts[1].kind, StmtKind::Foreach(_)));
    let StmtKind::Switch(sw) = &stmts[2].kind else {
        panic!()
    };
    assert_eq!(sw.sections.len(), 3);
    assert_eq!(sw.sections[1].labels.len(), 2);
}

#[test]
fn duplicate_modifier_is_reported() {
    let diags = parse_err("class C { public public int x; }");
    assert!(
        diags
            .iter()
            .any(|d| d.code == blue_common::DiagnosticCode::DuplicateModifier)
    );
}

#[test]
fn multi_dimensional_arrays_are_rejected() {
    let diags = parse_err("class C { void M() { int[,] a; } }");
    assert!(
        diags
            .iter()
            .any(|d| d.code == blue_common::DiagnosticCode::NotYetImplemented)
    );
}

#[test]
fn lock_statement_is_rejected() {
    let diags = parse_err("class C { void M() { lock (this) { } } }");
    assert!(
        diags
            .iter()
            .any(|d| d.code == blue_common::DiagnosticCode::NotYetImplemented)
    );
}

#[test]
fn parser_recovers_and_keeps_going() {
    let mut sections = SectionIdGen::new();
    let result = Parser::parse_file(
        FileId::from_raw(0),
        "class C { void M() { int = 5; } void N() { } }",
        &[],
        &mut sections,
    );
    assert!(result.failed);
    // Recovery keeps the rest of the type: N still parsed.
    let TypeItem::Type(decl) = &result.file.types[0] else {
        panic!()
    };
    assert!(
        decl.members
            .iter()
            .any(|m| matches!(m, Member::Method(m) if m.name == "N"))
    );
}

#[test]
fn modifier_bits_accumulate() {
    let ns = parse_ok("class C { public static int x; }");
    let TypeItem::Type(decl) = first_type(&ns) else {
        panic!()
    };
    let Member::Field(f) = &decl.members[0] else {
        panic!()
    };
    assert!(f.mods.contains(Modifiers::PUBLIC | Modifiers::STATIC));
}
