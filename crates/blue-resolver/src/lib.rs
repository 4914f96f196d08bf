//! Two-pass symbol resolver for the Blue compiler.
//!
//! This crate provides:
//! - `ResolveState` - scope tree, symbol arena, canonical type identity
//! - `Resolver` - the resolution passes: import referenced metadata,
//!   stub declared types (pass A), link inheritance and member signatures
//!   (pass A.2), resolve every body (pass B), then run the realization
//!   checks
//!
//! All diagnostics flow to the one `DiagnosticBag`; each local operation
//! returns a sentinel and keeps going, and the driver gates emission on
//! `has_errors`.

pub mod assignable;
mod bodies;
mod declare;
mod desugar;
mod exprs;
mod import;
mod link;
mod overload;
mod realize;
pub mod scope;
pub mod state;
pub mod symbols;

use tracing::{debug, debug_span};

use blue_common::{CompileOptions, DiagnosticBag};
use blue_parser::ast::Program;
use blue_runtime::{AssemblyRef, ImportedTypeInfo, MetadataLoader};
use rustc_hash::FxHashMap;

use blue_common::TypeId;

pub use state::{ResolveState, WellKnown};

pub struct Resolver<'a> {
    pub state: ResolveState,
    pub diags: &'a mut DiagnosticBag,
    opts: &'a CompileOptions,
    loader: &'a mut dyn MetadataLoader,
    /// Imported stubs pending their link phase.
    pending_imports: Vec<(TypeId, ImportedTypeInfo, AssemblyRef)>,
    /// Every type the compilation can name by full name (imported and
    /// declared); nested types use `+`.
    types_by_name: FxHashMap<String, TypeId>,
}

impl<'a> Resolver<'a> {
    /// Run the whole resolution pipeline over a parsed program.
    pub fn run(
        program: &mut Program,
        opts: &'a CompileOptions,
        loader: &'a mut dyn MetadataLoader,
        diags: &'a mut DiagnosticBag,
    ) -> ResolveState {
        let span = debug_span!("resolve");
        let _enter = span.enter();
        let mut resolver = Resolver {
            state: ResolveState::new(),
            diags,
            opts,
            loader,
            pending_imports: Vec::new(),
            types_by_name: FxHashMap::default(),
        };

        // Imported metadata first: stubs for every public type of every
        // referenced assembly, so declared code can name them.
        resolver.import_references();
        if !resolver.bind_well_known() {
            // Without the core library nothing downstream can type-check.
            return resolver.state;
        }
        resolver.link_imports();
        resolver.install_primitive_aliases();

        // Pass A: stubs for every declared type.
        resolver.declare_program(program);
        debug!(symbols = resolver.state.symbols.len(), "pass A complete");

        // Pass A.2: inheritance links and member signatures.
        resolver.link_program(program);

        // Override/abstractness checks need signatures only.
        resolver.check_overrides(program);

        // Pass B: bodies.
        resolver.resolve_bodies(program);

        // Interface realization runs over the fully linked world.
        resolver.check_interface_realization(program);

        resolver.state
    }
}
