//! Registry of source files participating in a compilation.
//!
//! Files are registered once, up front, and addressed by `FileId`
//! everywhere else (tokens, spans, diagnostics, debug documents).

use serde::{Deserialize, Serialize};

/// Index of a registered source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    /// Marker for spans on synthesized nodes.
    pub const SYNTHETIC: FileId = FileId(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        FileId(raw)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.0 == u32::MAX
    }
}

/// A registered source file: display name plus full text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

/// The set of source files in a compilation.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, text: impl Into<String>) -> FileId {
        let id = FileId(u32::try_from(self.files.len()).unwrap_or(u32::MAX - 1));
        self.files.push(SourceFile {
            name: name.into(),
            text: text.into(),
        });
        id
    }

    #[must_use]
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    #[must_use]
    pub fn name(&self, id: FileId) -> &str {
        if id.is_synthetic() {
            return "<synthetic>";
        }
        &self.files[id.index()].name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, f)| (FileId(i as u32), f))
    }
}
