//! A parsed source file with its module path and line table.

use std::path::{Component, Path, PathBuf};

use banned_api_core::Span;

/// One Rust file of the analysed tree.
pub struct SourceFile {
    /// Path relative to the analysed root.
    pub relative_path: PathBuf,
    /// File contents.
    pub content: String,
    /// Parsed syntax tree.
    pub ast: syn::File,
    /// Canonical module path, e.g. `crate::legacy::client`.
    pub module: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Parses `content`.
    ///
    /// # Errors
    ///
    /// Returns the `syn` error if the file is not valid Rust.
    pub fn parse(relative_path: PathBuf, content: String) -> syn::Result<Self> {
        let ast = syn::parse_file(&content)?;
        let module = module_path(&relative_path);
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Ok(Self {
            relative_path,
            content,
            ast,
            module,
            line_starts,
        })
    }

    /// Byte offset of a `proc_macro2` position (1-indexed line, 0-indexed
    /// character column).
    #[must_use]
    pub fn offset_of(&self, pos: proc_macro2::LineColumn) -> usize {
        let Some(&start) = pos
            .line
            .checked_sub(1)
            .and_then(|i| self.line_starts.get(i))
        else {
            return self.content.len();
        };
        let line = &self.content[start..];
        let within = line
            .char_indices()
            .nth(pos.column)
            .map_or(line.len(), |(i, _)| i);
        start + within
    }

    /// Converts a token span into a [`Span`] within this file.
    #[must_use]
    pub fn span(&self, span: proc_macro2::Span) -> Span {
        let (start, end) = (span.start(), span.end());
        let offset = self.offset_of(start);
        let length = self.offset_of(end).saturating_sub(offset);
        Span::new(self.relative_path.clone(), start.line, start.column + 1).with_bytes(offset, length)
    }
}

/// Computes the module path of a file from its path relative to the root.
///
/// Everything up to and including the last `src` directory is dropped, and
/// `lib.rs`, `main.rs` and `mod.rs` name their directory's module.
#[must_use]
pub fn module_path(relative_path: &Path) -> String {
    let mut parts: Vec<String> = relative_path
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str().map(String::from),
            _ => None,
        })
        .collect();

    if let Some(src) = parts.iter().rposition(|p| p == "src") {
        parts.drain(..=src);
    }

    if let Some(last) = parts.last() {
        if last == "mod" || (parts.len() == 1 && (last == "lib" || last == "main")) {
            parts.pop();
        }
    }

    std::iter::once("crate".to_string())
        .chain(parts.into_iter().map(|p| p.replace('-', "_")))
        .collect::<Vec<_>>()
        .join("::")
}
