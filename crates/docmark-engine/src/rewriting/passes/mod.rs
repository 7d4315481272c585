//! The rewriters behind the documentation extensions.

pub mod include;
pub mod notes;
pub mod tables;
pub mod tabs;
pub mod text;
pub mod xref;

pub use include::expand_includes;
pub use notes::{flatten_block_split, note_blocks, note_kind, notes};
pub use tables::validate_tables;
pub use tabs::tab_visibility;
pub use text::merge_text;
pub use xref::resolve_xrefs;
