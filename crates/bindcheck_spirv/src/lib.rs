#![deny(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
#![warn(rustdoc::all)]
#![doc = include_str!("../README.md")]

mod layout;
pub mod module;
pub mod tables;
mod validate;

pub use module::{
    DecorationFlags, Decorations, EntryPoint, ImageType, ScalarKind, SpirvModule, Type, Variable,
};
pub use tables::FormatType;
pub use validate::{validate, Message, MessageLevel, TargetEnv, Validated, ValidationReport};

/// Re-export of the `spirv` enums the decoded module is expressed in.
pub use spirv;
/// Re-export of the loader the module is decoded with.
pub use rspirv;
