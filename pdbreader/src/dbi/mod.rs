//! The DBI (Debug Information) stream: compiland list, section contributions, and the
//! fixed-slot "optional debug header" array of auxiliary stream indexes.

mod header;
mod modules;
mod optional_dbg;
mod section_contrib;

pub use header::{
    DbiFlags, DbiStreamHeader, DbiSubstreamRanges, StreamIndexU16, DBI_STREAM_HEADER_LEN,
    NIL_STREAM_INDEX,
};
pub use modules::{IterModuleInfo, ModuleInfo, ModuleInfoFixed};
pub use optional_dbg::{OptionalDebugHeader, OptionalDebugStream};
pub use section_contrib::{SectionContribEntry, SectionContributionsSubstream};
