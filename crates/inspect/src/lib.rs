//! Invocations of the code-signing and binary-inspection tools, and parsers
//! for their output.

pub mod section;
pub mod signing;

pub use section::{
    read_plist_section, Otool, SectionOracle, INFO_PLIST_SECTION, LAUNCHD_PLIST_SECTION,
    TEXT_SEGMENT,
};
pub use signing::{Codesign, SigningOracle};
