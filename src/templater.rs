//! Main module for templater library functionality

pub mod buffer;
pub mod cycler;
pub mod dialects;
pub mod grammar;
pub mod matcher;
pub mod session;

pub use buffer::{Buffer, BufferError, Edit, EditKind, Line, TextBuffer};
pub use cycler::{CyclePlan, SurroundingBlocks, TagCycler, TagEdit};
pub use dialects::{DialectId, DialectRegistry, DialectTable};
pub use grammar::{build_addon_class, AddonPair, Dialect, GrammarError, Position, Variant};
pub use matcher::{BlockMatch, DelimiterMatcher};
pub use session::Session;
