//! Document model, undo engine, and script codec for the anm2 editor.
//!
//! The document is a tree of named selectors holding layer-path and
//! animation items. Every mutation goes through an operation engine that
//! synthesises inverse operations for linear undo/redo, notifies the host
//! through synchronous callbacks, and round-trips to disk as a Lua-flavoured
//! script with an embedded JSON metadata line.

mod codec;
mod document;
pub mod error;
pub mod locale;

pub use document::Document;
pub use document::node::NodeId;
pub use document::notify::ChangeEvent;
pub use document::op::OpType;
pub use error::{Error, Result};
pub use locale::Strings;
