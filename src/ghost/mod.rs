//! The asset-resolution engine: locating installed ghost packages,
//! normalizing their shell descriptors across format generations, and
//! cutting canonical payload snapshots for the rendering side.

pub mod anchor;
pub mod balloon;
pub mod hit;
pub mod locate;
pub mod manifest;
pub mod parsing;
pub mod payload;
pub mod runner;
pub mod save;
pub mod shell;
