//! Snapshot persistence for [`FileSystem`](crate::filesystem::FileSystem).
//!
//! Two text formats are supported. The legacy format writes one
//! `name|isDirectory|content|createdAt|modifiedAt` line per node and encodes
//! structure purely through traversal order, terminating every chain with an
//! empty line. The framed format adds a header, escapes its fields and stores
//! an explicit child count per node.

mod codec;
mod framed;
mod legacy;
mod snapshot;

pub use codec::{SnapshotCodec, SnapshotError, SnapshotFormat};
pub use framed::{FRAMED_HEADER, FramedCodec};
pub use legacy::LegacyCodec;
