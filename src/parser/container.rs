//! Compound-file loading.
//!
//! The whole `cfb` directory tree is materialized into owned [`Node`]s up
//! front, so the walker never holds a borrow on the container.

use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use cfb::CompoundFile;
use tracing::{debug, warn};

use crate::error::{MsgError, Result};

/// One entry of the compound-file directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Storage {
        name: String,
        children: Vec<Node>,
    },
    Stream {
        name: String,
        /// Length recorded in the directory entry.
        len: u64,
        /// `None` when the stream could not be read.
        data: Option<Vec<u8>>,
    },
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::Storage { name, .. } | Self::Stream { name, .. } => name,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Self::Storage { children, .. } => children,
            Self::Stream { .. } => &[],
        }
    }
}

/// Open a compound file held in memory and load its full tree.
///
/// Fails only when the header is invalid or the root storage cannot be listed.
/// Unreadable inner storages come back empty and unreadable streams carry no data.
pub fn load(bytes: &[u8]) -> Result<Node> {
    let mut compound = CompoundFile::open(Cursor::new(bytes)).map_err(MsgError::InvalidContainer)?;
    let children = read_children(&mut compound, Path::new("/")).map_err(MsgError::InvalidContainer)?;
    Ok(Node::Storage {
        name: String::new(),
        children,
    })
}

fn read_children<F: Read + Seek>(
    compound: &mut CompoundFile<F>,
    path: &Path,
) -> io::Result<Vec<Node>> {
    // Collect first: the storage iterator borrows the container.
    let entries: Vec<(String, PathBuf, bool, u64)> = compound
        .read_storage(path)?
        .map(|e| (e.name().to_string(), e.path().to_path_buf(), e.is_storage(), e.len()))
        .collect();

    let mut nodes = Vec::with_capacity(entries.len());
    for (name, entry_path, is_storage, len) in entries {
        if is_storage {
            let children = read_children(compound, &entry_path).unwrap_or_else(|e| {
                warn!(name = %name, error = %e, "Unreadable storage, treating as empty");
                Vec::new()
            });
            nodes.push(Node::Storage { name, children });
        } else {
            let data = match read_stream(compound, &entry_path) {
                Ok(data) => Some(data),
                Err(e) => {
                    debug!(name = %name, error = %e, "Unreadable stream");
                    None
                }
            };
            nodes.push(Node::Stream { name, len, data });
        }
    }
    Ok(nodes)
}

fn read_stream<F: Read + Seek>(compound: &mut CompoundFile<F>, path: &Path) -> io::Result<Vec<u8>> {
    let mut stream = compound.open_stream(path)?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}
