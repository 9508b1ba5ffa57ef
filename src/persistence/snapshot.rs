use std::path::Path;

use compio::fs;
use snafu::ResultExt;
use tracing::{debug, info};

use super::codec::{InvalidEncodingSnafu, IoUnavailableSnafu};
use super::{SnapshotCodec, SnapshotError, SnapshotFormat};
use crate::ext::BestEffortPathExt;
use crate::filesystem::FileSystem;

impl FileSystem {
    /// Writes the whole tree to `path` in the given format.
    pub async fn save_to_path(
        &self,
        path: impl AsRef<Path>,
        format: SnapshotFormat,
    ) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let encoded = format.encode(self.tree())?;

        debug!(
            "Writing {} bytes to {}",
            encoded.len(),
            path.best_effort_path_display()
        );
        fs::write(path, encoded.into_bytes())
            .await
            .0
            .context(IoUnavailableSnafu {
                path: path.to_path_buf(),
            })?;

        info!(
            "Saved {} entries to {} ({} format)",
            self.tree().len(),
            path.best_effort_path_display(),
            format
        );
        Ok(())
    }

    /// Replaces the whole tree with the snapshot stored at `path` and moves
    /// the cursor to the new root. The format is detected from the file. On
    /// any failure the current tree and cursor are left as they were.
    pub async fn load_from_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<SnapshotFormat, SnapshotError> {
        let path = path.as_ref();
        debug!("Reading snapshot {}", path.best_effort_path_display());

        let bytes = fs::read(path).await.context(IoUnavailableSnafu {
            path: path.to_path_buf(),
        })?;
        let text = String::from_utf8(bytes).context(InvalidEncodingSnafu {
            path: path.to_path_buf(),
        })?;

        let format = SnapshotFormat::detect(&text);
        let tree = format.decode(&text)?;
        let discarded = self.replace_tree(tree);

        info!(
            "Loaded {} entries from {} ({} format), discarded {}",
            self.tree().len(),
            path.best_effort_path_display(),
            format,
            discarded
        );
        Ok(format)
    }
}
