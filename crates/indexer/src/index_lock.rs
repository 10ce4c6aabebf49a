use crate::error::{IndexerError, Result};
use crate::paths::lock_path_for_state_dir;
use fs2::FileExt;
use std::path::Path;
use std::time::Instant;

/// Advisory exclusive lock on `.bugtrace/index.lock`, released on drop
pub(crate) struct IndexWriteLock {
    file: std::fs::File,
}

impl Drop for IndexWriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Block (off the async runtime) until no other process holds the project lock
pub(crate) async fn acquire_index_write_lock(state_dir: &Path) -> Result<IndexWriteLock> {
    tokio::fs::create_dir_all(state_dir).await?;
    let path = lock_path_for_state_dir(state_dir);

    tokio::task::spawn_blocking(move || -> Result<IndexWriteLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                IndexerError::Other(format!("open index lock {}: {err}", path.display()))
            })?;

        let start = Instant::now();
        file.lock_exclusive().map_err(|err| {
            IndexerError::Other(format!("acquire index lock {}: {err}", path.display()))
        })?;

        let waited = start.elapsed();
        if waited.as_millis() > 100 {
            log::info!("Waited {}ms for index lock {}", waited.as_millis(), path.display());
        }

        Ok(IndexWriteLock { file })
    })
    .await
    .map_err(|err| IndexerError::Other(format!("join index lock task: {err}")))?
}
