use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::Error;

use super::{Collection, Record, RecordStore};

/// Stores each collection as a pretty-printed `<name>.json` array inside a
/// data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<FileStore, Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        Ok(FileStore { dir })
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, collection: Collection) -> Result<Vec<Record>, Error> {
        let content = match fs::read(self.path(collection)).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(vec![]);
        }

        serde_json::from_slice(&content)
            .map_err(|reason| Error::CorruptCollection { collection, reason })
    }

    #[tracing::instrument(skip(self, records))]
    async fn replace(&self, collection: Collection, records: Vec<Record>) -> Result<(), Error> {
        let content = serde_json::to_vec_pretty(&records)?;

        // rename is atomic, so readers see either the old or the new file
        let path = self.path(collection);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, content).await?;
        fs::rename(&staging, &path).await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), Error> {
        let probe = self.dir.join(".probe");
        fs::write(&probe, b"ok").await?;
        fs::remove_file(&probe).await?;

        Ok(())
    }
}
