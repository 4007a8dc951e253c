//! Lightweight dictionary descriptors and best-effort file scanning.

use std::fs::File;
use std::path::Path;

use log::warn;

use super::index::IndexInfo;
use super::Dictionary;

/// Everything a catalog needs to describe a dictionary file without
/// keeping it open: timestamp, description, and per-index summaries,
/// plus file name and size when the descriptor came from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryInfo {
    pub creation_millis: i64,
    pub description: String,
    pub index_infos: Vec<IndexInfo>,
    pub filename: Option<String>,
    pub uncompressed_bytes: Option<u64>,
}

impl DictionaryInfo {
    /// Open `path`, extract its descriptor, and close it again.
    ///
    /// Best-effort by design: any failure (missing file, truncation,
    /// unknown version, corruption) yields `None` rather than an error,
    /// because this is meant for scanning mixed sets of candidate files.
    pub fn scan(path: impl AsRef<Path>) -> Option<DictionaryInfo> {
        let path = path.as_ref();
        let result = (|| {
            let file = File::open(path)?;
            let byte_len = file.metadata()?.len();
            let dict = Dictionary::open(file)?;
            let mut info = dict.info()?;
            info.filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            info.uncompressed_bytes = Some(byte_len);
            Ok::<_, super::error::DictError>(info)
        })();
        match result {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Skipping unreadable dictionary {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Scan many candidate files, keeping only the readable ones.
    pub fn scan_many<I, P>(paths: I) -> Vec<DictionaryInfo>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths.into_iter().filter_map(DictionaryInfo::scan).collect()
    }
}
