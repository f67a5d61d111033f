/// Local file fetcher for development
///
/// When the live API is unavailable, point channels at saved API responses
/// and replay them through the full pipeline. The channel's `source` is a
/// path to a JSON payload, resolved against an optional root directory.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;

use super::{parse_payload, Fetcher};
use crate::channels::Channel;
use crate::model::{FetchError, Series};

pub struct FileFetcher {
    root: Option<PathBuf>,
    offset: FixedOffset,
}

impl FileFetcher {
    pub fn new(root: Option<PathBuf>, offset: FixedOffset) -> Self {
        Self { root, offset }
    }

    pub fn path_for(&self, channel: &Channel) -> PathBuf {
        let source = Path::new(&channel.source);
        match &self.root {
            Some(root) if source.is_relative() => root.join(source),
            _ => source.to_path_buf(),
        }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, channel: &Channel) -> Result<Series, FetchError> {
        let path = self.path_for(channel);
        let body = std::fs::read_to_string(&path)
            .map_err(|e| FetchError::Unreachable(format!("{}: {}", path.display(), e)))?;
        parse_payload(&channel.name, &body, self.offset)
    }
}
