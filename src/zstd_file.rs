//! Reading files that may have been compressed with zstd by the
//! simulation's output stage.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use ruzstd::StreamingDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd,
}

impl Compression {
    /// The suffix added by the compressor, without the dot.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Zstd => Some("zstd"),
        }
    }
}

/// Determine the compression from the file name, which must end in
/// `.{expected_suffix}` or `.{expected_suffix}.zstd`.
pub fn compression_of<P: AsRef<Path>>(path: P, expected_suffix: &str) -> Result<Compression> {
    let path = path.as_ref();
    let ext = path.extension().ok_or_else(|| {
        anyhow!("missing file extension, expecting {expected_suffix:?} or \"zstd\": {path:?}")
    })?;

    match ext.to_string_lossy().as_ref() {
        "zstd" => {
            let stem = path.with_extension("");
            match stem.extension() {
                Some(ext2) if ext2.to_string_lossy() == expected_suffix => Ok(Compression::Zstd),
                Some(ext2) => bail!(
                    "unknown file extension {ext2:?} before \".zstd\", \
                     expecting {expected_suffix:?}: {path:?}"
                ),
                None => bail!(
                    "missing file extension before \".zstd\", \
                     expecting {expected_suffix:?}: {path:?}"
                ),
            }
        }
        s if s == expected_suffix => Ok(Compression::None),
        _ => bail!(
            "unknown file extension {ext:?}, expecting {expected_suffix:?} \
             or \"zstd\": {path:?}"
        ),
    }
}

/// The file names under which `{file_name}` may be stored in `dir`,
/// uncompressed first.
pub fn candidate_paths(dir: &Path, file_name: &str) -> Vec<PathBuf> {
    [Compression::None, Compression::Zstd]
        .into_iter()
        .map(|compression| match compression.suffix() {
            None => dir.join(file_name),
            Some(suffix) => dir.join(format!("{file_name}.{suffix}")),
        })
        .collect()
}

/// Open `path` for reading, transparently decompressing it if it
/// carries a `.zstd` suffix after `.{expected_suffix}` (given
/// *without* the leading dot).
pub fn open_decompressed(path: &Path, expected_suffix: &str) -> Result<Box<dyn Read>> {
    let compression = compression_of(path, expected_suffix)?;
    let file = File::open(path).with_context(|| anyhow!("opening file {path:?}"))?;
    let input = BufReader::new(file);
    match compression {
        Compression::None => Ok(Box::new(input)),
        Compression::Zstd => Ok(Box::new(
            StreamingDecoder::new(input).with_context(|| anyhow!("zstd-decoding {path:?}"))?,
        )),
    }
}
