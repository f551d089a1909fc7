//! The unit of distribution: a fixed-size slice of the source file, identified
//! by its on-disk filename at a conventional prefix.

use std::fmt;

/// A chunk's identity is its filename; two chunks are equal iff their
/// filenames are equal. Immutable after creation.
#[derive(Debug, Clone, Eq)]
pub struct Chunk {
    filename: String,
}

impl Chunk {
    pub fn new(filename: impl Into<String>) -> Self {
        Self { filename: filename.into() }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename)
    }
}

/// Build the chunk-file prefix convention `/tmp/<basename>.chunk_` used both to
/// name chunks and to build the `cat`/`rm` glob patterns.
pub fn chunk_prefix(source_path: &str) -> String {
    let basename =
        std::path::Path::new(source_path).file_name().map(|s| s.to_string_lossy().to_string());
    let basename = basename.unwrap_or_else(|| source_path.to_string());
    format!("/tmp/{basename}.chunk_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_filename() {
        let a = Chunk::new("/tmp/foo.chunk_aa");
        let b = Chunk::new("/tmp/foo.chunk_aa");
        let c = Chunk::new("/tmp/foo.chunk_ab");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn prefix_uses_basename_only() {
        assert_eq!(chunk_prefix("/home/user/image.zip"), "/tmp/image.zip.chunk_");
        assert_eq!(chunk_prefix("image.zip"), "/tmp/image.zip.chunk_");
    }
}
