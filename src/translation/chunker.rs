/*!
 * Line-based document model and chunking.
 *
 * A `Document` owns the raw lines of one source file, each line keeping its
 * own terminator so that joining the lines reproduces the file byte for byte.
 * A `Chunk` is a fixed-size, order-preserving slice of those lines tagged with
 * its owning document and a zero-based index. The only ways back from chunks
 * to a document go through `Document::from_chunks`, which checks that the
 * chunk sequence is complete, and `Chunk::with_lines`, which refuses to change
 * a chunk's line count.
 */

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::ReassemblyError;

/// Identity of a document: the path it was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(PathBuf);

impl DocumentId {
    /// Create an identity from a path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Path of the document
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// An ordered sequence of raw lines belonging to one file
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    lines: Vec<String>,
}

impl Document {
    /// Create a document from lines that already carry their terminators
    pub fn new(id: DocumentId, lines: Vec<String>) -> Self {
        Self { id, lines }
    }

    /// Split file content into lines, keeping every terminator
    pub fn from_text(id: DocumentId, text: &str) -> Self {
        let lines = text.split_inclusive('\n').map(String::from).collect();
        Self { id, lines }
    }

    /// Rebuild a document from its chunks
    ///
    /// Chunks may arrive in any order. They must all belong to `id` and their
    /// indices must form the sequence `0..n` with no gaps or repeats.
    pub fn from_chunks(id: DocumentId, mut chunks: Vec<Chunk>) -> Result<Self, ReassemblyError> {
        chunks.sort_by_key(|chunk| chunk.index);

        let mut lines = Vec::with_capacity(chunks.iter().map(Chunk::line_count).sum());
        for (expected_index, chunk) in chunks.into_iter().enumerate() {
            if chunk.document != id {
                return Err(ReassemblyError::ForeignChunk {
                    index: chunk.index,
                    expected: id.to_string(),
                    found: chunk.document.to_string(),
                });
            }
            if chunk.index < expected_index {
                return Err(ReassemblyError::DuplicateChunk { index: chunk.index });
            }
            if chunk.index > expected_index {
                return Err(ReassemblyError::MissingChunk { index: expected_index });
            }
            lines.extend(chunk.lines);
        }

        Ok(Self { id, lines })
    }

    /// Identity of the document
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Raw lines, terminators included
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether the document has no lines at all
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Split into chunks of `lines_per_chunk` lines (the last one may be shorter)
    pub fn split_into_chunks(&self, lines_per_chunk: usize) -> Vec<Chunk> {
        chunk_lines(&self.lines, lines_per_chunk)
            .into_iter()
            .enumerate()
            .map(|(index, lines)| Chunk {
                document: self.id.clone(),
                index,
                lines,
            })
            .collect()
    }

    /// Join all lines back into file content
    pub fn to_text(&self) -> String {
        self.lines.concat()
    }
}

/// A fixed-size slice of a document's lines
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    document: DocumentId,
    index: usize,
    lines: Vec<String>,
}

impl Chunk {
    /// Create a chunk directly
    pub fn new(document: DocumentId, index: usize, lines: Vec<String>) -> Self {
        Self { document, index, lines }
    }

    /// Owning document
    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Zero-based position within the document
    pub fn index(&self) -> usize {
        self.index
    }

    /// Lines of the chunk
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Take the lines out of the chunk
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Number of lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Replace the content of the chunk, keeping its identity and line count
    pub fn with_lines(self, lines: Vec<String>) -> Result<Self, ReassemblyError> {
        if lines.len() != self.lines.len() {
            return Err(ReassemblyError::LineCountChanged {
                index: self.index,
                expected: self.lines.len(),
                actual: lines.len(),
            });
        }

        Ok(Self { lines, ..self })
    }
}

/// Split lines into consecutive groups of `lines_per_chunk`
///
/// Every group but the last has exactly `lines_per_chunk` lines. Empty input
/// yields no groups. A chunk size of zero is treated as one.
pub fn chunk_lines<T: Clone>(lines: &[T], lines_per_chunk: usize) -> Vec<Vec<T>> {
    lines.chunks(lines_per_chunk.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Split a raw line into its content and its terminator (`"\r\n"`, `"\n"` or `""`)
pub fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}
