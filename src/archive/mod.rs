pub mod format;
mod reader;
mod writer;

pub use format::{
    ArchiveHeader, CompressionAlgo, FileEntryPlain, CURRENT_VERSION, ENTRY_PLAIN_SIZE,
    ENTRY_RECORD_SIZE, MAGIC, MAX_COMMENT_LEN, MAX_FILENAME, MAX_FILES, MAX_FILE_SIZE,
    MAX_OUTDIR_LEN, MIN_VERSION,
};
pub use reader::{ArchiveReader, ListEntry, ListOutcome};
pub use writer::{ArchivePacker, PackEntry, PackOptions};
