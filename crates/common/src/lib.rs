/**
 * Multi-tenant drive engine.
 *  - Node model and the node/blob store contracts
 *  - Tree operations: listing, move, cascading delete, stats
 *  - Safe zip ingestion with rollback
 */
pub mod drive;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::drive::{
        ArchiveViolation, BlobStore, Drive, DriveError, DriveLimits, ErrorKind, ExtractReport,
        FileUpload, FolderStats, Node, NodeKind, NodeStore, OwnerId,
    };
    pub use crate::version::build_info;
}
