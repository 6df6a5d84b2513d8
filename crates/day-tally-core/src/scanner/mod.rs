pub mod batch;
pub mod subjects;
pub mod timestamp;
pub mod walk;

pub use batch::{BatchDetector, BatchOutcome, ListedFile, NameCollapser};
pub use subjects::{SubjectFilter, SubjectFolder};
pub use timestamp::TimestampProvider;
pub use walk::{FileOutcome, FolderWalker};
