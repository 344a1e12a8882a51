pub mod error;
pub mod playbook;

pub use error::{PlaybookError, PlaybookResult};
pub use playbook::{Playbook, PlaybookCatalog, PlaybookSet};
