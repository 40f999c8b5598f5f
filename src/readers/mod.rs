pub mod nc;
pub mod types;
pub mod utils;

pub use nc::NcTimeReader;
pub use types::{FileError, FileType, GriddedSource, ReadError, TimeAxisReader};
pub use utils::{file_type_from_path, require_boundary, require_gridded};
