pub mod doi;
pub mod work_id;

pub use doi::Doi;
pub use work_id::{OPENALEX_URI_PREFIX, WorkIdentifier};
