//! Current-page tracking and navigation history.

mod coordinator;
mod model;
mod repository;

pub use coordinator::PageCoordinator;
pub use model::{PageHistoryEntry, PageState};
pub use repository::PageHistoryRepository;
