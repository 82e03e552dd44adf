mod recipe;
mod sync_status;

pub use recipe::{now_millis, InvalidRecipe, Recipe};
pub use sync_status::SyncStatus;
