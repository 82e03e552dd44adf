//! Last-write-wins diff between a local and a remote recipe snapshot.
//!
//! The diff is keyed by recipe id. For every id the side with the strictly
//! greater timestamp wins; equal timestamps mean both sides already agree and
//! nothing is transferred. An id therefore lands in at most one direction.

use std::collections::HashMap;

use crate::models::Recipe;

/// Records that must flow in each direction after one diff pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipesDiff {
    /// Remote records to write into the local store.
    pub to_pull: Vec<Recipe>,
    /// Local records to send to the server.
    pub to_push: Vec<Recipe>,
}

impl RecipesDiff {
    pub fn is_empty(&self) -> bool {
        self.to_pull.is_empty() && self.to_push.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_pull.len() + self.to_push.len()
    }
}

/// Computes which records to push and which to pull.
///
/// Records without an id have never been saved locally and are skipped.
/// Output order follows input order.
pub fn compute_diff(local: &[Recipe], remote: &[Recipe]) -> RecipesDiff {
    let local_by_id = index_by_id(local);
    let remote_by_id = index_by_id(remote);

    let to_push = local
        .iter()
        .filter(|recipe| wins_against(recipe, &remote_by_id))
        .cloned()
        .inspect(|recipe| tracing::debug!("{} will be pushed", recipe))
        .collect();

    let to_pull = remote
        .iter()
        .filter(|recipe| wins_against(recipe, &local_by_id))
        .cloned()
        .inspect(|recipe| tracing::debug!("{} will be pulled", recipe))
        .collect();

    RecipesDiff { to_pull, to_push }
}

fn index_by_id(recipes: &[Recipe]) -> HashMap<i64, &Recipe> {
    recipes
        .iter()
        .filter_map(|recipe| match recipe.id {
            Some(id) => Some((id, recipe)),
            None => {
                tracing::debug!("Skipping {} without an id", recipe);
                None
            }
        })
        .collect()
}

/// True when `recipe` is absent from `other` or strictly newer than its copy.
fn wins_against(recipe: &Recipe, other: &HashMap<i64, &Recipe>) -> bool {
    let Some(id) = recipe.id else {
        return false;
    };
    match other.get(&id) {
        None => true,
        Some(theirs) => recipe.timestamp > theirs.timestamp,
    }
}
