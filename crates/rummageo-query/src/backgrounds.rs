//! Background gene universes, one per species.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use rummageo_common::entities::{Background, Nodes};
use rummageo_common::error::{Result, RummageoError};
use rummageo_common::Species;

use crate::documents::GET_BACKGROUNDS;
use crate::graphql::{query, GraphQlExecutor};

#[derive(Deserialize)]
struct BackgroundsData {
    backgrounds: Nodes<Background>,
}

/// Species → background id lookup.
#[derive(Debug, Clone, Default)]
pub struct BackgroundIndex {
    by_species: HashMap<Species, String>,
}

impl BackgroundIndex {
    pub async fn fetch(exec: &dyn GraphQlExecutor) -> Result<Self> {
        let data: BackgroundsData = query(exec, &GET_BACKGROUNDS, serde_json::json!({})).await?;
        let index = Self::from_backgrounds(data.backgrounds.nodes);
        debug!(count = index.by_species.len(), "Loaded backgrounds");
        Ok(index)
    }

    pub fn from_backgrounds(backgrounds: impl IntoIterator<Item = Background>) -> Self {
        let mut by_species = HashMap::new();
        for bg in backgrounds {
            match bg.species.parse::<Species>() {
                Ok(species) => {
                    by_species.entry(species).or_insert(bg.id);
                }
                Err(e) => warn!(id = %bg.id, "Skipping background: {e}"),
            }
        }
        Self { by_species }
    }

    pub fn id_for(&self, species: Species) -> Result<&str> {
        self.by_species
            .get(&species)
            .map(String::as_str)
            .ok_or_else(|| RummageoError::NotFound(format!("no background for {species}")))
    }

    /// Background id for a gene list, using the case of its first symbol.
    pub fn id_for_genes(&self, genes: &[String]) -> Result<&str> {
        self.id_for(Species::from_genes(genes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[tokio::test]
    async fn test_backgrounds_are_keyed_by_species() {
        let exec = MockExecutor::default().with(
            &GET_BACKGROUNDS,
            serde_json::json!({ "backgrounds": { "nodes": [
                { "id": "h-1", "species": "human" },
                { "id": "m-1", "species": "mouse" },
                { "id": "x-1", "species": "zebrafish" }
            ]}}),
        );
        let index = BackgroundIndex::fetch(&exec).await.unwrap();
        assert_eq!(index.id_for(Species::Human).unwrap(), "h-1");
        assert_eq!(index.id_for_genes(&["Stat3".to_string()]).unwrap(), "m-1");
    }

    #[test]
    fn test_missing_species_is_not_found() {
        let index = BackgroundIndex::from_backgrounds(vec![]);
        assert!(matches!(index.id_for(Species::Mouse), Err(RummageoError::NotFound(_))));
    }
}
