//! The seam the engine pulls pathways from.

use std::sync::atomic::{AtomicUsize, Ordering};

use wardflow_core::{CoreError, Result};

use crate::pathway::Pathway;

/// Supplies pathways to start. Implementations decide where pathways come
/// from and how the next one is chosen; the engine only ever asks for the
/// next pathway or for a specific one by name.
pub trait PathwaySupplier: Send + Sync {
    /// The next pathway to start, per the supplier's selection policy.
    fn next_pathway(&self) -> Result<Pathway>;

    /// A specific pathway by name.
    fn get_pathway(&self, name: &str) -> Result<Pathway>;
}

/// Cycles through a fixed set of pathways in order. Deterministic, which
/// makes it the supplier of choice for tests and demos.
pub struct RoundRobinSupplier {
    pathways: Vec<Pathway>,
    cursor: AtomicUsize,
}

impl RoundRobinSupplier {
    pub fn new(pathways: Vec<Pathway>) -> Result<Self> {
        if pathways.is_empty() {
            return Err(CoreError::configuration(
                "round robin supplier needs at least one pathway",
            ));
        }
        Ok(Self {
            pathways,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.pathways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }
}

impl PathwaySupplier for RoundRobinSupplier {
    fn next_pathway(&self) -> Result<Pathway> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.pathways.len();
        Ok(self.pathways[index].clone())
    }

    fn get_pathway(&self, name: &str) -> Result<Pathway> {
        self.pathways
            .iter()
            .find(|pathway| pathway.name == name)
            .cloned()
            .ok_or_else(|| CoreError::unknown_pathway(name))
    }
}
