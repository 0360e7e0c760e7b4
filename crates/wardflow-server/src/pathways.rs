//! Loading the pathway definitions the round-robin supplier cycles through.
//!
//! The file is one TOML table per pathway, keyed by pathway name:
//!
//! ```toml
//! [admit_and_discharge]
//! pathway = [
//!     { admission = { loc = "Ward 1" } },
//!     { discharge = {} },
//! ]
//! ```

use indexmap::IndexMap;

use wardflow_pathway::Pathway;

/// Reads and parses a pathways file. Pathways come back in authoring order,
/// each initialized under the name it was defined as.
pub fn load_pathways(path: &str) -> Result<Vec<Pathway>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read pathways file {path}: {e}"))?;
    parse_pathways(&text).map_err(|e| format!("in pathways file {path}: {e}"))
}

fn parse_pathways(text: &str) -> Result<Vec<Pathway>, String> {
    let table: IndexMap<String, Pathway> =
        toml::from_str(text).map_err(|e| format!("invalid pathway definition: {e}"))?;
    if table.is_empty() {
        return Err("no pathways defined".into());
    }
    Ok(table
        .into_iter()
        .map(|(name, mut pathway)| {
            pathway.init(name);
            pathway
        })
        .collect())
}
