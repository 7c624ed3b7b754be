use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::OutputOptions;
use crate::db::model::TableModel;
use crate::db::naming::model_file_stem;
use crate::error::GenerateError;
use crate::render::render_table;

/// Writes rendered model definitions into the output directory
pub struct ModelWriter {
    options: OutputOptions,
}

impl ModelWriter {
    pub fn new(options: OutputOptions) -> Self {
        Self { options }
    }

    pub fn directory(&self) -> &Path {
        &self.options.directory
    }

    /// `<directory>/<Stem>.js` for a table
    pub fn path_for(&self, table: &str) -> PathBuf {
        self.options
            .directory
            .join(format!("{}.js", model_file_stem(table)))
    }

    /// Render and write every model, creating the directory first.
    /// Returns the written paths in table name order.
    pub async fn write_all(
        &self,
        models: &BTreeMap<String, TableModel>,
    ) -> Result<Vec<PathBuf>, GenerateError> {
        let directory = self.directory();
        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|source| GenerateError::Io {
                path: directory.to_path_buf(),
                source,
            })?;

        let mut seen = HashSet::new();
        let mut written = Vec::with_capacity(models.len());
        for (table, model) in models {
            let path = self.path_for(table);
            if !seen.insert(path.clone()) {
                log::warn!(
                    "Table {} maps to {} which was already written; overwriting",
                    table,
                    path.display()
                );
            }

            tokio::fs::write(&path, render_table(model, &self.options))
                .await
                .map_err(|source| GenerateError::Io {
                    path: path.clone(),
                    source,
                })?;
            log::info!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}
