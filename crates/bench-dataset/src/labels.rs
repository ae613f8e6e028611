//! Label-space resolution and mapping-file loading.
//!
//! The label universe is discovered from the dataset root using, in priority
//! order: an explicit ordered label-list file, class-bearing subdirectory
//! names, or the distinct labels observed in the annotation file. The first
//! source yields a file-defined index order; the other two sort discovered
//! labels lexicographically. Runs resolved from different sources assign
//! different indices and must not be compared.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use bench_core::{ClassMapping, DatasetConfig, Error, LabelSpace, Result};

/// Resolves the dataset's label space.
///
/// Fails with [`Error::LabelSpaceUnavailable`] when none of the three label
/// sources exists; without labels no accuracy is measurable and the run
/// must abort before any inference.
pub fn resolve_label_space(config: &DatasetConfig) -> Result<LabelSpace> {
    let list_path = config.root.join(&config.label_list_file);
    if list_path.is_file() {
        let content = fs::read_to_string(&list_path)?;
        let ids: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if !ids.is_empty() {
            info!(
                source = %list_path.display(),
                classes = ids.len(),
                "resolved label space from ordered label list"
            );
            return Ok(LabelSpace::from_ordered(ids));
        }
    }

    let class_dir = config.root.join(&config.class_dir);
    if class_dir.is_dir() {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&class_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        if !ids.is_empty() {
            ids.sort();
            info!(
                source = %class_dir.display(),
                classes = ids.len(),
                "resolved label space from class directories"
            );
            return Ok(LabelSpace::from_ordered(ids));
        }
    }

    let annotation_path = config.root.join(&config.annotation_file);
    if annotation_path.is_file() {
        let content = fs::read_to_string(&annotation_path)?;
        let ids: BTreeSet<String> = content
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(String::from)
            .collect();
        if !ids.is_empty() {
            info!(
                source = %annotation_path.display(),
                classes = ids.len(),
                "resolved label space from annotation file"
            );
            return Ok(LabelSpace::from_ordered(ids));
        }
    }

    Err(Error::LabelSpaceUnavailable(format!(
        "no label list, class directories, or annotations under {}",
        config.root.display()
    )))
}

/// On-disk format of the persisted cross-space mapping file.
#[derive(Debug, Deserialize)]
struct MappingFile {
    tiny_imagenet_to_imagenet: HashMap<String, String>,
    #[serde(default)]
    #[allow(dead_code)]
    imagenet_classes: Vec<String>,
}

/// Loads a persisted local-index to target-index mapping.
///
/// Keys and values are string-encoded indices; entries that do not parse
/// are rejected rather than silently dropped.
pub fn load_class_mapping(path: &Path) -> Result<ClassMapping> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Mapping(format!("failed to read {}: {e}", path.display())))?;
    let file: MappingFile = serde_json::from_str(&content)
        .map_err(|e| Error::Mapping(format!("failed to parse {}: {e}", path.display())))?;

    let mut pairs = Vec::with_capacity(file.tiny_imagenet_to_imagenet.len());
    for (local, target) in &file.tiny_imagenet_to_imagenet {
        let local: usize = local
            .parse()
            .map_err(|_| Error::Mapping(format!("invalid local index {local:?}")))?;
        let target: usize = target
            .parse()
            .map_err(|_| Error::Mapping(format!("invalid target index {target:?}")))?;
        pairs.push((local, target));
    }

    let mapping = ClassMapping::from_pairs(pairs);
    debug!(entries = mapping.len(), "loaded class mapping");
    Ok(mapping)
}
