//! Dataset listing: annotation parsing and sample enumeration.

use std::fs;

use tracing::{info, warn};

use bench_core::{DatasetConfig, Error, LabelSpace, Result, Sample};

/// Lists the labeled samples described by the annotation file.
///
/// Each line holds a whitespace-delimited `<image file> <label id>` pair;
/// short lines are skipped. Images missing on disk are skipped with a
/// warning. Order follows the annotation file, so truncating to the first N
/// samples is deterministic across runs.
pub fn list_samples(config: &DatasetConfig, labels: &LabelSpace) -> Result<Vec<Sample>> {
    let annotation_path = config.root.join(&config.annotation_file);
    let content = fs::read_to_string(&annotation_path).map_err(|e| {
        Error::NotFound(format!(
            "annotation file {}: {e}",
            annotation_path.display()
        ))
    })?;

    let image_dir = config.root.join(&config.image_dir);
    let mut samples = Vec::new();
    let mut missing = 0usize;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(file), Some(label_id)) = (parts.next(), parts.next()) else {
            continue;
        };

        let path = image_dir.join(file);
        if !path.is_file() {
            missing += 1;
            warn!(image = file, "annotated image missing on disk, skipping");
            continue;
        }

        let label_index = labels.index_of(label_id);
        if label_index.is_none() {
            warn!(image = file, label = label_id, "label id not in label space");
        }
        samples.push(Sample::new(path, label_id, label_index));
    }

    info!(
        samples = samples.len(),
        missing, "listed validation samples"
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_test_image(path: &Path) {
        let img = image::ImageBuffer::from_fn(4, 4, |_, _| image::Rgb([128u8, 64u8, 32u8]));
        img.save(path).unwrap();
    }

    fn fixture(dir: &TempDir, annotations: &str, images: &[&str]) -> DatasetConfig {
        fs::create_dir_all(dir.path().join("val/images")).unwrap();
        fs::write(dir.path().join("val/val_annotations.txt"), annotations).unwrap();
        for name in images {
            write_test_image(&dir.path().join("val/images").join(name));
        }
        DatasetConfig {
            root: dir.path().to_path_buf(),
            ..DatasetConfig::default()
        }
    }

    #[test]
    fn test_list_samples_resolves_indices() {
        let dir = TempDir::new().unwrap();
        let config = fixture(
            &dir,
            "img_0.jpg n01443537\nimg_1.jpg n01629819\n",
            &["img_0.jpg", "img_1.jpg"],
        );
        // Ordered label file lists n01629819 first, so img_0 resolves to 1.
        let labels = LabelSpace::from_ordered(vec![
            "n01629819".to_string(),
            "n01443537".to_string(),
        ]);

        let samples = list_samples(&config, &labels).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label_id, "n01443537");
        assert_eq!(samples[0].label_index, Some(1));
        assert_eq!(samples[1].label_index, Some(0));
    }

    #[test]
    fn test_missing_images_skipped() {
        let dir = TempDir::new().unwrap();
        let config = fixture(
            &dir,
            "img_0.jpg n01443537\nimg_gone.jpg n01443537\n",
            &["img_0.jpg"],
        );
        let labels = LabelSpace::from_ordered(vec!["n01443537".to_string()]);

        let samples = list_samples(&config, &labels).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].file_name(), "img_0.jpg");
    }

    #[test]
    fn test_unknown_label_yields_none_index() {
        let dir = TempDir::new().unwrap();
        let config = fixture(&dir, "img_0.jpg n99999999\n", &["img_0.jpg"]);
        let labels = LabelSpace::from_ordered(vec!["n01443537".to_string()]);

        let samples = list_samples(&config, &labels).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label_index, None);
    }

    #[test]
    fn test_short_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let config = fixture(&dir, "lonely_token\n\nimg_0.jpg n01443537\n", &["img_0.jpg"]);
        let labels = LabelSpace::from_ordered(vec!["n01443537".to_string()]);

        let samples = list_samples(&config, &labels).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_missing_annotation_file() {
        let dir = TempDir::new().unwrap();
        let config = DatasetConfig {
            root: dir.path().to_path_buf(),
            ..DatasetConfig::default()
        };
        let labels = LabelSpace::from_ordered(vec!["a".to_string()]);
        assert!(matches!(
            list_samples(&config, &labels),
            Err(Error::NotFound(_))
        ));
    }
}
