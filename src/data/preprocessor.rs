// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns raw 8-bit images and integer labels into model input:
//
//   1. pixels u8 [0, 255] → f32 [0.0, 1.0]   (v / 255)
//   2. (N, H, W)          → (N, H, W, 1)      explicit channel
//   3. label y            → one-hot row of width num_classes
//
// The same functions are applied to the training and the
// evaluation split. The one-hot width comes from the evaluation
// labels and is reused for the training labels, so both target
// matrices always have the same number of columns.

use anyhow::{bail, Result};

use crate::domain::images::{LabeledImages, RawDataset};

/// Normalised images, channels-last: shape (N, H, W, C).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub shape: [usize; 4],
    pub data:  Vec<f32>,
}

impl ImageTensor {
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    pub fn image_size(&self) -> usize {
        self.shape[1] * self.shape[2] * self.shape[3]
    }

    pub fn image(&self, index: usize) -> Option<&[f32]> {
        let size  = self.image_size();
        let start = index.checked_mul(size)?;
        self.data.get(start..start + size)
    }
}

/// One-hot label matrix, row-major: shape (N, num_classes).
#[derive(Debug, Clone, PartialEq)]
pub struct OneHot {
    pub num_classes: usize,
    pub data:        Vec<f32>,
}

impl OneHot {
    pub fn len(&self) -> usize {
        if self.num_classes == 0 { 0 } else { self.data.len() / self.num_classes }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.num_classes)?;
        self.data.get(start..start + self.num_classes)
    }

    /// Index of the set position of a row.
    pub fn argmax(&self, index: usize) -> Option<usize> {
        let row = self.row(index)?;
        row.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// Cast to float, rescale to [0, 1] and add the channel axis.
pub fn preprocess(images: &LabeledImages) -> ImageTensor {
    let data = images
        .pixels
        .iter()
        .map(|&v| v as f32 / 255.0)
        .collect();

    ImageTensor {
        shape: [images.len(), images.rows, images.cols, 1],
        data,
    }
}

/// Number of classes implied by a label set: highest label + 1.
pub fn num_classes(labels: &[u8]) -> usize {
    labels.iter().copied().max().map_or(0, |m| m as usize + 1)
}

/// Encode labels as indicator rows of width `num_classes`.
pub fn encode_labels(labels: &[u8], num_classes: usize) -> Result<OneHot> {
    let mut data = vec![0.0f32; labels.len() * num_classes];
    for (i, &label) in labels.iter().enumerate() {
        let label = label as usize;
        if label >= num_classes {
            bail!("label {label} at index {i} does not fit a one-hot width of {num_classes}");
        }
        data[i * num_classes + label] = 1.0;
    }
    Ok(OneHot { num_classes, data })
}

/// One split after preprocessing.
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    pub images:  ImageTensor,
    pub targets: OneHot,
    pub labels:  Vec<usize>,
}

impl PreparedSplit {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Both splits, ready to be wrapped into Burn datasets.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train:       PreparedSplit,
    pub test:        PreparedSplit,
    pub num_classes: usize,
}

/// Preprocess both splits with one consistent class count.
pub fn prepare(raw: &RawDataset) -> Result<PreparedData> {
    let classes = num_classes(&raw.test.labels);
    if classes == 0 {
        bail!("evaluation split has no labels");
    }

    let split = |images: &LabeledImages| -> Result<PreparedSplit> {
        Ok(PreparedSplit {
            images:  preprocess(images),
            targets: encode_labels(&images.labels, classes)?,
            labels:  images.labels.iter().map(|&l| l as usize).collect(),
        })
    };

    let train = split(&raw.train)?;
    let test  = split(&raw.test)?;

    tracing::debug!(
        "Prepared {} train / {} test images, {} classes",
        train.len(), test.len(), classes
    );
    Ok(PreparedData { train, test, num_classes: classes })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pixel_value_maps_to_v_over_255() {
        let pixels: Vec<u8> = (0..=255u8).collect();
        let labels          = vec![0u8; 256 / 16];
        let images          = LabeledImages::new(4, 4, pixels, labels).unwrap();

        let out = preprocess(&images);
        for v in 0..=255u8 {
            assert_eq!(out.data[v as usize], v as f32 / 255.0);
        }
        assert_eq!(out.data[0], 0.0);
        assert_eq!(out.data[255], 1.0);
    }

    #[test]
    fn test_adds_channel_axis() {
        let images = LabeledImages::new(28, 28, vec![7; 3 * 28 * 28], vec![1, 2, 3]).unwrap();
        let out    = preprocess(&images);
        assert_eq!(images.shape(), [3, 28, 28]);
        assert_eq!(out.shape, [3, 28, 28, 1]);
        assert_eq!(out.data.len(), 3 * 28 * 28);
        assert_eq!(out.image(2).map(|img| img.len()), Some(784));
        assert!(out.image(3).is_none());
    }

    #[test]
    fn test_one_hot_round_trip() {
        let labels: Vec<u8> = (0..10).collect();
        let onehot = encode_labels(&labels, 10).unwrap();

        assert_eq!(onehot.len(), 10);
        for y in 0..10usize {
            let row = onehot.row(y).unwrap();
            assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 1);
            assert_eq!(row.iter().sum::<f32>(), 1.0);
            assert_eq!(onehot.argmax(y), Some(y));
        }
    }

    #[test]
    fn test_rejects_label_outside_width() {
        assert!(encode_labels(&[0, 10], 10).is_err());
    }

    #[test]
    fn test_num_classes_from_max_label() {
        assert_eq!(num_classes(&[0, 3, 9, 1]), 10);
        assert_eq!(num_classes(&[]), 0);
    }

    #[test]
    fn test_prepare_uses_eval_class_count_for_both_splits() {
        let train = LabeledImages::new(1, 1, vec![0, 255], vec![1, 2]).unwrap();
        let test  = LabeledImages::new(1, 1, vec![128], vec![9]).unwrap();
        let data  = prepare(&RawDataset { train, test }).unwrap();

        assert_eq!(data.num_classes, 10);
        assert_eq!(data.train.targets.num_classes, 10);
        assert_eq!(data.test.targets.num_classes, 10);
        assert_eq!(data.train.labels, vec![1, 2]);
    }

    #[test]
    fn test_prepare_fails_when_train_has_unseen_class() {
        let train = LabeledImages::new(1, 1, vec![0], vec![5]).unwrap();
        let test  = LabeledImages::new(1, 1, vec![0], vec![3]).unwrap();
        assert!(prepare(&RawDataset { train, test }).is_err());
    }
}
