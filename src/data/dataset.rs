use burn::data::dataset::Dataset;

use crate::data::preprocessor::PreparedSplit;

/// One preprocessed image with its targets.
/// `pixels` is channels-last (H, W, 1), `target` a one-hot row.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    pub rows:   usize,
    pub cols:   usize,
    pub pixels: Vec<f32>,
    pub target: Vec<f32>,
    pub label:  usize,
}

pub struct ImageDataset {
    split: PreparedSplit,
}

impl ImageDataset {
    pub fn new(split: PreparedSplit) -> Self { Self { split } }

    /// The first `count` items, in order.
    pub fn head(&self, count: usize) -> Vec<ImageItem> {
        (0..count.min(self.len())).filter_map(|i| self.get(i)).collect()
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        let [_, rows, cols, _] = self.split.images.shape;
        Some(ImageItem {
            rows,
            cols,
            pixels: self.split.images.image(index)?.to_vec(),
            target: self.split.targets.row(index)?.to_vec(),
            label:  *self.split.labels.get(index)?,
        })
    }

    fn len(&self) -> usize {
        self.split.len()
    }
}
