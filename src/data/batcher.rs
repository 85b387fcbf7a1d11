// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageItem> into
// tensors on the target device.
//
//   Input:  N ImageItems, pixels (H, W, 1), one-hot rows (C)
//   Output: images  [N, 1, H, W]   (Burn convolutions are NCHW)
//           targets [N, C]
//           labels  [N]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageItem;

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised pixels, shape: [batch_size, 1, height, width]
    pub images:  Tensor<B, 4>,

    /// One-hot targets, shape: [batch_size, num_classes]
    /// Fed to the cross-entropy loss
    pub targets: Tensor<B, 2>,

    /// Class indices, shape: [batch_size]
    /// Compared with the argmax of the logits for accuracy
    pub labels:  Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    /// The device to create tensors on
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();
        let (rows, cols) = items.first().map_or((0, 0), |i| (i.rows, i.cols));
        let classes      = items.first().map_or(0, |i| i.target.len());

        let pixels: Vec<f32> = items.iter().flat_map(|i| i.pixels.iter().copied()).collect();
        let targets: Vec<f32> = items.iter().flat_map(|i| i.target.iter().copied()).collect();
        let labels: Vec<i32> = items.iter().map(|i| i.label as i32).collect();

        // channels-last → channels-first
        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, rows, cols, 1])
            .permute([0, 3, 1, 2]);

        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, classes]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, targets, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes() {
        let item = |label: usize| ImageItem {
            rows:   2,
            cols:   3,
            pixels: (0..6).map(|v| v as f32).collect(),
            target: (0..4).map(|c| if c == label { 1.0 } else { 0.0 }).collect(),
            label,
        };
        let batcher = ImageBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![item(1), item(3)]);

        assert_eq!(batch.images.dims(), [2, 1, 2, 3]);
        assert_eq!(batch.targets.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(), [2]);

        // Row-major pixel order survives the channel move when C = 1
        let first: Vec<f32> = batch.images.slice([0..1, 0..1, 0..2, 0..3])
            .into_data()
            .iter::<f32>()
            .collect();
        assert_eq!(first, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![1, 3]);
    }
}
