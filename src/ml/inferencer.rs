// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Class predictions for a handful of images, used for the
// sample predictions logged after every epoch.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::{batcher::ImageBatcher, dataset::ImageItem};
use crate::ml::model::Cnn;

pub struct Inferencer<'a, B: Backend> {
    model:   &'a Cnn<B>,
    batcher: ImageBatcher<B>,
}

impl<'a, B: Backend> Inferencer<'a, B> {
    pub fn new(model: &'a Cnn<B>, device: B::Device) -> Self {
        Self { model, batcher: ImageBatcher::new(device) }
    }

    /// Most likely class index for each item, in order.
    pub fn predict(&self, items: &[ImageItem]) -> Vec<usize> {
        if items.is_empty() {
            return Vec::new();
        }

        let batch  = self.batcher.batch(items.to_vec());
        let logits = self.model.forward(batch.images);

        logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .into_data()
            .iter::<i64>()
            .map(|class| class as usize)
            .collect()
    }
}
