// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Runs epochs `start_epoch..epochs` over the training split and
// evaluates on the test split after each one. A resumed run at
// step k therefore performs `epochs - k` more passes.
//
// After every epoch the callbacks see the metrics and the
// compiled model. No retries: any error ends the fit.
//
//   - Training uses B (Autodiff) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - Validation batcher must also use B::InnerBackend
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    data::dataset::Dataset,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ImageDataset,
};
use crate::domain::run::EpochMetrics;
use crate::ml::model::Cnn;
use crate::ml::optimizer::Compiled;

/// Hook invoked by the training loop.
pub trait EpochCallback<B: AutodiffBackend> {
    fn on_fit_start(&mut self, _start_epoch: usize, _epochs: usize) -> Result<()> {
        Ok(())
    }

    /// `epoch` is 0-based; `metrics.epoch` is the 1-based display number.
    fn on_epoch_end(
        &mut self,
        epoch:    usize,
        metrics:  &EpochMetrics,
        compiled: &Compiled<B>,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    /// Epoch budget; training stops after epoch index `epochs - 1`
    pub epochs:      usize,

    /// First 0-based epoch to train (the tracker's step on resume)
    pub start_epoch: usize,

    /// Images per optimizer step, for training and validation
    pub batch_size:  usize,

    /// Shuffle seed of the training loader
    pub seed:        u64,
}

pub fn fit<B: AutodiffBackend>(
    mut compiled:  Compiled<B>,
    train_dataset: ImageDataset,
    test_dataset:  ImageDataset,
    options:       FitOptions,
    device:        &B::Device,
    callbacks:     &mut [&mut dyn EpochCallback<B>],
) -> Result<(Compiled<B>, Option<EpochMetrics>)> {
    tracing::info!(
        "Fitting epochs {}..{} on {} train / {} test images",
        options.start_epoch, options.epochs, train_dataset.len(), test_dataset.len()
    );

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(options.batch_size)
        .shuffle(shuffle_seed(options.seed, options.start_epoch))
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend, no autodiff overhead) ──────────
    let test_loader = DataLoaderBuilder::new(ImageBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(options.batch_size)
        .num_workers(1)
        .build(test_dataset);

    for callback in callbacks.iter_mut() {
        callback.on_fit_start(options.start_epoch, options.epochs)?;
    }

    let mut last = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in options.start_epoch..options.epochs {
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;
        let mut lr       = compiled.learning_rate();

        // ── Training phase ────────────────────────────────────────────────────
        for batch in train_loader.iter() {
            let batch_len = batch.labels.dims()[0];
            let logits    = compiled.model.forward(batch.images);
            let loss      = Cnn::loss(logits.clone(), batch.targets);

            loss_sum += loss.clone().into_scalar().elem::<f64>() * batch_len as f64;
            correct  += count_correct(logits, batch.labels);
            seen     += batch_len;

            lr = compiled.learning_rate();
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &compiled.model);
            compiled.model = compiled.optimizer.step(lr, compiled.model, grads);
            compiled.iteration += 1;
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let (val_loss, val_accuracy) = evaluate(&compiled.model.valid(), &*test_loader);

        let metrics = EpochMetrics {
            epoch:         epoch + 1,
            loss:          ratio(loss_sum, seen),
            accuracy:      ratio(correct as f64, seen),
            val_loss,
            val_accuracy,
            learning_rate: lr,
        };

        println!(
            "Epoch {:>3}/{} | loss={:.4} | acc={:.2}% | val_loss={:.4} | val_acc={:.2}%",
            metrics.epoch, options.epochs, metrics.loss, metrics.accuracy * 100.0,
            metrics.val_loss, metrics.val_accuracy * 100.0,
        );

        for callback in callbacks.iter_mut() {
            callback.on_epoch_end(epoch, &metrics, &compiled)?;
        }
        last = Some(metrics);
    }

    if last.is_none() {
        tracing::info!(
            "Nothing to fit: start epoch {} already reaches the budget of {}",
            options.start_epoch, options.epochs
        );
    }
    Ok((compiled, last))
}

/// Mean loss and accuracy of a model over a whole loader.
fn evaluate<B: Backend>(
    model:  &Cnn<B>,
    loader: &dyn DataLoader<ImageBatch<B>>,
) -> (f64, f64) {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut seen     = 0usize;

    for batch in loader.iter() {
        let batch_len = batch.labels.dims()[0];
        let logits    = model.forward(batch.images);
        let loss      = Cnn::loss(logits.clone(), batch.targets);

        loss_sum += loss.into_scalar().elem::<f64>() * batch_len as f64;
        correct  += count_correct(logits, batch.labels);
        seen     += batch_len;
    }

    (ratio(loss_sum, seen), ratio(correct as f64, seen))
}

// argmax(1) returns shape [batch, 1]; flatten to [batch]
// before comparing with labels which is [batch]
fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// A resumed session shuffles differently from the session that
/// trained the first epochs.
fn shuffle_seed(seed: u64, start_epoch: usize) -> u64 {
    seed.wrapping_add(start_epoch as u64)
}

fn ratio(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { f64::NAN }
}
