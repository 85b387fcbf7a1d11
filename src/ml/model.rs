use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

use crate::domain::config::RunConfig;

const KERNEL: usize = 5;
const POOL:   usize = 2;

// #[derive(Config)] supplies Clone and the serde impls.
#[derive(Config, Debug)]
pub struct CnnConfig {
    pub num_classes:       usize,
    pub layer_1_size:      usize,
    pub layer_2_size:      usize,
    pub hidden_layer_size: usize,
    pub dropout:           f64,
    #[config(default = 28)]
    pub image_size:        usize,
}

impl CnnConfig {
    pub fn from_run(cfg: &RunConfig, num_classes: usize) -> Self {
        CnnConfig::new(
            num_classes,
            cfg.layer_1_size,
            cfg.layer_2_size,
            cfg.hidden_layer_size,
            cfg.dropout,
        )
    }

    /// Side length of the feature maps after both conv + pool stages.
    /// 28 → conv 24 → pool 12 → conv 8 → pool 4
    pub fn feature_size(&self) -> usize {
        let after_first = (self.image_size + 1 - KERNEL) / POOL;
        (after_first + 1 - KERNEL) / POOL
    }

    pub fn flattened_size(&self) -> usize {
        self.layer_2_size * self.feature_size() * self.feature_size()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Cnn<B> {
        let pool = || MaxPool2dConfig::new([POOL, POOL]).with_strides([POOL, POOL]).init();

        Cnn {
            conv1:   Conv2dConfig::new([1, self.layer_1_size], [KERNEL, KERNEL]).init(device),
            pool1:   pool(),
            conv2:   Conv2dConfig::new([self.layer_1_size, self.layer_2_size], [KERNEL, KERNEL]).init(device),
            pool2:   pool(),
            dropout: DropoutConfig::new(self.dropout).init(),
            hidden:  LinearConfig::new(self.flattened_size(), self.hidden_layer_size).init(device),
            output:  LinearConfig::new(self.hidden_layer_size, self.num_classes).init(device),
        }
    }
}

/// conv → pool → conv → pool → dropout → flatten → dense → dense
#[derive(Module, Debug)]
pub struct Cnn<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub pool1:   MaxPool2d,
    pub conv2:   Conv2d<B>,
    pub pool2:   MaxPool2d,
    pub dropout: Dropout,
    pub hidden:  Linear<B>,
    pub output:  Linear<B>,
}

impl<B: Backend> Cnn<B> {
    /// images: [batch, 1, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool1.forward(relu(self.conv1.forward(images)));
        let x = self.pool2.forward(relu(self.conv2.forward(x)));
        let x = self.dropout.forward(x);

        let [batch, channels, height, width] = x.dims();
        let x = x.reshape([batch, channels * height * width]);

        let x = relu(self.hidden.forward(x));
        self.output.forward(x)
    }

    /// Categorical cross-entropy against one-hot targets.
    /// logits: [batch, C], targets: [batch, C] → scalar [1]
    pub fn loss(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        let log_probs = log_softmax(logits, 1);
        (log_probs * targets).sum_dim(1).neg().mean()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_feature_size_for_28px() {
        let cfg = CnnConfig::from_run(&RunConfig::default(), 10);
        assert_eq!(cfg.feature_size(), 4);
        assert_eq!(cfg.flattened_size(), 32 * 4 * 4);
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model  = CnnConfig::new(10, 4, 8, 16, 0.2).init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::zeros([3, 1, 28, 28], &device);
        assert_eq!(model.forward(images).dims(), [3, 10]);
    }

    #[test]
    fn test_loss_of_uniform_logits_is_ln_classes() {
        let device  = Default::default();
        let logits  = Tensor::<TestBackend, 2>::zeros([2, 4], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            &device,
        );
        let loss: f32 = Cnn::<TestBackend>::loss(logits, targets).into_scalar().elem();
        assert!((loss - 4f32.ln()).abs() < 1e-5);
    }
}
