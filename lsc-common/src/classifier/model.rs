//! CNN definition
//!
//! Two convolution blocks (conv 3x3 valid + ReLU, max-pool 2x2, dropout),
//! a dense layer and a two-way head. The head emits logits; softmax is
//! applied by [`super::Classifier`] and folded into the loss during training.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::features::{N_FRAMES, N_MELS};

#[derive(Config, Debug)]
pub struct ClassifierNetConfig {
    #[config(default = 2)]
    pub num_classes: usize,
    #[config(default = 32)]
    pub conv1_channels: usize,
    #[config(default = 64)]
    pub conv2_channels: usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 0.2)]
    pub conv_dropout: f64,
    #[config(default = 0.3)]
    pub dense_dropout: f64,
}

#[derive(Module, Debug)]
pub struct ClassifierNet<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    dropout1: Dropout,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    dropout2: Dropout,
    fc1: Linear<B>,
    dropout3: Dropout,
    head: Linear<B>,
    activation: Relu,
}

/// Spatial size after a valid 3x3 convolution followed by a 2x2 pool
fn block_output(size: usize) -> usize {
    (size - 2) / 2
}

impl ClassifierNetConfig {
    /// Flattened feature count entering the dense layer
    pub fn flattened_size(&self) -> usize {
        let height = block_output(block_output(N_MELS));
        let width = block_output(block_output(N_FRAMES));
        self.conv2_channels * height * width
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierNet<B> {
        let pool = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        ClassifierNet {
            conv1: Conv2dConfig::new([1, self.conv1_channels], [3, 3]).init(device),
            pool1: pool(),
            dropout1: DropoutConfig::new(self.conv_dropout).init(),
            conv2: Conv2dConfig::new([self.conv1_channels, self.conv2_channels], [3, 3])
                .init(device),
            pool2: pool(),
            dropout2: DropoutConfig::new(self.conv_dropout).init(),
            fc1: LinearConfig::new(self.flattened_size(), self.hidden_size).init(device),
            dropout3: DropoutConfig::new(self.dense_dropout).init(),
            head: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> ClassifierNet<B> {
    /// # Shapes
    /// - input `[batch, 1, N_MELS, N_FRAMES]`
    /// - output `[batch, num_classes]` logits
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(input);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);
        let x = self.dropout1.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x);
        let x = self.dropout2.forward(x);

        let [batch, channels, height, width] = x.dims();
        let x = x.reshape([batch, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout3.forward(x);

        self.head.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_flattened_size() {
        // 128 -> conv 126 -> pool 63 -> conv 61 -> pool 30
        assert_eq!(ClassifierNetConfig::new().flattened_size(), 64 * 30 * 30);
    }

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let net = ClassifierNetConfig::new().init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::zeros([2, 1, N_MELS, N_FRAMES], &device);

        assert_eq!(net.forward(input).dims(), [2, 2]);
    }
}
