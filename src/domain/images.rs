use anyhow::{bail, Result};

/// Class names of Fashion-MNIST, indexed by label.
pub const FASHION_LABELS: [&str; 10] = [
    "T-shirt/top", "Trouser", "Pullover", "Dress", "Coat",
    "Sandal", "Shirt", "Sneaker", "Bag", "Ankle boot",
];

pub const IMG_WIDTH:  usize = 28;
pub const IMG_HEIGHT: usize = 28;

/// A batch of raw 8-bit grayscale images with their labels.
/// Pixels are stored row-major, image after image: shape (N, H, W).
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImages {
    pub rows:   usize,
    pub cols:   usize,
    pub pixels: Vec<u8>,
    pub labels: Vec<u8>,
}

impl LabeledImages {
    pub fn new(rows: usize, cols: usize, pixels: Vec<u8>, labels: Vec<u8>) -> Result<Self> {
        let per_image = rows * cols;
        if per_image == 0 || pixels.len() % per_image != 0 {
            bail!("pixel buffer of {} bytes is not a whole number of {rows}x{cols} images", pixels.len());
        }
        if pixels.len() / per_image != labels.len() {
            bail!(
                "{} images but {} labels",
                pixels.len() / per_image,
                labels.len()
            );
        }
        Ok(Self { rows, cols, pixels, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.len(), self.rows, self.cols]
    }
}

/// The fixed train / evaluation split handed out by a dataset provider.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub train: LabeledImages,
    pub test:  LabeledImages,
}

/// Name of a class index, or a placeholder for indices outside the label set.
pub fn label_name(index: usize) -> &'static str {
    FASHION_LABELS.get(index).copied().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_mismatched_counts() {
        assert!(LabeledImages::new(2, 2, vec![0; 8], vec![1]).is_err());
        assert!(LabeledImages::new(2, 2, vec![0; 7], vec![1, 2]).is_err());
    }

    #[test]
    fn test_shape() {
        let imgs = LabeledImages::new(2, 3, vec![0; 12], vec![4, 5]).unwrap();
        assert_eq!(imgs.shape(), [2, 2, 3]);
    }

    #[test]
    fn test_label_name() {
        assert_eq!(label_name(9), "Ankle boot");
        assert_eq!(label_name(42), "unknown");
    }
}
