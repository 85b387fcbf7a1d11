// ============================================================
// Layer 4 — Fashion-MNIST Loader
// ============================================================
// Reads the four gzip-compressed IDX files of Fashion-MNIST.
// Files missing from the data directory are downloaded first.
//
// IDX layout (all integers big-endian):
//   images: magic 2051 | count | rows | cols | count*rows*cols u8
//   labels: magic 2049 | count | count u8
//
// Reference: http://yann.lecun.com/exdb/mnist/ (file format)
//            https://github.com/zalandoresearch/fashion-mnist

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use crate::domain::images::{LabeledImages, RawDataset};
use crate::domain::traits::DatasetProvider;

pub const DEFAULT_MIRROR: &str = "https://storage.googleapis.com/tensorflow/tf-keras-datasets";

const TRAIN_IMAGES: &str = "train-images-idx3-ubyte.gz";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte.gz";
const TEST_IMAGES:  &str = "t10k-images-idx3-ubyte.gz";
const TEST_LABELS:  &str = "t10k-labels-idx1-ubyte.gz";

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// Loads Fashion-MNIST from a directory of IDX files.
/// Implements the DatasetProvider trait from Layer 3.
pub struct FashionMnist {
    dir:    PathBuf,
    mirror: String,
}

impl FashionMnist {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), mirror: DEFAULT_MIRROR.to_string() }
    }

    pub fn with_mirror(mut self, mirror: impl Into<String>) -> Self {
        self.mirror = mirror.into();
        self
    }

    /// Path of `name` inside the data directory, downloading it first
    /// if it is not there yet.
    fn ensure_file(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        if path.exists() {
            return Ok(path);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create data directory '{}'", self.dir.display()))?;

        let url = format!("{}/{}", self.mirror.trim_end_matches('/'), name);
        tracing::info!("Downloading {}", url);

        let response = reqwest::blocking::get(&url)
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to download '{url}'"))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read body of '{url}'"))?;

        fs::write(&path, &bytes)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved {} bytes to '{}'", bytes.len(), path.display());
        Ok(path)
    }

    fn load_split(&self, images: &str, labels: &str) -> Result<LabeledImages> {
        let image_bytes = read_gz(&self.ensure_file(images)?)?;
        let label_bytes = read_gz(&self.ensure_file(labels)?)?;

        let (rows, cols, pixels) = parse_idx_images(&image_bytes)
            .with_context(|| format!("Malformed image file '{images}'"))?;
        let labels_vec = parse_idx_labels(&label_bytes)
            .with_context(|| format!("Malformed label file '{labels}'"))?;

        LabeledImages::new(rows, cols, pixels, labels_vec)
    }
}

impl DatasetProvider for FashionMnist {
    fn load(&self) -> Result<RawDataset> {
        let train = self.load_split(TRAIN_IMAGES, TRAIN_LABELS)?;
        let test  = self.load_split(TEST_IMAGES, TEST_LABELS)?;

        tracing::info!("train-images: {:?}", train.shape());
        tracing::info!("test-images:  {:?}", test.shape());
        Ok(RawDataset { train, test })
    }
}

fn read_gz(path: &Path) -> Result<Vec<u8>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    let mut bytes = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .with_context(|| format!("Cannot decompress '{}'", path.display()))?;
    Ok(bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    match bytes.get(offset..offset + 4) {
        Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None    => bail!("truncated header at byte {offset}"),
    }
}

/// Parse an IDX3 image file into (rows, cols, pixels).
pub fn parse_idx_images(bytes: &[u8]) -> Result<(usize, usize, Vec<u8>)> {
    let magic = read_u32(bytes, 0)?;
    if magic != IMAGES_MAGIC {
        bail!("bad magic number {magic}, expected {IMAGES_MAGIC}");
    }
    let count = read_u32(bytes, 4)? as usize;
    let rows  = read_u32(bytes, 8)? as usize;
    let cols  = read_u32(bytes, 12)? as usize;

    let body     = &bytes[16..];
    let expected = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| anyhow!("image header {count}x{rows}x{cols} is too large"))?;
    if body.len() != expected {
        bail!("expected {expected} pixel bytes, found {}", body.len());
    }
    Ok((rows, cols, body.to_vec()))
}

/// Parse an IDX1 label file.
pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let magic = read_u32(bytes, 0)?;
    if magic != LABELS_MAGIC {
        bail!("bad magic number {magic}, expected {LABELS_MAGIC}");
    }
    let count = read_u32(bytes, 4)? as usize;

    let body = &bytes[8..];
    if body.len() != count {
        bail!("expected {count} labels, found {}", body.len());
    }
    Ok(body.to_vec())
}
