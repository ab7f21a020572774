use gpu_dataset::dataloader::dataloader::{IMAGE_MAGIC, LABEL_MAGIC};

/// Encodes images of `rows * cols` bytes each as an image archive.
pub fn encode_images(images: &[&[u8]], rows: u32, cols: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + images.iter().map(|i| i.len()).sum::<usize>());
    buf.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
    buf.extend_from_slice(&(images.len() as u32).to_be_bytes());
    buf.extend_from_slice(&rows.to_be_bytes());
    buf.extend_from_slice(&cols.to_be_bytes());
    for image in images {
        buf.extend_from_slice(image);
    }
    buf
}

pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + labels.len());
    buf.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
    buf.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    buf.extend_from_slice(labels);
    buf
}
