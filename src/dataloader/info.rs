use super::dataloader::DatasetSplit;
use super::pipeline::BatchPipeline;

pub fn print_dataset_info(pipeline: &BatchPipeline, batch_size: usize) {
    println!("{}", dataset_info(pipeline, batch_size));
}

pub fn dataset_info(pipeline: &BatchPipeline, batch_size: usize) -> String {
    let (height, width) = pipeline.image_dims();
    let batch_size = batch_size.max(1);

    let mut out = String::new();
    out.push_str("Image Information:\n");
    out.push_str("-------------------\n");
    out.push_str(&format!("Dimensions: {height}x{width}\n"));
    out.push_str(&format!("Classes: {}\n", pipeline.num_classes()));
    out.push_str(&format!("Device: {:?}\n", pipeline.device().location()));
    out.push('\n');
    out.push_str("Dataset Information:\n");
    out.push_str("-------------------\n");
    out.push_str(&format!(
        "Total size: {}\n",
        pipeline.len(DatasetSplit::Train) + pipeline.len(DatasetSplit::Test)
    ));
    out.push_str(&format!("Batch size: {batch_size}\n"));

    for split in DatasetSplit::ALL {
        let size = pipeline.len(split);
        let remainder = size % batch_size;

        out.push('\n');
        out.push_str(&format!("{} split:\n", capitalize(&split.to_string())));
        out.push_str(&format!("  Size: {size}\n"));
        out.push_str(&format!("  Batches: {}\n", size.div_ceil(batch_size)));
        out.push_str(&format!(
            "  Last batch size: {}\n",
            if remainder == 0 { batch_size.min(size) } else { remainder }
        ));
    }

    out.push('\n');
    out.push_str(&format!("Shuffle: {}\n", pipeline.shuffle_enabled()));
    out.push_str(&format!("Seed: {}", pipeline.shuffle_seed()));
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
