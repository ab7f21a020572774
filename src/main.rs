use std::io::IsTerminal;
use std::process::ExitCode;

use gpu_dataset::dataloader::info::print_dataset_info;
use gpu_dataset::{BatchPipeline, DatasetConfig, DatasetSplit, DeviceLocation};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    Registry::default().with(filter).with(fmt_layer).init();
}

fn run() -> gpu_dataset::Result<()> {
    let mut args = std::env::args().skip(1);
    let data_dir = args.next().unwrap_or_else(|| "data".to_string());
    let batch_size = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| gpu_dataset::DataError::InvalidConfig(format!("batch size {raw:?} is not a number")))?,
        None => 64,
    };

    let device = match std::env::var("GPU_DATASET_DEVICE") {
        Ok(ordinal) => DeviceLocation::Gpu(ordinal.parse::<usize>().map_err(|_| {
            gpu_dataset::DataError::InvalidConfig(format!("GPU_DATASET_DEVICE {ordinal:?} is not an ordinal"))
        })?),
        Err(_) => DeviceLocation::Cpu,
    };

    let config = DatasetConfig {
        device,
        ..DatasetConfig::new(data_dir)
    };
    let mut pipeline = BatchPipeline::new(config)?;
    print_dataset_info(&pipeline, batch_size);

    pipeline.next_epoch();
    for split in DatasetSplit::ALL {
        let mut batches = 0;
        let mut samples = 0;
        while pipeline.has_next(split) {
            let (images, _labels) = pipeline.next_batch(batch_size, split)?;
            samples += images.shape().map_or(0, |shape| shape.as_slice()[0]);
            batches += 1;
        }
        info!(split = %split, batches, samples, "epoch complete");
    }

    info!(
        peak_bytes = pipeline.device().peak_memory(),
        allocations = pipeline.device().allocation_count(),
        "device memory"
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
