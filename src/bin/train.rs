use std::env;

use anyhow::Context;
use log::info;
use ncf_pipeline::{pipeline, store::FsStore, PipelineConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = PipelineConfig::default();
    let root = env::var("STORE_ROOT").unwrap_or_else(|_| cfg.bucket.clone());
    let store = FsStore::new(&root);

    let summary =
        pipeline::train(&store, &cfg).with_context(|| format!("train over store {root}"))?;
    if let Some(last) = summary.history.last() {
        info!(
            "training done: val_loss {:.4}, val_accuracy {:.4} after {} epochs",
            last.valid_loss,
            last.valid_accuracy,
            summary.history.len()
        );
    }
    Ok(())
}
