use std::env;

use anyhow::Context;
use log::info;
use ncf_pipeline::{pipeline, store::FsStore, PipelineConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = PipelineConfig::default();
    let root = env::var("STORE_ROOT").unwrap_or_else(|_| cfg.bucket.clone());
    let store = FsStore::new(&root);

    let summary = pipeline::preprocess(&store, &cfg)
        .with_context(|| format!("preprocess over store {root}"))?;
    info!(
        "preprocess done: {} train / {} test records, {} users, {} products",
        summary.n_train, summary.n_test, summary.n_users, summary.n_products
    );
    Ok(())
}
