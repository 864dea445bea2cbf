//! The two batch stages, wired over any `ObjectStore`.
//!
//! `preprocess` turns the raw event log into encoded train/test splits plus
//! the canonical encoder artifact; `train` consumes exactly those artifacts
//! and persists the fitted model. The stages share nothing in memory, only
//! the blobs between them.

use log::info;

use crate::{
    config::PipelineConfig,
    data::{
        encoder::EncoderSet,
        features::{event_time_seconds, filter_views},
        records::{read_interactions, read_raw_events, write_interactions, Interaction},
        split::train_test_split,
    },
    error::{PipelineErr, Result},
    model::NcfModel,
    persist,
    store::ObjectStore,
    train::{EpochStats, SplitArrays, Trainer},
};

/// What `preprocess` produced, for logging and assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub n_raw: usize,
    pub n_views: usize,
    pub n_users: usize,
    pub n_products: usize,
    pub n_train: usize,
    pub n_test: usize,
}

/// What `train` produced: the fitted topology and the per-epoch history.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub n_users: usize,
    pub n_products: usize,
    pub history: Vec<EpochStats>,
}

/// Stage one: raw event log in, encoded splits and encoders out.
///
/// Reads `cfg.source_key`, keeps only view events, fits both ID encoders
/// over the filtered rows in first-seen order, derives the interaction
/// strength from each event timestamp, splits 80/20 at `cfg.seed` and
/// uploads the three artifacts.
///
/// # Errors
/// `EmptyDataset` if no view events survive the filter, plus any read,
/// parse or upload failure.
pub fn preprocess(store: &impl ObjectStore, cfg: &PipelineConfig) -> Result<PreprocessSummary> {
    info!("reading raw events from {}", cfg.source_key);
    let raw = read_raw_events(&store.get(&cfg.source_key)?)?;
    let n_raw = raw.len();

    let views = filter_views(raw);
    info!("kept {} view events of {n_raw} raw", views.len());
    if views.is_empty() {
        return Err(PipelineErr::EmptyDataset { stage: "preprocess" });
    }

    let encoders = EncoderSet::fit(&views);
    let mut encoded = Vec::with_capacity(views.len());
    for event in &views {
        let strength = event_time_seconds(&event.event_time)?;
        encoded.push(encoders.encode_event(event, strength)?);
    }

    let (train, test) = train_test_split(encoded, cfg.test_fraction, cfg.seed);
    info!(
        "encoded {} users / {} products; split {} train / {} test",
        encoders.users.len(),
        encoders.products.len(),
        train.len(),
        test.len()
    );

    store.put(&cfg.train_key, &write_interactions(&train)?)?;
    store.put(&cfg.test_key, &write_interactions(&test)?)?;
    persist::save_encoders(store, &cfg.encoders_key, &encoders)?;

    Ok(PreprocessSummary {
        n_raw,
        n_views: views.len(),
        n_users: encoders.users.len(),
        n_products: encoders.products.len(),
        n_train: train.len(),
        n_test: test.len(),
    })
}

/// Stage two: encoded splits in, fitted model blob out.
///
/// The encoder artifact written by `preprocess` is the single source of
/// truth for vocabulary sizes; both splits are validated against it before
/// any parameter is allocated, so a stale or foreign split fails fast
/// instead of training against the wrong embedding tables.
///
/// # Errors
/// `EmptyDataset` if either split is empty, `IndexOutOfRange` if a split
/// row does not fit the encoders, plus any read, train or upload failure.
pub fn train(store: &impl ObjectStore, cfg: &PipelineConfig) -> Result<TrainSummary> {
    let encoders = persist::load_encoders(store, &cfg.encoders_key)?;
    let n_users = encoders.users.len();
    let n_products = encoders.products.len();
    info!("loaded encoders: {n_users} users, {n_products} products");

    let train_records = read_interactions(&store.get(&cfg.train_key)?)?;
    let test_records = read_interactions(&store.get(&cfg.test_key)?)?;
    if train_records.is_empty() {
        return Err(PipelineErr::EmptyDataset { stage: "train split" });
    }
    if test_records.is_empty() {
        return Err(PipelineErr::EmptyDataset { stage: "test split" });
    }
    validate_indices(&train_records, n_users, n_products)?;
    validate_indices(&test_records, n_users, n_products)?;

    let model = NcfModel::new(n_users, n_products, cfg.embedding_dim, cfg.hidden_dims);
    info!(
        "fitting ncf model ({} parameters) on {} records",
        model.size(),
        train_records.len()
    );

    let mut trainer = Trainer::new(model, cfg)?;
    let history = trainer.fit(
        &SplitArrays::from_records(&train_records),
        &SplitArrays::from_records(&test_records),
    )?;

    let (model, params) = trainer.into_parts();
    persist::save_model(store, &cfg.model_key, &model, &params)?;

    Ok(TrainSummary { n_users, n_products, history })
}

fn validate_indices(records: &[Interaction], n_users: usize, n_products: usize) -> Result<()> {
    for r in records {
        if r.user_id as usize >= n_users {
            return Err(PipelineErr::IndexOutOfRange { kind: "user_id", got: r.user_id, bound: n_users });
        }
        if r.product_id as usize >= n_products {
            return Err(PipelineErr::IndexOutOfRange {
                kind: "product_id",
                got: r.product_id,
                bound: n_products,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsStore;

    const RAW: &str = "\
user_id,product_id,event_type,event_time
u1,p1,view,100
u2,p1,cart,110
u2,p2,view,120
u3,p3,purchase,130
";

    fn seeded_store(raw: &str) -> (tempfile::TempDir, FsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.put("cleaned_events.csv", raw.as_bytes()).unwrap();
        (dir, store)
    }

    #[test]
    fn preprocess_filters_and_encodes() {
        let (_dir, store) = seeded_store(RAW);
        let cfg = PipelineConfig::default();

        let summary = preprocess(&store, &cfg).unwrap();
        assert_eq!(summary.n_raw, 4);
        assert_eq!(summary.n_views, 2);
        assert_eq!(summary.n_users, 2);
        assert_eq!(summary.n_products, 2);
        assert_eq!(summary.n_train + summary.n_test, 2);

        let encoders = persist::load_encoders(&store, &cfg.encoders_key).unwrap();
        assert_eq!(encoders.users.encode("u1").unwrap(), 0);
        assert_eq!(encoders.users.encode("u2").unwrap(), 1);
        // u3 only purchased, so it never entered the vocabulary.
        assert!(encoders.users.encode("u3").is_err());
    }

    #[test]
    fn preprocess_with_no_views_is_an_error() {
        let (_dir, store) = seeded_store("user_id,product_id,event_type,event_time\nu1,p1,cart,100\n");
        let err = preprocess(&store, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineErr::EmptyDataset { stage: "preprocess" }), "got {err:?}");
    }

    #[test]
    fn train_rejects_rows_outside_the_encoders() {
        let (_dir, store) = seeded_store(RAW);
        let cfg = PipelineConfig::default();
        preprocess(&store, &cfg).unwrap();

        // Overwrite the train split with an index no encoder produced.
        let rogue = vec![Interaction { user_id: 9, product_id: 0, interaction_strength: 100. }];
        store.put(&cfg.train_key, &write_interactions(&rogue).unwrap()).unwrap();

        let err = train(&store, &cfg).unwrap_err();
        assert!(matches!(err, PipelineErr::IndexOutOfRange { kind: "user_id", .. }), "got {err:?}");
    }
}
