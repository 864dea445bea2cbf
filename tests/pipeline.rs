//! Both stages driven end to end over a filesystem store.

use std::num::NonZeroUsize;

use ncf_pipeline::{
    data::records::read_interactions,
    model::NcfModel,
    persist,
    pipeline::{preprocess, train},
    store::{FsStore, ObjectStore},
    PipelineConfig,
};

const RAW_EVENTS: &str = "\
user_id,product_id,event_type,event_time
A,X,view,2020-01-01 00:00:00 UTC
B,Y,view,2020-01-01 00:00:10 UTC
A,X,view,2020-01-01 00:00:20 UTC
B,X,cart,2020-01-01 00:00:30 UTC
A,Y,purchase,2020-01-01 00:00:40 UTC
";

const EPOCH_2020: f64 = 1_577_836_800.0;

fn small_config() -> PipelineConfig {
    PipelineConfig {
        embedding_dim: 4,
        hidden_dims: [8, 4],
        epochs: NonZeroUsize::new(2).unwrap(),
        batch_size: NonZeroUsize::new(2).unwrap(),
        ..PipelineConfig::default()
    }
}

fn seeded_store() -> (tempfile::TempDir, FsStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store
        .put("cleaned_events.csv", RAW_EVENTS.as_bytes())
        .unwrap();
    (dir, store)
}

#[test]
fn preprocess_derives_the_expected_artifacts() {
    let (_dir, store) = seeded_store();
    let cfg = small_config();

    let summary = preprocess(&store, &cfg).unwrap();
    assert_eq!(summary.n_raw, 5);
    assert_eq!(summary.n_views, 3);
    assert_eq!(summary.n_users, 2);
    assert_eq!(summary.n_products, 2);
    assert_eq!(summary.n_train, 2);
    assert_eq!(summary.n_test, 1);

    // First-seen encoding order over the view rows only.
    let encoders = persist::load_encoders(&store, &cfg.encoders_key).unwrap();
    assert_eq!(encoders.users.encode("A").unwrap(), 0);
    assert_eq!(encoders.users.encode("B").unwrap(), 1);
    assert_eq!(encoders.products.encode("X").unwrap(), 0);
    assert_eq!(encoders.products.encode("Y").unwrap(), 1);

    // Every encoded row carries its event time, in epoch seconds, as label.
    let mut rows = read_interactions(&store.get(&cfg.train_key).unwrap()).unwrap();
    rows.extend(read_interactions(&store.get(&cfg.test_key).unwrap()).unwrap());
    assert_eq!(rows.len(), 3);
    let mut strengths: Vec<f64> = rows.iter().map(|r| r.interaction_strength).collect();
    strengths.sort_by(f64::total_cmp);
    assert_eq!(strengths, vec![EPOCH_2020, EPOCH_2020 + 10., EPOCH_2020 + 20.]);
}

#[test]
fn preprocess_is_deterministic() {
    let (_dir, store_a) = seeded_store();
    let (_dir2, store_b) = seeded_store();
    let cfg = small_config();

    preprocess(&store_a, &cfg).unwrap();
    preprocess(&store_b, &cfg).unwrap();

    for key in [&cfg.train_key, &cfg.test_key, &cfg.encoders_key] {
        assert_eq!(store_a.get(key).unwrap(), store_b.get(key).unwrap(), "key {key}");
    }
}

#[test]
fn both_stages_produce_a_loadable_model() {
    let (_dir, store) = seeded_store();
    let cfg = small_config();

    preprocess(&store, &cfg).unwrap();
    let summary = train(&store, &cfg).unwrap();

    assert_eq!(summary.n_users, 2);
    assert_eq!(summary.n_products, 2);
    assert_eq!(summary.history.len(), cfg.epochs.get());
    for stats in &summary.history {
        assert!(stats.train_loss.is_finite());
        assert!(stats.valid_loss.is_finite());
    }

    // The persisted blob restores into the same topology and scores pairs.
    let mut model = NcfModel::new(summary.n_users, summary.n_products, cfg.embedding_dim, cfg.hidden_dims);
    let params = persist::load_model_params(&store, &cfg.model_key, &model).unwrap();
    let scores = model.forward(&params, &[0, 1], &[0, 1]).unwrap();
    assert_eq!(scores.dim(), (2, 1));
    for &s in scores.iter() {
        assert!(s > 0. && s < 1., "score {s} outside (0, 1)");
    }
}

#[test]
fn train_without_preprocess_artifacts_fails() {
    let (_dir, store) = seeded_store();
    assert!(train(&store, &small_config()).is_err());
}
