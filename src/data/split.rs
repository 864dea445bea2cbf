use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Deterministically partitions `records` into (train, test).
///
/// Row order is shuffled with `StdRng::seed_from_u64(seed)` and the first
/// `ceil(test_fraction * n)` shuffled positions become the test set, so the
/// same input and seed always produce the same membership. The subsets are
/// disjoint and cover the input; each keeps the input's relative row order.
/// No stratification by user or product is attempted.
pub fn train_test_split<T>(records: Vec<T>, test_fraction: f32, seed: u64) -> (Vec<T>, Vec<T>) {
    let n = records.len();
    let n_test = ((n as f32) * test_fraction).ceil() as usize;

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut is_test = vec![false; n];
    for &row in &order[..n_test.min(n)] {
        is_test[row] = true;
    }

    let mut train = Vec::with_capacity(n - n_test.min(n));
    let mut test = Vec::with_capacity(n_test.min(n));
    for (row, record) in records.into_iter().enumerate() {
        if is_test[row] {
            test.push(record);
        } else {
            train.push(record);
        }
    }

    (train, test)
}
