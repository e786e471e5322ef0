use ndarray::{s, Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{Dataset, Float};

impl<F: Float> Dataset<F> {
    /// Create a new dataset from records and targets
    ///
    /// The number of rows in `records` has to match the length of `targets`.
    pub fn new(records: Array2<F>, targets: Array1<F>) -> Dataset<F> {
        Dataset {
            records,
            targets,
            feature_names: Vec::new(),
        }
    }

    /// Return a reference to the record matrix
    pub fn records(&self) -> &Array2<F> {
        &self.records
    }

    /// Return a reference to the targets
    pub fn targets(&self) -> &Array1<F> {
        &self.targets
    }

    pub fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    pub fn nfeatures(&self) -> usize {
        self.records.ncols()
    }

    /// Updates the feature names of a dataset
    pub fn with_feature_names<I: Into<String>>(mut self, names: Vec<I>) -> Dataset<F> {
        self.feature_names = names.into_iter().map(|x| x.into()).collect();
        self
    }

    /// Returns feature names
    ///
    /// A feature name gives a human-readable string describing the purpose of a single feature.
    /// This allow the reader to understand its purpose while analysing results, for example
    /// correlation analysis or feature importance. If no names were set, placeholders of the form
    /// `feature-<index>` are returned.
    pub fn feature_names(&self) -> Vec<String> {
        if !self.feature_names.is_empty() {
            self.feature_names.clone()
        } else {
            (0..self.nfeatures())
                .map(|idx| format!("feature-{}", idx))
                .collect()
        }
    }

    /// Shuffle the samples of a dataset
    ///
    /// Records and targets are permuted together with a random permutation drawn from `rng`, so a
    /// seeded generator always produces the same order.
    pub fn shuffle<R: Rng>(self, rng: &mut R) -> Dataset<F> {
        let mut indices = (0..self.nsamples()).collect::<Vec<_>>();
        indices.shuffle(rng);

        Dataset {
            records: self.records.select(Axis(0), &indices),
            targets: self.targets.select(Axis(0), &indices),
            feature_names: self.feature_names,
        }
    }

    /// Split dataset into two disjoint chunks
    ///
    /// The first chunk receives `floor(nsamples * ratio)` samples, the second chunk the
    /// remainder. Samples keep their order, call [`shuffle`](Self::shuffle) first to obtain a
    /// randomized split.
    ///
    /// `ratio` has to be in `[0, 1]`.
    pub fn split_with_ratio(self, ratio: f64) -> (Dataset<F>, Dataset<F>) {
        let nsamples = self.nsamples();
        let exact = nsamples as f64 * ratio;
        // absorb representation error, 0.29 * 100 is slightly below 29
        let n_first = ((exact + exact.abs() * 1e-12).floor() as usize).min(nsamples);

        let first = Dataset {
            records: self.records.slice(s![..n_first, ..]).to_owned(),
            targets: self.targets.slice(s![..n_first]).to_owned(),
            feature_names: self.feature_names.clone(),
        };
        let second = Dataset {
            records: self.records.slice(s![n_first.., ..]).to_owned(),
            targets: self.targets.slice(s![n_first..]).to_owned(),
            feature_names: self.feature_names,
        };

        (first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::Dataset;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn indexed(nsamples: usize) -> Dataset<f64> {
        let records = Array2::from_shape_fn((nsamples, 2), |(i, j)| (i * 2 + j) as f64);
        let targets = Array1::from_shape_fn(nsamples, |i| i as f64);
        Dataset::new(records, targets).with_feature_names(vec!["a", "b"])
    }

    #[test]
    fn default_feature_names() {
        let ds = Dataset::new(array![[1.0, 2.0, 3.0]], array![0.0]);
        assert_eq!(
            ds.feature_names(),
            vec!["feature-0", "feature-1", "feature-2"]
        );
    }

    #[test]
    fn split_sizes_follow_ratio() {
        let (train, test) = indexed(100).split_with_ratio(0.75);
        assert_eq!(train.nsamples(), 75);
        assert_eq!(test.nsamples(), 25);

        let (train, test) = indexed(1599).split_with_ratio(0.75);
        assert_eq!(train.nsamples(), 1199);
        assert_eq!(test.nsamples(), 400);

        let (train, test) = indexed(100).split_with_ratio(0.7);
        assert_eq!((train.nsamples(), test.nsamples()), (70, 30));

        let (train, test) = indexed(10).split_with_ratio(0.7);
        assert_eq!((train.nsamples(), test.nsamples()), (7, 3));

        let (train, test) = indexed(20).split_with_ratio(0.9);
        assert_eq!((train.nsamples(), test.nsamples()), (18, 2));

        let (train, test) = indexed(100).split_with_ratio(0.29);
        assert_eq!((train.nsamples(), test.nsamples()), (29, 71));

        let (train, test) = indexed(10).split_with_ratio(1.0);
        assert_eq!(train.nsamples(), 10);
        assert_eq!(test.nsamples(), 0);
    }

    #[test]
    fn split_keeps_feature_names() {
        let (train, test) = indexed(8).split_with_ratio(0.5);
        assert_eq!(train.feature_names(), vec!["a", "b"]);
        assert_eq!(test.feature_names(), vec!["a", "b"]);
    }

    #[test]
    fn shuffled_split_is_disjoint_and_complete() {
        let mut rng = Xoshiro256Plus::seed_from_u64(40);
        let (train, test) = indexed(101).shuffle(&mut rng).split_with_ratio(0.75);

        assert_eq!(train.nsamples() + test.nsamples(), 101);
        assert!((train.nsamples() as f64 - 0.75 * 101.0).abs() <= 1.0);

        let mut seen = train
            .targets()
            .iter()
            .chain(test.targets().iter())
            .map(|x| *x as usize)
            .collect::<Vec<_>>();
        seen.sort_unstable();
        assert_eq!(seen, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_keeps_rows_aligned() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let ds = indexed(20).shuffle(&mut rng);

        for (row, target) in ds.records().outer_iter().zip(ds.targets().iter()) {
            assert_abs_diff_eq!(row[0], target * 2.0);
        }
    }

    #[test]
    fn shuffle_is_reproducible() {
        let first = indexed(50).shuffle(&mut Xoshiro256Plus::seed_from_u64(40));
        let second = indexed(50).shuffle(&mut Xoshiro256Plus::seed_from_u64(40));
        assert_eq!(first, second);

        let other = indexed(50).shuffle(&mut Xoshiro256Plus::seed_from_u64(41));
        assert_ne!(first.targets(), other.targets());
    }
}
