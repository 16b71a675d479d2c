//! View construction.
//!
//! Statistics are folded in during construction so the accessors are
//! constant-time. Each entity is one of two cases:
//!
//! - A genome is appended and folded in with Knuth's online update for the
//!   mean and the sum of squared deviations (Knuth, TAOCP vol. 2, 3rd ed.,
//!   p. 232).
//! - A population is summarised into its own view, which is then merged with
//!   the pairwise formula of Chan, Golub and LeVeque (1983). Knuth's update is
//!   the special case where the other side holds a single genome.

use super::{View, ViewPool};
use crate::models::{Entity, Genome, Population};

/// Running extremes; only meaningful once the view has a member.
struct Extremes {
    max: f64,
    min: f64,
}

impl<G: Genome> ViewPool<G> {
    /// Build a view over `entities`, folding them in order.
    ///
    /// Nested populations contribute their genomes rather than themselves.
    /// Their intermediate views are released back to this pool once merged.
    pub fn view<'a, P, I>(&self, entities: I) -> View<G>
    where
        P: Population<G> + ?Sized + 'a,
        I: IntoIterator<Item = Entity<'a, G, P>>,
    {
        let entities = entities.into_iter();
        let mut view = self.acquire_with_capacity(entities.size_hint().0);
        let mut extremes = Extremes {
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        };

        for entity in entities {
            match entity {
                Entity::Genome(genome) => view.fold_genome(genome, &mut extremes),
                Entity::Population(population) => {
                    let sub = population.view(self);
                    view.merge(sub, &mut extremes);
                }
            }
        }

        view
    }

    /// Build a view over a flat list of genomes.
    pub fn view_genomes<I>(&self, genomes: I) -> View<G>
    where
        I: IntoIterator<Item = G>,
    {
        self.view(genomes.into_iter().map(Entity::<G, Leaves>::Genome))
    }
}

/// Stand-in population type for views built from genomes only.
enum Leaves {}

impl<G> Population<G> for Leaves {
    fn view(&self, _pool: &ViewPool<G>) -> View<G> {
        match *self {}
    }
}

impl<G: Genome> View<G> {
    fn fold_genome(&mut self, genome: G, extremes: &mut Extremes) {
        let fitness = genome.fitness();
        let delta = fitness - self.mean;
        let new_len = self.len + 1.0;
        let first = self.members.is_empty();

        if first || fitness > extremes.max {
            self.max = self.members.len();
            extremes.max = fitness;
        }
        if first || fitness < extremes.min {
            self.min = self.members.len();
            extremes.min = fitness;
        }

        self.mean += delta / new_len;
        self.m2 += delta * delta * (self.len / new_len);
        self.len = new_len;
        self.members.push(genome);
    }

    fn merge(&mut self, mut sub: View<G>, extremes: &mut Extremes) {
        // An empty sub-population adds nothing, and 0/0 would poison the mean.
        if sub.members.is_empty() {
            sub.release();
            return;
        }

        let offset = self.members.len();
        let first = offset == 0;
        let delta = sub.mean - self.mean;
        let new_len = self.len + sub.len;

        let sub_max = sub.members[sub.max].fitness();
        if first || sub_max > extremes.max {
            self.max = offset + sub.max;
            extremes.max = sub_max;
        }
        let sub_min = sub.members[sub.min].fitness();
        if first || sub_min < extremes.min {
            self.min = offset + sub.min;
            extremes.min = sub_min;
        }

        self.mean += delta * (sub.len / new_len);
        self.m2 += sub.m2 + delta * delta * (sub.len * self.len / new_len);
        self.len = new_len;
        self.members.append(&mut sub.members);

        sub.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Deme, Individual};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn naive_mean_variance(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        (mean, var)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_flat_scenario() {
        let pool: ViewPool<f64> = ViewPool::new();
        let view = pool.view_genomes(vec![3.0, 1.0, 4.0, 1.0, 5.0]);

        assert!(close(view.mean(), 2.8));
        assert!(close(view.variance().unwrap(), 2.56));
        assert_eq!(*view.max().unwrap(), 5.0);
        assert_eq!(*view.min().unwrap(), 1.0);
        // First of the tied minima wins.
        assert_eq!(view.min_index(), Ok(1));
        assert_eq!(view.max_index(), Ok(4));
        assert_eq!(view.range(), Ok(4.0));
    }

    #[test]
    fn test_ties_resolve_to_first_occurrence() {
        let pool: ViewPool<f64> = ViewPool::new();
        let view = pool.view_genomes(vec![2.0, 9.0, 0.0, 9.0, 0.0]);
        assert_eq!(view.max_index(), Ok(1));
        assert_eq!(view.min_index(), Ok(2));
    }

    #[test]
    fn test_nested_groups_match_flat_list() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut root = Deme::new("root");
        root.push_deme(Deme::from_genomes("a", [1.0, 2.0, 3.0]));
        root.push_deme(Deme::from_genomes("b", [4.0, 5.0]));

        let nested = root.view(&pool);
        let flat = pool.view_genomes(vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        assert!(close(nested.mean(), 3.0));
        assert!(close(nested.variance().unwrap(), 2.0));
        assert!(close(nested.mean(), flat.mean()));
        assert!(close(nested.variance().unwrap(), flat.variance().unwrap()));
        assert_eq!(nested.members(), flat.members());
        assert_eq!(nested.max_index(), flat.max_index());
        assert_eq!(nested.min_index(), flat.min_index());
    }

    #[test]
    fn test_mixed_genomes_and_populations_keep_order() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut root = Deme::from_genomes("root", [10.0]);
        root.push_deme(Deme::from_genomes("inner", [-3.0, 20.0]));
        root.push_genome(0.5);

        let view = root.view(&pool);
        assert_eq!(view.members(), &[10.0, -3.0, 20.0, 0.5]);
        assert_eq!(view.max_index(), Ok(2));
        assert_eq!(view.min_index(), Ok(1));
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn test_sub_population_extremes_are_offset() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut root = Deme::from_genomes("root", [5.0, 6.0]);
        root.push_deme(Deme::from_genomes("inner", [5.5, 1.0, 9.0]));

        let view = root.view(&pool);
        assert_eq!(view.max_index(), Ok(4));
        assert_eq!(view.min_index(), Ok(3));
    }

    #[test]
    fn test_tie_between_genome_and_population_keeps_first() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut root = Deme::from_genomes("root", [7.0]);
        root.push_deme(Deme::from_genomes("inner", [7.0, 7.0]));

        let view = root.view(&pool);
        assert_eq!(view.max_index(), Ok(0));
        assert_eq!(view.min_index(), Ok(0));
    }

    #[test]
    fn test_empty_sub_population_is_skipped() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut root = Deme::new("root");
        root.push_deme(Deme::new("empty"));
        root.push_genome(2.0);
        root.push_deme(Deme::new("also-empty"));
        root.push_genome(4.0);

        let view = root.view(&pool);
        assert_eq!(view.len(), 2);
        assert!(close(view.mean(), 3.0));
        assert!(close(view.variance().unwrap(), 1.0));
        assert!(!view.mean().is_nan());
    }

    #[test]
    fn test_only_empty_sub_populations_gives_empty_view() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut root: Deme<f64> = Deme::new("root");
        root.push_deme(Deme::new("empty"));

        let view = root.view(&pool);
        assert!(view.is_empty());
        assert_eq!(view.mean(), 0.0);
    }

    #[test]
    fn test_negative_infinity_genome_is_tracked() {
        let pool: ViewPool<f64> = ViewPool::new();
        let view = pool.view_genomes(vec![f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert_eq!(view.max_index(), Ok(0));
        assert_eq!(*view.min().unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_deep_nesting() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut deme = Deme::from_genomes("d0", [0.0]);
        for depth in 1..6 {
            let mut outer = Deme::from_genomes(format!("d{}", depth), [depth as f64]);
            outer.push_deme(deme);
            deme = outer;
        }

        let view = deme.view(&pool);
        assert_eq!(view.len(), 6);
        assert_eq!(view.members(), &[5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
        assert!(close(view.mean(), 2.5));
        assert_eq!(view.max_index(), Ok(0));
        assert_eq!(view.min_index(), Ok(5));
    }

    #[test]
    fn test_intermediate_views_are_released() {
        let pool: ViewPool<f64> = ViewPool::new();
        let mut root = Deme::new("root");
        root.push_deme(Deme::from_genomes("a", [1.0, 2.0]));
        root.push_deme(Deme::from_genomes("b", [3.0]));

        let view = root.view(&pool);
        let stats = pool.stats();
        assert_eq!(stats.acquired, 3);
        assert_eq!(stats.released, 2);
        drop(view);
        assert_eq!(pool.stats().released, 3);
    }

    #[test]
    fn test_members_are_shared_handles() {
        let pool: ViewPool<Arc<Individual>> = ViewPool::new();
        let best = Arc::new(Individual::new("best", 9.0));
        let deme = Deme::from_genomes(
            "shared",
            [Arc::new(Individual::new("worst", -1.0)), Arc::clone(&best)],
        );

        let view = deme.view(&pool);
        assert!(Arc::ptr_eq(view.max().unwrap(), &best));
        assert_eq!(view.min().unwrap().id, "worst");
    }

    #[test]
    fn test_view_over_borrowed_genomes() {
        let genomes = vec![Individual::new("a", 1.0), Individual::new("b", 3.0)];
        let pool: ViewPool<&Individual> = ViewPool::new();
        let view = pool.view_genomes(genomes.iter());

        assert_eq!(view.max().unwrap().id, "b");
        assert!(close(view.mean(), 2.0));
    }

    #[test]
    fn test_dyn_population_entities() {
        let pool: ViewPool<f64> = ViewPool::new();
        let inner = Deme::from_genomes("inner", [1.0, 3.0]);
        let entities: Vec<Entity<'_, f64, dyn Population<f64>>> = vec![
            Entity::Genome(2.0),
            Entity::Population(&inner),
        ];

        let view = pool.view(entities);
        assert_eq!(view.len(), 3);
        assert!(close(view.mean(), 2.0));
    }

    #[test]
    fn test_reused_view_is_reset() {
        let pool: ViewPool<f64> = ViewPool::new();
        pool.view_genomes(vec![100.0, 200.0]).release();

        let view = pool.view_genomes(vec![1.0]);
        assert_eq!(view.len(), 1);
        assert_eq!(view.mean(), 1.0);
        assert_eq!(view.variance(), Ok(0.0));
        assert_eq!(pool.stats().reused, 1);
    }

    fn scale(values: &[f64]) -> f64 {
        values.iter().fold(1.0, |m: f64, v| m.max(v.abs()))
    }

    fn values() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-1.0e6..1.0e6f64, 1..200)
    }

    proptest! {
        /// Single-pass variance agrees with the two-pass formula.
        #[test]
        fn prop_variance_matches_two_pass(values in values()) {
            let pool: ViewPool<f64> = ViewPool::new();
            let view = pool.view_genomes(values.clone());
            let (mean, var) = naive_mean_variance(&values);
            let s = scale(&values);

            prop_assert!((view.mean() - mean).abs() <= 1e-9 * s);
            prop_assert!((view.variance().unwrap() - var).abs() <= 1e-9 * s * s);
            prop_assert_eq!(view.len(), values.len());
        }

        /// Merging any partition gives the same statistics as the flat list.
        #[test]
        fn prop_partition_merge_matches_flat(
            values in values(),
            cuts in prop::collection::vec(0usize..200, 0..8),
        ) {
            let pool: ViewPool<f64> = ViewPool::new();
            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % values.len()).collect();
            cuts.push(0);
            cuts.push(values.len());
            cuts.sort_unstable();
            cuts.dedup();

            let mut root = Deme::new("root");
            for window in cuts.windows(2) {
                root.push_deme(Deme::from_genomes("part", values[window[0]..window[1]].to_vec()));
            }

            let nested = root.view(&pool);
            let flat = pool.view_genomes(values.clone());

            let s = scale(&values);
            prop_assert_eq!(nested.len(), flat.len());
            prop_assert!((nested.mean() - flat.mean()).abs() <= 1e-9 * s);
            let (nv, fv) = (nested.variance().unwrap(), flat.variance().unwrap());
            prop_assert!((nv - fv).abs() <= 1e-9 * s * s);
            prop_assert_eq!(*nested.max().unwrap(), *flat.max().unwrap());
            prop_assert_eq!(*nested.min().unwrap(), *flat.min().unwrap());
            prop_assert_eq!(nested.max_index(), flat.max_index());
            prop_assert_eq!(nested.min_index(), flat.min_index());
        }

        /// Every member lies between the reported extremes.
        #[test]
        fn prop_extremes_bound_members(values in values()) {
            let pool: ViewPool<f64> = ViewPool::new();
            let view = pool.view_genomes(values);
            let (max, min) = (*view.max().unwrap(), *view.min().unwrap());

            for v in view.members() {
                prop_assert!(max >= *v && *v >= min);
            }
        }
    }
}
