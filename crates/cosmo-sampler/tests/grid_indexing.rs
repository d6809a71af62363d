use cosmo_core::{ColumnName, ParameterSpace, ParameterSpec};
use cosmo_sampler::grid_point;
use proptest::prelude::*;

fn space(ndim: usize) -> ParameterSpace {
    let specs = (0..ndim)
        .map(|i| {
            let lower = -(i as f64) - 1.0;
            let upper = i as f64 + 2.0;
            ParameterSpec::new(
                ColumnName::sectioned("parameters", &format!("x{i}")).unwrap(),
                lower,
                lower,
                upper,
            )
            .unwrap()
        })
        .collect();
    ParameterSpace::new(specs).unwrap()
}

proptest! {
    #[test]
    fn grid_points_are_distinct_and_in_bounds(ndim in 1usize..4, n in 2usize..6) {
        let space = space(ndim);
        let total = n.pow(ndim as u32);
        let points: Vec<Vec<f64>> = (0..total).map(|i| grid_point(&space, n, i)).collect();
        for point in &points {
            prop_assert!(space.in_bounds(point));
        }
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                prop_assert_ne!(a, b);
            }
        }
        prop_assert_eq!(&points[0], &space.specs().iter().map(|s| s.lower).collect::<Vec<_>>());
        prop_assert_eq!(&points[total - 1], &space.specs().iter().map(|s| s.upper).collect::<Vec<_>>());
    }

    #[test]
    fn last_parameter_varies_fastest(n in 2usize..8) {
        let space = space(2);
        let first = grid_point(&space, n, 0);
        let second = grid_point(&space, n, 1);
        prop_assert_eq!(first[0], second[0]);
        prop_assert!(second[1] > first[1]);
    }
}
