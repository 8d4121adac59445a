use lp_model::{LpModel, Sense};

#[test]
fn simple_problem() {
    let mut model = LpModel::with_sense(3, Sense::Minimize);
    let inf = model.infinity();
    model.set_objective(&[2., 1., 0.]);
    model.set_column_bounds(&[-inf, 0., 1.], &[inf, inf, 10.]);
    model.add_sparse_row(&[1., 1., 1.], &[0, 1, 2], 5., inf);
    model.add_row(&[1., -1., 0.], -2., 3.);
    model.add_sparse_row(&[2.], &[2], 4., 4.);

    let expected_str = "\\ lp_model

Minimize
  obj: 2 x0 + 1 x1 + 0 x2

Subject To
  r0: 1 x0 + 1 x1 + 1 x2 >= 5
  r1_lo: 1 x0 - 1 x1 >= -2
  r1_up: 1 x0 - 1 x1 <= 3
  r2: 2 x2 = 4

Bounds
  x0 free
  0 <= x1
  1 <= x2 <= 10

Generals
  x0
  x1
  x2

End
";
    assert_eq!(model.display_lp().to_string(), expected_str);
}

#[test]
fn infinity_leaves_a_side_open() {
    let mut model = LpModel::new(2);
    let inf = model.infinity();
    model.set_objective(&[-1., 0.5]);
    model.set_column_bounds(&[-inf, 3.], &[16.5, 3.]);
    model.add_row(&[1., 1.], -inf, inf);
    model.add_sparse_row(&[], &[], -inf, 7.);
    model.add_row(&[-3., 0.], f64::NEG_INFINITY, f64::INFINITY);

    let expected_str = "\\ lp_model

Maximize
  obj: - 1 x0 + 0.5 x1

Subject To
  r1: 0 x0 <= 7

Bounds
  -inf <= x0 <= 16.5
  x1 = 3

Generals
  x0
  x1

End
";
    assert_eq!(model.display_lp().to_string(), expected_str);
}

#[test]
fn default_bounds_are_non_negative() {
    let model = LpModel::new(1);
    let lp = model.display_lp().to_string();
    assert!(lp.contains("Maximize\n  obj: 0 x0\n"));
    assert!(lp.contains("\nBounds\n  0 <= x0\n"));
    assert!(!lp.contains("Subject To"));
}
