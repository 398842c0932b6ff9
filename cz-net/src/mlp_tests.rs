use crate::mlp::{AffineMap, Edge, Mlp, NodeKind};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn edge_with(values: &[f64]) -> Edge {
    Edge {
        v: values.to_vec(),
        dv: vec![0.0; values.len()],
    }
}

#[test]
fn softmax_outputs_sum_to_one_and_value_is_open_unit() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut net = Mlp::new(4, &[8, 8], 5, &mut rng);

    for case in 0..50 {
        let input: Vec<f64> = (0..4).map(|i| ((case * 7 + i * 3) % 13) as f64 - 6.0).collect();
        let (policy, value) = net.forward(&input);
        let sum: f64 = policy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum = {}", sum);
        assert!(policy.iter().all(|&p| p > 0.0));
        assert!(value > 0.0 && value < 1.0, "value = {}", value);
    }
}

#[test]
fn value_head_starts_near_zero() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut net = Mlp::new(6, &[12, 12], 7, &mut rng);
    let (_, value) = net.forward(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    // sigma(-10) up to the tiny random affine output.
    assert!(value < 1e-3, "value = {}", value);
}

#[test]
fn affine_backward_is_the_transpose_of_forward() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut affine = AffineMap::new(3, 2, &mut rng);
    let w = affine.w.clone();

    let mut x = edge_with(&[0.3, -1.2, 0.7]);
    let mut y = edge_with(&[0.0, 0.0]);
    affine.forward(&x, &mut y);

    y.dv = vec![0.9, -0.4];
    // Zero step size: propagate without updating parameters.
    affine.backward(&mut x, &y, 0.0);
    assert_eq!(affine.w, w, "zero-step backward must not touch weights");

    for j in 0..3 {
        let expected = w[j] * y.dv[0] + w[3 + j] * y.dv[1];
        assert!(
            (x.dv[j] - expected).abs() < 1e-12,
            "x.dv[{}] = {}, expected {}",
            j,
            x.dv[j],
            expected
        );
    }
}

#[test]
fn affine_gradient_matches_finite_differences() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let mut affine = AffineMap::new(4, 3, &mut rng);
    let x0 = [0.25, -0.5, 1.5, -1.0];
    let g = [0.7, -0.2, 0.4];

    let mut x = edge_with(&x0);
    let mut y = edge_with(&[0.0; 3]);
    affine.forward(&x, &mut y);
    y.dv = g.to_vec();
    affine.backward(&mut x, &y, 0.0);

    // d(g . y)/dx_j by central differences.
    let eps = 1e-6;
    for j in 0..4 {
        let mut lo = edge_with(&x0);
        lo.v[j] -= eps;
        let mut hi = edge_with(&x0);
        hi.v[j] += eps;
        let mut y_lo = edge_with(&[0.0; 3]);
        let mut y_hi = edge_with(&[0.0; 3]);
        affine.forward(&lo, &mut y_lo);
        affine.forward(&hi, &mut y_hi);
        let f_lo: f64 = y_lo.v.iter().zip(&g).map(|(a, b)| a * b).sum();
        let f_hi: f64 = y_hi.v.iter().zip(&g).map(|(a, b)| a * b).sum();
        let numeric = (f_hi - f_lo) / (2.0 * eps);
        assert!(
            (x.dv[j] - numeric).abs() < 1e-6,
            "x.dv[{}] = {}, numeric {}",
            j,
            x.dv[j],
            numeric
        );
    }
}

#[test]
fn affine_update_applies_weight_decay_and_gradient() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut affine = AffineMap::new(2, 1, &mut rng);
    let w0 = affine.w.clone();
    let b0 = affine.b.clone();

    let mut x = edge_with(&[1.0, -2.0]);
    let mut y = edge_with(&[0.0]);
    affine.forward(&x, &mut y);
    y.dv = vec![0.5];

    let eta = 0.01;
    affine.backward(&mut x, &y, eta);

    let shrink = 1.0 - 2.0 * 0.002 * eta;
    assert!((affine.w[0] - (w0[0] * shrink - eta * 0.5 * 1.0)).abs() < 1e-15);
    assert!((affine.w[1] - (w0[1] * shrink - eta * 0.5 * -2.0)).abs() < 1e-15);
    assert!((affine.b[0] - (b0[0] * shrink - eta * 0.5)).abs() < 1e-15);
}

#[test]
fn leaky_relu_kink_is_visible_in_the_chain() {
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    let mut net = Mlp::new(2, &[4], 3, &mut rng);
    // Both branches exercised across many inputs; outputs stay finite.
    for i in 0..20 {
        let t = i as f64 - 10.0;
        let (policy, value) = net.forward(&[t, -t]);
        assert!(policy.iter().all(|p| p.is_finite()));
        assert!(value.is_finite());
    }
}

#[test]
fn training_moves_policy_toward_target() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut net = Mlp::new(3, &[10, 10], 4, &mut rng);
    let input = [0.5, -0.25, 1.0];
    let target = [1.0, 0.0, 0.0, 0.0];

    let (policy, _) = net.forward(&input);
    let before = policy[0];

    for _ in 0..500 {
        net.train(&input, &target, 0.0, 1e-3, false);
    }

    let (policy, _) = net.forward(&input);
    assert!(
        policy[0] > before + 0.1,
        "policy[0] {} -> {}",
        before,
        policy[0]
    );
}

#[test]
fn training_moves_value_toward_score() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut net = Mlp::new(3, &[10, 10], 4, &mut rng);
    let input = [0.8, 0.1, -0.4];
    let target = [0.25, 0.25, 0.25, 0.25];

    let (_, before) = net.forward(&input);

    for _ in 0..2000 {
        net.train(&input, &target, 0.9, 1e-3, false);
    }

    let (_, after) = net.forward(&input);
    assert!(after > before, "value {} -> {}", before, after);
    assert!(after < 1.0);
    assert!(after > 0.1, "value barely moved: {}", after);
}

#[test]
fn tracked_step_reports_outputs_and_gradients() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut net = Mlp::new(2, &[6], 3, &mut rng);
    let step = net
        .train(&[0.2, 0.4], &[0.5, 0.3, 0.2], 0.7, 1e-4, true)
        .expect("tracked step");
    assert_eq!(step.policy.len(), 3);
    assert_eq!(step.policy_grad.len(), 3);
    assert!(step.value > 0.0 && step.value < 1.0);
    // MLE gradient is negative wherever the target has mass.
    assert!(step.policy_grad.iter().all(|&g| g < 0.0));
    // The near-zero value output sits below the score, so its gradient pushes up.
    assert!(step.value_grad < 0.0);

    assert!(net
        .train(&[0.2, 0.4], &[0.5, 0.3, 0.2], 0.7, 1e-4, false)
        .is_none());
}

#[test]
#[should_panic(expected = "sum to 1")]
fn unnormalized_target_panics() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let mut net = Mlp::new(2, &[4], 3, &mut rng);
    net.train(&[0.0, 0.0], &[0.5, 0.5, 0.5], 0.0, 1e-4, false);
}

#[test]
fn node_chain_has_expected_shape() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let net = Mlp::new(5, &[9, 9], 6, &mut rng);
    assert_eq!(net.edges.len(), 7);
    assert_eq!(net.nodes.len(), 6);
    assert!(matches!(net.nodes[0].kind, NodeKind::Affine(_)));
    assert!(matches!(net.nodes[1].kind, NodeKind::LeakyRelu));
    assert!(matches!(net.nodes[5].kind, NodeKind::SoftmaxSigmoid));
    assert_eq!(net.edges.last().unwrap().v.len(), 7);
}
