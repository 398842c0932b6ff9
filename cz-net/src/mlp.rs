//! The network: typed edges, three node kinds, and the one-example training
//! step.

use rand::Rng;

/// Leak slope of the rectifier.
const LEAK: f64 = 0.01;
/// L2 weight decay, fused into the backward update.
const WEIGHT_DECAY: f64 = 0.002;
/// Sigmoid input offset; keeps the value head near zero at initialization.
const SIGMOID_BIAS: f64 = 10.0;
/// Singularity guard for the maximum-likelihood policy loss.
const POLICY_EPS: f64 = 1e-10;
/// Singularity guard for the log-ratio value loss.
const SCORE_EPS: f64 = 1e-5;

/// A fixed-length value vector with a parallel gradient vector.
pub(crate) struct Edge {
    pub(crate) v: Vec<f64>,
    pub(crate) dv: Vec<f64>,
}

impl Edge {
    fn new(len: usize) -> Edge {
        Edge {
            v: vec![0.0; len],
            dv: vec![0.0; len],
        }
    }

    fn len(&self) -> usize {
        self.v.len()
    }
}

/// Dense affine map `y = Wx + b` with the SGD + weight-decay update fused into
/// the backward pass.
pub(crate) struct AffineMap {
    pub(crate) w: Vec<f64>,
    pub(crate) b: Vec<f64>,
    n_in: usize,
    n_out: usize,
}

impl AffineMap {
    pub(crate) fn new(n_in: usize, n_out: usize, rng: &mut impl Rng) -> AffineMap {
        let mut w = vec![0.0; n_in * n_out];
        let mut b = vec![0.0; n_out];
        for wi in &mut w {
            *wi = 0.001 * (rng.gen::<f64>() - 0.5);
        }
        for bi in &mut b {
            *bi = 0.001 * (rng.gen::<f64>() - 0.5);
        }
        AffineMap { w, b, n_in, n_out }
    }

    pub(crate) fn forward(&self, x: &Edge, y: &mut Edge) {
        debug_assert_eq!(x.len(), self.n_in);
        debug_assert_eq!(y.len(), self.n_out);
        for i in 0..self.n_out {
            let mut acc = self.b[i];
            let row = &self.w[i * self.n_in..(i + 1) * self.n_in];
            for (j, &wij) in row.iter().enumerate() {
                acc += wij * x.v[j];
            }
            y.v[i] = acc;
        }
    }

    pub(crate) fn backward(&mut self, x: &mut Edge, y: &Edge, step_size: f64) {
        let shrink = 1.0 - 2.0 * WEIGHT_DECAY * step_size;
        for g in &mut x.dv {
            *g = 0.0;
        }
        for i in 0..self.n_out {
            let gy = y.dv[i];
            let row = &mut self.w[i * self.n_in..(i + 1) * self.n_in];
            for (j, wij) in row.iter_mut().enumerate() {
                x.dv[j] += gy * *wij;
                *wij = *wij * shrink - step_size * gy * x.v[j];
            }
            self.b[i] = self.b[i] * shrink - step_size * gy;
        }
    }
}

fn leaky_relu_forward(x: &Edge, y: &mut Edge) {
    debug_assert_eq!(x.len(), y.len());
    for i in 0..x.len() {
        let v = x.v[i];
        y.v[i] = if v > 0.0 { v } else { LEAK * v };
    }
}

fn leaky_relu_backward(x: &mut Edge, y: &Edge) {
    // The slope can be read off the output sign because the leak is positive.
    for i in 0..y.len() {
        x.dv[i] = if y.v[i] > 0.0 { y.dv[i] } else { LEAK * y.dv[i] };
    }
}

/// Softmax over the first `len - 1` slots plus a lone sigmoid in the last.
fn softmax_sigmoid_forward(x: &Edge, y: &mut Edge) {
    debug_assert_eq!(x.len(), y.len());
    let k = y.len() - 1;

    let mut xmax = x.v[0];
    for &v in &x.v[1..k] {
        xmax = xmax.max(v);
    }
    assert!(xmax.abs() < 1e100, "softmax input blew up: {}", xmax);

    let mut sum = 0.0;
    for i in 0..k {
        y.v[i] = (x.v[i] - xmax).exp();
        sum += y.v[i];
    }
    // The subtracted maximum forces one term to exactly 1.
    assert!(sum >= 1.0 && sum <= 1.01 * k as f64, "softmax sum out of range: {}", sum);

    let inv = 1.0 / sum;
    for v in &mut y.v[..k] {
        *v *= inv;
    }

    y.v[k] = 1.0 / (1.0 + (SIGMOID_BIAS - x.v[k]).exp());
}

fn softmax_sigmoid_backward(x: &mut Edge, y: &Edge) {
    let k = y.len() - 1;

    let mut sum = 0.0;
    for i in 0..k {
        x.dv[i] = y.v[i] * y.dv[i];
        sum += x.dv[i];
    }
    for i in 0..k {
        x.dv[i] -= y.v[i] * sum;
    }

    x.dv[k] = y.dv[k] * y.v[k] * (1.0 - y.v[k]);
}

pub(crate) enum NodeKind {
    Affine(AffineMap),
    LeakyRelu,
    SoftmaxSigmoid,
}

pub(crate) struct Node {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) kind: NodeKind,
}

/// Snapshot of one training step, for tracked dumps.
pub struct TrainStep {
    pub policy: Vec<f64>,
    pub value: f64,
    pub policy_grad: Vec<f64>,
    pub value_grad: f64,
}

/// The network. Owns its parameters and computation edges for its full
/// lifetime; one instance serves both inference and training.
pub struct Mlp {
    pub(crate) edges: Vec<Edge>,
    pub(crate) nodes: Vec<Node>,
    input_len: usize,
    policy_len: usize,
}

impl Mlp {
    /// Build the chain: input -> (affine -> leaky ReLU) per hidden layer ->
    /// affine -> softmax+sigmoid over `policy_len + 1` outputs.
    pub fn new(
        input_len: usize,
        hidden_layer_sizes: &[usize],
        policy_len: usize,
        rng: &mut impl Rng,
    ) -> Mlp {
        assert!(input_len > 0 && policy_len >= 2);

        let mut edges = vec![Edge::new(input_len)];
        for &size in hidden_layer_sizes {
            assert!(size > 0);
            edges.push(Edge::new(size));
            edges.push(Edge::new(size));
        }
        edges.push(Edge::new(policy_len + 1));
        edges.push(Edge::new(policy_len + 1));

        let mut nodes = Vec::new();
        let layers = hidden_layer_sizes.len() + 1;
        for i in 0..layers {
            let x = 2 * i;
            let y = 2 * i + 1;
            let affine = AffineMap::new(edges[x].len(), edges[y].len(), rng);
            nodes.push(Node {
                x,
                y,
                kind: NodeKind::Affine(affine),
            });
            nodes.push(Node {
                x: y,
                y: y + 1,
                kind: if i + 1 < layers {
                    NodeKind::LeakyRelu
                } else {
                    NodeKind::SoftmaxSigmoid
                },
            });
        }

        Mlp {
            edges,
            nodes,
            input_len,
            policy_len,
        }
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn policy_len(&self) -> usize {
        self.policy_len
    }

    /// Run the chain on `input`. Returns the policy distribution and the value
    /// estimate in (0, 1).
    pub fn forward(&mut self, input: &[f64]) -> (&[f64], f64) {
        assert_eq!(input.len(), self.input_len, "bad input length");
        self.edges[0].v.copy_from_slice(input);

        for n in &self.nodes {
            let (x, y) = edge_pair(&mut self.edges, n.x, n.y);
            match &n.kind {
                NodeKind::Affine(a) => a.forward(x, y),
                NodeKind::LeakyRelu => leaky_relu_forward(x, y),
                NodeKind::SoftmaxSigmoid => softmax_sigmoid_forward(x, y),
            }
        }

        let out = self.edges.last().expect("empty chain");
        (&out.v[..self.policy_len], out.v[self.policy_len])
    }

    /// One SGD step on a single `(input, target policy, score)` example.
    ///
    /// The policy head takes a maximum-likelihood gradient against `target`;
    /// the value head a log-ratio gradient against `score`, chosen so the
    /// near-zero initial output does not produce an unbounded step.
    ///
    /// Returns a snapshot of the step when `track` is set.
    pub fn train(
        &mut self,
        input: &[f64],
        target: &[f64],
        score: f64,
        step_size: f64,
        track: bool,
    ) -> Option<TrainStep> {
        assert_eq!(target.len(), self.policy_len, "bad target length");
        let total: f64 = target.iter().sum();
        assert!(
            (total - 1.0).abs() < 1e-10,
            "policy target must sum to 1, got {}",
            total
        );

        self.forward(input);

        let k = self.policy_len;
        let out = self.edges.last_mut().expect("empty chain");
        for i in 0..k {
            out.dv[i] = -target[i] / (POLICY_EPS + out.v[i]);
        }
        let v = out.v[k];
        let s = (1.0 - SCORE_EPS) * score + SCORE_EPS;
        out.dv[k] = 2.0 * (v / s).ln() / v;

        let trace = track.then(|| {
            let out = self.edges.last().expect("empty chain");
            TrainStep {
                policy: out.v[..k].to_vec(),
                value: out.v[k],
                policy_grad: out.dv[..k].to_vec(),
                value_grad: out.dv[k],
            }
        });

        for n in self.nodes.iter_mut().rev() {
            let (x, y) = edge_pair(&mut self.edges, n.x, n.y);
            match &mut n.kind {
                NodeKind::Affine(a) => a.backward(x, y, step_size),
                NodeKind::LeakyRelu => leaky_relu_backward(x, y),
                NodeKind::SoftmaxSigmoid => softmax_sigmoid_backward(x, y),
            }
        }

        trace
    }
}

/// Split the edge list into the node's input and output. Edges form a chain,
/// so `x < y` always holds.
fn edge_pair(edges: &mut [Edge], x: usize, y: usize) -> (&mut Edge, &mut Edge) {
    debug_assert!(x < y);
    let (lo, hi) = edges.split_at_mut(y);
    (&mut lo[x], &mut hi[0])
}
