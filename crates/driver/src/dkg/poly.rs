//! Secret and public polynomials for Feldman secret sharing.
//!
//! Shares are evaluated at `x = index + 1` so that no share
//! is ever the evaluation at zero.
use bls12_381::{G1Affine, G1Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::{CryptoRng, RngCore};

/// Evaluation point for a share index.
pub fn share_point(index: u64) -> Scalar {
    Scalar::from(index) + Scalar::ONE
}

/// Secret polynomial `f(x) = a_0 + a_1*x + ... + a_{t-1}*x^{t-1}`.
#[derive(Clone)]
pub struct PriPoly {
    coefficients: Vec<Scalar>,
}

impl PriPoly {
    /// Random polynomial with `threshold` coefficients.
    pub fn random<R: RngCore + CryptoRng>(
        threshold: usize,
        rng: &mut R,
    ) -> Self {
        let coefficients =
            (0..threshold).map(|_| Scalar::random(&mut *rng)).collect();
        Self { coefficients }
    }

    /// Evaluate the share for an index.
    pub fn eval(&self, index: u64) -> Scalar {
        let x = share_point(index);
        let mut result = Scalar::ZERO;
        for coefficient in self.coefficients.iter().rev() {
            result = result * x + coefficient;
        }
        result
    }

    /// Commit to the coefficients.
    pub fn commit(&self) -> PubPoly {
        PubPoly::new(
            self.coefficients
                .iter()
                .map(|c| (G1Projective::generator() * c).to_affine())
                .collect(),
        )
    }
}

/// Public commitments `C_i = g^{a_i}` to a secret polynomial.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PubPoly {
    commits: Vec<G1Affine>,
}

impl PubPoly {
    /// Create from commitment points.
    pub fn new(commits: Vec<G1Affine>) -> Self {
        Self { commits }
    }

    /// Commitment points.
    pub fn commits(&self) -> &[G1Affine] {
        &self.commits
    }

    /// Number of coefficients.
    pub fn threshold(&self) -> usize {
        self.commits.len()
    }

    /// Evaluate the public polynomial at an index.
    ///
    /// Index zero of the underlying polynomial (the group key)
    /// is the first commitment, use [PubPoly::public_key].
    pub fn eval_index(&self, index: u64) -> G1Projective {
        self.eval_at(share_point(index))
    }

    /// Evaluate the public polynomial at `x`.
    pub fn eval(&self, x: u64) -> G1Projective {
        self.eval_at(Scalar::from(x))
    }

    fn eval_at(&self, x: Scalar) -> G1Projective {
        let mut result = G1Projective::identity();
        for commit in self.commits.iter().rev() {
            result = result * x + G1Projective::from(commit);
        }
        result
    }

    /// Group public key committed to by this polynomial.
    pub fn public_key(&self) -> G1Affine {
        self.eval(0).to_affine()
    }

    /// Check a share for an index against the commitments.
    pub fn verify_share(&self, index: u64, share: &Scalar) -> bool {
        let lhs = G1Projective::generator() * share;
        lhs == self.eval_index(index)
    }

    /// Add two public polynomials of the same threshold.
    pub fn add(&self, other: &PubPoly) -> Option<PubPoly> {
        if self.threshold() != other.threshold() {
            return None;
        }
        let commits = self
            .commits
            .iter()
            .zip(other.commits.iter())
            .map(|(a, b)| (G1Projective::from(a) + b).to_affine())
            .collect();
        Some(PubPoly::new(commits))
    }
}

/// Lagrange coefficient at zero for `index` within `indices`.
pub fn lagrange_coefficient(index: u64, indices: &[u64]) -> Option<Scalar> {
    let x_i = share_point(index);
    let mut numerator = Scalar::ONE;
    let mut denominator = Scalar::ONE;
    for other in indices.iter().filter(|j| **j != index) {
        let x_j = share_point(*other);
        numerator *= x_j;
        denominator *= x_j - x_i;
    }
    Option::<Scalar>::from(denominator.invert()).map(|inv| numerator * inv)
}

/// Recover the secret from `(index, share)` pairs.
pub fn recover_secret(shares: &[(u64, Scalar)]) -> Option<Scalar> {
    if shares.is_empty() {
        return None;
    }
    let indices: Vec<u64> = shares.iter().map(|(i, _)| *i).collect();
    let mut secret = Scalar::ZERO;
    for (index, share) in shares {
        secret += share * lagrange_coefficient(*index, &indices)?;
    }
    Some(secret)
}
