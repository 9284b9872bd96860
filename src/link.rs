//! Probabilistic one-way channels between nodes.

use rand::Rng;

use crate::packet::NodeId;

/// Link construction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    #[error("Link probability {probability} to {to} is outside [0, 1]")]
    InvalidProbability { to: NodeId, probability: f64 },
}

/// Directed lossy edge towards `to`.
///
/// Every delivery attempt is an independent Bernoulli trial drawn from the
/// generator the caller passes in.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    to: NodeId,
    probability: f64,
}

impl Link {
    pub fn new(to: NodeId, probability: f64) -> Result<Self, LinkError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(LinkError::InvalidProbability { to, probability });
        }
        Ok(Self { to, probability })
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Returns true when the packet makes it across this link.
    pub fn attempt_delivery<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rejects_out_of_range_probability() {
        assert!(Link::new(NodeId(1), -0.1).is_err());
        assert!(Link::new(NodeId(1), 1.0001).is_err());
        assert!(Link::new(NodeId(1), f64::NAN).is_err());
        assert!(Link::new(NodeId(1), f64::INFINITY).is_err());
        assert!(Link::new(NodeId(1), 0.0).is_ok());
        assert!(Link::new(NodeId(1), 1.0).is_ok());
    }

    #[test]
    fn test_boundary_probabilities_are_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let always = Link::new(NodeId(1), 1.0).unwrap();
        let never = Link::new(NodeId(1), 0.0).unwrap();

        for _ in 0..1000 {
            assert!(always.attempt_delivery(&mut rng));
            assert!(!never.attempt_delivery(&mut rng));
        }
    }

    #[test]
    fn test_delivery_rate_tracks_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let link = Link::new(NodeId(1), 0.3).unwrap();

        let delivered = (0..10_000).filter(|_| link.attempt_delivery(&mut rng)).count();
        let ratio = delivered as f64 / 10_000.0;
        assert!((ratio - 0.3).abs() < 0.03, "observed delivery ratio {}", ratio);
    }

    #[test]
    fn test_same_seed_same_outcomes() {
        let link = Link::new(NodeId(1), 0.5).unwrap();
        let mut rng1 = ChaCha8Rng::seed_from_u64(12345);
        let mut rng2 = ChaCha8Rng::seed_from_u64(12345);

        let a: Vec<bool> = (0..64).map(|_| link.attempt_delivery(&mut rng1)).collect();
        let b: Vec<bool> = (0..64).map(|_| link.attempt_delivery(&mut rng2)).collect();
        assert_eq!(a, b);
    }
}
