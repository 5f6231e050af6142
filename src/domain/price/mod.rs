//! Price domain - external reference price paths

mod price_feed;

pub use price_feed::{GbmParams, GbmPriceFeed, PriceFeed, ReplayPriceFeed};

use serde::{Deserialize, Serialize};
use crate::shared::errors::SimError;

/// External reference prices, one per block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct PricePath(Vec<f64>);

impl PricePath {
    pub fn new(prices: Vec<f64>) -> Result<Self, SimError> {
        if prices.is_empty() {
            return Err(SimError::configuration("price path is empty"));
        }
        if let Some((block, price)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(SimError::configuration(format!(
                "price path has non-positive price {} at block {}",
                price, block
            )));
        }
        Ok(Self(prices))
    }

    /// The same price for `blocks` blocks
    pub fn constant(price: f64, blocks: usize) -> Result<Self, SimError> {
        Self::new(vec![price; blocks])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn prices(&self) -> &[f64] {
        &self.0
    }

    pub fn first(&self) -> f64 {
        self.0[0]
    }

    pub fn last(&self) -> f64 {
        self.0[self.0.len() - 1]
    }
}

impl TryFrom<Vec<f64>> for PricePath {
    type Error = SimError;

    fn try_from(prices: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(prices)
    }
}

impl AsRef<[f64]> for PricePath {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_path_validation() {
        assert!(PricePath::new(vec![]).is_err());
        assert!(PricePath::new(vec![3000.0, 0.0]).is_err());
        assert!(PricePath::new(vec![3000.0, f64::NAN]).is_err());
        let path = PricePath::try_from(vec![3000.0, 3001.0]).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.first(), 3000.0);
        assert_eq!(path.last(), 3001.0);
    }

    #[test]
    fn test_deserialize_validates() {
        let path: PricePath = serde_json::from_str("[3000.0, 3010.0]").unwrap();
        assert_eq!(path.last(), 3010.0);
        assert!(serde_json::from_str::<PricePath>("[]").is_err());
        assert!(serde_json::from_str::<PricePath>("[3000.0, -1.0]").is_err());
    }

    #[test]
    fn test_constant_path() {
        let path = PricePath::constant(3000.0, 10).unwrap();
        assert!(path.prices().iter().all(|p| *p == 3000.0));
        assert!(PricePath::constant(3000.0, 0).is_err());
    }
}
