use serde::{Deserialize, Serialize};

/// Position of a user in a single symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Option<i32>,
    pub user_id: String,
    pub portfolio_id: Option<String>,
    pub symbol: String,
    pub asset_type: Option<String>,
    pub quantity: f64,
    pub average_price: f64,
    pub current_price: Option<f64>,
    pub current_value: Option<f64>,
    pub gain_loss_percent: Option<f64>,
}

impl Holding {
    /// Market value if known, otherwise the value at cost
    pub fn value(&self) -> f64 {
        match (self.current_value, self.current_price) {
            (Some(value), _) => value,
            (None, Some(price)) => self.quantity * price,
            (None, None) => self.cost(),
        }
    }

    pub fn cost(&self) -> f64 {
        self.quantity * self.average_price
    }
}
