//! The in-memory order dataset behind the order tools.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub name: String,
    pub price: u32,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: String,
    pub status: String,
    pub amount: u32,
    pub items: Vec<OrderItem>,
}

/// The summary row listed by `get_orders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub status: String,
    pub amount: u32,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            status: order.status.clone(),
            amount: order.amount,
        }
    }
}

/// Read-only order lookup.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: Vec<Order>,
}

impl OrderStore {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// The two sample orders the demo ships with.
    pub fn sample() -> Self {
        let item = |name: &str, price, quantity| OrderItem {
            name: name.into(),
            price,
            quantity,
        };
        Self::new(vec![
            Order {
                id: "A001".into(),
                status: "paid".into(),
                amount: 199,
                items: vec![item("Apple", 99, 1), item("Banana", 50, 2)],
            },
            Order {
                id: "A002".into(),
                status: "pending".into(),
                amount: 89,
                items: vec![item("Orange", 89, 1)],
            },
        ])
    }

    pub fn summaries(&self) -> Vec<OrderSummary> {
        self.orders.iter().map(OrderSummary::from).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_orders() {
        let store = OrderStore::sample();
        let summaries = store.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "A001");
        assert_eq!(summaries[1].status, "pending");

        let a001 = store.find("A001").unwrap();
        assert_eq!(a001.items.len(), 2);
        assert_eq!(a001.items[1].quantity, 2);
        assert!(store.find("Z9").is_none());
    }
}
