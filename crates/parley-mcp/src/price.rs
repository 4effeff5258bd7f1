//! Clothing price server: a small in-memory inventory with lookup,
//! upsert, and listing operations.

use crate::server::{required_f64, required_str};
use crate::{OperationSpec, ServerError, ToolServer};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Mutex;

const LABEL: &str = "clothing_price_server";

pub struct PriceServer {
    inventory: Mutex<BTreeMap<String, f64>>,
}

impl Default for PriceServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceServer {
    pub fn new() -> Self {
        let mut inventory = BTreeMap::new();
        inventory.insert("t-shirt".to_string(), 19.99);
        inventory.insert("jeans".to_string(), 59.90);
        inventory.insert("hoodie".to_string(), 39.95);
        Self {
            inventory: Mutex::new(inventory),
        }
    }

    /// Canonical key form: surrounding whitespace stripped, lowercased.
    fn normalize(item: &str) -> String {
        item.trim().to_lowercase()
    }

    /// Always returns a pair; a missing item is `(false, 0.0)` rather
    /// than an error.
    pub fn get_price(&self, item: &str) -> (bool, f64) {
        let key = Self::normalize(item);
        let inventory = self
            .inventory
            .lock()
            .expect("price inventory mutex poisoned");
        match inventory.get(&key) {
            Some(price) => (true, *price),
            None => (false, 0.0),
        }
    }

    /// Insert or update. Negative prices are clamped to zero.
    pub fn add_item(&self, item: &str, price: f64) -> (String, f64) {
        let key = Self::normalize(item);
        let stored = price.max(0.0);
        let mut inventory = self
            .inventory
            .lock()
            .expect("price inventory mutex poisoned");
        inventory.insert(key.clone(), stored);
        (key, stored)
    }

    /// Full inventory, sorted by item name.
    pub fn list_items(&self) -> Vec<(String, f64)> {
        let inventory = self
            .inventory
            .lock()
            .expect("price inventory mutex poisoned");
        inventory
            .iter()
            .map(|(name, price)| (name.clone(), *price))
            .collect()
    }
}

#[async_trait]
impl ToolServer for PriceServer {
    fn label(&self) -> &str {
        LABEL
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new(
                "get_price",
                "의류 품목의 가격을 조회합니다. 항상 (found, price)를 반환합니다.",
                json!({
                    "type": "object",
                    "properties": {"item": {"type": "string"}},
                    "required": ["item"]
                }),
            ),
            OperationSpec::new(
                "add_item",
                "의류 품목을 추가하거나 가격을 업데이트합니다. 항상 (item, price)를 반환합니다.",
                json!({
                    "type": "object",
                    "properties": {
                        "item": {"type": "string"},
                        "price": {"type": "number"}
                    },
                    "required": ["item", "price"]
                }),
            ),
            OperationSpec::new(
                "list_items",
                "모든 의류 품목과 가격 목록을 반환합니다.",
                json!({"type": "object", "properties": {}}),
            ),
        ]
    }

    async fn call(&self, operation: &str, arguments: Value) -> Result<String, ServerError> {
        match operation {
            "get_price" => {
                let item = required_str(&arguments, "item")?;
                let (found, price) = self.get_price(item);
                Ok(json!([found, price]).to_string())
            }
            "add_item" => {
                let item = required_str(&arguments, "item")?;
                let price = required_f64(&arguments, "price")?;
                let (key, stored) = self.add_item(item, price);
                Ok(json!([key, stored]).to_string())
            }
            "list_items" => Ok(json!(self.list_items()).to_string()),
            other => Err(ServerError::UnknownOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_item_lookup_returns_found_and_price() {
        let server = PriceServer::new();
        assert_eq!(server.get_price("t-shirt"), (true, 19.99));
    }

    #[test]
    fn unknown_item_returns_false_and_zero() {
        let server = PriceServer::new();
        assert_eq!(server.get_price("scarf"), (false, 0.0));
    }

    #[test]
    fn lookup_normalizes_case_and_whitespace() {
        let server = PriceServer::new();
        assert_eq!(server.get_price("  T-Shirt "), (true, 19.99));
    }

    #[test]
    fn negative_price_is_clamped_to_zero() {
        let server = PriceServer::new();
        assert_eq!(server.add_item("Socks", -3.5), ("socks".to_string(), 0.0));
        assert_eq!(server.get_price("socks"), (true, 0.0));
    }

    #[test]
    fn add_item_updates_existing_entry() {
        let server = PriceServer::new();
        server.add_item("jeans", 45.00);
        assert_eq!(server.get_price("jeans"), (true, 45.00));
    }

    #[test]
    fn listing_is_sorted_by_name() {
        let server = PriceServer::new();
        server.add_item("Anorak", 89.0);
        let items = server.list_items();
        let names: Vec<&str> = items.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["anorak", "hoodie", "jeans", "t-shirt"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn operations_answer_with_json_pairs() {
        let server = PriceServer::new();
        let answer = server
            .call("get_price", json!({"item": "hoodie"}))
            .await
            .expect("call");
        assert_eq!(answer, "[true,39.95]");

        let missing = server
            .call("get_price", json!({}))
            .await
            .expect_err("missing argument");
        assert!(matches!(missing, ServerError::InvalidArguments(_)));
    }
}
