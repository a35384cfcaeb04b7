//! Product catalog port and the in-memory price list.

use std::sync::Arc;

use async_trait::async_trait;
use common::{ItemType, Money};
use tokio::sync::RwLock;

use crate::error::DomainError;

/// A sellable item with its current price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub item_type: ItemType,
    pub name: String,
    pub price: Money,
}

impl CatalogItem {
    pub fn new(item_type: ItemType, price: Money) -> Self {
        Self {
            item_type,
            name: item_type.name().to_string(),
            price,
        }
    }
}

/// Looks up prices for the items of an order.
#[async_trait]
pub trait ProductCatalog: Send + Sync + 'static {
    /// Returns the entries for `item_types` that are sold on the drink menu
    /// (`is_barista`) or the food menu. Types not on that menu are left out.
    async fn get_items_by_type(
        &self,
        item_types: &[ItemType],
        is_barista: bool,
    ) -> Result<Vec<CatalogItem>, DomainError>;

    /// Returns the whole catalog.
    async fn get_all(&self) -> Result<Vec<CatalogItem>, DomainError>;
}

fn price_list() -> Vec<CatalogItem> {
    [
        (ItemType::Cappuccino, 450),
        (ItemType::CoffeeBlack, 300),
        (ItemType::CoffeeWithRoom, 300),
        (ItemType::Espresso, 350),
        (ItemType::EspressoDouble, 450),
        (ItemType::Latte, 450),
        (ItemType::CakePop, 250),
        (ItemType::Croissant, 325),
        (ItemType::Muffin, 300),
        (ItemType::CroissantChocolate, 350),
    ]
    .into_iter()
    .map(|(item_type, cents)| CatalogItem::new(item_type, Money::from_cents(cents)))
    .collect()
}

#[derive(Debug)]
struct InMemoryCatalogState {
    items: Vec<CatalogItem>,
    fail_on_lookup: bool,
}

/// Fixed price list held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl Default for InMemoryProductCatalog {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryCatalogState {
                items: price_list(),
                fail_on_lookup: false,
            })),
        }
    }
}

impl InMemoryProductCatalog {
    /// Creates a catalog with the standard price list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry of one menu, without going through the port.
    pub fn menu(&self, is_barista: bool) -> Vec<CatalogItem> {
        price_list()
            .into_iter()
            .filter(|item| item.item_type.is_drink() == is_barista)
            .collect()
    }

    /// Makes lookups fail, as if the catalog were unreachable.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_items_by_type(
        &self,
        item_types: &[ItemType],
        is_barista: bool,
    ) -> Result<Vec<CatalogItem>, DomainError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(DomainError::Catalog("product catalog unavailable".to_string()));
        }

        Ok(state
            .items
            .iter()
            .filter(|item| item.item_type.is_drink() == is_barista)
            .filter(|item| item_types.contains(&item.item_type))
            .cloned()
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<CatalogItem>, DomainError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(DomainError::Catalog("product catalog unavailable".to_string()));
        }

        Ok(state.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_filters_by_menu() {
        let catalog = InMemoryProductCatalog::new();

        let drinks = catalog
            .get_items_by_type(&[ItemType::Latte, ItemType::Muffin], true)
            .await
            .unwrap();
        assert_eq!(drinks, vec![CatalogItem::new(ItemType::Latte, Money::from_cents(450))]);

        let food = catalog
            .get_items_by_type(&[ItemType::Latte, ItemType::Muffin], false)
            .await
            .unwrap();
        assert_eq!(food, vec![CatalogItem::new(ItemType::Muffin, Money::from_cents(300))]);
    }

    #[tokio::test]
    async fn test_get_all_lists_every_item_type() {
        let catalog = InMemoryProductCatalog::new();
        let all = catalog.get_all().await.unwrap();

        assert_eq!(all.len(), ItemType::ALL.len());
        let croissant = all
            .iter()
            .find(|item| item.item_type == ItemType::Croissant)
            .unwrap();
        assert_eq!(croissant.price.to_string(), "$3.25");
        assert_eq!(croissant.name, "CROISSANT");
    }

    #[tokio::test]
    async fn test_fail_on_lookup() {
        let catalog = InMemoryProductCatalog::new();
        catalog.set_fail_on_lookup(true).await;

        let result = catalog.get_items_by_type(&[ItemType::Latte], true).await;
        assert!(matches!(result, Err(DomainError::Catalog(_))));
    }

    #[test]
    fn test_menus_split_the_price_list() {
        let catalog = InMemoryProductCatalog::new();
        assert_eq!(catalog.menu(true).len(), 6);
        assert_eq!(catalog.menu(false).len(), 4);
    }
}
