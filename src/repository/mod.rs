pub mod cart_item;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionError,
};
use thiserror::Error;

/// A handle that can run statements and knows whether it is inside a
/// transaction. Bulk mutations take a `Session` instead of a bare
/// [`ConnectionTrait`] so they can refuse to run in autocommit mode.
pub trait Session: ConnectionTrait {
    fn in_transaction(&self) -> bool;
}

impl Session for DatabaseConnection {
    fn in_transaction(&self) -> bool {
        false
    }
}

impl Session for DatabaseTransaction {
    fn in_transaction(&self) -> bool {
        true
    }
}

#[derive(Error, Debug)]
pub enum CartItemError {
    #[error("Bulk delete requires an active transaction")]
    TransactionRequired,
    #[error("Quantity should be greater than 0, got {0}")]
    InvalidQuantity(i32),
    #[error("Adding {added} to a quantity of {current} overflows")]
    QuantityOverflow { current: i32, added: i32 },
    #[error("Cart {cart_id} already holds product {product_id}")]
    DuplicateItem { cart_id: i32, product_id: i32 },
    #[error("Database error: {0}")]
    Storage(#[from] DbErr),
}

impl CartItemError {
    /// Maps an insert failure for `(cart_id, product_id)`, turning a unique
    /// index violation into [`CartItemError::DuplicateItem`].
    pub(crate) fn from_insert(err: DbErr, cart_id: i32, product_id: i32) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Self::DuplicateItem { cart_id, product_id }
            }
            _ => Self::Storage(err),
        }
    }
}

impl From<TransactionError<CartItemError>> for CartItemError {
    fn from(err: TransactionError<CartItemError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => Self::Storage(db_err),
            TransactionError::Transaction(inner) => inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db;
    use crate::entities::{cart, cart_item, product, setup_schema};
    use sea_orm::{ActiveModelTrait, Set};

    async fn db_with_item() -> DatabaseConnection {
        let config = DatabaseConfig::new("sqlite::memory:").with_max_connections(1);
        let db = db::connect(&config).await.expect("Failed to connect");
        setup_schema(&db).await.expect("Failed to create schema");

        cart::ActiveModel {
            id: Set(5),
            user_id: Set(1),
        }
        .insert(&db)
        .await
        .expect("Failed to insert cart");
        product::ActiveModel {
            id: Set(10),
            name: Set("Poppy seed bagel".to_owned()),
            price: Set(1.5),
            description: Set(String::new()),
            is_available: Set(true),
        }
        .insert(&db)
        .await
        .expect("Failed to insert product");
        new_item(5, 10).insert(&db).await.expect("Failed to insert cart item");

        db
    }

    fn new_item(cart_id: i32, product_id: i32) -> cart_item::ActiveModel {
        cart_item::ActiveModel {
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unique_violation_maps_to_duplicate_item() {
        let db = db_with_item().await;

        let err = new_item(5, 10)
            .insert(&db)
            .await
            .expect_err("Second row for the same pair should be rejected");

        assert!(matches!(
            CartItemError::from_insert(err, 5, 10),
            CartItemError::DuplicateItem {
                cart_id: 5,
                product_id: 10
            }
        ));
    }

    #[tokio::test]
    async fn other_insert_failures_stay_storage_errors() {
        let db = db_with_item().await;

        // no product 999: foreign key violation
        let err = new_item(5, 999)
            .insert(&db)
            .await
            .expect_err("Unknown product should be rejected");

        assert!(matches!(
            CartItemError::from_insert(err, 5, 999),
            CartItemError::Storage(_)
        ));
    }

    #[test]
    fn transaction_errors_flatten() {
        let inner: CartItemError =
            TransactionError::Transaction(CartItemError::TransactionRequired).into();
        assert!(matches!(inner, CartItemError::TransactionRequired));

        let connection: CartItemError =
            TransactionError::<CartItemError>::Connection(DbErr::Custom("gone".to_owned())).into();
        assert!(matches!(connection, CartItemError::Storage(DbErr::Custom(_))));
    }
}
