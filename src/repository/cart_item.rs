//! Cart item queries.
//!
//! The free functions take any connection or transaction, so callers can
//! compose them inside a transaction of their own. [`CartItemRepository`]
//! wraps the shared pool and opens a transaction itself where a write
//! needs one.

use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use serde::Serialize;
use std::{future::Future, pin::Pin, sync::Arc};
use tracing::{debug, warn};

use crate::entities::{cart_item, cart_item::Entity as CartItemEntity, product};
use crate::repository::{CartItemError, Session};

/// A cart item together with the product it points at, loaded by the same
/// query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartItemWithProduct {
    #[serde(flatten)]
    pub item: cart_item::Model,
    pub product: product::Model,
}

/// Every item of `cart_id` in insertion order, each joined with its product.
/// An unknown cart yields an empty list.
pub async fn find_by_cart_id<C: ConnectionTrait>(
    conn: &C,
    cart_id: i32,
) -> Result<Vec<CartItemWithProduct>, CartItemError> {
    let rows = CartItemEntity::find()
        .join(JoinType::InnerJoin, cart_item::Relation::Product.def())
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::Id)
        .select_also(product::Entity)
        .all(conn)
        .await?;

    let items = pair_with_products(rows)?;

    debug!(cart_id, count = items.len(), "Listed cart items");
    Ok(items)
}

/// The join is an INNER JOIN, so a row without its product means the result
/// set is broken; that is reported instead of dropping the row.
fn pair_with_products(
    rows: Vec<(cart_item::Model, Option<product::Model>)>,
) -> Result<Vec<CartItemWithProduct>, CartItemError> {
    rows.into_iter()
        .map(|(item, product)| match product {
            Some(product) => Ok(CartItemWithProduct { item, product }),
            None => Err(CartItemError::Storage(DbErr::RecordNotFound(format!(
                "product {} of cart item {}",
                item.product_id, item.id
            )))),
        })
        .collect()
}

pub async fn find_by_cart_id_and_product_id<C: ConnectionTrait>(
    conn: &C,
    cart_id: i32,
    product_id: i32,
) -> Result<Option<cart_item::Model>, CartItemError> {
    let entry = CartItemEntity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(conn)
        .await?;

    debug!(cart_id, product_id, found = entry.is_some(), "Looked up cart item");
    Ok(entry)
}

/// Removes every item of `cart_id` with a single `DELETE` and returns the
/// number of rows removed.
///
/// Fails with [`CartItemError::TransactionRequired`] when `session` is not a
/// transaction; nothing is sent to the database in that case.
pub async fn delete_by_cart_id<S: Session>(
    session: &S,
    cart_id: i32,
) -> Result<u64, CartItemError> {
    if !session.in_transaction() {
        warn!(cart_id, "Refused to delete cart items outside of a transaction");
        return Err(CartItemError::TransactionRequired);
    }

    let result = CartItemEntity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .exec(session)
        .await?;

    debug!(cart_id, rows = result.rows_affected, "Deleted cart items");
    Ok(result.rows_affected)
}

/// Puts `quantity` of `product_id` into `cart_id`. An existing line for the
/// same product gets the quantity added instead of a second row.
///
/// The merge is a single `UPDATE ... SET quantity = quantity + ?`, issued
/// before any read so that concurrent adds queue on the write lock rather
/// than fail on a lock upgrade.
pub async fn add_item<C: ConnectionTrait>(
    conn: &C,
    cart_id: i32,
    product_id: i32,
    quantity: i32,
) -> Result<cart_item::Model, CartItemError> {
    if quantity <= 0 {
        return Err(CartItemError::InvalidQuantity(quantity));
    }

    let merged = CartItemEntity::update_many()
        .col_expr(
            cart_item::Column::Quantity,
            Expr::col(cart_item::Column::Quantity).add(quantity),
        )
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .filter(cart_item::Column::Quantity.lte(i32::MAX - quantity))
        .exec(conn)
        .await?;

    let existing = find_by_cart_id_and_product_id(conn, cart_id, product_id).await?;

    match existing {
        Some(entry) if merged.rows_affected > 0 => {
            debug!(
                cart_id,
                product_id,
                quantity = entry.quantity,
                "Merged into existing cart item"
            );
            Ok(entry)
        }
        // the row is there but the guard on the update held it back
        Some(entry) => Err(CartItemError::QuantityOverflow {
            current: entry.quantity,
            added: quantity,
        }),
        None => {
            let new_entry = cart_item::ActiveModel {
                cart_id: Set(cart_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                ..Default::default()
            };
            let inserted = new_entry
                .insert(conn)
                .await
                .map_err(|err| CartItemError::from_insert(err, cart_id, product_id))?;
            debug!(cart_id, product_id, quantity, "Added cart item");
            Ok(inserted)
        }
    }
}

pub type TransactionFuture<'c, T> =
    Pin<Box<dyn Future<Output = Result<T, CartItemError>> + Send + 'c>>;

#[derive(Clone, Debug)]
pub struct CartItemRepository {
    db: Arc<DatabaseConnection>,
}

impl CartItemRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_cart_id(
        &self,
        cart_id: i32,
    ) -> Result<Vec<CartItemWithProduct>, CartItemError> {
        find_by_cart_id(self.db.as_ref(), cart_id).await
    }

    pub async fn find_by_cart_id_and_product_id(
        &self,
        cart_id: i32,
        product_id: i32,
    ) -> Result<Option<cart_item::Model>, CartItemError> {
        find_by_cart_id_and_product_id(self.db.as_ref(), cart_id, product_id).await
    }

    /// Bulk delete in a transaction of its own.
    pub async fn delete_by_cart_id(&self, cart_id: i32) -> Result<u64, CartItemError> {
        self.transaction::<_, u64>(move |txn| {
            Box::pin(async move { delete_by_cart_id(txn, cart_id).await })
        })
        .await
    }

    pub async fn add_item(
        &self,
        cart_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<cart_item::Model, CartItemError> {
        self.transaction::<_, cart_item::Model>(move |txn| {
            Box::pin(async move { add_item(txn, cart_id, product_id, quantity).await })
        })
        .await
    }

    /// Runs `callback` in a transaction that commits when it returns `Ok` and
    /// rolls back otherwise.
    pub async fn transaction<F, T>(&self, callback: F) -> Result<T, CartItemError>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> TransactionFuture<'c, T> + Send,
        T: Send,
    {
        Ok(self.db.transaction(callback).await?)
    }
}
