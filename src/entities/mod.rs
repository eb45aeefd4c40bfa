pub mod cart;
pub mod cart_item;
pub mod product;

use sea_orm::{sea_query::Index, ConnectionTrait, DbErr, Schema};
use tracing::info;

use crate::entities::{
    cart::Entity as Cart,
    cart_item::Entity as CartItem,
    product::Entity as Product,
};

pub const CART_ITEM_UNIQUE_INDEX: &str = "idx-cart_item-cart_id-product_id";

/// Creates every table this crate reads or writes, parents first so the
/// foreign keys on `cart_item` resolve, plus the unique index that keeps a
/// cart from holding the same product twice.
pub async fn setup_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_cart_table = schema.create_table_from_entity(Cart);
    let mut create_product_table = schema.create_table_from_entity(Product);
    let mut create_cart_item_table = schema.create_table_from_entity(CartItem);

    create_cart_table.if_not_exists();
    create_product_table.if_not_exists();
    create_cart_item_table.if_not_exists();

    db.execute(backend.build(&create_cart_table)).await?;
    db.execute(backend.build(&create_product_table)).await?;
    db.execute(backend.build(&create_cart_item_table)).await?;

    let create_unique_index = Index::create()
        .if_not_exists()
        .name(CART_ITEM_UNIQUE_INDEX)
        .table(CartItem)
        .col(cart_item::Column::CartId)
        .col(cart_item::Column::ProductId)
        .unique()
        .to_owned();
    db.execute(backend.build(&create_unique_index)).await?;

    info!("Cart schema ready");
    Ok(())
}
