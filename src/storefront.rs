//! The storefront schema: products, carts and the items linking them.
//!
//! - `Product` is publicly readable with an API key; the `cartItems` view is
//!   restricted to the `ADMINS` group.
//! - `Cart` and `CartItem` are owner-only. Ownership is checked per entity;
//!   a cart item is not covered by its cart's owner.

use std::sync::Arc;

use crate::auth::{AuthMode, AuthRule, AuthorizationConfig, Operation};
use crate::schema::{Entity, FieldSpec, Relationship, SchemaDefinition, SchemaResult, ValidatedSchema};

pub const PRODUCT: &str = "Product";
pub const CART_ITEM: &str = "CartItem";
pub const CART: &str = "Cart";

/// Group allowed to see which carts hold a product
pub const ADMINS: &str = "ADMINS";

pub const API_KEY_EXPIRES_IN_DAYS: i64 = 30;

pub fn config() -> AuthorizationConfig {
    AuthorizationConfig::new(AuthMode::ApiKey, API_KEY_EXPIRES_IN_DAYS)
}

pub fn definition() -> SchemaDefinition {
    let product = Entity::new(PRODUCT)
        .with_field("title", FieldSpec::string().required())
        .with_field("image", FieldSpec::url())
        .with_field("price", FieldSpec::float())
        .with_rule(AuthRule::public_api_key().to(&[Operation::Read]));

    let cart_item = Entity::new(CART_ITEM)
        .with_field("productId", FieldSpec::id().required())
        .with_field("cartId", FieldSpec::id().required())
        .with_field("quantity", FieldSpec::integer().with_default(1))
        .with_rule(AuthRule::owner());

    let cart = Entity::new(CART).with_rule(AuthRule::owner());

    let relationships = vec![
        Relationship::has_many(PRODUCT, "cartItems", CART_ITEM, "productId")
            .with_rule(AuthRule::group(ADMINS).to(&[Operation::Read])),
        Relationship::belongs_to(CART_ITEM, "product", PRODUCT, "productId"),
        Relationship::belongs_to(CART_ITEM, "cart", CART, "cartId"),
        Relationship::has_many(CART, "cartItems", CART_ITEM, "cartId"),
    ];

    SchemaDefinition {
        authorization: config(),
        entities: vec![product, cart_item, cart],
        relationships,
    }
}

/// Builds and finalizes the storefront schema.
pub fn schema() -> SchemaResult<Arc<ValidatedSchema>> {
    definition().finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    #[test]
    fn test_storefront_finalizes() {
        let schema = schema().unwrap();

        assert_eq!(schema.entities().count(), 3);
        assert_eq!(schema.relationships().len(), 4);
        assert_eq!(schema.config().api_key_expires_in_days, 30);
    }

    #[test]
    fn test_relation_and_owner_fields() {
        let schema = schema().unwrap();
        let names: Vec<&str> = schema
            .entity(CART_ITEM)
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();

        assert_eq!(names, ["productId", "cartId", "quantity", "owner", "product", "cart"]);
        assert_eq!(
            schema.field(CART, "cartItems").unwrap().spec.field_type,
            FieldType::Relation { target: CART_ITEM.into() }
        );
        assert!(schema.field(PRODUCT, "owner").is_none());
    }
}
