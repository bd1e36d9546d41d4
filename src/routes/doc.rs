use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{CheckoutMode, OrderStatus, Size},
    dto::{
        cart::{AddToCartRequest, AddToCartResult, UpdateCartItemRequest},
        checkout::{BuyNowRequest, BuyNowResult, CheckoutSummary, ConfirmCheckoutForm},
        orders::{OrderItemRequest, OrderList, PlaceOrderRequest, UpdateOrderStatusRequest},
    },
    models::{CartSummary, DraftView, LineItem, Order, OrderItem, Product, ShippingInfo},
    response::{ApiResponse, Meta},
    routes::{admin, cart, checkout, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::get_product,
        cart::cart_summary,
        cart::add_to_cart,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        checkout::buy_now,
        checkout::get_draft,
        checkout::get_draft_by_id,
        checkout::clear_draft,
        checkout::checkout_summary,
        checkout::confirm,
        orders::place_order,
        orders::list_my_orders,
        orders::get_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::advance_order_status
    ),
    components(
        schemas(
            Size,
            CheckoutMode,
            OrderStatus,
            Product,
            LineItem,
            CartSummary,
            DraftView,
            ShippingInfo,
            Order,
            OrderItem,
            AddToCartRequest,
            AddToCartResult,
            UpdateCartItemRequest,
            BuyNowRequest,
            BuyNowResult,
            CheckoutSummary,
            ConfirmCheckoutForm,
            checkout::CheckoutQuery,
            OrderItemRequest,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            OrderList,
            params::Pagination,
            params::SortOrder,
            params::OrderListQuery,
            health::HealthData,
            Meta,
            ApiResponse<CartSummary>,
            ApiResponse<AddToCartResult>,
            ApiResponse<DraftView>,
            ApiResponse<CheckoutSummary>,
            ApiResponse<Order>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog lookups"),
        (name = "Cart", description = "Persistent cart of a user or guest"),
        (name = "Checkout", description = "Buy-now drafts and checkout confirmation"),
        (name = "Orders", description = "Order placement and lookups"),
        (name = "Admin", description = "Order fulfillment (admin only)"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
