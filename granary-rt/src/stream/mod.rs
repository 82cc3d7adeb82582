//! Namespaced pub/sub streams with implicit subscriptions, plus lazy
//! operators over stream items.

pub mod broker;
pub mod operators;

pub use broker::{
    clear_broker, current_broker, set_broker, ImplicitSubscription, StreamBroker, StreamError,
    StreamHandle, StreamHandler, StreamProvider,
};
pub use operators::{
    filter_items, filter_items_async, group_items, map_items, map_items_async, reduce_items,
    reduce_items_async, ActorStreamExt,
};
