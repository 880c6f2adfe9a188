//! Core domain entities.

pub mod credential;
pub mod orders;
pub mod resource;

pub use credential::{Credential, Identity};
pub use orders::{
    CursorPageInfo, Order, OrderCount, OrderCursorPage, OrderPage, OrderSample,
    OrderStatusUpdate, OrderStatusUpdateResponse, PageInfo,
};
pub use resource::{ManagedResource, ProviderResourceState, ResourceHandle, ResourceSpec, ResourceState};
