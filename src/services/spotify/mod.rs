pub mod batch;
pub mod catalog;
pub mod client;
pub mod reconcile;
pub mod remote_index;
