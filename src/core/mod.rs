pub mod db;
pub mod envelope;
pub mod errors;
pub mod helpers;
pub mod kv;
pub mod multipart;
pub mod query_params;
#[cfg(not(target_arch = "wasm32"))]
pub mod redb_store;
pub mod static_server;
