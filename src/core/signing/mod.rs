pub mod attribute;
pub mod block;
pub mod eocd;
pub mod error;
pub mod pairs;
pub mod rewrite;
