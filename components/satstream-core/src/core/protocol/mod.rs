pub mod inscription_indexing;
pub mod satoshi_tracking;
