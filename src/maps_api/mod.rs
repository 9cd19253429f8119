pub mod search;
pub mod search_adapter;
pub mod tile_retriever;
