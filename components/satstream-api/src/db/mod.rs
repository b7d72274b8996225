pub mod brc20_queries;
pub mod ordinals_queries;
