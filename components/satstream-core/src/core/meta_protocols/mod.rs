pub mod brc20;
