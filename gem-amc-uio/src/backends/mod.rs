pub mod address_table;
pub mod uio;
