pub mod bags;
pub mod validate;
