pub mod migrate;
pub mod scope;
pub mod token;
