pub mod authn;
pub mod pages;
