pub mod authn;

pub mod prelude {
    pub use super::authn::*;
}
