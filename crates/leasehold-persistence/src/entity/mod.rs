//! SeaORM entity definitions

pub mod lock;

pub mod prelude {
    pub use super::lock::Entity as Lock;
}
