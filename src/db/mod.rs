//! Storage layer for bingo-server
//!
//! Models, the `BingoStore` trait every handler talks to, and its
//! Postgres and in-memory implementations.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod slug;
pub mod store;

pub use memory::MemoryStore;
pub use models::{
    BingoCard, BingoCardSquare, CardDetail, Contact, Page, PageRequest, User, UserProfile,
    UserSession,
};
pub use postgres::PgStore;
pub use store::BingoStore;
