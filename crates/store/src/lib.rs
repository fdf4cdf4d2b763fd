pub mod memory;
pub mod seed;

pub use memory::InMemoryStore;
pub use seed::SeedData;
