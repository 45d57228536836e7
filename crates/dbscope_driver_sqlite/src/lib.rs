mod driver;

pub use driver::{SqliteConnection, SqliteDriver};
