// Entity Models
// In-memory state of the desk: the account being worked on and the session
// that owns it. Persistence lives in db.rs; these types never touch SQL.

pub mod account;
pub mod session;

pub use account::Account;
pub use session::Session;
