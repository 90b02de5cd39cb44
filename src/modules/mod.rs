pub mod auth;
pub mod export;
pub mod history;
pub mod issuances;
pub mod materials;
pub mod schools;
pub mod subjects;
pub mod users;

pub use self::auth::model::LoginRequest;
pub use self::users::model::User;
