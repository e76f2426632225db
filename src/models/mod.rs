mod book_request;
mod fulfilled_request;
mod ids;
mod payment;
mod user;

pub use book_request::*;
pub use fulfilled_request::*;
pub use ids::*;
pub use payment::*;
pub use user::*;
