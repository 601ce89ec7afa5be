mod session;
mod listing;
mod property;
mod saved_search;
mod contact_request;
mod notification;

pub use session::*;
pub use listing::*;
pub use property::*;
pub use saved_search::*;
pub use contact_request::*;
pub use notification::*;
