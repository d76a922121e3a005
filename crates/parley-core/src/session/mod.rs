mod collection;
mod model;
mod store;

pub use collection::SessionCollection;
pub use model::Session;
pub use store::{create_new_session, generate_session_id, SessionStore};
