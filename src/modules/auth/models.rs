use serde::{Deserialize, Serialize};

use shelf_collection::User;
use shelf_store::Document;

/// Request model for account creation.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request model for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Stored shape of a user document. `password` is the salted digest; it
/// never leaves this module.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDoc {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Wire view of a stored user.
pub fn user_from_doc(doc: &Document) -> Option<User> {
    Some(User {
        id: doc.id.clone(),
        email: doc.body.get("email")?.as_str()?.to_string(),
        name: doc.body.get("name")?.as_str()?.to_string(),
    })
}
