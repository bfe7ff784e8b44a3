use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    /// Insertion order, used to break ties between equal timestamps.
    pub seq: u64,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub edited: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}
