use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The username a session or task belongs to. Produced by the access gate and
/// passed explicitly to every task operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Owner(String);

impl Owner {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for Owner {
    fn from(name: String) -> Self { Self(name) }
}

impl From<&str> for Owner {
    fn from(name: &str) -> Self { Self(name.to_string()) }
}

impl Display for Owner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}
