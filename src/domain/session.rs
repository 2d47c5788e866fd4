use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Buyer,
    Farmer,
    Industry,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Buyer => "buyer",
            Role::Farmer => "farmer",
            Role::Industry => "industry",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" | "shopper" => Ok(Role::Buyer),
            "farmer" => Ok(Role::Farmer),
            "industry" => Ok(Role::Industry),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Identity fields of a logged-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub credential: String,
    pub account_id: String,
    pub role: Role,
    pub display_name: String,
    pub email: String,
}

/// Who is shopping right now.
///
/// Passed explicitly to the cart engine; the presence of a credential is the
/// only thing that decides where cart state lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionContext {
    account: Option<Account>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(account: Account) -> Self {
        Self {
            account: Some(account),
        }
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn credential(&self) -> Option<&str> {
        self.account
            .as_ref()
            .map(|account| account.credential.as_str())
            .filter(|credential| !credential.is_empty())
    }

    pub fn identity(&self) -> CartIdentity {
        match (&self.account, self.credential()) {
            (Some(account), Some(_)) => CartIdentity::Authenticated(account.account_id.clone()),
            _ => CartIdentity::Anonymous,
        }
    }
}

/// Where the authoritative copy of the cart lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartIdentity {
    /// Local persistent store.
    Anonymous,
    /// Server-side cart of this account.
    Authenticated(String),
}
