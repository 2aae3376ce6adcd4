use super::money::Credits;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

pub const MIN_NAME_LEN: usize = 2;

/// A platform user and their in-app wallet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub balance: Credits,
    /// The category the user most recently paid for. Earlier purchases stay in
    /// the user's plan history.
    #[serde(default)]
    pub category_id: Option<u64>,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            balance: Credits::ZERO,
            category_id: None,
        }
    }

    pub fn with_balance(mut self, balance: Credits) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(LedgerError::ValidationError(format!(
            "name must contain at least {MIN_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Partial update of a user. At least one field must be set.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub balance: Option<Credits>,
    pub email: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.balance.is_none() && self.email.is_none()
    }

    pub fn apply(self, user: &mut User) -> Result<()> {
        if self.is_empty() {
            return Err(LedgerError::ValidationError(
                "no fields to update".to_string(),
            ));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }

        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(balance) = self.balance {
            user.balance = balance;
        }
        if let Some(email) = self.email {
            user.email = Some(email);
        }
        Ok(())
    }
}
