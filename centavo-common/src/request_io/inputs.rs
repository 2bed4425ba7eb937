use serde::{Deserialize, Serialize};

use crate::validators;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl InputUser {
    pub fn validate_username(&self) -> validators::Validity {
        validators::validate_username(&self.username)
    }

    pub fn validate_email_address(&self) -> validators::Validity {
        validators::validate_email_address(&self.email)
    }

    pub fn validate_strong_password(&self) -> validators::Validity {
        validators::validate_strong_password(&self.password)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputTransaction {
    pub amount_cents: i64,
    pub description: String,
    pub category: String,
    pub transaction_type: String,
}

impl InputTransaction {
    pub fn validate(&self) -> validators::Validity {
        if self.amount_cents <= 0 {
            return validators::Validity::Invalid(String::from(
                "Amount must be greater than 0.",
            ));
        }

        if self.description.is_empty() || self.description.len() > 255 {
            return validators::Validity::Invalid(String::from(
                "Description must be between 1 and 255 characters long.",
            ));
        }

        if let v @ validators::Validity::Invalid(_) =
            validators::validate_transaction_category(&self.category)
        {
            return v;
        }

        validators::validate_transaction_type(&self.transaction_type)
    }
}
