#[derive(Debug)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

pub const TRANSACTION_CATEGORIES: [&str; 10] = [
    "food",
    "transport",
    "entertainment",
    "bills",
    "healthcare",
    "shopping",
    "salary",
    "freelance",
    "investment",
    "other",
];

pub const TRANSACTION_TYPES: [&str; 2] = ["income", "expense"];

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

pub fn validate_email_address(email: &str) -> Validity {
    if email.chars().count() > 320 {
        return Validity::Invalid(String::from("Email address is too long."));
    }

    if email.chars().any(|c| c == ' ' || !c.is_ascii()) {
        return Validity::Invalid(String::from(
            "Email address cannot contain a space or non-ASCII characters.",
        ));
    }

    let Some((local_part, domain)) = email.split_once('@') else {
        return Validity::Invalid(String::from("Email address must contain an at symbol (@)."));
    };

    if local_part.is_empty() || domain.len() < 3 {
        return Validity::Invalid(String::from("Email username or domain name is too short."));
    }

    if domain.contains('@') || !domain.contains('.') {
        return Validity::Invalid(String::from(
            "Email address must have only one at symbol (@) and the domain must contain a period.",
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Validity::Invalid(String::from(
            "Domain name in email address cannot begin or end with a period.",
        ));
    }

    Validity::Valid
}

pub fn validate_username(username: &str) -> Validity {
    if username.len() < 6 {
        return Validity::Invalid(String::from(
            "Username must be at least 6 characters long.",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Validity::Invalid(String::from(
            "Username can only contain letters, numbers, and underscores.",
        ));
    }

    Validity::Valid
}

pub fn validate_strong_password(password: &str) -> Validity {
    if password.len() < 8 {
        return Validity::Invalid(String::from(
            "Password must be at least 8 characters long.",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Validity::Invalid(String::from(
            "Password must contain at least one uppercase letter.",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Validity::Invalid(String::from(
            "Password must contain at least one lowercase letter.",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Validity::Invalid(String::from(
            "Password must contain at least one digit.",
        ));
    }

    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        return Validity::Invalid(format!(
            "Password must contain at least one special character ({PASSWORD_SPECIAL_CHARS})."
        ));
    }

    Validity::Valid
}

pub fn validate_transaction_category(category: &str) -> Validity {
    if TRANSACTION_CATEGORIES.contains(&category) {
        Validity::Valid
    } else {
        Validity::Invalid(format!("'{category}' is not a recognized category."))
    }
}

pub fn validate_transaction_type(transaction_type: &str) -> Validity {
    if TRANSACTION_TYPES.contains(&transaction_type) {
        Validity::Valid
    } else {
        Validity::Invalid(String::from(
            "Transaction type must be either 'income' or 'expense'.",
        ))
    }
}
