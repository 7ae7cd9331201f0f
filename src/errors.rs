use std::fmt;

use thiserror::Error;

/// The three form fields a transaction needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormField {
    Sender,
    Receiver,
    Amount,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Sender, FormField::Receiver, FormField::Amount];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Sender => "sender",
            FormField::Receiver => "receiver",
            FormField::Amount => "amount",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failures surfaced at the UI boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Network or transport failure, non-success snapshot status, or a body that
    /// is not the JSON we expect.
    #[error("server unreachable: {0}")]
    Connectivity(String),
    /// Required form fields were empty. Detected before any network call.
    #[error("please fill in all fields (missing: {})", join_fields(.0))]
    Validation(Vec<FormField>),
    /// The server refused to mine the transaction (HTTP 403).
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("a transaction is already being mined")]
    Busy,
}

fn join_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn validation__display__lists_missing_fields_in_order() {
        // given
        let err = ClientError::Validation(vec![FormField::Sender, FormField::Amount]);

        // when
        let message = err.to_string();

        // then
        assert_eq!(message, "please fill in all fields (missing: sender, amount)");
    }

    #[test]
    fn rejected__display__carries_server_reason() {
        let err = ClientError::Rejected("User Blacklisted".to_string());
        assert_eq!(err.to_string(), "transaction rejected: User Blacklisted");
    }
}
